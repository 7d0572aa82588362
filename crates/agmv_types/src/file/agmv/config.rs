//! Playback configuration for AGMV sessions.
//!
//! The configuration is plain data so hosts can load it from any serde
//! format. Missing keys fall back to [`PlaybackConfig::default`].

use serde::{Deserialize, Serialize};

use crate::file::HeaderError;

/// Highest volume, in percent
pub const MAX_VOLUME: u8 = 100;

/// Session options chosen by the host.
///
/// # Presets
///
/// - `default()`: audio on at full volume, playing, frames up to 4096 pixels wide or tall
/// - `silent()`: as `default()` with audio disabled
///
/// # Examples
///
/// ```
/// use agmv_types::file::agmv::PlaybackConfig;
///
/// let config = PlaybackConfig {
///     volume: 40,
///     ..PlaybackConfig::default()
/// };
/// assert!(config.audio_enabled);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
	/// Decode audio chunks when the stream has audio
	pub audio_enabled: bool,
	/// Initial volume in percent, clamped to 100
	pub volume: u8,
	/// Open the session with video and audio paused
	pub start_paused: bool,
	/// Largest accepted frame width or height
	pub max_dimension: u32,
}

impl Default for PlaybackConfig {
	fn default() -> Self {
		Self {
			audio_enabled: true,
			volume: MAX_VOLUME,
			start_paused: false,
			max_dimension: 4096,
		}
	}
}

impl PlaybackConfig {
	/// Default configuration with audio disabled
	pub fn silent() -> Self {
		Self {
			audio_enabled: false,
			..Self::default()
		}
	}

	/// Volume clamped to the valid range
	pub fn clamped_volume(&self) -> u8 {
		self.volume.min(MAX_VOLUME)
	}

	/// Rejects frames larger than `max_dimension` in either direction.
	pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), HeaderError> {
		if width > self.max_dimension || height > self.max_dimension {
			return Err(HeaderError::InvalidDimensions {
				width,
				height,
			});
		}
		Ok(())
	}
}
