//! Error types for AGMV parsing and decoding.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons an AGMV main header is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
	/// The stream does not start with the `AGMV` tag
	#[error("Invalid magic number: expected {expected:02X?}, got {actual:02X?}")]
	InvalidMagic {
		/// Expected tag bytes
		expected: [u8; 4],
		/// Tag bytes found in the stream
		actual: [u8; 4],
	},

	/// The version byte does not name a known codec dialect
	#[error("Unsupported AGMV version: {0}")]
	UnsupportedVersion(u8),

	/// Frame rate of 200 or more
	#[error("Implausible frame rate: {0} fps (must be below 200)")]
	InvalidFrameRate(u32),

	/// Bits per sample outside {0, 8, 16}
	#[error("Unsupported bits per sample: {0} (expected 0, 8 or 16)")]
	InvalidBitsPerSample(u16),

	/// Zero or oversized frame dimensions
	#[error("Invalid frame dimensions: {width}x{height}")]
	InvalidDimensions {
		/// Frame width in pixels
		width: u32,
		/// Frame height in pixels
		height: u32,
	},
}

/// Errors raised by the LZSS stage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LzssError {
	/// Input ran out before the output was complete
	#[error("Compressed stream ended after producing {produced} of {expected} bytes")]
	UnexpectedEnd {
		/// Bytes produced so far
		produced: usize,
		/// Bytes that were requested
		expected: usize,
	},

	/// A back-reference points before the start of the output
	#[error("Invalid back-reference at output position {position}: distance {distance}")]
	InvalidBackReference {
		/// Output cursor when the reference was read
		position: usize,
		/// Distance stored in the reference
		distance: usize,
	},

	/// The destination buffer cannot hold the requested output
	#[error("Output buffer too small: need {required} bytes, have {available}")]
	OutputTooSmall {
		/// Requested uncompressed size
		required: usize,
		/// Size of the destination buffer
		available: usize,
	},
}

/// Unified error type for the AGMV codec
#[derive(Debug, Error)]
pub enum AgmvError {
	/// Header validation failed; no buffers were allocated
	#[error("Invalid header: {0}")]
	InvalidHeader(#[from] HeaderError),

	/// The source file could not be opened
	#[error("File not found: {}", path.display())]
	FileNotFound {
		/// Path that was requested
		path: PathBuf,
	},

	/// A frame, scratch or audio buffer could not be allocated
	#[error("Failed to allocate {bytes} bytes")]
	MemoryAllocation {
		/// Size of the failed request in bytes
		bytes: usize,
	},

	/// A single frame failed to decode; the session remains usable
	#[error("Corrupt frame {frame}: {reason}")]
	CorruptFrame {
		/// Frame number from the chunk header
		frame: u32,
		/// What went wrong
		reason: String,
	},

	/// An audio chunk could not be read; fatal for the session
	#[error("Invalid audio chunk: {message}")]
	InvalidAudioChunk {
		/// What went wrong
		message: String,
	},

	/// The stream carries no audio (bits per sample is 0)
	#[error("Audio is disabled for this stream")]
	AudioDisabled,

	/// LZSS decompression error outside of frame decoding
	#[error(transparent)]
	Lzss(#[from] LzssError),

	/// IO error
	#[error(transparent)]
	Io(#[from] std::io::Error),

	/// WAV export error
	#[error(transparent)]
	Wav(#[from] hound::Error),
}

impl AgmvError {
	/// Shorthand for [`AgmvError::CorruptFrame`]
	pub fn corrupt(frame: u32, reason: impl Into<String>) -> Self {
		Self::CorruptFrame {
			frame,
			reason: reason.into(),
		}
	}

	/// Returns `true` for errors that only invalidate the current frame.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, Self::CorruptFrame { .. })
	}
}
