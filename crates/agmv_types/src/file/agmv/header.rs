//! AGMV main header.
//!
//! | Offset | Size | Field                  | Notes                          |
//! |--------|------|------------------------|--------------------------------|
//! | 0x00   | 4    | `magic`                | "AGMV"                         |
//! | 0x04   | 4    | `num_frames`           |                                |
//! | 0x08   | 4    | `width`                |                                |
//! | 0x0C   | 4    | `height`               |                                |
//! | 0x10   | 1    | `pixel_format`         |                                |
//! | 0x11   | 1    | `version`              | selects the [`CodecDialect`]   |
//! | 0x12   | 4    | `fps`                  | must be below 200              |
//! | 0x16   | 4    | `total_audio_duration` |                                |
//! | 0x1A   | 4    | `sample_rate`          |                                |
//! | 0x1E   | 4    | `audio_size`           |                                |
//! | 0x22   | 2    | `num_channels`         |                                |
//! | 0x24   | 2    | `bits_per_sample`      | absent in legacy versions      |
//!
//! Zero, one or two palettes of 256 `u16` colors follow, depending on the
//! version.

use std::fmt::Display;
use std::io::Read;

use serde::Serialize;

use crate::file::{AgmvError, HeaderError};

use super::dialect::CodecDialect;
use super::palette::{PALETTE_BYTES, Palette};

/// Magic bytes at the start of every AGMV stream
pub const MAGIC: [u8; 4] = *b"AGMV";

/// Size of the fixed fields shared by every version
pub const BASE_HEADER_SIZE: usize = 36;

/// Exclusive upper bound on the frame rate
pub const MAX_FPS: u32 = 200;

/// Main header of an AGMV stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
	num_frames: u32,
	width: u32,
	height: u32,
	pixel_format: u8,
	dialect: CodecDialect,
	fps: u32,
	total_audio_duration: u32,
	sample_rate: u32,
	audio_size: u32,
	num_channels: u16,
	bits_per_sample: u16,
	#[serde(skip)]
	palettes: Vec<Palette>,
}

impl Header {
	/// Creates a header with no audio and black palettes.
	pub fn new(dialect: CodecDialect, width: u32, height: u32, fps: u32) -> Result<Self, HeaderError> {
		validate_dimensions(width, height)?;
		if fps >= MAX_FPS {
			return Err(HeaderError::InvalidFrameRate(fps));
		}

		Ok(Self {
			num_frames: 0,
			width,
			height,
			pixel_format: 0,
			dialect,
			fps,
			total_audio_duration: 0,
			sample_rate: 0,
			audio_size: 0,
			num_channels: 0,
			bits_per_sample: 0,
			palettes: vec![Palette::new(); dialect.palette_count()],
		})
	}

	/// Sets the frame count
	pub fn with_num_frames(mut self, num_frames: u32) -> Self {
		self.num_frames = num_frames;
		self
	}

	/// Sets the pixel format byte
	pub fn with_pixel_format(mut self, pixel_format: u8) -> Self {
		self.pixel_format = pixel_format;
		self
	}

	/// Sets the audio parameters.
	///
	/// Legacy dialects cannot store a sample width, so for them it is derived
	/// from `audio_size` the same way the decoder does.
	pub fn with_audio(
		mut self,
		sample_rate: u32,
		num_channels: u16,
		bits_per_sample: u16,
		audio_size: u32,
		total_audio_duration: u32,
	) -> Result<Self, HeaderError> {
		let bits_per_sample = if self.dialect.has_bits_per_sample() {
			bits_per_sample
		} else {
			legacy_bits_per_sample(audio_size)
		};
		validate_bits_per_sample(bits_per_sample)?;

		self.sample_rate = sample_rate;
		self.num_channels = num_channels;
		self.bits_per_sample = bits_per_sample;
		self.audio_size = audio_size;
		self.total_audio_duration = total_audio_duration;
		Ok(self)
	}

	/// Replaces the palette at `index`; ignored if the dialect has no such palette
	pub fn with_palette(mut self, index: usize, palette: Palette) -> Self {
		if let Some(slot) = self.palettes.get_mut(index) {
			*slot = palette;
		}
		self
	}

	/// Number of frames in the stream
	pub fn num_frames(&self) -> u32 {
		self.num_frames
	}

	/// Frame width in pixels
	pub fn width(&self) -> u32 {
		self.width
	}

	/// Frame height in pixels
	pub fn height(&self) -> u32 {
		self.height
	}

	/// Pixel format byte
	pub fn pixel_format(&self) -> u8 {
		self.pixel_format
	}

	/// Version byte
	pub fn version(&self) -> u8 {
		self.dialect.version()
	}

	/// Codec dialect resolved from the version byte
	pub fn dialect(&self) -> CodecDialect {
		self.dialect
	}

	/// Frames per second
	pub fn fps(&self) -> u32 {
		self.fps
	}

	/// Total audio duration
	pub fn total_audio_duration(&self) -> u32 {
		self.total_audio_duration
	}

	/// Audio sample rate in Hz
	pub fn sample_rate(&self) -> u32 {
		self.sample_rate
	}

	/// Total audio payload size in bytes
	pub fn audio_size(&self) -> u32 {
		self.audio_size
	}

	/// Number of audio channels
	pub fn num_channels(&self) -> u16 {
		self.num_channels
	}

	/// Sample width of the reconstructed audio: 0 (none), 8 or 16
	pub fn bits_per_sample(&self) -> u16 {
		self.bits_per_sample
	}

	/// Returns `true` if the stream carries audio
	pub fn has_audio(&self) -> bool {
		self.bits_per_sample != 0
	}

	/// Palettes following the header, as many as the dialect defines
	pub fn palettes(&self) -> &[Palette] {
		&self.palettes
	}

	/// Serialized size, which is also the offset of the first chunk
	pub fn size(&self) -> usize {
		let bps_field = if self.dialect.has_bits_per_sample() {
			2
		} else {
			0
		};
		BASE_HEADER_SIZE + bps_field + self.dialect.palette_count() * PALETTE_BYTES
	}

	/// Reads and validates a header, leaving the reader past any palettes.
	pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self, AgmvError> {
		let mut fixed = [0u8; BASE_HEADER_SIZE];
		reader.read_exact(&mut fixed)?;

		let magic = [fixed[0], fixed[1], fixed[2], fixed[3]];
		if magic != MAGIC {
			return Err(HeaderError::InvalidMagic {
				expected: MAGIC,
				actual: magic,
			}
			.into());
		}

		let u32_at = |at: usize| u32::from_le_bytes([fixed[at], fixed[at + 1], fixed[at + 2], fixed[at + 3]]);

		let num_frames = u32_at(0x04);
		let width = u32_at(0x08);
		let height = u32_at(0x0C);
		let pixel_format = fixed[0x10];
		let dialect = CodecDialect::from_version(fixed[0x11])?;
		let fps = u32_at(0x12);
		let total_audio_duration = u32_at(0x16);
		let sample_rate = u32_at(0x1A);
		let audio_size = u32_at(0x1E);
		let num_channels = u16::from_le_bytes([fixed[0x22], fixed[0x23]]);

		if fps >= MAX_FPS {
			return Err(HeaderError::InvalidFrameRate(fps).into());
		}

		let bits_per_sample = if dialect.has_bits_per_sample() {
			let mut buf = [0u8; 2];
			reader.read_exact(&mut buf)?;
			u16::from_le_bytes(buf)
		} else {
			legacy_bits_per_sample(audio_size)
		};
		validate_bits_per_sample(bits_per_sample)?;
		validate_dimensions(width, height)?;

		let palettes = (0..dialect.palette_count())
			.map(|_| Palette::from_reader(&mut *reader))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			num_frames,
			width,
			height,
			pixel_format,
			dialect,
			fps,
			total_audio_duration,
			sample_rate,
			audio_size,
			num_channels,
			bits_per_sample,
			palettes,
		})
	}

	/// Parses a header from the start of a byte slice
	pub fn from_bytes(data: &[u8]) -> Result<Self, AgmvError> {
		let mut cursor = data;
		Self::from_reader(&mut cursor)
	}

	/// Serializes the header and its palettes
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut bytes = Vec::with_capacity(self.size());

		bytes.extend_from_slice(&MAGIC);
		bytes.extend_from_slice(&self.num_frames.to_le_bytes());
		bytes.extend_from_slice(&self.width.to_le_bytes());
		bytes.extend_from_slice(&self.height.to_le_bytes());
		bytes.push(self.pixel_format);
		bytes.push(self.dialect.version());
		bytes.extend_from_slice(&self.fps.to_le_bytes());
		bytes.extend_from_slice(&self.total_audio_duration.to_le_bytes());
		bytes.extend_from_slice(&self.sample_rate.to_le_bytes());
		bytes.extend_from_slice(&self.audio_size.to_le_bytes());
		bytes.extend_from_slice(&self.num_channels.to_le_bytes());
		if self.dialect.has_bits_per_sample() {
			bytes.extend_from_slice(&self.bits_per_sample.to_le_bytes());
		}
		for palette in &self.palettes {
			bytes.extend_from_slice(&palette.to_bytes());
		}

		bytes
	}
}

fn legacy_bits_per_sample(audio_size: u32) -> u16 {
	if audio_size > 0 {
		8
	} else {
		0
	}
}

fn validate_bits_per_sample(bits_per_sample: u16) -> Result<(), HeaderError> {
	match bits_per_sample {
		0 | 8 | 16 => Ok(()),
		other => Err(HeaderError::InvalidBitsPerSample(other)),
	}
}

fn validate_dimensions(width: u32, height: u32) -> Result<(), HeaderError> {
	if width == 0 || height == 0 {
		return Err(HeaderError::InvalidDimensions {
			width,
			height,
		});
	}
	Ok(())
}

impl Display for Header {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"AGMV Header:\n\
			- Dialect: {}\n\
			- Frames: {}\n\
			- Dimensions: {}x{}\n\
			- Pixel Format: {}\n\
			- FPS: {}\n\
			- Audio: {} Hz, {} channel(s), {} bits, {} bytes\n\
			- Audio Duration: {}\n\
			- Palettes: {}",
			self.dialect,
			self.num_frames,
			self.width,
			self.height,
			self.pixel_format,
			self.fps,
			self.sample_rate,
			self.num_channels,
			self.bits_per_sample,
			self.audio_size,
			self.total_audio_duration,
			self.palettes.len(),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_header(version: u8) -> Header {
		let dialect = CodecDialect::from_version(version).unwrap();
		let mut palette = Palette::new();
		palette.set(3, 0x1234);
		Header::new(dialect, 320, 240, 24)
			.unwrap()
			.with_num_frames(100)
			.with_pixel_format(1)
			.with_audio(22050, 1, 8, 4096, 4)
			.unwrap()
			.with_palette(0, palette.clone())
			.with_palette(1, palette)
	}

	#[test]
	fn test_roundtrip_every_version() {
		for version in 1..=6 {
			let header = sample_header(version);
			let bytes = header.to_bytes();
			assert_eq!(bytes.len(), header.size());

			let parsed = Header::from_bytes(&bytes).unwrap();
			assert_eq!(parsed, header);
			assert_eq!(parsed.width(), 320);
			assert_eq!(parsed.height(), 240);
			assert_eq!(parsed.version(), version);
			assert_eq!(parsed.palettes().len(), header.dialect().palette_count());
		}
	}

	#[test]
	fn test_header_sizes() {
		assert_eq!(sample_header(1).size(), 36 + 512);
		assert_eq!(sample_header(3).size(), 38 + 1024);
		assert_eq!(sample_header(5).size(), 38);
	}

	#[test]
	fn test_legacy_derives_sample_width() {
		let header = sample_header(2);
		assert_eq!(header.bits_per_sample(), 8);

		let silent = Header::new(CodecDialect::from_version(1).unwrap(), 8, 8, 10).unwrap();
		let parsed = Header::from_bytes(&silent.to_bytes()).unwrap();
		assert_eq!(parsed.bits_per_sample(), 0);
		assert!(!parsed.has_audio());
	}

	#[test]
	fn test_reader_left_after_palettes() {
		let header = sample_header(3);
		let mut bytes = header.to_bytes();
		bytes.extend_from_slice(b"AGFC");

		let mut cursor = std::io::Cursor::new(bytes);
		Header::from_reader(&mut cursor).unwrap();
		assert_eq!(cursor.position() as usize, header.size());
	}

	#[test]
	fn test_rejects_bad_magic() {
		let mut bytes = sample_header(5).to_bytes();
		bytes[0..4].copy_from_slice(b"RIFF");
		assert!(matches!(
			Header::from_bytes(&bytes),
			Err(AgmvError::InvalidHeader(HeaderError::InvalidMagic { .. }))
		));
	}

	#[test]
	fn test_rejects_unknown_version() {
		let mut bytes = sample_header(5).to_bytes();
		bytes[0x11] = 9;
		assert!(matches!(
			Header::from_bytes(&bytes),
			Err(AgmvError::InvalidHeader(HeaderError::UnsupportedVersion(9)))
		));
	}

	#[test]
	fn test_rejects_frame_rate() {
		let mut bytes = sample_header(5).to_bytes();
		bytes[0x12..0x16].copy_from_slice(&200u32.to_le_bytes());
		assert!(matches!(
			Header::from_bytes(&bytes),
			Err(AgmvError::InvalidHeader(HeaderError::InvalidFrameRate(200)))
		));

		bytes[0x12..0x16].copy_from_slice(&199u32.to_le_bytes());
		assert!(Header::from_bytes(&bytes).is_ok());
	}

	#[test]
	fn test_rejects_sample_width() {
		let mut bytes = sample_header(5).to_bytes();
		bytes[0x24..0x26].copy_from_slice(&12u16.to_le_bytes());
		assert!(matches!(
			Header::from_bytes(&bytes),
			Err(AgmvError::InvalidHeader(HeaderError::InvalidBitsPerSample(12)))
		));

		assert_eq!(
			Header::new(CodecDialect::from_version(5).unwrap(), 4, 4, 1).unwrap().with_audio(8000, 1, 24, 10, 1),
			Err(HeaderError::InvalidBitsPerSample(24))
		);
	}

	#[test]
	fn test_rejects_zero_dimensions() {
		let mut bytes = sample_header(5).to_bytes();
		bytes[0x08..0x0C].copy_from_slice(&0u32.to_le_bytes());
		assert!(matches!(
			Header::from_bytes(&bytes),
			Err(AgmvError::InvalidHeader(HeaderError::InvalidDimensions { width: 0, .. }))
		));
	}

	#[test]
	fn test_truncated_header_is_io_error() {
		let bytes = sample_header(1).to_bytes();
		assert!(matches!(Header::from_bytes(&bytes[..100]), Err(AgmvError::Io(_))));
	}
}
