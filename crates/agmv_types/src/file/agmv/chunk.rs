//! Frame and audio chunk headers.
//!
//! ```text
//! AGFC | frame_num u32 | [frame_type u16] | uncompressed_size u32 | compressed_size u32 | payload
//! AGAC | size u32      | [compressed_size u32]                                         | payload
//! ```
//!
//! Bracketed fields are absent in legacy dialects.

use std::fmt::Display;
use std::io::{Read, Seek};

use serde::Serialize;

use crate::file::AgmvError;

use super::dialect::CodecDialect;
use super::reader::ByteReader;

/// Tag opening a frame chunk
pub const FRAME_CHUNK_TAG: [u8; 4] = *b"AGFC";

/// Tag opening an audio chunk
pub const AUDIO_CHUNK_TAG: [u8; 4] = *b"AGAC";

/// Whether a frame stands alone or references earlier frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u16)]
pub enum FrameType {
	/// I-frame; becomes the long-lived reference
	Intra = 0,
	/// P-frame; decoded against the I-frame and the previous frame
	Inter = 1,
}

impl FrameType {
	/// Converts a chunk field to `FrameType`
	pub fn from_u16(value: u16) -> Option<Self> {
		match value {
			0 => Some(Self::Intra),
			1 => Some(Self::Inter),
			_ => None,
		}
	}

	/// Frame type of a legacy chunk, which carries no type field
	pub fn legacy(frame_num: u32) -> Self {
		if frame_num == 0 {
			Self::Intra
		} else {
			Self::Inter
		}
	}

	/// Returns `true` for I-frames
	pub fn is_intra(self) -> bool {
		self == Self::Intra
	}
}

impl Display for FrameType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Intra => write!(f, "I"),
			Self::Inter => write!(f, "P"),
		}
	}
}

/// Fields following an `AGFC` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameChunkHeader {
	/// Frame number
	pub frame_num: u32,
	/// Frame type, explicit or derived for legacy streams
	pub frame_type: FrameType,
	/// Size of the frame bitstream after decompression
	pub uncompressed_size: u32,
	/// Size of the payload on disk
	pub compressed_size: u32,
}

impl FrameChunkHeader {
	/// Reads the fields after the tag; the cursor must be past the tag.
	///
	/// An unknown frame type is reported as a corrupt frame once all fields
	/// have been consumed, so the caller can still skip the payload.
	pub fn read<R: Read + Seek>(reader: &mut ByteReader<R>, dialect: CodecDialect) -> Result<Self, AgmvError> {
		let frame_num = reader.read_u32()?;
		let raw_type = if dialect.has_frame_type() {
			Some(reader.read_u16()?)
		} else {
			None
		};
		let uncompressed_size = reader.read_u32()?;
		let compressed_size = reader.read_u32()?;

		let frame_type = match raw_type {
			None => FrameType::legacy(frame_num),
			Some(value) => FrameType::from_u16(value).ok_or_else(|| {
				AgmvError::corrupt(frame_num, format!("unknown frame type {value}"))
			})?,
		};

		Ok(Self {
			frame_num,
			frame_type,
			uncompressed_size,
			compressed_size,
		})
	}

	/// Serializes the tag and fields
	pub fn to_bytes(&self, dialect: CodecDialect) -> Vec<u8> {
		let mut bytes = Vec::with_capacity(18);
		bytes.extend_from_slice(&FRAME_CHUNK_TAG);
		bytes.extend_from_slice(&self.frame_num.to_le_bytes());
		if dialect.has_frame_type() {
			bytes.extend_from_slice(&(self.frame_type as u16).to_le_bytes());
		}
		bytes.extend_from_slice(&self.uncompressed_size.to_le_bytes());
		bytes.extend_from_slice(&self.compressed_size.to_le_bytes());
		bytes
	}
}

/// Fields following an `AGAC` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioChunkHeader {
	/// Number of delta bytes after decompression
	pub size: u32,
	/// Payload size on disk, present in non-legacy dialects
	pub compressed_size: Option<u32>,
}

impl AudioChunkHeader {
	/// Reads the fields after the tag; the cursor must be past the tag.
	pub fn read<R: Read + Seek>(reader: &mut ByteReader<R>, dialect: CodecDialect) -> Result<Self, AgmvError> {
		let size = reader.read_u32()?;
		let compressed_size = if dialect.has_audio_compressed_size() {
			Some(reader.read_u32()?)
		} else {
			None
		};

		Ok(Self {
			size,
			compressed_size,
		})
	}

	/// Bytes of payload on disk
	pub fn payload_len(&self) -> u32 {
		self.compressed_size.unwrap_or(self.size)
	}

	/// Serializes the tag and fields
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut bytes = Vec::with_capacity(12);
		bytes.extend_from_slice(&AUDIO_CHUNK_TAG);
		bytes.extend_from_slice(&self.size.to_le_bytes());
		if let Some(compressed_size) = self.compressed_size {
			bytes.extend_from_slice(&compressed_size.to_le_bytes());
		}
		bytes
	}
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use super::*;

	fn reader_after_tag(bytes: Vec<u8>) -> ByteReader<Cursor<Vec<u8>>> {
		let mut reader = ByteReader::new(Cursor::new(bytes)).unwrap();
		reader.skip(4).unwrap();
		reader
	}

	#[test]
	fn test_frame_chunk_roundtrip() {
		let dialect = CodecDialect::from_version(3).unwrap();
		let chunk = FrameChunkHeader {
			frame_num: 42,
			frame_type: FrameType::Inter,
			uncompressed_size: 100,
			compressed_size: 60,
		};
		let bytes = chunk.to_bytes(dialect);
		assert_eq!(bytes.len(), 18);

		let mut reader = reader_after_tag(bytes);
		assert_eq!(FrameChunkHeader::read(&mut reader, dialect).unwrap(), chunk);
	}

	#[test]
	fn test_legacy_frame_chunk_has_no_type() {
		let dialect = CodecDialect::from_version(1).unwrap();
		let chunk = FrameChunkHeader {
			frame_num: 0,
			frame_type: FrameType::Intra,
			uncompressed_size: 4,
			compressed_size: 4,
		};
		let bytes = chunk.to_bytes(dialect);
		assert_eq!(bytes.len(), 16);

		let parsed = FrameChunkHeader::read(&mut reader_after_tag(bytes), dialect).unwrap();
		assert_eq!(parsed.frame_type, FrameType::Intra);

		let later = FrameChunkHeader {
			frame_num: 5,
			..chunk
		};
		let parsed = FrameChunkHeader::read(&mut reader_after_tag(later.to_bytes(dialect)), dialect).unwrap();
		assert_eq!(parsed.frame_type, FrameType::Inter);
	}

	#[test]
	fn test_unknown_frame_type_consumes_fields() {
		let dialect = CodecDialect::from_version(5).unwrap();
		let mut bytes = FRAME_CHUNK_TAG.to_vec();
		bytes.extend_from_slice(&7u32.to_le_bytes());
		bytes.extend_from_slice(&9u16.to_le_bytes());
		bytes.extend_from_slice(&[0; 8]);

		let mut reader = reader_after_tag(bytes);
		let err = FrameChunkHeader::read(&mut reader, dialect).unwrap_err();
		assert!(matches!(err, AgmvError::CorruptFrame { frame: 7, .. }));
		assert!(reader.is_eof());
	}

	#[test]
	fn test_audio_chunk_layouts() {
		let modern = CodecDialect::from_version(4).unwrap();
		let chunk = AudioChunkHeader {
			size: 512,
			compressed_size: Some(300),
		};
		let parsed = AudioChunkHeader::read(&mut reader_after_tag(chunk.to_bytes()), modern).unwrap();
		assert_eq!(parsed, chunk);
		assert_eq!(parsed.payload_len(), 300);

		let legacy = CodecDialect::from_version(2).unwrap();
		let chunk = AudioChunkHeader {
			size: 512,
			compressed_size: None,
		};
		let parsed = AudioChunkHeader::read(&mut reader_after_tag(chunk.to_bytes()), legacy).unwrap();
		assert_eq!(parsed.payload_len(), 512);
	}
}
