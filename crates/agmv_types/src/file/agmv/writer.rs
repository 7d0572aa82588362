//! Stream writer producing AGMV containers.

use std::io::Write;

use log::trace;

use crate::file::AgmvError;

use super::chunk::{AudioChunkHeader, FrameChunkHeader, FrameType};
use super::dialect::{CodecDialect, Payload};
use super::header::Header;
use super::lzss;

/// Writes a header followed by frame and audio chunks
#[derive(Debug)]
pub struct AgmvWriter<W: Write> {
	writer: W,
	dialect: CodecDialect,
	frames_written: u32,
}

impl<W: Write> AgmvWriter<W> {
	/// Writes `header` and prepares for chunks.
	pub fn new(mut writer: W, header: &Header) -> Result<Self, AgmvError> {
		writer.write_all(&header.to_bytes())?;

		Ok(Self {
			writer,
			dialect: header.dialect(),
			frames_written: 0,
		})
	}

	/// Dialect chunks are written in
	pub fn dialect(&self) -> CodecDialect {
		self.dialect
	}

	/// Number of frame chunks written so far
	pub fn frames_written(&self) -> u32 {
		self.frames_written
	}

	/// Writes one frame chunk, compressing the bitstream for LZSS dialects.
	pub fn write_frame(&mut self, frame_num: u32, frame_type: FrameType, bitstream: &[u8]) -> Result<(), AgmvError> {
		let payload = match self.dialect.payload() {
			Payload::Lzss => lzss::compress(bitstream),
			Payload::Raw => bitstream.to_vec(),
		};

		let chunk = FrameChunkHeader {
			frame_num,
			frame_type,
			uncompressed_size: chunk_len(bitstream.len())?,
			compressed_size: chunk_len(payload.len())?,
		};
		trace!(
			"Writing frame {frame_num} ({frame_type}): {} -> {} bytes",
			chunk.uncompressed_size, chunk.compressed_size
		);

		self.writer.write_all(&chunk.to_bytes(self.dialect))?;
		self.writer.write_all(&payload)?;
		self.frames_written += 1;
		Ok(())
	}

	/// Writes one audio chunk of delta bytes.
	pub fn write_audio(&mut self, deltas: &[u8]) -> Result<(), AgmvError> {
		let size = chunk_len(deltas.len())?;
		let (chunk, payload) = if self.dialect.compresses_audio() {
			let packed = lzss::compress(deltas);
			let chunk = AudioChunkHeader {
				size,
				compressed_size: Some(chunk_len(packed.len())?),
			};
			(chunk, packed)
		} else {
			let chunk = AudioChunkHeader {
				size,
				compressed_size: self.dialect.has_audio_compressed_size().then_some(size),
			};
			(chunk, deltas.to_vec())
		};

		self.writer.write_all(&chunk.to_bytes())?;
		self.writer.write_all(&payload)?;
		Ok(())
	}

	/// Flushes and returns the underlying writer
	pub fn finish(mut self) -> Result<W, AgmvError> {
		self.writer.flush()?;
		Ok(self.writer)
	}
}

fn chunk_len(len: usize) -> Result<u32, AgmvError> {
	u32::try_from(len).map_err(|_| {
		AgmvError::Io(std::io::Error::new(
			std::io::ErrorKind::InvalidInput,
			format!("chunk of {len} bytes does not fit a 32-bit size field"),
		))
	})
}
