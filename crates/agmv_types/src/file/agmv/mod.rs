//! AGMV video container support.
//!
//! An AGMV stream is a header followed by interleaved frame and audio
//! chunks. All integers are little-endian.
//!
//! # File Structure
//!
//! ```text
//! +------------------------------+
//! | Header (36 or 38 bytes)      |
//! +------------------------------+
//! | Palettes (0, 1 or 2 × 512)   |
//! +------------------------------+
//! | "AGFC" frame chunk           |
//! | ["AGAC" audio chunk]         |
//! | "AGFC" frame chunk           |
//! | ...                          |
//! +------------------------------+
//! ```
//!
//! The header version byte selects a [`CodecDialect`], which decides the
//! palette count, how colors are packed in frame bitstreams, whether
//! payloads are LZSS-compressed and which optional fields are present.
//!
//! Frames are reconstructed block by block by [`FrameDecoder`] against the
//! last I-frame and the previous frame. [`AgmvSession`] drives the whole
//! pipeline and adds seeking on top of an I-frame [`SeekIndex`].
//!
//! # Examples
//!
//! Writing a one-frame stream and playing it back:
//!
//! ```
//! use std::io::Cursor;
//!
//! use agmv_types::file::agmv::{
//!     AgmvSession, AgmvWriter, BitstreamBuilder, CodecDialect, DecodeStep, FrameType, Header,
//! };
//!
//! let dialect = CodecDialect::from_version(5)?;
//! let header = Header::new(dialect, 8, 8, 24)?.with_num_frames(1);
//!
//! let mut writer = AgmvWriter::new(Vec::new(), &header)?;
//! let frame = BitstreamBuilder::solid_frame(dialect.color_packing(), 8, 8, 0x7C00);
//! writer.write_frame(0, FrameType::Intra, &frame)?;
//! let bytes = writer.finish()?;
//!
//! let mut session = AgmvSession::from_reader(Cursor::new(bytes))?;
//! assert!(matches!(session.decode_next_frame()?, DecodeStep::Frame(_)));
//! assert!(session.frame_buffer().iter().all(|&c| c == 0x7C00));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod audio;
mod chunk;
mod config;
mod dialect;
mod frame;
mod header;
mod palette;
mod platform;
mod reader;
mod seek;
mod session;
mod writer;

pub mod lzss;

pub use audio::{Pcm, decode_audio};
pub use chunk::{AUDIO_CHUNK_TAG, AudioChunkHeader, FRAME_CHUNK_TAG, FrameChunkHeader, FrameType};
pub use config::{MAX_VOLUME, PlaybackConfig};
pub use dialect::{CodecDialect, ColorPacking, Payload};
pub use frame::{
	BitstreamBuilder, BlockRegisters, BlockSize, CELL_SIZE, FrameBuffer, FrameDecoder, Opcode, ReferenceFrames,
};
pub use header::{BASE_HEADER_SIZE, Header, MAGIC, MAX_FPS};
pub use palette::{PALETTE_BYTES, PALETTE_SIZE, Palette, rgb555, rgb555_channels, rgb555_midpoint, rgb555_to_rgb888};
pub use platform::{AudioSink, DisplaySink, NullSink};
pub use reader::ByteReader;
pub use seek::{SeekEntry, SeekIndex};
pub use session::{AgmvSession, DecodeStep, FrameInfo, PlaybackState};
pub use writer::AgmvWriter;
