//! Benchmark helper utilities for agmv-rs
//!
//! This module generates synthetic AGMV streams that exercise the LZSS stage
//! and every frame opcode, so benchmarks need no external media.

use agmv_types::file::AgmvError;
use agmv_types::file::agmv::{AgmvWriter, BitstreamBuilder, BlockSize, CodecDialect, FrameType, Header, Payload};

/// Dialect of generated streams: direct RGB555 colors, LZSS payloads
const DIALECT: CodecDialect = CodecDialect::Direct {
	payload: Payload::Lzss,
};

/// Generates an LZSS-compressed direct-color stream.
///
/// Every `gop`-th frame is an I-frame built from `FILL`, `NORMAL`, `VQ2` and
/// `VQ4` blocks; the frames in between mix copies and motion vectors.
pub fn generate_test_stream(width: u32, height: u32, frames: u32, gop: u32) -> Result<Vec<u8>, AgmvError> {
	let header = Header::new(DIALECT, width, height, 30)?.with_num_frames(frames);
	let mut writer = AgmvWriter::new(Vec::new(), &header)?;

	for frame in 0..frames {
		let intra = gop == 0 || frame % gop == 0;
		let bitstream = if intra {
			intra_frame(width, height, frame)
		} else {
			inter_frame(width, height, frame)
		};
		let frame_type = if intra {
			FrameType::Intra
		} else {
			FrameType::Inter
		};
		writer.write_frame(frame, frame_type, &bitstream)?;
	}

	writer.finish()
}

/// Generates LZSS-friendly bytes: short runs mixed with a repeating ramp
pub fn generate_lzss_input(len: usize) -> Vec<u8> {
	(0..len)
		.map(|i| match i % 96 {
			0..32 => 0,
			32..64 => (i % 7) as u8,
			_ => (i / 3) as u8,
		})
		.collect()
}

fn cells(width: u32, height: u32) -> impl Iterator<Item = (usize, usize)> {
	let columns = (width as usize).div_ceil(4);
	let rows = (height as usize).div_ceil(4);
	(0..rows).flat_map(move |row| (0..columns).map(move |column| (column, row)))
}

fn intra_frame(width: u32, height: u32, frame: u32) -> Vec<u8> {
	let mut bits = BitstreamBuilder::for_dialect(DIALECT);
	for (column, row) in cells(width, height) {
		let seed = (column * 31 + row * 17 + frame as usize) as u16;
		match (column + row) % 4 {
			0 => {
				bits.fill(BlockSize::S4x4, seed & 0x7FFF);
			}
			1 => {
				bits.normal([seed, seed ^ 0x0421, seed ^ 0x1084, seed ^ 0x2108, seed ^ 0x4210])
					.normal([seed; 5]);
			}
			2 => {
				let selectors: Vec<u8> = (0..16).map(|i| (i % 3 == 0) as u8).collect();
				bits.vq2(BlockSize::S4x4, [seed, !seed & 0x7FFF], &selectors);
			}
			_ => {
				let selectors: Vec<u8> = (0..16).map(|i| (i % 4) as u8).collect();
				bits.vq4(BlockSize::S4x4, [seed, seed >> 1, seed >> 2, seed >> 3], &selectors);
			}
		}
	}
	bits.finish()
}

fn inter_frame(width: u32, height: u32, frame: u32) -> Vec<u8> {
	let mut bits = BitstreamBuilder::for_dialect(DIALECT);
	for (column, row) in cells(width, height) {
		match (column + row + frame as usize) % 5 {
			0 => bits.pcopy(BlockSize::S4x4),
			1 => bits.pmv(BlockSize::S4x4, 1, 0),
			2 => bits.copy(BlockSize::S4x4),
			3 => bits.smv(BlockSize::S4x4, &[(0, 1), (1, 0), (-1, 0), (0, -1)]),
			_ => bits.skip(BlockSize::S4x4),
		};
	}
	bits.finish()
}

/// Common benchmark sizes for synthetic streams
pub mod sizes {
	/// Tiny frame: 64x64 (4,096 pixels)
	pub const TINY: (u32, u32) = (64, 64);
	/// Classic full-motion video: 320x240 (76,800 pixels)
	pub const QVGA: (u32, u32) = (320, 240);
	/// VGA: 640x480 (307,200 pixels)
	pub const VGA: (u32, u32) = (640, 480);
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use agmv_types::file::agmv::{AgmvSession, DecodeStep};

	use super::*;

	#[test]
	fn test_generated_stream_decodes() {
		let data = generate_test_stream(64, 32, 6, 3).unwrap();
		assert_eq!(&data[0..4], b"AGMV");

		let mut session = AgmvSession::from_reader(Cursor::new(data)).unwrap();
		let mut decoded = 0;
		while let DecodeStep::Frame(_) = session.decode_next_frame().unwrap() {
			decoded += 1;
		}
		assert_eq!(decoded, 6);
		assert_eq!(session.seek_index().len(), 2);
	}

	#[test]
	fn test_lzss_input_compresses() {
		let data = generate_lzss_input(4096);
		let packed = agmv_types::file::agmv::lzss::compress(&data);
		assert!(packed.len() < data.len());
	}
}
