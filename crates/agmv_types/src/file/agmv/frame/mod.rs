//! Block-based frame reconstruction.
//!
//! A frame bitstream is a raster scan of nominal 4×4 cells. Each cell opens
//! with a descriptor byte:
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! +-------+-----------------------+
//! | size  |        opcode         |
//! +-------+-----------------------+
//! ```
//!
//! | Size bits | Footprint |
//! |-----------|-----------|
//! | `0`       | 4×4       |
//! | `1`       | 8×4       |
//! | `2`       | 2×4       |
//! | `3`       | 8×8       |
//!
//! | Opcode | Name     | Payload                 | Source                              |
//! |--------|----------|-------------------------|-------------------------------------|
//! | 0      | `FILL`   | 1 color                 | flat color, remembered              |
//! | 1      | `NORMAL` | 5 colors                | fixed 2×4 strip, interpolated row 1 |
//! | 2      | `PFILL`  | -                       | remembered fill color               |
//! | 3      | `COPY`   | -                       | I-frame, same position              |
//! | 4      | `ICOPY`  | `sx << 4 \| sy`         | current frame at (x−sx, y−sy)       |
//! | 5      | `ICOPYR` | `sx << 4 \| sy`         | current frame at (x+sx, y−sy)       |
//! | 6      | `PCOPY`  | -                       | previous frame, same position       |
//! | 7      | `MV`     | `dx << 4 \| dy` signed  | I-frame at (x+dx, y+dy)             |
//! | 8      | `PMV`    | `dx << 4 \| dy` signed  | previous frame at (x+dx, y+dy)      |
//! | 9      | `SMV`    | one vector per sub-block| previous frame, per sub-block       |
//! | 10     | `VQ2`    | 2 colors + 1-bit mask   | remembered for `PVQ2`               |
//! | 11     | `PVQ2`   | 1-bit mask              | remembered VQ2 colors               |
//! | 12     | `VQ4`    | 4 colors + 2-bit mask   |                                     |
//! | 13     | `SKIP`   | -                       | nothing written                     |
//!
//! "Previous frame" resolves to the I-frame while no P-frame has been
//! decoded since it, because at that point the I-frame *is* the previous
//! frame.

mod builder;
mod decoder;


pub use self::builder::BitstreamBuilder;
pub use self::decoder::FrameDecoder;

use std::fmt::Display;

use crate::file::AgmvError;

use super::chunk::FrameType;
use super::palette::rgb555_to_rgb888;

/// Side of a nominal scan cell
pub const CELL_SIZE: usize = 4;

/// Footprint selected by the top two bits of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockSize {
	/// 4 wide, 4 tall
	S4x4 = 0,
	/// 8 wide, 4 tall
	S8x4 = 1,
	/// 2 wide, 4 tall
	S2x4 = 2,
	/// 8 wide, 8 tall
	S8x8 = 3,
}

impl BlockSize {
	/// Decodes the size bits of a descriptor byte
	pub fn from_descriptor(descriptor: u8) -> Self {
		match descriptor >> 6 {
			0 => Self::S4x4,
			1 => Self::S8x4,
			2 => Self::S2x4,
			_ => Self::S8x8,
		}
	}

	/// Footprint width in pixels
	pub fn width(self) -> usize {
		match self {
			Self::S4x4 => 4,
			Self::S8x4 | Self::S8x8 => 8,
			Self::S2x4 => 2,
		}
	}

	/// Footprint height in pixels
	pub fn height(self) -> usize {
		match self {
			Self::S8x8 => 8,
			_ => 4,
		}
	}

	/// Sub-block dimensions used by `SMV`
	pub fn split(self) -> (usize, usize) {
		match self {
			Self::S4x4 | Self::S2x4 => (2, 2),
			Self::S8x4 | Self::S8x8 => (4, 4),
		}
	}
}

/// Block operation selected by the low six bits of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
	/// Flat fill with a new color
	Fill = 0,
	/// Five-color 2×4 strip
	Normal = 1,
	/// Flat fill with the remembered color
	PFill = 2,
	/// Copy from the I-frame
	Copy = 3,
	/// Copy from up-left in the current frame
	ICopy = 4,
	/// Copy from up-right in the current frame
	ICopyR = 5,
	/// Copy from the previous frame
	PCopy = 6,
	/// Motion vector into the I-frame
	Mv = 7,
	/// Motion vector into the previous frame
	PMv = 8,
	/// Split motion vectors into the previous frame
	SMv = 9,
	/// Two-color vector quantization
	Vq2 = 10,
	/// Two-color vector quantization with remembered colors
	PVq2 = 11,
	/// Four-color vector quantization
	Vq4 = 12,
	/// Leave the cell untouched
	Skip = 13,
}

impl Opcode {
	/// Decodes the low six bits of a descriptor byte
	pub fn from_descriptor(descriptor: u8) -> Option<Self> {
		Some(match descriptor & 0x3F {
			0 => Self::Fill,
			1 => Self::Normal,
			2 => Self::PFill,
			3 => Self::Copy,
			4 => Self::ICopy,
			5 => Self::ICopyR,
			6 => Self::PCopy,
			7 => Self::Mv,
			8 => Self::PMv,
			9 => Self::SMv,
			10 => Self::Vq2,
			11 => Self::PVq2,
			12 => Self::Vq4,
			13 => Self::Skip,
			_ => return None,
		})
	}

	/// Builds a descriptor byte
	pub fn descriptor(self, size: BlockSize) -> u8 {
		((size as u8) << 6) | self as u8
	}
}

impl Display for Opcode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Fill => "FILL",
			Self::Normal => "NORMAL",
			Self::PFill => "PFILL",
			Self::Copy => "COPY",
			Self::ICopy => "ICOPY",
			Self::ICopyR => "ICOPYR",
			Self::PCopy => "PCOPY",
			Self::Mv => "MV",
			Self::PMv => "PMV",
			Self::SMv => "SMV",
			Self::Vq2 => "VQ2",
			Self::PVq2 => "PVQ2",
			Self::Vq4 => "VQ4",
			Self::Skip => "SKIP",
		};
		f.write_str(name)
	}
}

/// Rectangle covered by one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block {
	pub x: usize,
	pub y: usize,
	pub width: usize,
	pub height: usize,
}

/// Registers carried between blocks and seeded by `FILL` / `VQ2`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockRegisters {
	/// Last color read by `FILL`, reused by `PFILL`
	pub prev_fill_color: u16,
	/// Last pair read by `VQ2`, reused by `PVQ2`
	pub vq2: [u16; 2],
}

impl BlockRegisters {
	/// Resets both registers to black
	pub fn clear(&mut self) {
		*self = Self::default();
	}
}

/// Allocates a zeroed buffer, reporting failure instead of aborting.
pub(crate) fn allocate<T: Copy + Default>(count: usize) -> Result<Vec<T>, AgmvError> {
	let bytes = count.saturating_mul(size_of::<T>());
	let mut buffer = Vec::new();
	buffer.try_reserve_exact(count).map_err(|_| AgmvError::MemoryAllocation {
		bytes,
	})?;
	buffer.resize(count, T::default());
	Ok(buffer)
}

/// A width × height grid of RGB555 colors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
	width: usize,
	height: usize,
	pixels: Vec<u16>,
}

impl FrameBuffer {
	/// Allocates a black frame.
	pub fn new(width: u32, height: u32) -> Result<Self, AgmvError> {
		let width = width as usize;
		let height = height as usize;
		let count = width.checked_mul(height).ok_or(AgmvError::MemoryAllocation {
			bytes: usize::MAX,
		})?;

		Ok(Self {
			width,
			height,
			pixels: allocate(count)?,
		})
	}

	/// Width in pixels
	pub fn width(&self) -> usize {
		self.width
	}

	/// Height in pixels
	pub fn height(&self) -> usize {
		self.height
	}

	/// Row-major pixel data
	pub fn pixels(&self) -> &[u16] {
		&self.pixels
	}

	/// Color at `(x, y)`, or `None` outside the frame
	pub fn get(&self, x: usize, y: usize) -> Option<u16> {
		if x < self.width && y < self.height {
			Some(self.pixels[y * self.width + x])
		} else {
			None
		}
	}

	/// Overwrites this frame with `other`; both must share dimensions.
	pub fn copy_from(&mut self, other: &FrameBuffer) {
		debug_assert_eq!((self.width, self.height), (other.width, other.height));
		self.pixels.copy_from_slice(&other.pixels);
	}

	/// Resets every pixel to black
	pub fn clear(&mut self) {
		self.pixels.fill(0);
	}

	/// Expands the frame to packed 8-bit RGB
	pub fn to_rgb888(&self) -> Vec<u8> {
		self.pixels.iter().flat_map(|&c| rgb555_to_rgb888(c)).collect()
	}

	/// Whether a `width` × `height` rectangle at `(x, y)` lies fully inside the frame
	pub(crate) fn contains_rect(&self, x: i64, y: i64, width: usize, height: usize) -> bool {
		x >= 0
			&& y >= 0
			&& x as usize + width <= self.width
			&& y as usize + height <= self.height
	}

	/// Visible part of a block: blocks hanging over the right or bottom edge are clipped
	fn visible(&self, block: Block) -> (usize, usize) {
		(
			block.width.min(self.width.saturating_sub(block.x)),
			block.height.min(self.height.saturating_sub(block.y)),
		)
	}

	/// The part of `block` that lies inside the frame
	pub(crate) fn clip(&self, block: Block) -> Block {
		let (width, height) = self.visible(block);
		Block {
			width,
			height,
			..block
		}
	}

	/// Writes one pixel; positions outside the frame are dropped
	pub(crate) fn put(&mut self, x: usize, y: usize, color: u16) {
		if x < self.width && y < self.height {
			self.pixels[y * self.width + x] = color;
		}
	}

	pub(crate) fn fill_block(&mut self, block: Block, color: u16) {
		let (width, height) = self.visible(block);
		for row in block.y..block.y + height {
			let start = row * self.width + block.x;
			self.pixels[start..start + width].fill(color);
		}
	}

	/// Copies from another frame; the source rectangle must already be validated.
	pub(crate) fn copy_block_from(&mut self, src: &FrameBuffer, block: Block, src_x: usize, src_y: usize) {
		let (width, height) = self.visible(block);
		for row in 0..height {
			let dst = (block.y + row) * self.width + block.x;
			let from = (src_y + row) * src.width + src_x;
			self.pixels[dst..dst + width].copy_from_slice(&src.pixels[from..from + width]);
		}
	}

	/// Copies within this frame pixel by pixel in raster order, so an
	/// overlapping source sees pixels already written by this block.
	pub(crate) fn copy_block_within(&mut self, block: Block, src_x: usize, src_y: usize) {
		let (width, height) = self.visible(block);
		for row in 0..height {
			for col in 0..width {
				let color = self.pixels[(src_y + row) * self.width + src_x + col];
				self.pixels[(block.y + row) * self.width + block.x + col] = color;
			}
		}
	}
}

/// The three frames a session decodes into and against
#[derive(Debug, Clone)]
pub struct ReferenceFrames {
	pub(crate) current: FrameBuffer,
	pub(crate) intra: FrameBuffer,
	pub(crate) previous: FrameBuffer,
	pub(crate) frames_since_intra: u32,
	pub(crate) registers: BlockRegisters,
}

impl ReferenceFrames {
	/// Allocates all three frames.
	pub fn new(width: u32, height: u32) -> Result<Self, AgmvError> {
		Ok(Self {
			current: FrameBuffer::new(width, height)?,
			intra: FrameBuffer::new(width, height)?,
			previous: FrameBuffer::new(width, height)?,
			frames_since_intra: 0,
			registers: BlockRegisters::default(),
		})
	}

	/// Frame rewritten by every decode
	pub fn current(&self) -> &FrameBuffer {
		&self.current
	}

	/// Last decoded I-frame
	pub fn intra(&self) -> &FrameBuffer {
		&self.intra
	}

	/// Last decoded P-frame
	pub fn previous(&self) -> &FrameBuffer {
		&self.previous
	}

	/// P-frames decoded since the last I-frame
	pub fn frames_since_intra(&self) -> u32 {
		self.frames_since_intra
	}

	/// Carried block registers
	pub fn registers(&self) -> &BlockRegisters {
		&self.registers
	}

	/// Clears the carried registers
	pub fn clear_registers(&mut self) {
		self.registers.clear();
	}

	/// Publishes `current` as the new reference for its frame type.
	pub(crate) fn commit(&mut self, frame_type: FrameType) {
		match frame_type {
			FrameType::Intra => {
				self.intra.copy_from(&self.current);
				self.frames_since_intra = 0;
			}
			FrameType::Inter => {
				self.previous.copy_from(&self.current);
				self.frames_since_intra = self.frames_since_intra.saturating_add(1);
			}
		}
	}

	/// Blacks out every frame and clears counters and registers
	pub fn reset(&mut self) {
		self.current.clear();
		self.intra.clear();
		self.previous.clear();
		self.frames_since_intra = 0;
		self.registers.clear();
	}
}
