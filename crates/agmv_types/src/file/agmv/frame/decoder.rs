use log::trace;

use crate::file::AgmvError;

use super::super::chunk::FrameType;
use super::super::dialect::ColorPacking;
use super::super::header::Header;
use super::super::palette::{Palette, rgb555_midpoint};
use super::{Block, BlockRegisters, BlockSize, CELL_SIZE, FrameBuffer, Opcode, ReferenceFrames};

/// Low seven bits of a dual-palette color byte that escape to a full index
const DUAL_PALETTE_ESCAPE: u8 = 0x7F;

/// Reconstructs frames from decompressed bitstreams
#[derive(Debug, Clone)]
pub struct FrameDecoder {
	packing: ColorPacking,
	palettes: [Palette; 2],
	width: usize,
	height: usize,
}

impl FrameDecoder {
	/// Captures the dimensions, color packing and palettes of a stream.
	pub fn new(header: &Header) -> Self {
		let mut palettes = [Palette::new(), Palette::new()];
		for (slot, palette) in palettes.iter_mut().zip(header.palettes()) {
			*slot = palette.clone();
		}

		Self {
			packing: header.dialect().color_packing(),
			palettes,
			width: header.width() as usize,
			height: header.height() as usize,
		}
	}

	/// Decodes one frame bitstream into `refs.current`.
	///
	/// The reference frames are updated for `frame_type` whether or not the
	/// scan succeeds, so later frames always see a consistent reference set.
	pub fn decode(
		&self,
		frame_num: u32,
		bitstream: &[u8],
		frame_type: FrameType,
		refs: &mut ReferenceFrames,
	) -> Result<(), AgmvError> {
		if frame_type.is_intra() {
			refs.registers.clear();
		}

		let result = self.scan(frame_num, bitstream, refs);
		refs.commit(frame_type);
		result
	}

	fn scan(&self, frame_num: u32, bitstream: &[u8], refs: &mut ReferenceFrames) -> Result<(), AgmvError> {
		let ReferenceFrames {
			current,
			intra,
			previous,
			frames_since_intra,
			registers,
		} = refs;
		let intra: &FrameBuffer = intra;
		let previous: &FrameBuffer = previous;
		let after_intra = *frames_since_intra == 0;

		let mut ctx = BlockContext {
			current,
			intra,
			reference: if after_intra {
				intra
			} else {
				previous
			},
			registers,
			after_intra,
		};
		let mut bits = Bitstream {
			data: bitstream,
			pos: 0,
			frame: frame_num,
		};

		let mut y = 0;
		while y < self.height {
			let mut x = 0;
			while x < self.width {
				let descriptor = bits.read_u8()?;
				let size = BlockSize::from_descriptor(descriptor);
				let opcode = Opcode::from_descriptor(descriptor).ok_or_else(|| {
					AgmvError::corrupt(
						frame_num,
						format!("unknown opcode {} at ({x}, {y})", descriptor & 0x3F),
					)
				})?;

				let size = if opcode == Opcode::Normal {
					BlockSize::S2x4
				} else {
					size
				};
				let block = Block {
					x,
					y,
					width: size.width(),
					height: size.height(),
				};
				self.decode_block(opcode, size, block, &mut bits, &mut ctx)?;

				x += CELL_SIZE;
				match size.width() {
					8 => x += 4,
					2 => x -= 2,
					_ => {}
				}
			}
			y += CELL_SIZE;
		}

		if bits.remaining() > 0 {
			trace!("Frame {frame_num}: {} trailing bytes ignored", bits.remaining());
		}
		Ok(())
	}

	fn decode_block(
		&self,
		opcode: Opcode,
		size: BlockSize,
		block: Block,
		bits: &mut Bitstream<'_>,
		ctx: &mut BlockContext<'_>,
	) -> Result<(), AgmvError> {
		match opcode {
			Opcode::Fill => {
				let color = self.read_color(bits)?;
				ctx.registers.prev_fill_color = color;
				ctx.current.fill_block(block, color);
			}
			Opcode::Normal => {
				let mut c = [0u16; 5];
				for color in &mut c {
					*color = self.read_color(bits)?;
				}
				let rows = [
					[c[0], c[1]],
					[rgb555_midpoint(c[0], c[2]), rgb555_midpoint(c[1], c[3])],
					[c[2], c[3]],
					[c[4], c[4]],
				];
				for (dy, row) in rows.iter().enumerate() {
					for (dx, &color) in row.iter().enumerate() {
						ctx.current.put(block.x + dx, block.y + dy, color);
					}
				}
			}
			Opcode::PFill => {
				ctx.current.fill_block(block, ctx.registers.prev_fill_color);
			}
			Opcode::Copy => {
				// right after an I-frame `current` already holds it
				if !ctx.after_intra {
					ctx.current.copy_block_from(ctx.intra, block, block.x, block.y);
				}
			}
			Opcode::ICopy | Opcode::ICopyR => {
				let offset = bits.read_u8()?;
				let sx = i64::from(offset >> 4);
				let sy = i64::from(offset & 0x0F);
				let src_x = if opcode == Opcode::ICopy {
					block.x as i64 - sx
				} else {
					block.x as i64 + sx
				};
				let src_y = block.y as i64 - sy;

				// edge blocks only need their visible part to be readable
				let visible = ctx.current.clip(block);
				if ctx.current.contains_rect(src_x, src_y, visible.width, visible.height) {
					ctx.current.copy_block_within(block, src_x as usize, src_y as usize);
				} else {
					trace!("{opcode} at ({}, {}) reads outside the frame, skipped", block.x, block.y);
				}
			}
			Opcode::PCopy => {
				ctx.current.copy_block_from(ctx.reference, block, block.x, block.y);
			}
			Opcode::Mv => {
				let vector = bits.read_u8()?;
				motion_copy(ctx.current, ctx.intra, block, vector);
			}
			Opcode::PMv => {
				let vector = bits.read_u8()?;
				motion_copy(ctx.current, ctx.reference, block, vector);
			}
			Opcode::SMv => {
				let (sub_width, sub_height) = size.split();
				for dy in (0..block.height).step_by(sub_height) {
					for dx in (0..block.width).step_by(sub_width) {
						let vector = bits.read_u8()?;
						let sub = Block {
							x: block.x + dx,
							y: block.y + dy,
							width: sub_width,
							height: sub_height,
						};
						motion_copy(ctx.current, ctx.reference, sub, vector);
					}
				}
			}
			Opcode::Vq2 => {
				let colors = [self.read_color(bits)?, self.read_color(bits)?];
				ctx.registers.vq2 = colors;
				apply_mask(ctx.current, block, bits, 1, &colors)?;
			}
			Opcode::PVq2 => {
				let colors = ctx.registers.vq2;
				apply_mask(ctx.current, block, bits, 1, &colors)?;
			}
			Opcode::Vq4 => {
				let mut colors = [0u16; 4];
				for color in &mut colors {
					*color = self.read_color(bits)?;
				}
				apply_mask(ctx.current, block, bits, 2, &colors)?;
			}
			Opcode::Skip => {}
		}

		Ok(())
	}

	fn read_color(&self, bits: &mut Bitstream<'_>) -> Result<u16, AgmvError> {
		match self.packing {
			ColorPacking::Direct16 => bits.read_u16(),
			ColorPacking::PaletteByte => Ok(self.palettes[0].get(bits.read_u8()?)),
			ColorPacking::DualPalette => {
				let byte = bits.read_u8()?;
				let bank = usize::from(byte >> 7);
				let index = match byte & 0x7F {
					DUAL_PALETTE_ESCAPE => bits.read_u8()?,
					index => index,
				};
				Ok(self.palettes[bank].get(index))
			}
		}
	}
}

/// Decoder state shared by every block of one frame
struct BlockContext<'a> {
	current: &'a mut FrameBuffer,
	intra: &'a FrameBuffer,
	/// `intra` right after an I-frame, `previous` afterwards
	reference: &'a FrameBuffer,
	registers: &'a mut BlockRegisters,
	after_intra: bool,
}

/// Read cursor over a decompressed frame bitstream
struct Bitstream<'a> {
	data: &'a [u8],
	pos: usize,
	frame: u32,
}

impl Bitstream<'_> {
	fn remaining(&self) -> usize {
		self.data.len() - self.pos
	}

	fn read_u8(&mut self) -> Result<u8, AgmvError> {
		let byte = *self.data.get(self.pos).ok_or_else(|| self.exhausted())?;
		self.pos += 1;
		Ok(byte)
	}

	fn read_u16(&mut self) -> Result<u16, AgmvError> {
		let bytes = self.read_bytes(2)?;
		Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
	}

	fn read_bytes(&mut self, count: usize) -> Result<&[u8], AgmvError> {
		if self.remaining() < count {
			return Err(self.exhausted());
		}
		let bytes = &self.data[self.pos..self.pos + count];
		self.pos += count;
		Ok(bytes)
	}

	fn exhausted(&self) -> AgmvError {
		AgmvError::corrupt(self.frame, format!("bitstream exhausted at byte {}", self.pos))
	}
}

/// Splits a motion byte into signed nibbles `(dx, dy)`
fn motion_vector(byte: u8) -> (i64, i64) {
	let dx = (byte as i8) >> 4;
	let dy = ((byte << 4) as i8) >> 4;
	(i64::from(dx), i64::from(dy))
}

fn motion_copy(current: &mut FrameBuffer, source: &FrameBuffer, block: Block, vector: u8) {
	let (dx, dy) = motion_vector(vector);
	let visible = current.clip(block);
	if visible.width == 0 || visible.height == 0 {
		// split sub-block entirely past the edge
		return;
	}

	let src_x = block.x as i64 + dx;
	let src_y = block.y as i64 + dy;
	if source.contains_rect(src_x, src_y, visible.width, visible.height) {
		current.copy_block_from(source, block, src_x as usize, src_y as usize);
	} else {
		trace!("Motion vector ({dx}, {dy}) at ({}, {}) leaves the frame, skipped", block.x, block.y);
	}
}

/// Paints a block from a packed index mask, MSB first in row-major order.
fn apply_mask(
	current: &mut FrameBuffer,
	block: Block,
	bits: &mut Bitstream<'_>,
	bits_per_pixel: usize,
	colors: &[u16],
) -> Result<(), AgmvError> {
	let pixels = block.width * block.height;
	let mask = bits.read_bytes((pixels * bits_per_pixel).div_ceil(8))?;
	let pixel_mask = (1u8 << bits_per_pixel) - 1;

	for i in 0..pixels {
		let bit = i * bits_per_pixel;
		let shift = 8 - bits_per_pixel - bit % 8;
		let index = (mask[bit / 8] >> shift) & pixel_mask;
		current.put(block.x + i % block.width, block.y + i / block.width, colors[usize::from(index)]);
	}

	Ok(())
}
