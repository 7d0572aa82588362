use super::super::dialect::{CodecDialect, ColorPacking};
use super::{BlockSize, CELL_SIZE, Opcode};

/// Assembles frame bitstreams one block at a time
///
/// Colors are given as the value the decoder should look up: an RGB555
/// value for direct streams, a palette index for single-palette streams
/// and `bank << 8 | index` for dual-palette streams.
#[derive(Debug, Clone)]
pub struct BitstreamBuilder {
	packing: ColorPacking,
	bytes: Vec<u8>,
}

impl BitstreamBuilder {
	/// Creates an empty bitstream for the given color packing
	pub fn new(packing: ColorPacking) -> Self {
		Self {
			packing,
			bytes: Vec::new(),
		}
	}

	/// Creates an empty bitstream for a dialect
	pub fn for_dialect(dialect: CodecDialect) -> Self {
		Self::new(dialect.color_packing())
	}

	/// Builds a frame that fills every cell with `color`
	pub fn solid_frame(packing: ColorPacking, width: u32, height: u32, color: u16) -> Vec<u8> {
		let mut builder = Self::new(packing);
		let cells = (width as usize).div_ceil(CELL_SIZE) * (height as usize).div_ceil(CELL_SIZE);
		for _ in 0..cells {
			builder.fill(BlockSize::S4x4, color);
		}
		builder.finish()
	}

	/// Appends a raw byte
	pub fn byte(&mut self, value: u8) -> &mut Self {
		self.bytes.push(value);
		self
	}

	/// Appends a color in the stream's packing
	pub fn color(&mut self, value: u16) -> &mut Self {
		match self.packing {
			ColorPacking::Direct16 => self.bytes.extend_from_slice(&value.to_le_bytes()),
			ColorPacking::PaletteByte => self.bytes.push(value as u8),
			ColorPacking::DualPalette => {
				let bank = ((value >> 8) as u8 & 1) << 7;
				let index = value as u8;
				if index < 0x7F {
					self.bytes.push(bank | index);
				} else {
					self.bytes.push(bank | 0x7F);
					self.bytes.push(index);
				}
			}
		}
		self
	}

	fn op(&mut self, opcode: Opcode, size: BlockSize) -> &mut Self {
		self.byte(opcode.descriptor(size))
	}

	/// `FILL`
	pub fn fill(&mut self, size: BlockSize, color: u16) -> &mut Self {
		self.op(Opcode::Fill, size).color(color)
	}

	/// `NORMAL`; the footprint is always 2×4
	pub fn normal(&mut self, colors: [u16; 5]) -> &mut Self {
		self.op(Opcode::Normal, BlockSize::S2x4);
		for color in colors {
			self.color(color);
		}
		self
	}

	/// `PFILL`
	pub fn pfill(&mut self, size: BlockSize) -> &mut Self {
		self.op(Opcode::PFill, size)
	}

	/// `COPY`
	pub fn copy(&mut self, size: BlockSize) -> &mut Self {
		self.op(Opcode::Copy, size)
	}

	/// `ICOPY` from (x − sx, y − sy); offsets are 4-bit
	pub fn icopy(&mut self, size: BlockSize, sx: u8, sy: u8) -> &mut Self {
		self.op(Opcode::ICopy, size).byte(((sx & 0x0F) << 4) | (sy & 0x0F))
	}

	/// `ICOPYR` from (x + sx, y − sy); offsets are 4-bit
	pub fn icopyr(&mut self, size: BlockSize, sx: u8, sy: u8) -> &mut Self {
		self.op(Opcode::ICopyR, size).byte(((sx & 0x0F) << 4) | (sy & 0x0F))
	}

	/// `PCOPY`
	pub fn pcopy(&mut self, size: BlockSize) -> &mut Self {
		self.op(Opcode::PCopy, size)
	}

	/// `MV`; components are clamped to −8..=7
	pub fn mv(&mut self, size: BlockSize, dx: i8, dy: i8) -> &mut Self {
		self.op(Opcode::Mv, size).byte(motion_byte(dx, dy))
	}

	/// `PMV`; components are clamped to −8..=7
	pub fn pmv(&mut self, size: BlockSize, dx: i8, dy: i8) -> &mut Self {
		self.op(Opcode::PMv, size).byte(motion_byte(dx, dy))
	}

	/// `SMV` with one vector per sub-block in raster order
	pub fn smv(&mut self, size: BlockSize, vectors: &[(i8, i8)]) -> &mut Self {
		self.op(Opcode::SMv, size);
		for &(dx, dy) in vectors {
			self.byte(motion_byte(dx, dy));
		}
		self
	}

	/// `VQ2` with one 0/1 selector per pixel in raster order
	pub fn vq2(&mut self, size: BlockSize, colors: [u16; 2], selectors: &[u8]) -> &mut Self {
		self.op(Opcode::Vq2, size);
		for color in colors {
			self.color(color);
		}
		self.mask(selectors, 1)
	}

	/// `PVQ2` reusing the last `VQ2` colors
	pub fn pvq2(&mut self, size: BlockSize, selectors: &[u8]) -> &mut Self {
		self.op(Opcode::PVq2, size).mask(selectors, 1)
	}

	/// `VQ4` with one 0..=3 selector per pixel in raster order
	pub fn vq4(&mut self, size: BlockSize, colors: [u16; 4], selectors: &[u8]) -> &mut Self {
		self.op(Opcode::Vq4, size);
		for color in colors {
			self.color(color);
		}
		self.mask(selectors, 2)
	}

	/// `SKIP`
	pub fn skip(&mut self, size: BlockSize) -> &mut Self {
		self.op(Opcode::Skip, size)
	}

	fn mask(&mut self, selectors: &[u8], bits_per_pixel: usize) -> &mut Self {
		let mut packed = vec![0u8; (selectors.len() * bits_per_pixel).div_ceil(8)];
		let pixel_mask = (1u8 << bits_per_pixel) - 1;
		for (i, &selector) in selectors.iter().enumerate() {
			let bit = i * bits_per_pixel;
			packed[bit / 8] |= (selector & pixel_mask) << (8 - bits_per_pixel - bit % 8);
		}
		self.bytes.extend_from_slice(&packed);
		self
	}

	/// Bytes written so far
	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	/// Returns `true` if nothing has been written
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Bytes written so far
	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Returns the finished bitstream, leaving the builder empty
	pub fn finish(&mut self) -> Vec<u8> {
		std::mem::take(&mut self.bytes)
	}
}

fn motion_byte(dx: i8, dy: i8) -> u8 {
	let dx = dx.clamp(-8, 7) as u8 & 0x0F;
	let dy = dy.clamp(-8, 7) as u8 & 0x0F;
	(dx << 4) | dy
}
