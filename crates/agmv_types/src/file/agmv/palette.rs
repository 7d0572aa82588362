//! RGB555 colors and 256-entry palettes.

use std::fmt;
use std::io::Read;

/// Number of entries in a palette
pub const PALETTE_SIZE: usize = 256;

/// Size of one serialized palette (256 × `u16`)
pub const PALETTE_BYTES: usize = PALETTE_SIZE * 2;

/// Packs 8-bit channels into a `0RRRRRGGGGGBBBBB` color.
pub const fn rgb555(r: u8, g: u8, b: u8) -> u16 {
	((r as u16 >> 3) << 10) | ((g as u16 >> 3) << 5) | (b as u16 >> 3)
}

/// Splits a color into its three 5-bit channels
pub const fn rgb555_channels(color: u16) -> [u16; 3] {
	[(color >> 10) & 0x1F, (color >> 5) & 0x1F, color & 0x1F]
}

/// Expands a color to 8 bits per channel, replicating the high bits into the low ones
pub const fn rgb555_to_rgb888(color: u16) -> [u8; 3] {
	let [r, g, b] = rgb555_channels(color);
	[
		((r << 3) | (r >> 2)) as u8,
		((g << 3) | (g >> 2)) as u8,
		((b << 3) | (b >> 2)) as u8,
	]
}

/// Per-channel floor average of two colors
pub const fn rgb555_midpoint(a: u16, b: u16) -> u16 {
	let [ar, ag, ab] = rgb555_channels(a);
	let [br, bg, bb] = rgb555_channels(b);
	(((ar + br) >> 1) << 10) | (((ag + bg) >> 1) << 5) | ((ab + bb) >> 1)
}

/// A 256-color palette of RGB555 values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
	colors: [u16; PALETTE_SIZE],
}

impl Default for Palette {
	fn default() -> Self {
		Self::new()
	}
}

impl Palette {
	/// Creates a palette with every entry black
	pub fn new() -> Self {
		Self {
			colors: [0; PALETTE_SIZE],
		}
	}

	/// Creates a palette from explicit colors
	pub fn from_colors(colors: [u16; PALETTE_SIZE]) -> Self {
		Self {
			colors,
		}
	}

	/// Reads 256 little-endian colors.
	pub fn from_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
		let mut buffer = [0u8; PALETTE_BYTES];
		reader.read_exact(&mut buffer)?;

		let mut colors = [0u16; PALETTE_SIZE];
		for (color, bytes) in colors.iter_mut().zip(buffer.chunks_exact(2)) {
			*color = u16::from_le_bytes([bytes[0], bytes[1]]);
		}

		Ok(Self {
			colors,
		})
	}

	/// Serializes the palette
	pub fn to_bytes(&self) -> Vec<u8> {
		self.colors.iter().flat_map(|c| c.to_le_bytes()).collect()
	}

	/// Gets a color by index
	#[inline]
	pub fn get(&self, index: u8) -> u16 {
		self.colors[usize::from(index)]
	}

	/// Sets a color by index
	pub fn set(&mut self, index: u8, color: u16) {
		self.colors[usize::from(index)] = color;
	}

	/// All 256 colors
	pub fn colors(&self) -> &[u16; PALETTE_SIZE] {
		&self.colors
	}
}

impl fmt::Display for Palette {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let distinct = {
			let mut seen = self.colors.to_vec();
			seen.sort_unstable();
			seen.dedup();
			seen.len()
		};
		write!(f, "Palette(256 entries, {distinct} distinct)")
	}
}
