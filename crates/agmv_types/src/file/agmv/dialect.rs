//! Version-dependent bitstream rules, resolved once from the header.

use std::fmt::Display;

use serde::Serialize;

use crate::file::HeaderError;

/// How a chunk payload is stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Payload {
	/// Payload is wrapped in the LZSS token stream
	Lzss,
	/// Payload is stored verbatim
	Raw,
}

/// How a color is read from the frame bitstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColorPacking {
	/// One byte indexing the single palette
	PaletteByte,
	/// One byte: bit 7 selects the palette, bits 0-6 the index; an index of
	/// 127 escapes to a second byte holding the full 8-bit index
	DualPalette,
	/// One little-endian RGB555 value
	Direct16,
}

/// Codec dialect selected by the header version byte
///
/// | Version | Dialect       | Palettes | Colors        | Payload |
/// |---------|---------------|----------|---------------|---------|
/// | 1       | `Legacy`      | 1        | palette byte  | LZSS    |
/// | 2       | `Legacy`      | 1        | palette byte  | raw     |
/// | 3       | `DualPalette` | 2        | dual palette  | LZSS    |
/// | 4       | `DualPalette` | 2        | dual palette  | raw     |
/// | 5       | `Direct`      | 0        | direct RGB555 | LZSS    |
/// | 6       | `Direct`      | 0        | direct RGB555 | raw     |
///
/// Legacy streams omit the bits-per-sample header field, the frame type in
/// frame chunks and the compressed size in audio chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CodecDialect {
	/// Versions 1 and 2
	Legacy {
		/// Payload storage
		payload: Payload,
	},
	/// Versions 3 and 4
	DualPalette {
		/// Payload storage
		payload: Payload,
	},
	/// Versions 5 and 6
	Direct {
		/// Payload storage
		payload: Payload,
	},
}

impl CodecDialect {
	/// All supported dialects, in version order
	pub const ALL: [CodecDialect; 6] = [
		CodecDialect::Legacy {
			payload: Payload::Lzss,
		},
		CodecDialect::Legacy {
			payload: Payload::Raw,
		},
		CodecDialect::DualPalette {
			payload: Payload::Lzss,
		},
		CodecDialect::DualPalette {
			payload: Payload::Raw,
		},
		CodecDialect::Direct {
			payload: Payload::Lzss,
		},
		CodecDialect::Direct {
			payload: Payload::Raw,
		},
	];

	/// Resolves the dialect for a header version byte.
	pub fn from_version(version: u8) -> Result<Self, HeaderError> {
		match version {
			1..=6 => Ok(Self::ALL[usize::from(version - 1)]),
			_ => Err(HeaderError::UnsupportedVersion(version)),
		}
	}

	/// Version byte written for this dialect
	pub fn version(self) -> u8 {
		match self {
			Self::Legacy {
				payload: Payload::Lzss,
			} => 1,
			Self::Legacy {
				payload: Payload::Raw,
			} => 2,
			Self::DualPalette {
				payload: Payload::Lzss,
			} => 3,
			Self::DualPalette {
				payload: Payload::Raw,
			} => 4,
			Self::Direct {
				payload: Payload::Lzss,
			} => 5,
			Self::Direct {
				payload: Payload::Raw,
			} => 6,
		}
	}

	/// Payload storage for frame and audio chunks
	pub fn payload(self) -> Payload {
		match self {
			Self::Legacy {
				payload,
			}
			| Self::DualPalette {
				payload,
			}
			| Self::Direct {
				payload,
			} => payload,
		}
	}

	/// Number of 256-color palettes following the header
	pub fn palette_count(self) -> usize {
		match self {
			Self::Legacy {
				..
			} => 1,
			Self::DualPalette {
				..
			} => 2,
			Self::Direct {
				..
			} => 0,
		}
	}

	/// Color packing used inside frame bitstreams
	pub fn color_packing(self) -> ColorPacking {
		match self {
			Self::Legacy {
				..
			} => ColorPacking::PaletteByte,
			Self::DualPalette {
				..
			} => ColorPacking::DualPalette,
			Self::Direct {
				..
			} => ColorPacking::Direct16,
		}
	}

	/// Returns `true` for versions 1 and 2
	pub fn is_legacy(self) -> bool {
		matches!(
			self,
			Self::Legacy {
				..
			}
		)
	}

	/// Whether frame chunks carry a frame-type field
	pub fn has_frame_type(self) -> bool {
		!self.is_legacy()
	}

	/// Whether the header carries a bits-per-sample field
	pub fn has_bits_per_sample(self) -> bool {
		!self.is_legacy()
	}

	/// Whether audio chunks carry a compressed-size field
	pub fn has_audio_compressed_size(self) -> bool {
		!self.is_legacy()
	}

	/// Whether audio payloads go through LZSS
	pub fn compresses_audio(self) -> bool {
		self.has_audio_compressed_size() && self.payload() == Payload::Lzss
	}
}

impl Display for CodecDialect {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Legacy {
				..
			} => "Legacy",
			Self::DualPalette {
				..
			} => "DualPalette",
			Self::Direct {
				..
			} => "Direct",
		};
		let payload = match self.payload() {
			Payload::Lzss => "LZSS",
			Payload::Raw => "raw",
		};
		write!(f, "{name} (v{}, {payload})", self.version())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_version_mapping_roundtrips() {
		for version in 1..=6u8 {
			let dialect = CodecDialect::from_version(version).unwrap();
			assert_eq!(dialect.version(), version);
		}
	}

	#[test]
	fn test_unsupported_versions() {
		for version in [0u8, 7, 0xFF] {
			assert_eq!(
				CodecDialect::from_version(version),
				Err(HeaderError::UnsupportedVersion(version))
			);
		}
	}

	#[test]
	fn test_layout_rules() {
		let legacy = CodecDialect::from_version(2).unwrap();
		assert_eq!(legacy.palette_count(), 1);
		assert_eq!(legacy.payload(), Payload::Raw);
		assert_eq!(legacy.color_packing(), ColorPacking::PaletteByte);
		assert!(!legacy.has_frame_type());
		assert!(!legacy.compresses_audio());

		let dual = CodecDialect::from_version(3).unwrap();
		assert_eq!(dual.palette_count(), 2);
		assert!(dual.has_frame_type());
		assert!(dual.compresses_audio());

		let direct = CodecDialect::from_version(6).unwrap();
		assert_eq!(direct.palette_count(), 0);
		assert_eq!(direct.color_packing(), ColorPacking::Direct16);
		assert!(!direct.compresses_audio());
	}
}
