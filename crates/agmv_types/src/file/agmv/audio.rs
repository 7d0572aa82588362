//! Audio chunk decoding and WAV export.
//!
//! 8-bit streams store wrapping deltas: each byte is added (as `i8`) to an
//! accumulator that restarts at zero for every chunk, and the accumulator is
//! doubled and re-centered around 128.
//!
//! 16-bit streams expand every byte to one sample: even bytes are squared,
//! odd bytes are shifted into the high byte.

use std::io::{Seek, Write};

use crate::file::AgmvError;

/// Center of unsigned 8-bit PCM
const U8_CENTER: i32 = 0x80;

/// Center of unsigned 16-bit PCM
const U16_CENTER: i32 = 0x8000;

/// Decoded samples of one or more audio chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pcm {
	/// Unsigned 8-bit samples, silence at 128
	U8(Vec<u8>),
	/// Unsigned 16-bit samples, silence at 32768
	U16(Vec<u16>),
}

impl Pcm {
	/// Number of samples
	pub fn len(&self) -> usize {
		match self {
			Self::U8(samples) => samples.len(),
			Self::U16(samples) => samples.len(),
		}
	}

	/// Returns `true` if there are no samples
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Sample width in bits
	pub fn bits_per_sample(&self) -> u16 {
		match self {
			Self::U8(_) => 8,
			Self::U16(_) => 16,
		}
	}

	/// Drops all samples, keeping the sample width
	pub fn clear(&mut self) {
		match self {
			Self::U8(samples) => samples.clear(),
			Self::U16(samples) => samples.clear(),
		}
	}

	/// Appends the samples of `other`, which must have the same width.
	pub fn append(&mut self, other: &Pcm) -> Result<(), AgmvError> {
		match (self, other) {
			(Self::U8(samples), Self::U8(more)) => samples.extend_from_slice(more),
			(Self::U16(samples), Self::U16(more)) => samples.extend_from_slice(more),
			(this, _) => {
				return Err(AgmvError::InvalidAudioChunk {
					message: format!(
						"cannot append {}-bit samples to {}-bit samples",
						other.bits_per_sample(),
						this.bits_per_sample()
					),
				});
			}
		}
		Ok(())
	}

	/// Scales the distance of every sample from silence by `volume` percent.
	///
	/// Volumes above 100 are treated as 100.
	pub fn with_volume(&self, volume: u8) -> Pcm {
		let volume = i32::from(volume.min(100));
		if volume == 100 {
			return self.clone();
		}

		let scale = |sample: i32, center: i32| center + (sample - center) * volume / 100;
		match self {
			Self::U8(samples) => Self::U8(samples.iter().map(|&s| scale(i32::from(s), U8_CENTER) as u8).collect()),
			Self::U16(samples) => {
				Self::U16(samples.iter().map(|&s| scale(i32::from(s), U16_CENTER) as u16).collect())
			}
		}
	}

	/// Writes the samples as a PCM WAV file.
	///
	/// 8-bit samples are stored unsigned, 16-bit samples are converted to
	/// the signed form WAV expects.
	pub fn write_wav<W: Write + Seek>(&self, writer: &mut W, sample_rate: u32, channels: u16) -> Result<(), AgmvError> {
		let spec = hound::WavSpec {
			channels: channels.max(1),
			sample_rate,
			bits_per_sample: self.bits_per_sample(),
			sample_format: hound::SampleFormat::Int,
		};

		let mut wav_writer = hound::WavWriter::new(writer, spec)?;

		match self {
			// hound stores 8-bit samples offset by 128
			Self::U8(samples) => {
				for &sample in samples {
					wav_writer.write_sample((sample ^ 0x80) as i8)?;
				}
			}
			Self::U16(samples) => {
				for &sample in samples {
					wav_writer.write_sample((sample ^ 0x8000) as i16)?;
				}
			}
		}

		wav_writer.finalize()?;

		Ok(())
	}
}

/// Decodes the delta bytes of one audio chunk.
pub fn decode_audio(bytes: &[u8], bits_per_sample: u16) -> Result<Pcm, AgmvError> {
	match bits_per_sample {
		0 => Err(AgmvError::AudioDisabled),
		8 => Ok(Pcm::U8(decode_u8(bytes))),
		16 => Ok(Pcm::U16(decode_u16(bytes))),
		other => Err(AgmvError::InvalidAudioChunk {
			message: format!("unsupported sample width {other}"),
		}),
	}
}

fn decode_u8(bytes: &[u8]) -> Vec<u8> {
	let mut prev = 0u8;
	bytes
		.iter()
		.map(|&delta| {
			let cur = prev.wrapping_add_signed(delta as i8);
			prev = cur;
			(cur << 1).wrapping_sub(128)
		})
		.collect()
}

fn decode_u16(bytes: &[u8]) -> Vec<u16> {
	bytes
		.iter()
		.map(|&b| {
			let b = u16::from(b);
			if b % 2 == 0 {
				b * b
			} else {
				b << 8
			}
		})
		.collect()
}
