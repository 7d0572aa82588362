//! LZSS stage wrapping AGMV frame and audio payloads.
//!
//! ## Token stream
//!
//! Tokens come in groups of eight, each group preceded by a flag byte whose
//! bits are consumed most-significant first:
//!
//! | Flag bit | Token                         | Bytes |
//! |----------|-------------------------------|-------|
//! | `1`      | literal                       | 1     |
//! | `0`      | back-reference, `u16` LE word | 2     |
//!
//! A back-reference word splits into `distance = word >> 4` (12 bits) and
//! `length = word & 0xF` (4 bits). The copy reads from
//! `output[position - distance]` one byte at a time, so a reference may
//! overlap the bytes it is producing.

use crate::file::LzssError;

/// Largest distance a back-reference can encode
pub const MAX_DISTANCE: usize = 0x0FFF;

/// Largest length a back-reference can encode
pub const MAX_MATCH: usize = 0x0F;

/// Shortest match the compressor emits; anything shorter costs more than literals
pub const MIN_MATCH: usize = 3;

/// Upper bound on the output `compressed_len` input bytes can produce.
///
/// A group of 17 bytes (flag plus eight references) yields at most 120
/// bytes, so the output never exceeds eight times the input.
pub const fn max_decompressed_len(compressed_len: usize) -> usize {
	compressed_len.saturating_mul(8)
}

const HASH_BITS: u32 = 12;
const HASH_SIZE: usize = 1 << HASH_BITS;
const MAX_CHAIN: usize = 128;
const NIL: usize = usize::MAX;

/// Decompresses `src` into the first `uncompressed_size` bytes of `out`.
///
/// Decoding stops as soon as `uncompressed_size` bytes have been produced; a
/// back-reference crossing that boundary is truncated.
pub fn decompress(src: &[u8], out: &mut [u8], uncompressed_size: usize) -> Result<(), LzssError> {
	if uncompressed_size > out.len() {
		return Err(LzssError::OutputTooSmall {
			required: uncompressed_size,
			available: out.len(),
		});
	}

	let mut state = DecompressorState {
		src,
		read_offset: 0,
		flags: 0,
		flags_remaining: 0,
		expected: uncompressed_size,
	};
	let mut position = 0;

	while position < uncompressed_size {
		if state.next_flag(position)? {
			out[position] = state.read_byte(position)?;
			position += 1;
			continue;
		}

		let word = state.read_word(position)?;
		let distance = usize::from(word >> 4);
		let length = usize::from(word & 0x0F);

		if distance == 0 || distance > position {
			return Err(LzssError::InvalidBackReference {
				position,
				distance,
			});
		}

		let end = (position + length).min(uncompressed_size);
		while position < end {
			out[position] = out[position - distance];
			position += 1;
		}
	}

	Ok(())
}

/// Input-side state for [`decompress`]
struct DecompressorState<'a> {
	src: &'a [u8],
	read_offset: usize,
	flags: u8,
	flags_remaining: u32,
	expected: usize,
}

impl DecompressorState<'_> {
	fn exhausted(&self, produced: usize) -> LzssError {
		LzssError::UnexpectedEnd {
			produced,
			expected: self.expected,
		}
	}

	fn read_byte(&mut self, produced: usize) -> Result<u8, LzssError> {
		let byte = *self.src.get(self.read_offset).ok_or_else(|| self.exhausted(produced))?;
		self.read_offset += 1;
		Ok(byte)
	}

	fn read_word(&mut self, produced: usize) -> Result<u16, LzssError> {
		let lo = self.read_byte(produced)?;
		let hi = self.read_byte(produced)?;
		Ok(u16::from_le_bytes([lo, hi]))
	}

	/// Returns `true` for a literal, refilling the flag register every 8 tokens
	fn next_flag(&mut self, produced: usize) -> Result<bool, LzssError> {
		if self.flags_remaining == 0 {
			self.flags = self.read_byte(produced)?;
			self.flags_remaining = 8;
		}
		let literal = self.flags & 0x80 != 0;
		self.flags <<= 1;
		self.flags_remaining -= 1;
		Ok(literal)
	}
}

/// Compresses `data` into the token stream understood by [`decompress`].
///
/// Greedy parse over 3-byte hash chains.
pub fn compress(data: &[u8]) -> Vec<u8> {
	let mut state = CompressorState::new(data);

	while state.position < data.len() {
		state.begin_token();
		match state.find_match() {
			Some((distance, length)) => state.emit_match(distance, length),
			None => state.emit_literal(),
		}
	}

	state.output
}

/// State structure for the compressor
struct CompressorState<'a> {
	data: &'a [u8],
	output: Vec<u8>,
	position: usize,
	flag_offset: usize,
	tokens_in_group: u32,
	head: Vec<usize>,
	prev: Vec<usize>,
}

impl<'a> CompressorState<'a> {
	fn new(data: &'a [u8]) -> Self {
		Self {
			data,
			output: Vec::with_capacity(data.len() + data.len() / 8 + 1),
			position: 0,
			flag_offset: 0,
			tokens_in_group: 8,
			head: vec![NIL; HASH_SIZE],
			prev: vec![NIL; data.len()],
		}
	}

	fn hash(&self, at: usize) -> usize {
		let key = u32::from(self.data[at]) << 16
			| u32::from(self.data[at + 1]) << 8
			| u32::from(self.data[at + 2]);
		(key.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
	}

	fn insert(&mut self, at: usize) {
		if at + MIN_MATCH > self.data.len() {
			return;
		}
		let hash = self.hash(at);
		self.prev[at] = self.head[hash];
		self.head[hash] = at;
	}

	/// Opens a new flag byte every 8 tokens
	fn begin_token(&mut self) {
		if self.tokens_in_group == 8 {
			self.flag_offset = self.output.len();
			self.output.push(0);
			self.tokens_in_group = 0;
		}
	}

	/// Longest match within the window, as `(distance, length)`
	fn find_match(&self) -> Option<(usize, usize)> {
		if self.position + MIN_MATCH > self.data.len() {
			return None;
		}

		let limit = MAX_MATCH.min(self.data.len() - self.position);
		let mut candidate = self.head[self.hash(self.position)];
		let mut best: Option<(usize, usize)> = None;
		let mut depth = 0;

		while candidate != NIL && depth < MAX_CHAIN {
			let distance = self.position - candidate;
			// Chains run from nearest to farthest
			if distance > MAX_DISTANCE {
				break;
			}

			let length = (0..limit)
				.take_while(|&k| self.data[candidate + k] == self.data[self.position + k])
				.count();

			if length >= MIN_MATCH && best.is_none_or(|(_, best_len)| length > best_len) {
				best = Some((distance, length));
				if length == limit {
					break;
				}
			}

			candidate = self.prev[candidate];
			depth += 1;
		}

		best
	}

	fn emit_literal(&mut self) {
		self.output[self.flag_offset] |= 0x80 >> self.tokens_in_group;
		self.output.push(self.data[self.position]);
		self.insert(self.position);
		self.position += 1;
		self.tokens_in_group += 1;
	}

	fn emit_match(&mut self, distance: usize, length: usize) {
		let word = ((distance as u16) << 4) | length as u16;
		self.output.extend_from_slice(&word.to_le_bytes());
		for at in self.position..self.position + length {
			self.insert(at);
		}
		self.position += length;
		self.tokens_in_group += 1;
	}
}
