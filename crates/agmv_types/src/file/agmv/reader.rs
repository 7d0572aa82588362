//! Sequential little-endian cursor over a seekable byte source.

use std::io::{self, Read, Seek, SeekFrom};

/// Byte cursor used by the header, chunk and session layers.
///
/// The stream length is measured once at construction so EOF tests and
/// tag scans never have to query the underlying source.
#[derive(Debug)]
pub struct ByteReader<R> {
	inner: R,
	pos: u64,
	len: u64,
}

impl<R: Read + Seek> ByteReader<R> {
	/// Wraps a reader, measuring its length and rewinding it to offset 0.
	pub fn new(mut inner: R) -> io::Result<Self> {
		let len = inner.seek(SeekFrom::End(0))?;
		inner.seek(SeekFrom::Start(0))?;
		Ok(Self {
			inner,
			pos: 0,
			len,
		})
	}

	/// Current absolute offset
	pub fn position(&self) -> u64 {
		self.pos
	}

	/// Total stream length in bytes
	pub fn len(&self) -> u64 {
		self.len
	}

	/// Returns `true` if the stream is empty
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Bytes left between the cursor and the end of the stream
	pub fn remaining(&self) -> u64 {
		self.len.saturating_sub(self.pos)
	}

	/// Returns `true` once the cursor has reached the end of the stream
	pub fn is_eof(&self) -> bool {
		self.pos >= self.len
	}

	/// Moves the cursor to an absolute offset
	pub fn seek_to(&mut self, offset: u64) -> io::Result<()> {
		self.pos = self.inner.seek(SeekFrom::Start(offset))?;
		Ok(())
	}

	/// Moves the cursor forward by `count` bytes
	pub fn skip(&mut self, count: u64) -> io::Result<()> {
		self.seek_to(self.pos.saturating_add(count))
	}

	/// Moves the cursor backward by `count` bytes
	pub fn rewind(&mut self, count: u64) -> io::Result<()> {
		self.seek_to(self.pos.saturating_sub(count))
	}

	/// Reads one byte
	pub fn read_u8(&mut self) -> io::Result<u8> {
		let mut buf = [0u8; 1];
		self.read_exact(&mut buf)?;
		Ok(buf[0])
	}

	/// Reads a little-endian `u16`
	pub fn read_u16(&mut self) -> io::Result<u16> {
		let mut buf = [0u8; 2];
		self.read_exact(&mut buf)?;
		Ok(u16::from_le_bytes(buf))
	}

	/// Reads a little-endian `u32`
	pub fn read_u32(&mut self) -> io::Result<u32> {
		let mut buf = [0u8; 4];
		self.read_exact(&mut buf)?;
		Ok(u32::from_le_bytes(buf))
	}

	/// Reads a 4-byte tag
	pub fn read_tag(&mut self) -> io::Result<[u8; 4]> {
		let mut buf = [0u8; 4];
		self.read_exact(&mut buf)?;
		Ok(buf)
	}

	/// Checks whether the next four bytes equal `tag` without consuming them.
	pub fn matches_tag(&mut self, tag: &[u8; 4]) -> io::Result<bool> {
		if self.remaining() < 4 {
			return Ok(false);
		}
		let start = self.pos;
		let found = self.read_tag()?;
		self.seek_to(start)?;
		Ok(&found == tag)
	}

	/// Scans forward one byte at a time for `tag`.
	///
	/// On success the cursor is left on the first byte of the tag and its
	/// offset is returned. On failure the cursor is left at the end of the
	/// stream.
	pub fn find_tag(&mut self, tag: &[u8; 4]) -> io::Result<Option<u64>> {
		Ok(self.find_any_tag(&[*tag])?.map(|(offset, _)| offset))
	}

	/// Scans forward for whichever of `tags` occurs first.
	pub fn find_any_tag(&mut self, tags: &[[u8; 4]]) -> io::Result<Option<(u64, [u8; 4])>> {
		let mut window = [0u8; 4];
		let mut filled = 0usize;

		while !self.is_eof() {
			let byte = self.read_u8()?;
			window = [window[1], window[2], window[3], byte];
			filled += 1;

			if filled >= 4 && tags.contains(&window) {
				let offset = self.pos - 4;
				self.seek_to(offset)?;
				return Ok(Some((offset, window)));
			}
		}

		Ok(None)
	}

	/// Consumes the cursor and returns the wrapped source
	pub fn into_inner(self) -> R {
		self.inner
	}
}

impl<R: Read> Read for ByteReader<R> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		let count = self.inner.read(buf)?;
		self.pos += count as u64;
		Ok(count)
	}
}
