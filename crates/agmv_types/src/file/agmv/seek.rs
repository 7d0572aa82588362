//! Index of I-frame chunk positions, filled in while a stream is read.

/// One indexed I-frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeekEntry {
	/// Offset of the chunk's `AGFC` tag
	pub offset: u64,
	/// Frame number from the chunk header
	pub frame: u32,
}

/// I-frame positions in stream order
///
/// Entries are only ever appended with increasing frame numbers, so lookups
/// can binary search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeekIndex {
	entries: Vec<SeekEntry>,
}

impl SeekIndex {
	/// Creates an empty index
	pub fn new() -> Self {
		Self::default()
	}

	/// Records an I-frame; entries at or before the last recorded frame are ignored.
	///
	/// Returns `true` if the entry was added.
	pub fn record(&mut self, offset: u64, frame: u32) -> bool {
		if self.entries.last().is_some_and(|last| frame <= last.frame) {
			return false;
		}
		self.entries.push(SeekEntry {
			offset,
			frame,
		});
		true
	}

	/// Greatest entry whose frame is at or before `frame`
	pub fn lookup(&self, frame: u32) -> Option<SeekEntry> {
		let after = self.entries.partition_point(|entry| entry.frame <= frame);
		after.checked_sub(1).map(|i| self.entries[i])
	}

	/// Last recorded entry
	pub fn last(&self) -> Option<SeekEntry> {
		self.entries.last().copied()
	}

	/// All entries in frame order
	pub fn entries(&self) -> &[SeekEntry] {
		&self.entries
	}

	/// Number of entries
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` if no I-frame has been recorded
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
