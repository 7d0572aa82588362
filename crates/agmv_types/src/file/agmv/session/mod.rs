//! Playback session: chunk walking, frame and audio decoding, and seeking.
//!
//! A session owns the reader, the three reference frames and the seek
//! index. Frames are decoded one call at a time; after each frame the audio
//! chunk that follows it, if any, is decoded into the session's PCM buffer.
//!
//! The seek index grows as the stream is read. Every frame chunk up to the
//! furthest one seen has had its I-frames recorded, so any frame at or
//! before that point can be reached by jumping to the closest preceding
//! I-frame and decoding forward.
//!
//! # Examples
//!
//! ```no_run
//! use agmv_types::file::agmv::{AgmvSession, DecodeStep, NullSink};
//!
//! let mut session = AgmvSession::open("intro.agm")?;
//! let mut display = NullSink;
//! while let DecodeStep::Frame(info) = session.decode_next_frame()? {
//!     session.present(&mut display);
//!     println!("frame {} ({})", info.number, info.frame_type);
//! }
//! # Ok::<(), agmv_types::file::AgmvError>(())
//! ```


use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek};
use std::path::Path;

use log::{debug, trace, warn};

use crate::file::AgmvError;

use super::audio::{Pcm, decode_audio};
use super::chunk::{AUDIO_CHUNK_TAG, AudioChunkHeader, FRAME_CHUNK_TAG, FrameChunkHeader, FrameType};
use super::config::PlaybackConfig;
use super::dialect::{CodecDialect, Payload};
use super::frame::{FrameDecoder, ReferenceFrames, allocate};
use super::header::Header;
use super::lzss;
use super::platform::{AudioSink, DisplaySink};
use super::reader::ByteReader;
use super::seek::{SeekEntry, SeekIndex};

/// Whether a stream is advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackState {
	/// Advancing normally
	#[default]
	Playing,
	/// Held by the host
	Paused,
}

/// Summary of one decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
	/// Frame number from the chunk header
	pub number: u32,
	/// I-frame or P-frame
	pub frame_type: FrameType,
	/// Whether an audio chunk was decoded alongside this frame
	pub audio: bool,
}

/// Outcome of [`AgmvSession::decode_next_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
	/// A frame was decoded into the frame buffer
	Frame(FrameInfo),
	/// Video is paused; nothing was read
	Paused,
	/// No frames are left
	EndOfStream,
}

/// Decoding session over one AGMV stream
#[derive(Debug)]
pub struct AgmvSession<R> {
	reader: ByteReader<R>,
	header: Header,
	decoder: FrameDecoder,
	refs: ReferenceFrames,
	/// Decompressed frame bitstream, `width * height * 2` bytes
	scratch: Vec<u8>,
	/// Compressed chunk payload
	staging: Vec<u8>,
	pcm: Option<Pcm>,
	index: SeekIndex,
	/// Furthest frame chunk seen so far
	frontier: Option<SeekEntry>,
	/// Frame number the next decode is expected to produce
	position: u32,
	current_frame: Option<u32>,
	video_state: PlaybackState,
	audio_state: PlaybackState,
	audio_disabled: bool,
	volume: u8,
	video_done: bool,
}

impl AgmvSession<BufReader<File>> {
	/// Opens a file with the default configuration.
	pub fn open(path: impl AsRef<Path>) -> Result<Self, AgmvError> {
		Self::open_with_config(path, PlaybackConfig::default())
	}

	/// Opens a file.
	pub fn open_with_config(path: impl AsRef<Path>, config: PlaybackConfig) -> Result<Self, AgmvError> {
		let path = path.as_ref();
		let file = File::open(path).map_err(|e| match e.kind() {
			ErrorKind::NotFound => AgmvError::FileNotFound {
				path: path.to_path_buf(),
			},
			_ => AgmvError::Io(e),
		})?;
		debug!("Opening AGMV file {}", path.display());
		Self::from_reader_with_config(BufReader::new(file), config)
	}
}

impl<R: Read + Seek> AgmvSession<R> {
	/// Wraps a seekable reader with the default configuration.
	pub fn from_reader(reader: R) -> Result<Self, AgmvError> {
		Self::from_reader_with_config(reader, PlaybackConfig::default())
	}

	/// Wraps a seekable reader.
	///
	/// The header is validated before any frame buffer is allocated.
	pub fn from_reader_with_config(reader: R, config: PlaybackConfig) -> Result<Self, AgmvError> {
		let mut reader = ByteReader::new(reader)?;
		let header = Header::from_reader(&mut reader)?;
		config.check_dimensions(header.width(), header.height())?;

		let refs = ReferenceFrames::new(header.width(), header.height())?;
		let scratch_len = (header.width() as usize)
			.checked_mul(header.height() as usize)
			.and_then(|pixels| pixels.checked_mul(2))
			.ok_or(AgmvError::MemoryAllocation {
				bytes: usize::MAX,
			})?;
		let scratch = allocate(scratch_len)?;

		let audio_disabled = !config.audio_enabled || header.bits_per_sample() == 0;
		let initial_state = if config.start_paused {
			PlaybackState::Paused
		} else {
			PlaybackState::Playing
		};
		debug!("AGMV session: {header}, audio {}", if audio_disabled { "disabled" } else { "enabled" });

		Ok(Self {
			reader,
			decoder: FrameDecoder::new(&header),
			header,
			refs,
			scratch,
			staging: Vec::new(),
			pcm: None,
			index: SeekIndex::new(),
			frontier: None,
			position: 0,
			current_frame: None,
			video_state: initial_state,
			audio_state: initial_state,
			audio_disabled,
			volume: config.clamped_volume(),
			video_done: false,
		})
	}

	/// Parsed stream header
	pub fn header(&self) -> &Header {
		&self.header
	}

	/// Codec dialect of the stream
	pub fn dialect(&self) -> CodecDialect {
		self.header.dialect()
	}

	/// I-frames recorded so far
	pub fn seek_index(&self) -> &SeekIndex {
		&self.index
	}

	/// Number of the last decoded frame; `None` after opening, a seek or a reset
	pub fn current_frame(&self) -> Option<u32> {
		self.current_frame
	}

	/// Number of the frame the next decode is expected to produce
	pub fn position(&self) -> u32 {
		self.position
	}

	/// The current frame as row-major RGB555
	pub fn frame_buffer(&self) -> &[u16] {
		self.refs.current().pixels()
	}

	/// Reference frames, for inspection
	pub fn reference_frames(&self) -> &ReferenceFrames {
		&self.refs
	}

	/// Samples decoded alongside the last frame and not yet pumped
	pub fn audio_buffer(&self) -> Option<&Pcm> {
		self.pcm.as_ref()
	}

	/// Returns `true` once the last frame has been decoded
	pub fn is_video_done(&self) -> bool {
		self.video_done
	}

	/// Returns `true` if audio chunks are never decoded
	pub fn is_audio_disabled(&self) -> bool {
		self.audio_disabled
	}

	/// Video playback state
	pub fn video_state(&self) -> PlaybackState {
		self.video_state
	}

	/// Audio playback state
	pub fn audio_state(&self) -> PlaybackState {
		self.audio_state
	}

	/// Resumes video
	pub fn play_video(&mut self) {
		self.video_state = PlaybackState::Playing;
	}

	/// Holds video; `decode_next_frame` returns [`DecodeStep::Paused`]
	pub fn pause_video(&mut self) {
		self.video_state = PlaybackState::Paused;
	}

	/// Resumes audio
	pub fn play_audio(&mut self) {
		self.audio_state = PlaybackState::Playing;
	}

	/// Holds audio; chunks read while paused are skipped
	pub fn pause_audio(&mut self) {
		self.audio_state = PlaybackState::Paused;
	}

	/// Current volume in percent
	pub fn volume(&self) -> u8 {
		self.volume
	}

	/// Sets the volume in percent, clamped to 100
	pub fn set_volume(&mut self, volume: u8) {
		self.volume = volume.min(100);
	}

	/// Hands the current frame to a display
	pub fn present<D: DisplaySink>(&self, display: &mut D) {
		display.present(self.frame_buffer(), self.header.width(), self.header.height());
	}

	/// Hands pending samples to an audio sink.
	///
	/// Returns `true` if samples were submitted. Nothing is submitted while
	/// audio is paused or disabled.
	pub fn pump_audio<A: AudioSink>(&mut self, sink: &mut A) -> bool {
		if self.audio_disabled || self.audio_state != PlaybackState::Playing {
			return false;
		}
		match self.pcm.take() {
			Some(pcm) if !pcm.is_empty() => {
				sink.submit(&pcm, self.volume);
				true
			}
			_ => false,
		}
	}

	/// Decodes the next frame and the audio chunk that follows it.
	///
	/// A [`AgmvError::CorruptFrame`] leaves the session usable: the reference
	/// frames are still updated and the next call moves on to the next chunk.
	/// An [`AgmvError::InvalidAudioChunk`] ends the session.
	pub fn decode_next_frame(&mut self) -> Result<DecodeStep, AgmvError> {
		if self.video_done {
			return Ok(DecodeStep::EndOfStream);
		}
		if self.video_state == PlaybackState::Paused {
			return Ok(DecodeStep::Paused);
		}

		self.pcm = None;
		let Some(offset) = self.find_frame_chunk()? else {
			debug!("No frame chunk after offset {}, end of stream", self.reader.position());
			self.video_done = true;
			return Ok(DecodeStep::EndOfStream);
		};
		self.reader.skip(4)?;

		let dialect = self.dialect();
		let chunk = match FrameChunkHeader::read(&mut self.reader, dialect) {
			Ok(chunk) => chunk,
			Err(AgmvError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
				debug!("Truncated frame chunk at offset {offset}, end of stream");
				self.video_done = true;
				return Ok(DecodeStep::EndOfStream);
			}
			Err(e) => {
				warn!("Skipping frame chunk at offset {offset}: {e}");
				self.position = self.position.saturating_add(1);
				self.update_done();
				return Err(e);
			}
		};
		trace!(
			"Frame chunk {} ({}) at offset {offset}: {} -> {} bytes",
			chunk.frame_num, chunk.frame_type, chunk.compressed_size, chunk.uncompressed_size
		);
		self.note_chunk(offset, &chunk);

		let decoded = match self.load_payload(&chunk) {
			Ok(len) => {
				self.decoder.decode(chunk.frame_num, &self.scratch[..len], chunk.frame_type, &mut self.refs)
			}
			Err(e) => {
				if chunk.frame_type.is_intra() {
					self.refs.clear_registers();
				}
				self.refs.commit(chunk.frame_type);
				Err(e)
			}
		};

		self.current_frame = Some(chunk.frame_num);
		self.position = chunk.frame_num.saturating_add(1);
		self.update_done();

		if let Err(e) = decoded {
			warn!("Frame {} is corrupt: {e}", chunk.frame_num);
			return Err(e);
		}

		let audio = if self.audio_disabled {
			false
		} else {
			self.read_audio_chunk()?
		};

		Ok(DecodeStep::Frame(FrameInfo {
			number: chunk.frame_num,
			frame_type: chunk.frame_type,
			audio,
		}))
	}

	/// Skips `count` frame chunks without decoding them, then moves on to
	/// the next I-frame.
	///
	/// The session is marked done if no I-frame follows.
	pub fn skip_forward(&mut self, count: u32) -> Result<(), AgmvError> {
		debug!("Skipping {count} frames forward from frame {}", self.position);
		for _ in 0..count {
			if self.scan_frame_chunk()?.is_none() {
				self.video_done = true;
				return Ok(());
			}
		}

		loop {
			let Some((offset, chunk)) = self.scan_frame_chunk()? else {
				self.video_done = true;
				return Ok(());
			};
			if chunk.frame_type.is_intra() {
				return self.jump_to(SeekEntry {
					offset,
					frame: chunk.frame_num,
				});
			}
		}
	}

	/// Steps back `count` frames from the last decoded one, landing on the
	/// closest preceding I-frame.
	pub fn skip_backward(&mut self, count: u32) -> Result<(), AgmvError> {
		let last = self.current_frame.unwrap_or(self.position);
		let target = last.saturating_sub(count);
		debug!("Skipping {count} frames back from frame {last} to {target}");

		match self.index.lookup(target) {
			Some(entry) => self.jump_to(entry),
			None => self.rewind_to_start(),
		}
	}

	/// Positions the session so that decoding forward reaches `frame`.
	///
	/// The reader lands on the closest I-frame at or before `frame`; the
	/// frames between it and `frame` still have to be decoded.
	pub fn seek_to(&mut self, frame: u32) -> Result<(), AgmvError> {
		self.extend_index_to(frame)?;

		match self.index.lookup(frame) {
			Some(entry) => {
				debug!("Seek to frame {frame}: I-frame {} at offset {}", entry.frame, entry.offset);
				self.jump_to(entry)
			}
			None => {
				debug!("Seek to frame {frame}: no I-frame before it, rewinding");
				self.rewind_to_start()
			}
		}
	}

	/// Returns to the first chunk with black frames; the seek index is kept.
	pub fn reset(&mut self) -> Result<(), AgmvError> {
		debug!("Resetting session");
		self.reader.seek_to(self.header.size() as u64)?;
		self.refs.reset();
		self.position = 0;
		self.current_frame = None;
		self.pcm = None;
		self.video_done = false;
		Ok(())
	}

	/// Ends the session and returns the reader
	pub fn close(self) -> R {
		self.reader.into_inner()
	}

	fn update_done(&mut self) {
		let num_frames = self.header.num_frames();
		if num_frames > 0 && self.position >= num_frames {
			debug!("All {num_frames} frames decoded");
			self.video_done = true;
		}
	}

	/// Records an I-frame and advances the frontier
	fn note_chunk(&mut self, offset: u64, chunk: &FrameChunkHeader) {
		if chunk.frame_type.is_intra() && self.index.record(offset, chunk.frame_num) {
			trace!("Indexed I-frame {} at offset {offset}", chunk.frame_num);
		}
		if self.frontier.is_none_or(|frontier| offset > frontier.offset) {
			self.frontier = Some(SeekEntry {
				offset,
				frame: chunk.frame_num,
			});
		}
	}

	/// Moves the cursor onto the next frame chunk tag.
	///
	/// Audio chunks met on the way are stepped over by their declared size,
	/// so tag-like bytes inside an audio payload are never taken for a frame.
	fn find_frame_chunk(&mut self) -> Result<Option<u64>, AgmvError> {
		let dialect = self.dialect();
		loop {
			let Some((offset, tag)) = self.reader.find_any_tag(&[FRAME_CHUNK_TAG, AUDIO_CHUNK_TAG])? else {
				return Ok(None);
			};
			if tag == FRAME_CHUNK_TAG {
				return Ok(Some(offset));
			}

			self.reader.skip(tag.len() as u64)?;
			let chunk = match AudioChunkHeader::read(&mut self.reader, dialect) {
				Ok(chunk) => chunk,
				Err(AgmvError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
				Err(e) => return Err(e),
			};
			let payload = u64::from(chunk.payload_len()).min(self.reader.remaining());
			trace!("Stepping over audio chunk at offset {offset} ({payload} bytes)");
			self.reader.skip(payload)?;
		}
	}

	/// Reads the next frame chunk header and skips its payload.
	fn scan_frame_chunk(&mut self) -> Result<Option<(u64, FrameChunkHeader)>, AgmvError> {
		let dialect = self.dialect();
		loop {
			let Some(offset) = self.find_frame_chunk()? else {
				return Ok(None);
			};
			self.reader.skip(4)?;

			match FrameChunkHeader::read(&mut self.reader, dialect) {
				Ok(chunk) => {
					self.note_chunk(offset, &chunk);
					let payload = u64::from(chunk.compressed_size).min(self.reader.remaining());
					self.reader.skip(payload)?;
					return Ok(Some((offset, chunk)));
				}
				Err(AgmvError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
				Err(AgmvError::CorruptFrame {
					..
				}) => trace!("Unreadable frame chunk at offset {offset} while scanning"),
				Err(e) => return Err(e),
			}
		}
	}

	/// Scans past the frontier until a chunk at or after `frame` has been seen.
	fn extend_index_to(&mut self, frame: u32) -> Result<(), AgmvError> {
		if self.frontier.is_some_and(|frontier| frontier.frame >= frame) {
			return Ok(());
		}

		// the frontier chunk is read again so its payload is skipped, not scanned
		let start = match self.frontier {
			Some(frontier) => frontier.offset,
			None => self.header.size() as u64,
		};
		self.reader.seek_to(start)?;

		while let Some((_, chunk)) = self.scan_frame_chunk()? {
			if chunk.frame_num >= frame {
				break;
			}
		}
		trace!("Seek index now holds {} I-frames", self.index.len());
		Ok(())
	}

	fn jump_to(&mut self, entry: SeekEntry) -> Result<(), AgmvError> {
		self.reader.seek_to(entry.offset)?;
		self.position = entry.frame;
		self.after_seek();
		Ok(())
	}

	fn rewind_to_start(&mut self) -> Result<(), AgmvError> {
		self.reader.seek_to(self.header.size() as u64)?;
		self.position = 0;
		self.after_seek();
		Ok(())
	}

	fn after_seek(&mut self) {
		self.refs.clear_registers();
		self.current_frame = None;
		self.pcm = None;
		self.video_done = false;
	}

	/// Reads a frame payload into the scratch buffer, returning its length.
	///
	/// Payloads that cannot be used are skipped so the reader stays on the
	/// chunk boundary.
	fn load_payload(&mut self, chunk: &FrameChunkHeader) -> Result<usize, AgmvError> {
		let frame = chunk.frame_num;
		let compressed_size = u64::from(chunk.compressed_size);
		let uncompressed_size = chunk.uncompressed_size as usize;

		let remaining = self.reader.remaining();
		if compressed_size > remaining {
			self.reader.skip(remaining)?;
			return Err(AgmvError::corrupt(
				frame,
				format!("payload of {compressed_size} bytes exceeds the {remaining} bytes left"),
			));
		}
		if uncompressed_size > self.scratch.len() {
			self.reader.skip(compressed_size)?;
			return Err(AgmvError::corrupt(
				frame,
				format!("bitstream of {uncompressed_size} bytes exceeds the {} byte frame buffer", self.scratch.len()),
			));
		}

		match self.dialect().payload() {
			Payload::Raw => {
				if compressed_size != uncompressed_size as u64 {
					self.reader.skip(compressed_size)?;
					return Err(AgmvError::corrupt(
						frame,
						format!("raw payload of {compressed_size} bytes declares {uncompressed_size}"),
					));
				}
				self.reader.read_exact(&mut self.scratch[..uncompressed_size])?;
			}
			Payload::Lzss => {
				self.stage(compressed_size as usize)?;
				lzss::decompress(&self.staging, &mut self.scratch, uncompressed_size)
					.map_err(|e| AgmvError::corrupt(frame, e.to_string()))?;
			}
		}

		Ok(uncompressed_size)
	}

	/// Reads `len` payload bytes into the staging buffer
	fn stage(&mut self, len: usize) -> Result<(), AgmvError> {
		self.staging.clear();
		self.staging.try_reserve(len).map_err(|_| AgmvError::MemoryAllocation {
			bytes: len,
		})?;
		self.staging.resize(len, 0);
		self.reader.read_exact(&mut self.staging)?;
		Ok(())
	}

	/// Decodes the audio chunk following a frame, if there is one.
	fn read_audio_chunk(&mut self) -> Result<bool, AgmvError> {
		let tag = match self.reader.find_any_tag(&[AUDIO_CHUNK_TAG, FRAME_CHUNK_TAG])? {
			Some((_, tag)) if tag == AUDIO_CHUNK_TAG => tag,
			// a frame chunk follows directly; the cursor stays on its tag
			_ => return Ok(false),
		};
		self.reader.skip(tag.len() as u64)?;

		let result = self.decode_audio_chunk();
		if let Err(e) = &result {
			warn!("Audio chunk after frame {}: {e}", self.position.saturating_sub(1));
			self.video_done = true;
		}
		result
	}

	fn decode_audio_chunk(&mut self) -> Result<bool, AgmvError> {
		let dialect = self.dialect();
		let chunk = AudioChunkHeader::read(&mut self.reader, dialect).map_err(|e| {
			AgmvError::InvalidAudioChunk {
				message: format!("unreadable chunk header: {e}"),
			}
		})?;
		self.check_audio_chunk(&chunk)?;
		let payload_len = u64::from(chunk.payload_len());
		let remaining = self.reader.remaining();
		if payload_len > remaining {
			return Err(AgmvError::InvalidAudioChunk {
				message: format!("payload of {payload_len} bytes exceeds the {remaining} bytes left"),
			});
		}

		if self.audio_state != PlaybackState::Playing {
			trace!("Audio paused, skipping {payload_len} bytes");
			self.reader.skip(payload_len)?;
			return Ok(false);
		}

		self.stage(payload_len as usize)?;
		let pcm = if dialect.compresses_audio() {
			let size = chunk.size as usize;
			let mut deltas = allocate::<u8>(size)?;
			lzss::decompress(&self.staging, &mut deltas, size).map_err(|e| AgmvError::InvalidAudioChunk {
				message: e.to_string(),
			})?;
			decode_audio(&deltas, self.header.bits_per_sample())?
		} else {
			decode_audio(&self.staging, self.header.bits_per_sample())?
		};

		trace!("Decoded {} audio samples", pcm.len());
		self.pcm = Some(pcm);
		Ok(true)
	}

	/// Rejects chunk sizes no valid payload can have, before anything is allocated.
	fn check_audio_chunk(&self, chunk: &AudioChunkHeader) -> Result<(), AgmvError> {
		let size = chunk.size as usize;
		let payload_len = chunk.payload_len() as usize;
		let audio_size = self.header.audio_size() as usize;

		let message = if audio_size > 0 && size > audio_size {
			format!("{size} delta bytes exceed the {audio_size} byte soundtrack")
		} else if self.dialect().compresses_audio() {
			if size <= lzss::max_decompressed_len(payload_len) {
				return Ok(());
			}
			format!("{payload_len} compressed bytes cannot expand to {size}")
		} else if payload_len != size {
			format!("raw payload of {payload_len} bytes declares {size}")
		} else {
			return Ok(());
		};

		Err(AgmvError::InvalidAudioChunk {
			message,
		})
	}
}
