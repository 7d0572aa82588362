//! End-to-end playback tests for `agmv-rs`
//!
//! Streams are produced with [`AgmvWriter`] and written to the system temp
//! directory, then played back through the public API only.

use std::{
	fs,
	path::{Path, PathBuf},
};

use agmv_rs::prelude::*;

mod export;
mod seek;

const WIDTH: u32 = 16;
const HEIGHT: u32 = 8;
const CELLS: usize = (WIDTH as usize / 4) * (HEIGHT as usize / 4);

/// Audio deltas written after every frame
const DELTAS: [u8; 4] = [4, 0xFC, 8, 0];

/// Temp file removed on drop
struct TempStream {
	path: PathBuf,
}

impl TempStream {
	fn new(name: &str, bytes: &[u8]) -> Self {
		let path = std::env::temp_dir().join(format!("agmv-rs-{}-{name}.agm", std::process::id()));
		fs::write(&path, bytes).unwrap();
		Self {
			path,
		}
	}

	fn path(&self) -> &Path {
		&self.path
	}
}

impl Drop for TempStream {
	fn drop(&mut self) {
		let _ = fs::remove_file(&self.path);
	}
}

/// Highest frame number with its own shade
const SHADES: u32 = 10;

fn shade(frame: u32) -> u16 {
	((frame as u16 * 3) & 0x1F) << 5 | 0x0005
}

/// Bitstream color for `shade(frame)`: the palette index for palette
/// dialects, the RGB555 value otherwise
fn shade_code(dialect: CodecDialect, frame: u32) -> u16 {
	if dialect.palette_count() > 0 {
		frame as u16
	} else {
		shade(frame)
	}
}

/// 16×8 stream with an I-frame every `gop` frames and audio after each frame.
///
/// I-frames paint every cell with the frame's shade. P-frames repaint the
/// first cell, shift the remaining cells in from the left with motion
/// vectors and copy the bottom row from the previous frame.
fn build_stream(version: u8, frames: u32, gop: u32) -> Vec<u8> {
	assert!(frames <= SHADES);
	let dialect = CodecDialect::from_version(version).unwrap();
	let mut palette = Palette::new();
	for i in 0..SHADES {
		palette.set(i as u8, shade(i));
	}
	let header = Header::new(dialect, WIDTH, HEIGHT, 24)
		.unwrap()
		.with_num_frames(frames)
		.with_audio(11025, 1, 8, DELTAS.len() as u32 * frames, 0)
		.unwrap()
		.with_palette(0, palette);
	let mut writer = AgmvWriter::new(Vec::new(), &header).unwrap();

	for i in 0..frames {
		let mut bits = BitstreamBuilder::for_dialect(dialect);
		let frame_type = if i % gop == 0 {
			for _ in 0..CELLS {
				bits.fill(BlockSize::S4x4, shade_code(dialect, i));
			}
			FrameType::Intra
		} else {
			bits.fill(BlockSize::S4x4, shade_code(dialect, i));
			for _ in 1..CELLS / 2 {
				bits.pmv(BlockSize::S4x4, -4, 0);
			}
			for _ in CELLS / 2..CELLS {
				bits.pcopy(BlockSize::S4x4);
			}
			FrameType::Inter
		};
		writer.write_frame(i, frame_type, &bits.finish()).unwrap();
		writer.write_audio(&DELTAS).unwrap();
	}

	writer.finish().unwrap()
}

/// Decodes every remaining frame, returning copies of the frame buffer
fn decode_all<R: std::io::Read + std::io::Seek>(session: &mut AgmvSession<R>) -> Vec<Vec<u16>> {
	let mut frames = Vec::new();
	while let DecodeStep::Frame(_) = session.decode_next_frame().unwrap() {
		frames.push(session.frame_buffer().to_vec());
	}
	frames
}

#[test_log::test]
fn test_play_file_to_end() {
	for version in 1..=6 {
		let stream = TempStream::new(&format!("play-v{version}"), &build_stream(version, 9, 3));
		let mut session = AgmvSession::open_with_config(stream.path(), PlaybackConfig::silent()).unwrap();
		assert_eq!(session.header().version(), version);

		let frames = decode_all(&mut session);
		assert_eq!(frames.len(), 9, "version {version}");
		assert!(session.is_video_done());

		// frame 2 shifts frame 1 one cell to the right on the top row
		let width = WIDTH as usize;
		assert_eq!(frames[2][3], shade(2));
		assert_eq!(frames[2][4], shade(1));
		assert_eq!(frames[2][8], shade(0));
		assert_eq!(frames[2][4 * width], shade(0));

		// I-frames are uniform
		for (i, frame) in frames.iter().enumerate().step_by(3) {
			assert!(frame.iter().all(|&c| c == shade(i as u32)), "frame {i}");
		}
	}
}

#[test_log::test]
fn test_display_sink_receives_frames() {
	#[derive(Default)]
	struct Recorder {
		frames: Vec<(u32, u32, u16)>,
	}

	impl DisplaySink for Recorder {
		fn present(&mut self, pixels: &[u16], width: u32, height: u32) {
			self.frames.push((width, height, pixels[0]));
		}
	}

	let stream = TempStream::new("display", &build_stream(5, 4, 2));
	let mut session = AgmvSession::open_with_config(stream.path(), PlaybackConfig::silent()).unwrap();
	let mut display = Recorder::default();
	while let DecodeStep::Frame(_) = session.decode_next_frame().unwrap() {
		session.present(&mut display);
	}

	let expected: Vec<_> = (0..4).map(|i| (WIDTH, HEIGHT, shade(i))).collect();
	assert_eq!(display.frames, expected);
}

#[test_log::test]
fn test_missing_file_is_reported() {
	let path = std::env::temp_dir().join("agmv-rs-does-not-exist.agm");
	match AgmvSession::open(&path) {
		Err(AgmvError::FileNotFound {
			path: missing,
		}) => assert_eq!(missing, path),
		other => panic!("expected FileNotFound, got {other:?}"),
	}
}

#[test_log::test]
fn test_invalid_headers_are_rejected() {
	let good = build_stream(6, 1, 1);

	let mut bad_magic = good.clone();
	bad_magic[0] = b'X';
	let stream = TempStream::new("bad-magic", &bad_magic);
	assert!(matches!(
		AgmvSession::open(stream.path()),
		Err(AgmvError::InvalidHeader(HeaderError::InvalidMagic { .. }))
	));

	let mut bad_version = good.clone();
	bad_version[4 + 4 + 4 + 4 + 1] = 9;
	let stream = TempStream::new("bad-version", &bad_version);
	assert!(matches!(
		AgmvSession::open(stream.path()),
		Err(AgmvError::InvalidHeader(HeaderError::UnsupportedVersion(9)))
	));

	let stream = TempStream::new("oversized", &good);
	let config = PlaybackConfig {
		max_dimension: 8,
		..PlaybackConfig::default()
	};
	assert!(matches!(
		AgmvSession::open_with_config(stream.path(), config),
		Err(AgmvError::InvalidHeader(HeaderError::InvalidDimensions {
			width: WIDTH,
			height: HEIGHT
		}))
	));
}

#[test_log::test]
fn test_playback_config_from_toml() {
	let settings = config::Config::builder()
		.add_source(config::File::from_str(
			"volume = 35\nstart_paused = true",
			config::FileFormat::Toml,
		))
		.build()
		.unwrap();
	let config: PlaybackConfig = settings.try_deserialize().unwrap();
	assert_eq!(config.volume, 35);
	assert!(config.start_paused);
	assert!(config.audio_enabled);
	assert_eq!(config.max_dimension, PlaybackConfig::default().max_dimension);

	let stream = TempStream::new("config", &build_stream(3, 2, 2));
	let mut session = AgmvSession::open_with_config(stream.path(), config).unwrap();
	assert_eq!(session.volume(), 35);
	assert_eq!(session.decode_next_frame().unwrap(), DecodeStep::Paused);
	session.play_video();
	assert!(matches!(session.decode_next_frame().unwrap(), DecodeStep::Frame(_)));
}
