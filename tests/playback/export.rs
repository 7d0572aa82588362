//! Exporting frames and audio through the image and hound crates

use std::io::Cursor;

use agmv_rs::prelude::*;
use image::RgbImage;

use super::{DELTAS, HEIGHT, TempStream, WIDTH, build_stream, shade};

#[test_log::test]
fn test_soundtrack_exports_as_wav() {
	let frames = 5;
	let stream = TempStream::new("wav", &build_stream(3, frames, 2));
	let mut session = AgmvSession::open(stream.path()).unwrap();
	assert!(!session.is_audio_disabled());

	let mut chunks: Vec<Pcm> = Vec::new();
	while let DecodeStep::Frame(info) = session.decode_next_frame().unwrap() {
		assert!(info.audio);
		assert!(session.pump_audio(&mut chunks));
	}
	assert_eq!(chunks.len(), frames as usize);

	let mut soundtrack = chunks[0].clone();
	for chunk in &chunks[1..] {
		soundtrack.append(chunk).unwrap();
	}
	assert_eq!(soundtrack.len(), DELTAS.len() * frames as usize);
	assert_eq!(soundtrack.bits_per_sample(), 8);

	let mut wav = Cursor::new(Vec::new());
	soundtrack.write_wav(&mut wav, session.header().sample_rate(), session.header().num_channels()).unwrap();
	wav.set_position(0);

	let mut reader = hound::WavReader::new(wav).unwrap();
	let spec = reader.spec();
	assert_eq!(spec.sample_rate, 11025);
	assert_eq!(spec.channels, 1);
	assert_eq!(spec.bits_per_sample, 8);

	let read: Vec<u8> = reader.samples::<i8>().map(|s| (s.unwrap() as u8) ^ 0x80).collect();
	let Pcm::U8(samples) = soundtrack else {
		panic!("expected 8-bit samples");
	};
	assert_eq!(read, samples);
}

#[test_log::test]
fn test_frames_convert_to_rgb_images() {
	let stream = TempStream::new("rgb", &build_stream(6, 3, 3));
	let mut session = AgmvSession::open_with_config(stream.path(), PlaybackConfig::silent()).unwrap();
	assert!(matches!(session.decode_next_frame().unwrap(), DecodeStep::Frame(_)));

	let rgb = session.reference_frames().current().to_rgb888();
	let image = RgbImage::from_raw(WIDTH, HEIGHT, rgb).unwrap();
	assert_eq!(image.dimensions(), (WIDTH, HEIGHT));

	let [r, g, b] = image.get_pixel(WIDTH - 1, HEIGHT - 1).0;
	let color = shade(0);
	assert_eq!(r >> 3, ((color >> 10) & 0x1F) as u8);
	assert_eq!(g >> 3, ((color >> 5) & 0x1F) as u8);
	assert_eq!(b >> 3, (color & 0x1F) as u8);
}

#[test_log::test]
fn test_header_serializes_to_json() {
	let stream = TempStream::new("json", &build_stream(4, 1, 1));
	let session = AgmvSession::open_with_config(stream.path(), PlaybackConfig::silent()).unwrap();

	let json = serde_json::to_value(session.header()).unwrap();
	assert_eq!(json["width"], WIDTH);
	assert_eq!(json["height"], HEIGHT);
	assert_eq!(json["num_frames"], 1);
	assert_eq!(json["bits_per_sample"], 8);
	assert!(json.get("palettes").is_none());
}
