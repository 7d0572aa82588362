//! Seeking against linear playback

use agmv_rs::prelude::*;

use super::{TempStream, build_stream, decode_all};

fn decode_to<R: std::io::Read + std::io::Seek>(session: &mut AgmvSession<R>, frame: u32) -> Vec<u16> {
	loop {
		match session.decode_next_frame().unwrap() {
			DecodeStep::Frame(info) if info.number == frame => return session.frame_buffer().to_vec(),
			DecodeStep::Frame(info) => assert!(info.number < frame, "decoded past frame {frame}"),
			other => panic!("stream ended before frame {frame}: {other:?}"),
		}
	}
}

#[test_log::test]
fn test_seek_reproduces_linear_frames() {
	let bytes = build_stream(5, 10, 4);
	let stream = TempStream::new("seek-linear", &bytes);

	let mut linear = AgmvSession::open_with_config(stream.path(), PlaybackConfig::silent()).unwrap();
	let expected = decode_all(&mut linear);
	assert_eq!(expected.len(), 10);

	// fresh session: every seek has to extend the index itself
	let mut session = AgmvSession::open_with_config(stream.path(), PlaybackConfig::silent()).unwrap();
	for target in [9, 2, 5, 0, 8, 3] {
		session.seek_to(target).unwrap();
		assert_eq!(session.position() % 4, 0);
		assert!(session.position() <= target);
		assert_eq!(decode_to(&mut session, target), expected[target as usize], "frame {target}");
	}

	let intra: Vec<u32> = session.seek_index().entries().iter().map(|e| e.frame).collect();
	assert_eq!(intra, vec![0, 4, 8]);
}

#[test_log::test]
fn test_skip_and_reset() {
	let stream = TempStream::new("seek-skip", &build_stream(4, 10, 4));
	let mut session = AgmvSession::open_with_config(stream.path(), PlaybackConfig::silent()).unwrap();

	session.skip_forward(2).unwrap();
	assert_eq!(session.position(), 4);
	decode_to(&mut session, 6);

	session.skip_backward(3).unwrap();
	assert_eq!(session.position(), 0);

	session.seek_to(9).unwrap();
	decode_all(&mut session);
	assert!(session.is_video_done());

	session.reset().unwrap();
	assert!(!session.is_video_done());
	assert_eq!(session.current_frame(), None);
	assert_eq!(decode_all(&mut session).len(), 10);
}
