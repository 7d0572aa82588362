//! Output ports a host plugs into a session.

use super::audio::Pcm;

/// Receives finished frames
pub trait DisplaySink {
	/// Shows a row-major RGB555 frame
	fn present(&mut self, pixels: &[u16], width: u32, height: u32);
}

/// Receives decoded audio
pub trait AudioSink {
	/// Queues samples; `volume` is in percent, 0 to 100
	fn submit(&mut self, pcm: &Pcm, volume: u8);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DisplaySink for NullSink {
	fn present(&mut self, _pixels: &[u16], _width: u32, _height: u32) {}
}

impl AudioSink for NullSink {
	fn submit(&mut self, _pcm: &Pcm, _volume: u8) {}
}

/// Collects volume-scaled chunks
impl AudioSink for Vec<Pcm> {
	fn submit(&mut self, pcm: &Pcm, volume: u8) {
		self.push(pcm.with_volume(volume));
	}
}
