//! File format support for `agmv-rs`.

mod error;

pub mod agmv;

// Re-export unified error types
pub use error::{AgmvError, HeaderError, LzssError};

// Re-export main stream types
pub use agmv::{AgmvSession, AgmvWriter, CodecDialect, FrameType, Header, Pcm, PlaybackConfig};
