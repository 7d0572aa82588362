//! Prelude module for `agmv_types`.
//!
//! This module provides a convenient way to import commonly used types, traits, and constants.
//!
//! # Examples
//!
//! ```no_run
//! use agmv_types::prelude::*;
//!
//! let session = AgmvSession::open("intro.agm")?;
//! let header: &Header = session.header();
//! # Ok::<(), AgmvError>(())
//! ```

// Error types
#[doc(inline)]
pub use crate::file::{AgmvError, HeaderError, LzssError};

// Stream types
#[doc(inline)]
pub use crate::file::agmv::{
	AgmvSession,
	AgmvWriter,
	// Sinks
	AudioSink,
	BitstreamBuilder,
	BlockSize,
	CodecDialect,
	DecodeStep,
	DisplaySink,
	FrameBuffer,
	FrameInfo,
	FrameType,
	Header,
	NullSink,
	Palette,
	Pcm,
	PlaybackConfig,
	PlaybackState,
	SeekIndex,
};

// Re-export the file module for advanced usage
#[doc(inline)]
pub use crate::file;
