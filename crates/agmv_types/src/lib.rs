//! This crate provides the AGMV video container and codec for the `agmv-rs` project.
//!
//! # Components
//!
//! - **Header**: stream geometry, audio parameters and palettes, versioned by codec dialect
//! - **LZSS**: the 12-bit window compressor wrapping frame and audio payloads
//! - **Frame decoder**: block-based reconstruction against I-frame and previous-frame references
//! - **Audio**: 8-bit delta and 16-bit expanded PCM, exportable as WAV
//! - **Session**: playback, pausing and I-frame seeking over any seekable reader
//! - **Writer**: produces AGMV streams from prepared bitstreams
//!
//! # Examples
//!
//! Using the prelude (recommended):
//!
//! ```no_run
//! use agmv_types::prelude::*;
//!
//! let mut session = AgmvSession::open("intro.agm")?;
//! while let DecodeStep::Frame(info) = session.decode_next_frame()? {
//!     println!("decoded frame {}", info.number);
//! }
//! # Ok::<(), AgmvError>(())
//! ```
//!
//! Or use explicit paths:
//!
//! ```no_run
//! use agmv_types::file::agmv::{AgmvSession, PlaybackConfig};
//!
//! let session = AgmvSession::open_with_config("intro.agm", PlaybackConfig::silent())?;
//! println!("{}", session.header());
//! # Ok::<(), agmv_types::file::AgmvError>(())
//! ```

pub mod file;

/// `use agmv_types::prelude::*;` to import commonly used items.
pub mod prelude;
