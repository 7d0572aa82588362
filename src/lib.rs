#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! `agmv-rs` decodes, plays back and writes AGMV block-coded video streams.
//!
//! The format types, codec and playback session live in the `agmv_types`
//! crate and are re-exported here.
//!
//! ```no_run
//! use agmv_rs::prelude::*;
//!
//! let mut session = AgmvSession::open("intro.agm")?;
//! let mut display = NullSink;
//! while let DecodeStep::Frame(_) = session.decode_next_frame()? {
//!     session.present(&mut display);
//! }
//! # Ok::<(), AgmvError>(())
//! ```
pub use agmv_types::*;
