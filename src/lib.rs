#![doc(html_root_url = "https://docs.rs/mediadecode/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # mediadecode - Synchronized Audio/Video Decode Engine
//!
//! `mediadecode` is the decode core of a media player. It drives two
//! queue-based codec pipelines (mandatory video, optional audio) from demuxed
//! elementary-stream sources and keeps their timelines coherent.
//!
//! ## Features
//!
//! - Pull-based decoding: one decoded video picture per call, with audio fed
//!   and drained along the way
//! - Interleaved or separately sourced audio, kept ahead of video in the sink
//! - Adaptive representation switches without recreating the decoder
//! - Frame-accurate seeking with a lookahead for reordered timestamps
//! - Fixed pool of reusable frame descriptors sized to the codec's output slots
//! - Bounded waits everywhere; no internal threads
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mediadecode::codec::CodecFactory;
//! use mediadecode::av::{AudioSink, MediaSource};
//! use mediadecode::Decoder;
//!
//! fn play(
//!     factory: CodecFactory,
//!     source: Box<dyn MediaSource>,
//!     sink: Box<dyn AudioSink>,
//! ) -> mediadecode::Result<()> {
//!     // Track 0 is video, track 1 is interleaved audio.
//!     let mut decoder = Decoder::builder(factory)
//!         .with_video(source, 0)
//!         .with_audio(1, sink)
//!         .build()?;
//!
//!     while let Some(frame) = decoder.decode_frame(false)? {
//!         if frame.representation_changed() {
//!             println!("new size {:?}x{:?}", frame.width(), frame.height());
//!         }
//!         decoder.release_frame(frame, true)?;
//!     }
//!
//!     decoder.release();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: media vocabulary and collaborator traits
//!   - `MediaFormat`, `ReadResult`
//!   - `MediaSource` (demuxer), `AudioSink`, `RenderTarget`
//!
//! - `codec`: the queue-based codec engine contract
//!
//! - `decoder`: the decode engine
//!   - Frame descriptor pool
//!   - Sample feeding and audio draining
//!   - Representation switches
//!   - Seeking
//!
//! - `config`: tunables loaded from defaults, environment and file
//!
//! - `error`: error type and result alias
//!
//! - `testing`: deterministic in-memory collaborators

/// Media formats and collaborator traits
pub mod av;

/// Codec engine contract
pub mod codec;

/// Configuration module
pub mod config;

/// The decode engine
pub mod decoder;

/// Error types and utilities
pub mod error;

/// In-memory collaborators for tests
pub mod testing;

pub use config::DecoderConfig;
pub use decoder::{Decoder, DecoderBuilder, FrameDescriptor, TransitionState};
pub use error::{DecodeError, Result};
