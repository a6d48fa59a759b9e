//! # Test Doubles
//!
//! Deterministic, in-memory stand-ins for the decoder's collaborators: a
//! scripted demuxer ([`MockSource`]), a pass-through codec ([`MockCodec`]), an
//! audio sink ([`MockSink`]) and a render target ([`RecordingTarget`]).
//!
//! Each double hands out a probe sharing its state, so a test can keep
//! inspecting it after the double itself was moved into a [`Decoder`].
//!
//! ```rust
//! use mediadecode::av::MediaFormat;
//! use mediadecode::testing::{codec_factory, MockCodec, MockSource};
//! use mediadecode::Decoder;
//!
//! # fn main() -> mediadecode::Result<()> {
//! let source = MockSource::new(vec![MediaFormat::video("video/avc", 640, 360)]);
//! source.push_sample(0, 0, true);
//! source.push_sample(0, 40_000, false);
//!
//! let codec = MockCodec::new(4, 4);
//! let probe = codec.probe();
//! let mut decoder = Decoder::builder(codec_factory(vec![codec]))
//!     .with_video(Box::new(source), 0)
//!     .build()?;
//!
//! let frame = decoder.decode_frame(false)?.expect("a frame");
//! assert_eq!(frame.presentation_time_us(), 0);
//! decoder.release_frame(frame, true)?;
//! assert_eq!(probe.rendered_times(), vec![0]);
//! # Ok(())
//! # }
//! ```
//!
//! [`Decoder`]: crate::Decoder

use crate::av::{AudioSink, MediaFormat, RenderTarget};
use crate::codec::{CodecEngine, CodecFactory, OutputIndex};
use crate::error::{DecodeError, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

mod codec;
mod source;

pub use codec::{CodecProbe, MockCodec};
pub use source::{MockSource, SourceProbe};

/// A factory handing out the given codecs in order, one per created track
/// (video first, then audio).
pub fn codec_factory(codecs: Vec<MockCodec>) -> CodecFactory {
    let codecs = Mutex::new(VecDeque::from(codecs));
    Box::new(move |format: &MediaFormat| {
        codecs
            .lock()
            .pop_front()
            .map(|codec| Box::new(codec) as Box<dyn CodecEngine>)
            .ok_or_else(|| DecodeError::CodecInit(format!("no mock codec left for {}", format.mime)))
    })
}

#[derive(Debug, Default)]
struct SinkShared {
    formats: Vec<MediaFormat>,
    writes: Vec<(Bytes, i64)>,
    played_us: i64,
}

/// Audio sink that records what it receives. Every write counts as
/// `frame_duration_us` of buffered audio until [`SinkProbe::play`] consumes it.
#[derive(Debug, Clone)]
pub struct MockSink {
    shared: Arc<Mutex<SinkShared>>,
    frame_duration_us: i64,
}

impl MockSink {
    /// A sink counting 20ms per write.
    pub fn new() -> Self {
        Self::with_frame_duration_us(20_000)
    }

    /// A sink counting `frame_duration_us` per write.
    pub fn with_frame_duration_us(frame_duration_us: i64) -> Self {
        Self {
            shared: Arc::new(Mutex::new(SinkShared::default())),
            frame_duration_us,
        }
    }

    /// Inspection handle sharing this sink's state.
    pub fn probe(&self) -> SinkProbe {
        SinkProbe {
            shared: self.shared.clone(),
        }
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for MockSink {
    fn init(&mut self, format: &MediaFormat) -> Result<()> {
        self.shared.lock().formats.push(format.clone());
        Ok(())
    }

    fn write(&mut self, data: Bytes, presentation_time_us: i64) -> Result<()> {
        self.shared.lock().writes.push((data, presentation_time_us));
        Ok(())
    }

    fn buffered_duration_us(&self) -> i64 {
        let shared = self.shared.lock();
        (shared.writes.len() as i64 * self.frame_duration_us - shared.played_us).max(0)
    }
}

/// View on a [`MockSink`] owned by a decoder.
#[derive(Debug, Clone)]
pub struct SinkProbe {
    shared: Arc<Mutex<SinkShared>>,
}

impl SinkProbe {
    /// Formats passed to `init`, in order.
    pub fn init_formats(&self) -> Vec<MediaFormat> {
        self.shared.lock().formats.clone()
    }

    /// Timestamps of every write, in order.
    pub fn written_times(&self) -> Vec<i64> {
        self.shared.lock().writes.iter().map(|(_, pts)| *pts).collect()
    }

    /// Payloads of every write, in order.
    pub fn written_bytes(&self) -> Vec<Bytes> {
        self.shared.lock().writes.iter().map(|(data, _)| data.clone()).collect()
    }

    /// Simulates playback draining the sink.
    pub fn play(&self, duration_us: i64) {
        self.shared.lock().played_us += duration_us;
    }
}

/// Render target remembering every displayed picture.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    shown: Mutex<Vec<(OutputIndex, i64)>>,
}

impl RecordingTarget {
    /// An empty target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamps of displayed pictures, in order.
    pub fn shown_times(&self) -> Vec<i64> {
        self.shown.lock().iter().map(|(_, pts)| *pts).collect()
    }
}

impl RenderTarget for RecordingTarget {
    fn display(&self, picture: OutputIndex, presentation_time_us: i64) {
        self.shown.lock().push((picture, presentation_time_us));
    }
}
