//! # Codec Engine Contract
//!
//! The decode engine drives codecs through [`CodecEngine`], a queue-based
//! interface modelled on hardware codec APIs: the caller dequeues an empty
//! input slot, fills it, queues it back, and polls for decoded output slots
//! which it must release once consumed.
//!
//! Every queue operation takes an explicit timeout. Running out of time is an
//! ordinary outcome (`None` / [`OutputEvent::TryAgainLater`]), not an error.
//!
//! Slot indices are only meaningful to the engine instance that issued them
//! and only until the engine is stopped or flushed.

use crate::av::{MediaFormat, RenderTarget};
use crate::error::Result;
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::Duration;

/// Input slot issued by [`CodecEngine::dequeue_input`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputIndex(pub usize);

/// Output slot issued by [`CodecEngine::dequeue_output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputIndex(pub usize);

/// Describes the payload of a queued input or a produced output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferInfo {
    /// Start of the payload within the buffer.
    pub offset: usize,
    /// Payload length in bytes; 0 for marker-only buffers.
    pub size: usize,
    /// Presentation timestamp in microseconds.
    pub presentation_time_us: i64,
    /// Set on the last buffer of a stream.
    pub end_of_stream: bool,
}

impl BufferInfo {
    /// A regular sample of `size` bytes.
    pub fn sample(size: usize, presentation_time_us: i64) -> Self {
        Self {
            offset: 0,
            size,
            presentation_time_us,
            end_of_stream: false,
        }
    }

    /// An empty buffer carrying only the end-of-stream flag.
    pub fn end_of_stream() -> Self {
        Self {
            end_of_stream: true,
            ..Self::default()
        }
    }

    /// An empty, unflagged buffer. Hands an input slot back without data.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Result of polling a codec for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    /// A decoded buffer is ready in `index`.
    Produced {
        /// Slot holding the decoded data.
        index: OutputIndex,
        /// Payload location and timing of the slot.
        info: BufferInfo,
    },
    /// The engine replaced its output buffer set.
    BuffersChanged,
    /// The raw output format changed; see [`CodecEngine::output_format`].
    FormatChanged,
    /// Nothing became available within the timeout.
    TryAgainLater,
}

/// A hardware or software codec with asynchronous input/output queues.
pub trait CodecEngine: Send {
    /// Human readable name for logging.
    fn name(&self) -> &str;

    /// Prepares the engine for `format`. Video engines display released
    /// pictures on `target`.
    fn configure(&mut self, format: &MediaFormat, target: Option<Arc<dyn RenderTarget>>) -> Result<()>;
    /// Starts a configured engine with empty queues.
    fn start(&mut self) -> Result<()>;
    /// Stops the engine; it must be configured again before restarting.
    fn stop(&mut self) -> Result<()>;

    /// Discards every queued input and pending output.
    fn flush(&mut self) -> Result<()>;

    /// Frees the engine. No other call is valid afterwards.
    fn release(&mut self);

    /// Number of input slots.
    fn input_buffer_count(&self) -> usize;
    /// Number of output slots.
    fn output_buffer_count(&self) -> usize;

    /// Waits up to `timeout` for a free input slot.
    fn dequeue_input(&mut self, timeout: Duration) -> Result<Option<InputIndex>>;

    /// Writable storage of a dequeued input slot.
    fn input_buffer(&mut self, index: InputIndex) -> Result<&mut BytesMut>;

    /// Hands a filled input slot to the engine.
    fn queue_input(&mut self, index: InputIndex, info: BufferInfo) -> Result<()>;

    /// Waits up to `timeout` for decoded output or a notification.
    fn dequeue_output(&mut self, timeout: Duration) -> Result<OutputEvent>;

    /// Payload of a produced output slot, as described by `info`.
    fn output_data(&mut self, index: OutputIndex, info: &BufferInfo) -> Result<Bytes>;

    /// Raw output format most recently announced by `FormatChanged`.
    fn output_format(&self) -> Result<MediaFormat>;

    /// Returns an output slot to the engine, displaying it first if `render`.
    fn release_output(&mut self, index: OutputIndex, render: bool) -> Result<()>;
}

/// Creates a codec engine able to decode the given format.
pub type CodecFactory = Box<dyn Fn(&MediaFormat) -> Result<Box<dyn CodecEngine>> + Send + Sync>;
