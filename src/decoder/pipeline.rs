use super::frame::OutputHandle;
use crate::av::{MediaFormat, RenderTarget};
use crate::codec::{BufferInfo, CodecEngine, InputIndex, OutputEvent, OutputIndex};
use crate::error::{DecodeError, Result};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// End-of-stream bookkeeping of one elementary stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StreamState {
    pub(crate) input_eos: bool,
    pub(crate) output_eos: bool,
}

/// A codec engine together with the format it runs and its stream state.
pub(crate) struct CodecPipeline {
    label: &'static str,
    engine: Box<dyn CodecEngine>,
    pub(crate) format: MediaFormat,
    pub(crate) state: StreamState,
    input_slots: usize,
    output_slots: usize,
    session: u64,
    running: bool,
    released: bool,
}

impl CodecPipeline {
    pub(crate) fn new(label: &'static str, engine: Box<dyn CodecEngine>, format: MediaFormat) -> Self {
        Self {
            label,
            engine,
            format,
            state: StreamState::default(),
            input_slots: 0,
            output_slots: 0,
            session: 0,
            running: false,
            released: false,
        }
    }

    pub(crate) fn output_slots(&self) -> usize {
        self.output_slots
    }

    /// Stops the engine if it runs, configures it for `format` and starts it
    /// again. Both end-of-stream flags are reset. Any failure leaves the
    /// pipeline unusable.
    pub(crate) fn restart(&mut self, format: MediaFormat, target: Option<Arc<dyn RenderTarget>>) -> Result<()> {
        let started_at = Instant::now();
        let label = self.label;
        let init_error =
            |stage: &str, e: DecodeError| DecodeError::CodecInit(format!("{} codec {} failed: {}", label, stage, e));

        if self.running {
            self.running = false;
            self.engine.stop().map_err(|e| init_error("stop", e))?;
        }
        self.engine
            .configure(&format, target)
            .map_err(|e| init_error("configure", e))?;
        self.engine.start().map_err(|e| init_error("start", e))?;

        self.running = true;
        self.session += 1;
        self.format = format;
        self.state = StreamState::default();
        self.refresh_buffers();

        log::debug!(
            "{} codec {} started with {} in {:?} ({} inputs, {} outputs)",
            self.label,
            self.engine.name(),
            self.format.mime,
            started_at.elapsed(),
            self.input_slots,
            self.output_slots
        );
        Ok(())
    }

    /// Re-reads the engine's buffer set after `BuffersChanged` or a restart.
    pub(crate) fn refresh_buffers(&mut self) {
        self.input_slots = self.engine.input_buffer_count();
        self.output_slots = self.engine.output_buffer_count();
    }

    /// Drops all in-flight buffers. Handles issued before the flush go stale.
    pub(crate) fn flush(&mut self) -> Result<()> {
        self.engine.flush()?;
        self.session += 1;
        self.state = StreamState::default();
        Ok(())
    }

    pub(crate) fn dequeue_input(&mut self, timeout: Duration) -> Result<Option<InputIndex>> {
        self.engine.dequeue_input(timeout)
    }

    pub(crate) fn input_buffer(&mut self, index: InputIndex) -> Result<&mut BytesMut> {
        self.engine.input_buffer(index)
    }

    pub(crate) fn queue_input(&mut self, index: InputIndex, info: BufferInfo) -> Result<()> {
        self.engine.queue_input(index, info)
    }

    pub(crate) fn dequeue_output(&mut self, timeout: Duration) -> Result<OutputEvent> {
        self.engine.dequeue_output(timeout)
    }

    pub(crate) fn output_data(&mut self, index: OutputIndex, info: &BufferInfo) -> Result<Bytes> {
        self.engine.output_data(index, info)
    }

    pub(crate) fn output_format(&self) -> Result<MediaFormat> {
        self.engine.output_format()
    }

    pub(crate) fn release_output(&mut self, index: OutputIndex, render: bool) -> Result<()> {
        self.engine.release_output(index, render)
    }

    pub(crate) fn handle(&self, index: OutputIndex) -> OutputHandle {
        OutputHandle {
            index,
            session: self.session,
        }
    }

    /// Releases a frame's slot if it belongs to the current session.
    /// Returns false for a stale handle, which is left alone.
    pub(crate) fn release_handle(&mut self, handle: OutputHandle, render: bool) -> Result<bool> {
        if handle.session != self.session || !self.running {
            return Ok(false);
        }
        self.engine.release_output(handle.index, render)?;
        Ok(true)
    }

    /// Stops and frees the engine. Safe to call more than once.
    pub(crate) fn shutdown(&mut self) {
        if self.released {
            return;
        }
        if self.running {
            self.running = false;
            if let Err(e) = self.engine.stop() {
                log::warn!("{} codec stop failed during release: {}", self.label, e);
            }
        }
        self.engine.release();
        self.released = true;
    }
}
