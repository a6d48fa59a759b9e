use crate::av::{MediaFormat, RenderTarget};
use crate::codec::{BufferInfo, CodecEngine, InputIndex, OutputEvent, OutputIndex};
use crate::error::{DecodeError, Result};
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct CodecShared {
    configured: Vec<MediaFormat>,
    starts: usize,
    stops: usize,
    flushes: usize,
    releases: usize,
    queued: Vec<BufferInfo>,
    rendered: Vec<i64>,
    released_outputs: usize,
    events: VecDeque<OutputEvent>,
    output_format: Option<MediaFormat>,
    next_output_slots: Option<usize>,
    fail_next_start: bool,
    fail_next_configure: bool,
}

/// Pass-through codec: every non-empty input comes out unchanged, in queue
/// order, once an output slot is free. End-of-stream inputs come out as empty
/// end-of-stream outputs.
pub struct MockCodec {
    shared: Arc<Mutex<CodecShared>>,
    inputs: Vec<BytesMut>,
    free_inputs: VecDeque<usize>,
    outputs: Vec<Option<(Bytes, BufferInfo)>>,
    free_outputs: VecDeque<usize>,
    decoded: VecDeque<(Bytes, BufferInfo)>,
    target: Option<Arc<dyn RenderTarget>>,
    running: bool,
}

impl MockCodec {
    /// A stopped codec with the given slot counts.
    pub fn new(input_slots: usize, output_slots: usize) -> Self {
        let mut codec = Self {
            shared: Arc::new(Mutex::new(CodecShared::default())),
            inputs: Vec::new(),
            free_inputs: VecDeque::new(),
            outputs: Vec::new(),
            free_outputs: VecDeque::new(),
            decoded: VecDeque::new(),
            target: None,
            running: false,
        };
        codec.allocate(input_slots, output_slots);
        codec
    }

    /// Inspection handle sharing this codec's state.
    pub fn probe(&self) -> CodecProbe {
        CodecProbe {
            shared: self.shared.clone(),
        }
    }

    fn allocate(&mut self, input_slots: usize, output_slots: usize) {
        self.inputs = (0..input_slots).map(|_| BytesMut::new()).collect();
        self.outputs = vec![None; output_slots];
        self.reset_queues();
    }

    fn reset_queues(&mut self) {
        self.free_inputs = (0..self.inputs.len()).collect();
        self.free_outputs = (0..self.outputs.len()).collect();
        self.outputs.iter_mut().for_each(|slot| *slot = None);
        self.decoded.clear();
    }

    fn ensure_running(&self) -> Result<()> {
        if !self.running {
            return Err(DecodeError::Codec("mock codec is not running".into()));
        }
        Ok(())
    }
}

impl CodecEngine for MockCodec {
    fn name(&self) -> &str {
        "mock"
    }

    fn configure(&mut self, format: &MediaFormat, target: Option<Arc<dyn RenderTarget>>) -> Result<()> {
        let next_slots = {
            let mut shared = self.shared.lock();
            if shared.fail_next_configure {
                shared.fail_next_configure = false;
                return Err(DecodeError::Codec(format!("cannot configure {}", format.mime)));
            }
            shared.configured.push(format.clone());
            shared.next_output_slots.take()
        };
        if let Some(slots) = next_slots {
            let inputs = self.inputs.len();
            self.allocate(inputs, slots);
        }
        self.target = target;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        let mut shared = self.shared.lock();
        if shared.fail_next_start {
            shared.fail_next_start = false;
            return Err(DecodeError::Codec("mock codec refused to start".into()));
        }
        shared.starts += 1;
        drop(shared);
        self.reset_queues();
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.shared.lock().stops += 1;
        self.running = false;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.shared.lock().flushes += 1;
        self.reset_queues();
        Ok(())
    }

    fn release(&mut self) {
        self.shared.lock().releases += 1;
        self.running = false;
    }

    fn input_buffer_count(&self) -> usize {
        self.inputs.len()
    }

    fn output_buffer_count(&self) -> usize {
        self.outputs.len()
    }

    fn dequeue_input(&mut self, _timeout: Duration) -> Result<Option<InputIndex>> {
        self.ensure_running()?;
        Ok(self.free_inputs.pop_front().map(InputIndex))
    }

    fn input_buffer(&mut self, index: InputIndex) -> Result<&mut BytesMut> {
        self.inputs
            .get_mut(index.0)
            .ok_or_else(|| DecodeError::Codec(format!("no input slot {}", index.0)))
    }

    fn queue_input(&mut self, index: InputIndex, info: BufferInfo) -> Result<()> {
        self.ensure_running()?;
        let buf = self
            .inputs
            .get(index.0)
            .ok_or_else(|| DecodeError::Codec(format!("no input slot {}", index.0)))?;
        if info.size > 0 || info.end_of_stream {
            let data = Bytes::copy_from_slice(&buf[info.offset..info.offset + info.size]);
            self.decoded.push_back((data, info));
        }
        self.free_inputs.push_back(index.0);
        self.shared.lock().queued.push(info);
        Ok(())
    }

    fn dequeue_output(&mut self, _timeout: Duration) -> Result<OutputEvent> {
        self.ensure_running()?;
        if let Some(event) = self.shared.lock().events.pop_front() {
            return Ok(event);
        }
        if self.decoded.is_empty() {
            return Ok(OutputEvent::TryAgainLater);
        }
        let Some(slot) = self.free_outputs.pop_front() else {
            return Ok(OutputEvent::TryAgainLater);
        };
        let Some((data, info)) = self.decoded.pop_front() else {
            return Ok(OutputEvent::TryAgainLater);
        };
        let info = BufferInfo {
            offset: 0,
            size: data.len(),
            ..info
        };
        self.outputs[slot] = Some((data, info));
        Ok(OutputEvent::Produced {
            index: OutputIndex(slot),
            info,
        })
    }

    fn output_data(&mut self, index: OutputIndex, info: &BufferInfo) -> Result<Bytes> {
        match self.outputs.get(index.0) {
            Some(Some((data, _))) => Ok(data.slice(info.offset..info.offset + info.size)),
            _ => Err(DecodeError::Codec(format!("output slot {} not dequeued", index.0))),
        }
    }

    fn output_format(&self) -> Result<MediaFormat> {
        let shared = self.shared.lock();
        shared
            .output_format
            .clone()
            .or_else(|| shared.configured.last().cloned())
            .ok_or_else(|| DecodeError::Codec("mock codec not configured".into()))
    }

    fn release_output(&mut self, index: OutputIndex, render: bool) -> Result<()> {
        let (_, info) = self
            .outputs
            .get_mut(index.0)
            .and_then(Option::take)
            .ok_or_else(|| DecodeError::Codec(format!("output slot {} not dequeued", index.0)))?;
        {
            let mut shared = self.shared.lock();
            shared.released_outputs += 1;
            if render {
                shared.rendered.push(info.presentation_time_us);
            }
        }
        if render {
            if let Some(target) = &self.target {
                target.display(index, info.presentation_time_us);
            }
        }
        self.free_outputs.push_back(index.0);
        Ok(())
    }
}

/// Inspection and fault injection for a [`MockCodec`] owned by a decoder.
#[derive(Debug, Clone)]
pub struct CodecProbe {
    shared: Arc<Mutex<CodecShared>>,
}

impl CodecProbe {
    /// Makes the next `start` fail.
    pub fn fail_next_start(&self) {
        self.shared.lock().fail_next_start = true;
    }

    /// Makes the next `configure` fail.
    pub fn fail_next_configure(&self) {
        self.shared.lock().fail_next_configure = true;
    }

    /// Queues a non-`Produced` event ahead of any decoded output.
    pub fn inject(&self, event: OutputEvent) {
        self.shared.lock().events.push_back(event);
    }

    /// Format reported by `output_format` from now on.
    pub fn set_output_format(&self, format: MediaFormat) {
        self.shared.lock().output_format = Some(format);
    }

    /// Makes the next `configure` reallocate this many output slots.
    pub fn set_output_slots_on_restart(&self, slots: usize) {
        self.shared.lock().next_output_slots = Some(slots);
    }

    /// Formats passed to `configure`, in order.
    pub fn configured_formats(&self) -> Vec<MediaFormat> {
        self.shared.lock().configured.clone()
    }

    /// Number of `start` calls.
    pub fn start_count(&self) -> usize {
        self.shared.lock().starts
    }

    /// Number of `stop` calls.
    pub fn stop_count(&self) -> usize {
        self.shared.lock().stops
    }

    /// Number of `flush` calls.
    pub fn flush_count(&self) -> usize {
        self.shared.lock().flushes
    }

    /// Number of `release` calls.
    pub fn release_count(&self) -> usize {
        self.shared.lock().releases
    }

    /// Every input queued so far, in order.
    pub fn queued_inputs(&self) -> Vec<BufferInfo> {
        self.shared.lock().queued.clone()
    }

    /// Timestamps of non-empty inputs queued so far.
    pub fn queued_times(&self) -> Vec<i64> {
        self.shared
            .lock()
            .queued
            .iter()
            .filter(|info| info.size > 0)
            .map(|info| info.presentation_time_us)
            .collect()
    }

    /// Output slots returned, rendered or not.
    pub fn released_output_count(&self) -> usize {
        self.shared.lock().released_outputs
    }

    /// Timestamps of outputs released with rendering requested.
    pub fn rendered_times(&self) -> Vec<i64> {
        self.shared.lock().rendered.clone()
    }
}
