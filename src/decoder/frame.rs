use crate::codec::OutputIndex;
use crate::error::{DecodeError, Result};

/// Reference to a decoded picture still owned by the video codec.
///
/// `session` ties the slot to one configured run of the codec; a handle from
/// an earlier run must not reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OutputHandle {
    pub(crate) index: OutputIndex,
    pub(crate) session: u64,
}

/// Metadata of one decoded video picture, lent to the caller between
/// `Decoder::decode_frame` and `Decoder::release_frame`.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameDescriptor {
    id: usize,
    generation: u64,
    handle: Option<OutputHandle>,
    presentation_time_us: i64,
    end_of_stream: bool,
    representation_changed: bool,
    width: Option<u32>,
    height: Option<u32>,
}

impl FrameDescriptor {
    fn new(id: usize, generation: u64) -> Self {
        Self {
            id,
            generation,
            handle: None,
            presentation_time_us: -1,
            end_of_stream: false,
            representation_changed: false,
            width: None,
            height: None,
        }
    }

    /// Pool slot this descriptor occupies. Stable across reuse.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Presentation timestamp in microseconds.
    pub fn presentation_time_us(&self) -> i64 {
        self.presentation_time_us
    }

    /// Set on the last frame of the stream.
    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// Set on the first frame decoded after a representation switch.
    pub fn representation_changed(&self) -> bool {
        self.representation_changed
    }

    /// New display width; only present when `representation_changed`.
    pub fn width(&self) -> Option<u32> {
        self.width
    }

    /// New display height; only present when `representation_changed`.
    pub fn height(&self) -> Option<u32> {
        self.height
    }

    #[cfg(test)]
    pub(crate) fn is_free(&self) -> bool {
        self.handle.is_none()
    }

    pub(crate) fn fill(&mut self, handle: OutputHandle, presentation_time_us: i64, end_of_stream: bool) {
        self.handle = Some(handle);
        self.presentation_time_us = presentation_time_us;
        self.end_of_stream = end_of_stream;
    }

    pub(crate) fn mark_representation_changed(&mut self, width: u32, height: u32) {
        self.representation_changed = true;
        self.width = Some(width);
        self.height = Some(height);
    }

    pub(crate) fn take_handle(&mut self) -> Option<OutputHandle> {
        self.handle.take()
    }

    fn clear(&mut self) {
        *self = Self::new(self.id, self.generation);
    }
}

/// Fixed set of reusable frame descriptors, one per codec output slot.
///
/// Only descriptors of the current generation count as issued. A codec
/// session change retires every outstanding descriptor, since the codec has
/// taken their slots back.
#[derive(Debug)]
pub(crate) struct FramePool {
    free: Vec<FrameDescriptor>,
    capacity: usize,
    issued: usize,
    next_id: usize,
    generation: u64,
}

impl FramePool {
    pub(crate) fn new(capacity: usize) -> Self {
        let mut pool = Self {
            free: Vec::with_capacity(capacity),
            capacity: 0,
            issued: 0,
            next_id: 0,
            generation: 0,
        };
        pool.resize(capacity);
        pool
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn available(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn acquire(&mut self) -> Result<FrameDescriptor> {
        let frame = self.free.pop().ok_or(DecodeError::PoolExhausted)?;
        self.issued += 1;
        Ok(frame)
    }

    pub(crate) fn release(&mut self, mut frame: FrameDescriptor) {
        if frame.generation != self.generation {
            // Already replaced by `retire_issued`.
            return;
        }
        frame.clear();
        self.issued = self.issued.saturating_sub(1);
        // After shrinking, returning descriptors beyond the capacity are dropped.
        if self.free.len() + self.issued < self.capacity {
            self.free.push(frame);
        }
    }

    /// Forgets every issued descriptor and mints replacements, so the free
    /// count matches the codec's output slots again.
    pub(crate) fn retire_issued(&mut self) {
        if self.issued == 0 {
            return;
        }
        self.generation += 1;
        let generation = self.generation;
        self.free.iter_mut().for_each(|frame| frame.generation = generation);
        self.issued = 0;
        self.resize(self.capacity);
    }

    /// Adjusts the pool to a new output slot count. Issued descriptors stay
    /// valid and are accounted against the new capacity.
    pub(crate) fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.free.len() + self.issued < capacity {
            self.free.push(FrameDescriptor::new(self.next_id, self.generation));
            self.next_id += 1;
        }
        self.free.truncate(capacity.saturating_sub(self.issued));
    }
}
