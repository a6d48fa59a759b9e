use crate::av::{MediaFormat, MediaSource, ReadResult};
use crate::error::{DecodeError, Result};
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Entry {
    Sample {
        track: usize,
        time_us: i64,
        sync: bool,
        data: Bytes,
    },
    /// Reads come back empty until `track_format` picks up `format`.
    FormatChange { track: usize, format: MediaFormat },
    /// One empty read with an empty cache.
    Stall { track: usize },
}

impl Entry {
    fn track(&self) -> usize {
        match self {
            Entry::Sample { track, .. } | Entry::FormatChange { track, .. } | Entry::Stall { track } => *track,
        }
    }
}

#[derive(Debug)]
struct SourceState {
    formats: Vec<MediaFormat>,
    entries: Vec<Entry>,
    position: usize,
    cached_duration_us: i64,
    stalled: bool,
    advances: usize,
    seeks: Vec<i64>,
}

impl SourceState {
    fn current(&self) -> Option<&Entry> {
        self.entries.get(self.position)
    }

    fn sync_points(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, entry)| match entry {
            Entry::Sample { time_us, sync: true, .. } => Some((i, *time_us)),
            _ => None,
        })
    }
}

/// In-memory demuxer over a scripted list of samples.
///
/// Samples are read in push order. Clones share the same state.
#[derive(Debug, Clone)]
pub struct MockSource {
    state: Arc<Mutex<SourceState>>,
}

impl MockSource {
    /// Creates a source with one track per format and no samples.
    pub fn new(formats: Vec<MediaFormat>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SourceState {
                formats,
                entries: Vec::new(),
                position: 0,
                cached_duration_us: 1_000_000,
                stalled: false,
                advances: 0,
                seeks: Vec::new(),
            })),
        }
    }

    /// Adds a track and returns its index.
    pub fn add_track(&self, format: MediaFormat) -> usize {
        let mut state = self.state.lock();
        state.formats.push(format);
        state.formats.len() - 1
    }

    /// Appends a sample whose payload is its timestamp.
    pub fn push_sample(&self, track: usize, time_us: i64, sync: bool) {
        self.push_sample_data(track, time_us, sync, time_us.to_be_bytes().to_vec());
    }

    /// Appends a sample with an explicit payload.
    pub fn push_sample_data(&self, track: usize, time_us: i64, sync: bool, data: impl Into<Bytes>) {
        self.state.lock().entries.push(Entry::Sample {
            track,
            time_us,
            sync,
            data: data.into(),
        });
    }

    /// Appends a switch of `track` to `format` (a representation change).
    pub fn push_format_change(&self, track: usize, format: MediaFormat) {
        self.state.lock().entries.push(Entry::FormatChange { track, format });
    }

    /// Appends a point where the cache runs dry for one read.
    pub fn push_stall(&self, track: usize) {
        self.state.lock().entries.push(Entry::Stall { track });
    }

    /// Inspection handle sharing this source's state.
    pub fn probe(&self) -> SourceProbe {
        SourceProbe {
            state: self.state.clone(),
        }
    }
}

impl MediaSource for MockSource {
    fn track_count(&self) -> usize {
        self.state.lock().formats.len()
    }

    fn track_format(&mut self, track: usize) -> Result<MediaFormat> {
        let mut state = self.state.lock();
        if let Some(Entry::FormatChange { track: changed, format }) = state.current().cloned() {
            if changed == track {
                state.formats[track] = format;
                state.position += 1;
            }
        }
        state
            .formats
            .get(track)
            .cloned()
            .ok_or_else(|| DecodeError::Source(format!("no track {}", track)))
    }

    fn sample_track(&self) -> Option<usize> {
        self.state.lock().current().map(Entry::track)
    }

    fn sample_time(&self) -> Option<i64> {
        match self.state.lock().current() {
            Some(Entry::Sample { time_us, .. }) => Some(*time_us),
            _ => None,
        }
    }

    fn read_sample(&mut self, buf: &mut BytesMut) -> Result<ReadResult> {
        let mut state = self.state.lock();
        state.stalled = false;
        match state.current() {
            Some(Entry::Sample { data, .. }) => {
                buf.extend_from_slice(data);
                Ok(ReadResult::Sample(data.len()))
            }
            Some(Entry::FormatChange { .. }) => Ok(ReadResult::Empty),
            Some(Entry::Stall { .. }) => {
                state.stalled = true;
                state.position += 1;
                Ok(ReadResult::Empty)
            }
            None => Ok(ReadResult::EndOfStream),
        }
    }

    fn advance(&mut self) -> bool {
        let mut state = self.state.lock();
        state.advances += 1;
        if state.position < state.entries.len() {
            state.position += 1;
        }
        state.position < state.entries.len()
    }

    fn seek_to(&mut self, time_us: i64) -> Result<()> {
        let mut state = self.state.lock();
        state.seeks.push(time_us);
        state.stalled = false;

        let previous = state.sync_points().filter(|&(_, t)| t <= time_us).last();
        let chosen = previous.or_else(|| state.sync_points().next());
        state.position = chosen.map(|(i, _)| i).unwrap_or(0);
        Ok(())
    }

    fn cached_duration_us(&self) -> i64 {
        let state = self.state.lock();
        if state.stalled {
            0
        } else {
            state.cached_duration_us
        }
    }

    fn has_format_changed(&self) -> bool {
        matches!(self.state.lock().current(), Some(Entry::FormatChange { .. }))
    }
}

/// Read-only view on a [`MockSource`] after it was moved into a decoder.
#[derive(Debug, Clone)]
pub struct SourceProbe {
    state: Arc<Mutex<SourceState>>,
}

impl SourceProbe {
    /// Number of `advance` calls.
    pub fn advance_count(&self) -> usize {
        self.state.lock().advances
    }

    /// Number of `seek_to` calls.
    pub fn seek_count(&self) -> usize {
        self.state.lock().seeks.len()
    }

    /// Time requested by the latest `seek_to`.
    pub fn last_seek(&self) -> Option<i64> {
        self.state.lock().seeks.last().copied()
    }

    /// Timestamp of the sample at the read position.
    pub fn position_time(&self) -> Option<i64> {
        match self.state.lock().current() {
            Some(Entry::Sample { time_us, .. }) => Some(*time_us),
            _ => None,
        }
    }
}
