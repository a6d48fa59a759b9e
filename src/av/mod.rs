use crate::codec::OutputIndex;
use crate::error::Result;
use bytes::{Bytes, BytesMut};

mod format;
pub use format::*;

/// Outcome of reading the current sample into a codec input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadResult {
    /// A sample of the given size was written.
    Sample(usize),
    /// Nothing available right now: the cache ran dry or the track format is
    /// about to change.
    Empty,
    /// No more samples will follow.
    EndOfStream,
}

/// A demuxed elementary-stream source.
///
/// One source may interleave several tracks; `sample_track` tells which track
/// the current sample belongs to.
pub trait MediaSource: Send {
    /// Number of tracks exposed by the source.
    fn track_count(&self) -> usize;

    /// Current format of a track. Reading the format acknowledges a pending
    /// format change, after which samples of the new format are delivered.
    fn track_format(&mut self, track: usize) -> Result<MediaFormat>;

    /// Track of the current sample, `None` at end of stream.
    fn sample_track(&self) -> Option<usize>;

    /// Presentation time of the current sample in microseconds.
    fn sample_time(&self) -> Option<i64>;

    /// Copies the current sample into `buf` without advancing.
    fn read_sample(&mut self, buf: &mut BytesMut) -> Result<ReadResult>;

    /// Moves to the next sample. Returns false once no sample is left.
    fn advance(&mut self) -> bool;

    /// Repositions to the last sync point at or before `time_us`, or to the
    /// first sync point when there is none.
    fn seek_to(&mut self, time_us: i64) -> Result<()>;

    /// Duration of data cached ahead of the read position.
    fn cached_duration_us(&self) -> i64;

    /// Whether a track format change is pending at the read position.
    fn has_format_changed(&self) -> bool;
}

/// Playback sink for decoded PCM.
pub trait AudioSink: Send {
    /// (Re)initializes the sink. May be called at any time.
    fn init(&mut self, format: &MediaFormat) -> Result<()>;

    /// Queues decoded audio for playback.
    fn write(&mut self, data: Bytes, presentation_time_us: i64) -> Result<()>;

    /// Audio written but not yet played.
    fn buffered_duration_us(&self) -> i64;
}

/// Display target handed to the video codec at configuration time.
///
/// The codec engine calls `display` when an output buffer is released with
/// rendering requested.
pub trait RenderTarget: Send + Sync {
    /// Shows the decoded picture held in `picture`.
    fn display(&self, picture: OutputIndex, presentation_time_us: i64);
}
