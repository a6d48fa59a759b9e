use super::pipeline::CodecPipeline;
use super::{Decoder, TransitionState};
use crate::av::{MediaSource, ReadResult};
use crate::codec::BufferInfo;
use crate::error::{DecodeError, Result};
use std::time::Duration;

/// Outcome of one attempt to move a sample from a source into a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feed {
    /// No input slot freed up within the timeout.
    NoInputSlot,
    /// A sample was queued and the source advanced.
    Queued,
    /// The source had nothing to give; `starved` if its cache is empty.
    Empty { starved: bool },
    /// The source stopped at a track format change; an end-of-stream marker
    /// was queued so the codec drains the old format.
    FormatChange { starved: bool },
    /// The source is exhausted; an end-of-stream marker was queued.
    EndOfStream,
}

fn feed_sample(
    codec: &mut CodecPipeline,
    source: &mut dyn MediaSource,
    timeout: Duration,
    detect_format_change: bool,
) -> Result<Feed> {
    let Some(slot) = codec.dequeue_input(timeout)? else {
        return Ok(Feed::NoInputSlot);
    };

    let buf = codec.input_buffer(slot)?;
    buf.clear();
    match source.read_sample(buf)? {
        ReadResult::Sample(0) | ReadResult::Empty => {
            let starved = source.cached_duration_us() == 0;
            if detect_format_change && source.has_format_changed() {
                codec.queue_input(slot, BufferInfo::end_of_stream())?;
                Ok(Feed::FormatChange { starved })
            } else {
                // Hand the slot back; the source stays where it is.
                codec.queue_input(slot, BufferInfo::empty())?;
                Ok(Feed::Empty { starved })
            }
        }
        ReadResult::EndOfStream => {
            codec.state.input_eos = true;
            codec.queue_input(slot, BufferInfo::end_of_stream())?;
            Ok(Feed::EndOfStream)
        }
        ReadResult::Sample(size) => {
            let presentation_time_us = source.sample_time().unwrap_or(0);
            codec.queue_input(slot, BufferInfo::sample(size, presentation_time_us))?;
            source.advance();
            Ok(Feed::Queued)
        }
    }
}

impl Decoder {
    /// Moves the next sample of the video source into the video codec.
    /// Returns whether a non-empty sample was queued.
    pub(crate) fn feed_video(&mut self) -> Result<bool> {
        if self.video.state.input_eos {
            return Ok(false);
        }
        let feed = feed_sample(
            &mut self.video,
            self.source.as_mut(),
            self.config.dequeue_timeout,
            true,
        )?;
        Ok(self.note_feed("video", feed))
    }

    /// Moves the next audio sample into the audio codec, reading from the
    /// audio source or, when interleaved, the video source.
    pub(crate) fn feed_audio(&mut self) -> Result<bool> {
        let timeout = self.config.dequeue_timeout;
        let audio = self.audio.as_mut().ok_or(DecodeError::NoAudioPipeline)?;
        if audio.codec.state.input_eos {
            return Ok(false);
        }
        let source: &mut dyn MediaSource = match audio.source.as_mut() {
            Some(separate) => separate.as_mut(),
            None => self.source.as_mut(),
        };
        let feed = feed_sample(&mut audio.codec, source, timeout, false)?;
        Ok(self.note_feed("audio", feed))
    }

    fn note_feed(&mut self, stream: &str, feed: Feed) -> bool {
        match feed {
            Feed::Queued => {
                self.buffering = false;
                return true;
            }
            Feed::NoInputSlot => {}
            Feed::Empty { starved } => self.note_starved(stream, starved),
            Feed::FormatChange { starved } => {
                self.note_starved(stream, starved);
                log::debug!("{} track format changed, draining current representation", stream);
                self.transition = TransitionState::AwaitingBoundary;
            }
            Feed::EndOfStream => log::debug!("EOS {} input", stream),
        }
        false
    }

    fn note_starved(&mut self, stream: &str, starved: bool) {
        if starved {
            if !self.buffering {
                log::debug!("{} source cache empty, buffering", stream);
            }
            self.buffering = true;
        }
    }

    /// Feeds one round of samples: audio samples interleaved ahead of the next
    /// video sample are decoded (or skipped when `video_only`), samples of
    /// other tracks are skipped, then one video sample is queued. Stops early
    /// when an interleaved audio sample cannot be queued.
    pub(crate) fn queue_media_sample(&mut self, video_only: bool) -> Result<bool> {
        let shared_audio_track = self
            .audio
            .as_ref()
            .filter(|audio| audio.source.is_none())
            .map(|audio| audio.track);

        let mut queued = false;
        while !self.video.state.input_eos {
            match self.source.sample_track() {
                Some(track) if track == self.video_track => break,
                Some(track) if !video_only && Some(track) == shared_audio_track => {
                    let fed = self.feed_audio()?;
                    self.drain_audio()?;
                    if !fed {
                        // The audio sample is still current; retry on the next poll.
                        return Ok(queued);
                    }
                    queued = true;
                }
                Some(track) => {
                    log::trace!("skipping sample of track {}", track);
                    self.source.advance();
                }
                None => break,
            }
        }

        if !self.video.state.input_eos {
            queued = self.feed_video()?;
        }
        Ok(queued)
    }
}
