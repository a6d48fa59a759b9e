use super::{Decoder, TransitionState};
use crate::error::Result;

impl Decoder {
    /// Positions the decoder on the video sample closest to, but not after,
    /// `target_us` and returns that sample's timestamp.
    ///
    /// The source is moved to the preceding sync point and the video codec is
    /// primed with it; the resolved timestamp is found by scanning forward,
    /// looking `seek_lookahead` samples past the target to allow for
    /// reordered presentation timestamps. The caller resumes with
    /// [`decode_frame`](Self::decode_frame) to decode up to the target.
    ///
    /// If the source already sits on `target_us` nothing is flushed or moved.
    pub fn fast_seek(&mut self, target_us: i64) -> Result<i64> {
        self.ensure_live()?;
        if self.at_video_sample(target_us) {
            log::debug!("skip fast seek, already at {}us", target_us);
            return Ok(target_us);
        }

        self.flush_codecs()?;
        self.source.seek_to(target_us)?;
        if self.source.sample_time() == Some(target_us) {
            log::debug!("fast seek landed on sync sample {}us", target_us);
            self.seek_audio_source(target_us)?;
            return Ok(target_us);
        }

        // Prime the video codec with the sync frame.
        self.queue_media_sample(true)?;

        self.source.seek_to(target_us)?;
        let Some(resolved) = self.find_seek_candidate(target_us) else {
            log::warn!("no video sample found around {}us", target_us);
            return Ok(target_us);
        };

        self.source.seek_to(resolved)?;
        while !self.at_video_sample(resolved) {
            if !self.source.advance() {
                log::warn!("seek candidate {}us vanished from source", resolved);
                break;
            }
        }
        self.seek_audio_source(resolved)?;

        log::debug!("exact fast seek match: {}us (requested {}us)", resolved, target_us);
        Ok(resolved)
    }

    /// Scans forward from the current sync point for the latest video
    /// timestamp not exceeding `target_us`. Falls back to the first video
    /// sample when every sample lies past the target.
    fn find_seek_candidate(&mut self, target_us: i64) -> Option<i64> {
        let lookahead = self.config.seek_lookahead;
        let mut candidate: Option<i64> = None;
        let mut first: Option<i64> = None;
        let mut overshoot = 0;

        loop {
            if self.source.sample_track() == Some(self.video_track) {
                if let Some(time) = self.source.sample_time() {
                    first.get_or_insert(time);
                    if time <= target_us {
                        if candidate.map_or(true, |best| time > best) {
                            candidate = Some(time);
                        }
                    } else {
                        overshoot += 1;
                    }
                }
            }
            if overshoot >= lookahead || !self.source.advance() {
                break;
            }
        }

        candidate.or(first)
    }

    fn at_video_sample(&self, time_us: i64) -> bool {
        self.source.sample_track() == Some(self.video_track) && self.source.sample_time() == Some(time_us)
    }

    /// Discards everything in flight. In-flight timestamps are meaningless
    /// after a seek, and so is a half-finished representation switch.
    fn flush_codecs(&mut self) -> Result<()> {
        self.video.flush()?;
        self.pending_output = None;
        self.pool.retire_issued();
        if let Some(audio) = self.audio.as_mut() {
            audio.codec.flush()?;
        }
        if self.transition == TransitionState::AwaitingBoundary {
            self.transition = TransitionState::Stable;
        }
        Ok(())
    }

    fn seek_audio_source(&mut self, time_us: i64) -> Result<()> {
        if let Some(source) = self.audio.as_mut().and_then(|audio| audio.source.as_mut()) {
            source.seek_to(time_us)?;
        }
        Ok(())
    }
}
