use super::Decoder;
use crate::av::MediaSource;
use crate::error::Result;
use std::time::Instant;

impl Decoder {
    /// Restarts every codec against the current track formats of its source.
    ///
    /// Used once at construction and at each representation boundary. The
    /// decoder keeps its identity; the frame pool follows the video codec's
    /// output slot count. Any codec failure is fatal to the decoder.
    pub(crate) fn reinitialize(&mut self) -> Result<()> {
        let started_at = Instant::now();

        let video_format = self.source.track_format(self.video_track)?;
        self.video.restart(video_format, self.target.clone())?;

        if let Some(audio) = self.audio.as_mut() {
            let source: &mut dyn MediaSource = match audio.source.as_mut() {
                Some(separate) => separate.as_mut(),
                None => self.source.as_mut(),
            };
            let audio_format = source.track_format(audio.track)?;
            audio.codec.restart(audio_format.clone(), None)?;
            audio.sink.init(&audio_format)?;
        }

        self.pending_output = None;
        self.pool.retire_issued();
        let slots = self.video.output_slots();
        if slots != self.pool.capacity() {
            log::debug!("frame pool resized from {} to {} slots", self.pool.capacity(), slots);
            self.pool.resize(slots);
        }

        log::debug!("codecs reinitialized in {:?}", started_at.elapsed());
        Ok(())
    }
}
