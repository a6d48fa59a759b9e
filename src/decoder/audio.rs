use super::Decoder;
use crate::codec::OutputEvent;
use crate::error::{DecodeError, Result};

impl Decoder {
    /// Polls the audio codec once and forwards decoded PCM to the sink.
    pub(crate) fn drain_audio(&mut self) -> Result<()> {
        let timeout = self.config.dequeue_timeout;
        let audio = self.audio.as_mut().ok_or(DecodeError::NoAudioPipeline)?;
        if audio.codec.state.output_eos {
            return Ok(());
        }

        match audio.codec.dequeue_output(timeout)? {
            OutputEvent::Produced { index, info } => {
                if info.size > 0 {
                    let data = audio.codec.output_data(index, &info)?;
                    audio.sink.write(data, info.presentation_time_us)?;
                }
                audio.codec.release_output(index, false)?;

                if info.end_of_stream {
                    audio.codec.state.output_eos = true;
                    log::debug!("EOS audio output");
                }
            }
            OutputEvent::BuffersChanged => {
                log::debug!("audio output buffers have changed");
                audio.codec.refresh_buffers();
            }
            OutputEvent::FormatChanged => {
                let format = audio.codec.output_format()?;
                log::debug!("audio output format has changed to {:?}", format);
                audio.sink.init(&format)?;
            }
            OutputEvent::TryAgainLater => {
                log::trace!("audio dequeue_output timed out");
            }
        }
        Ok(())
    }

    /// Keeps the sink of a separately sourced audio track filled up to the
    /// high-water mark, stopping early when no audio sample can be queued.
    pub(crate) fn buffer_audio_ahead(&mut self) -> Result<()> {
        let high_water = self.config.audio_high_water_us();
        loop {
            let buffered = self
                .audio
                .as_ref()
                .map(|audio| audio.sink.buffered_duration_us())
                .ok_or(DecodeError::NoAudioPipeline)?;
            if buffered >= high_water {
                break;
            }
            let fed = self.feed_audio()?;
            self.drain_audio()?;
            if !fed {
                break;
            }
        }
        Ok(())
    }
}
