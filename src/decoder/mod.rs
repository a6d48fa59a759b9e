//! # Synchronized Decode Engine
//!
//! [`Decoder`] drives a mandatory video codec and an optional audio codec from
//! demuxed sources. It is pull based: every call to
//! [`decode_frame`](Decoder::decode_frame) keeps both codec input queues fed,
//! keeps the audio sink ahead of playback and returns the next decoded video
//! picture as a [`FrameDescriptor`].
//!
//! Mid-stream representation switches (adaptive streaming) are handled inside
//! `decode_frame`: the codecs are reconfigured without replacing the decoder,
//! and the first frame of the new representation reports its dimensions.
//!
//! Seeking is frame accurate: [`fast_seek`](Decoder::fast_seek) lands on the
//! closest sample not past the requested time and primes the video codec.
//!
//! All waits are bounded by [`DecoderConfig::dequeue_timeout`]. No threads are
//! spawned; a decoder must not be shared between threads without external
//! synchronization.

use crate::av::{AudioSink, MediaFormat, MediaSource, RenderTarget};
use crate::codec::{BufferInfo, CodecEngine, CodecFactory, OutputEvent, OutputIndex};
use crate::config::DecoderConfig;
use crate::error::{DecodeError, Result};
use std::sync::Arc;

mod audio;
mod feeder;
mod frame;
mod pipeline;
mod reconfigure;
mod seek;

pub use frame::FrameDescriptor;
use frame::FramePool;
use pipeline::CodecPipeline;

/// Progress of a representation switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionState {
    /// No switch in progress.
    #[default]
    Stable,
    /// The source announced a new format; the video codec is draining the old
    /// one and input feeding is paused until its end-of-stream marker.
    AwaitingBoundary,
    /// The codecs run the new format; the next returned frame reports it.
    JustReconfigured,
}

struct AudioPipeline {
    track: usize,
    /// `None` when audio samples are interleaved in the video source.
    source: Option<Box<dyn MediaSource>>,
    codec: CodecPipeline,
    sink: Box<dyn AudioSink>,
}

/// Audio/video decode engine. See the [module documentation](self).
pub struct Decoder {
    config: DecoderConfig,
    source: Box<dyn MediaSource>,
    video_track: usize,
    target: Option<Arc<dyn RenderTarget>>,
    video: CodecPipeline,
    audio: Option<AudioPipeline>,
    pool: FramePool,
    /// Decoded picture that could not get a descriptor yet.
    pending_output: Option<(OutputIndex, BufferInfo)>,
    transition: TransitionState,
    buffering: bool,
    released: bool,
}

/// Assembles a [`Decoder`] from its sources, sinks and codec factory.
pub struct DecoderBuilder {
    factory: CodecFactory,
    config: DecoderConfig,
    video_source: Option<Box<dyn MediaSource>>,
    video_track: usize,
    target: Option<Arc<dyn RenderTarget>>,
    audio_track: Option<usize>,
    audio_source: Option<Box<dyn MediaSource>>,
    audio_sink: Option<Box<dyn AudioSink>>,
}

impl DecoderBuilder {
    /// Decodes `track` of `source` as video.
    pub fn with_video(mut self, source: Box<dyn MediaSource>, track: usize) -> Self {
        self.video_source = Some(source);
        self.video_track = track;
        self
    }

    /// Display target the video codec renders released frames to.
    pub fn with_render_target(mut self, target: Arc<dyn RenderTarget>) -> Self {
        self.target = Some(target);
        self
    }

    /// Decodes `track` as audio into `sink`. Without
    /// [`with_audio_source`](Self::with_audio_source) the track is read from
    /// the video source.
    pub fn with_audio(mut self, track: usize, sink: Box<dyn AudioSink>) -> Self {
        self.audio_track = Some(track);
        self.audio_sink = Some(sink);
        self
    }

    /// Audio track to decode; requires a sink.
    pub fn with_audio_track(mut self, track: usize) -> Self {
        self.audio_track = Some(track);
        self
    }

    /// Sink receiving decoded audio.
    pub fn with_audio_sink(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.audio_sink = Some(sink);
        self
    }

    /// Reads audio from its own source instead of the video source.
    pub fn with_audio_source(mut self, source: Box<dyn MediaSource>) -> Self {
        self.audio_source = Some(source);
        self
    }

    /// Overrides the default [`DecoderConfig`].
    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Creates and starts the codecs.
    pub fn build(self) -> Result<Decoder> {
        let Some(mut source) = self.video_source else {
            let reason = if self.audio_track.is_some() {
                "audio-only playback is not supported"
            } else {
                "no video track specified"
            };
            return Err(DecodeError::Configuration(reason.into()));
        };

        let video_format = track_format(source.as_mut(), self.video_track)?;
        if !video_format.is_video() {
            return Err(DecodeError::Configuration(format!(
                "track {} is not a video track ({})",
                self.video_track, video_format.mime
            )));
        }

        let audio = match self.audio_track {
            None => None,
            Some(track) => {
                let sink = self
                    .audio_sink
                    .ok_or_else(|| DecodeError::Configuration("audio playback sink missing".into()))?;
                let mut audio_source = self.audio_source;
                let format = match audio_source.as_mut() {
                    Some(separate) => track_format(separate.as_mut(), track)?,
                    None => track_format(source.as_mut(), track)?,
                };
                if !format.is_audio() {
                    return Err(DecodeError::Configuration(format!(
                        "track {} is not an audio track ({})",
                        track, format.mime
                    )));
                }
                Some((track, audio_source, format, sink))
            }
        };

        let video = CodecPipeline::new("video", create_codec(&self.factory, &video_format)?, video_format);
        let audio = match audio {
            Some((track, source, format, sink)) => Some(AudioPipeline {
                track,
                source,
                codec: CodecPipeline::new("audio", create_codec(&self.factory, &format)?, format),
                sink,
            }),
            None => None,
        };

        let mut decoder = Decoder {
            config: self.config,
            source,
            video_track: self.video_track,
            target: self.target,
            video,
            audio,
            pool: FramePool::new(0),
            pending_output: None,
            transition: TransitionState::Stable,
            buffering: false,
            released: false,
        };
        decoder.reinitialize()?;

        log::info!(
            "decoder ready: video {} ({}x{}), audio {}, {} frame slots",
            decoder.video.format.mime,
            decoder.video_width(),
            decoder.video_height(),
            decoder.audio_format().map(|f| f.mime.as_str()).unwrap_or("none"),
            decoder.pool.capacity()
        );
        Ok(decoder)
    }
}

fn track_format(source: &mut dyn MediaSource, track: usize) -> Result<MediaFormat> {
    let count = source.track_count();
    if track >= count {
        return Err(DecodeError::Configuration(format!(
            "track {} out of range, source has {} tracks",
            track, count
        )));
    }
    source.track_format(track)
}

fn create_codec(factory: &CodecFactory, format: &MediaFormat) -> Result<Box<dyn CodecEngine>> {
    factory(format).map_err(|e| match e {
        DecodeError::CodecInit(_) => e,
        other => DecodeError::CodecInit(format!("no decoder for {}: {}", format.mime, other)),
    })
}

impl Decoder {
    /// Starts building a decoder whose codecs are created by `factory`.
    pub fn builder(factory: CodecFactory) -> DecoderBuilder {
        DecoderBuilder {
            factory,
            config: DecoderConfig::default(),
            video_source: None,
            video_track: 0,
            target: None,
            audio_track: None,
            audio_source: None,
            audio_sink: None,
        }
    }

    /// Runs the codecs until the next video frame is decoded.
    ///
    /// Returns `Ok(None)` once the video stream has ended; further calls keep
    /// returning `Ok(None)`. With `video_only`, audio samples are skipped
    /// instead of decoded.
    ///
    /// Every returned descriptor must be handed back through
    /// [`release_frame`](Self::release_frame).
    pub fn decode_frame(&mut self, video_only: bool) -> Result<Option<FrameDescriptor>> {
        self.ensure_live()?;
        let timeout = self.config.dequeue_timeout;

        while !self.video.state.output_eos {
            let event = match self.pending_output.take() {
                Some((index, info)) => OutputEvent::Produced { index, info },
                None => {
                    if !self.video.state.input_eos && self.transition != TransitionState::AwaitingBoundary {
                        self.queue_media_sample(video_only)?;
                    }
                    self.video.dequeue_output(timeout)?
                }
            };

            match event {
                OutputEvent::Produced { index, info }
                    if info.end_of_stream && self.transition == TransitionState::AwaitingBoundary =>
                {
                    // End of the current representation, not of the stream.
                    log::debug!("representation boundary reached at {}us", info.presentation_time_us);
                    self.video.release_output(index, false)?;
                    self.reinitialize()?;
                    self.transition = TransitionState::JustReconfigured;
                }
                OutputEvent::Produced { index, info } => {
                    let mut frame = match self.pool.acquire() {
                        Ok(frame) => frame,
                        Err(e) => {
                            // Kept for the next call, once the caller has returned a frame.
                            self.pending_output = Some((index, info));
                            return Err(e);
                        }
                    };
                    self.video.state.output_eos = info.end_of_stream;
                    frame.fill(self.video.handle(index), info.presentation_time_us, info.end_of_stream);
                    if self.transition == TransitionState::JustReconfigured {
                        self.transition = TransitionState::Stable;
                        frame.mark_representation_changed(self.video_width(), self.video_height());
                    }
                    log::trace!("video frame pts={}", info.presentation_time_us);

                    if !video_only && self.has_separate_audio_source() {
                        self.buffer_audio_ahead()?;
                    }

                    if info.end_of_stream {
                        log::debug!("EOS video output");
                    }
                    return Ok(Some(frame));
                }
                OutputEvent::BuffersChanged => {
                    log::debug!("video output buffers have changed");
                    self.video.refresh_buffers();
                }
                OutputEvent::FormatChanged => {
                    // Raw output format; the container format stays authoritative for display size.
                    match self.video.output_format() {
                        Ok(format) => log::debug!("video output format has changed to {:?}", format),
                        Err(e) => log::debug!("video output format has changed (unreadable: {})", e),
                    }
                }
                OutputEvent::TryAgainLater => {
                    log::trace!("video dequeue_output timed out");
                }
            }
        }

        log::trace!("EOS, no frame left");
        Ok(None)
    }

    /// Returns a frame's picture to the video codec, displaying it on the
    /// render target first if `render` is set, and recycles the descriptor.
    pub fn release_frame(&mut self, mut frame: FrameDescriptor, render: bool) -> Result<()> {
        self.ensure_live()?;
        let result = match frame.take_handle() {
            Some(handle) => match self.video.release_handle(handle, render) {
                Ok(true) => Ok(()),
                Ok(false) => {
                    log::warn!(
                        "frame {} (pts={}) outlived its codec session, not released to codec",
                        frame.id(),
                        frame.presentation_time_us()
                    );
                    Ok(())
                }
                Err(e) => Err(e),
            },
            None => Ok(()),
        };
        self.pool.release(frame);
        result
    }

    /// Display width of the current video representation, 0 if unknown.
    pub fn video_width(&self) -> u32 {
        self.video.format.display_width()
    }

    /// Height of the current video representation, 0 if unknown.
    pub fn video_height(&self) -> u32 {
        self.video.format.display_height()
    }

    /// Container format of the current video representation.
    pub fn video_format(&self) -> &MediaFormat {
        &self.video.format
    }

    /// Container format of the audio track, if any.
    pub fn audio_format(&self) -> Option<&MediaFormat> {
        self.audio.as_ref().map(|a| &a.codec.format)
    }

    /// Whether a source ran dry since the last queued sample.
    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    /// Progress of a representation switch.
    pub fn transition_state(&self) -> TransitionState {
        self.transition
    }

    /// Number of frame descriptors, equal to the video codec's output slots.
    pub fn frame_pool_capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Frame descriptors not currently lent to the caller.
    pub fn available_frames(&self) -> usize {
        self.pool.available()
    }

    /// Stops and frees both codecs. Idempotent; every other operation fails
    /// with [`DecodeError::Released`] afterwards.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.video.shutdown();
        if let Some(audio) = self.audio.as_mut() {
            audio.codec.shutdown();
        }
        self.released = true;
        log::debug!("decoder released");
    }

    fn ensure_live(&self) -> Result<()> {
        if self.released {
            return Err(DecodeError::Released);
        }
        Ok(())
    }

    fn has_separate_audio_source(&self) -> bool {
        self.audio.as_ref().is_some_and(|a| a.source.is_some())
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.release();
    }
}
