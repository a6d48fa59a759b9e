#[cfg(test)]
mod tests {
    use mediadecode::av::MediaFormat;
    use mediadecode::codec::OutputEvent;
    use mediadecode::testing::{codec_factory, CodecProbe, MockCodec, MockSink, MockSource, RecordingTarget, SinkProbe};
    use mediadecode::{DecodeError, Decoder, FrameDescriptor, TransitionState};
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;
    use std::sync::Arc;

    const VIDEO: usize = 0;
    const AUDIO: usize = 1;

    fn video_format() -> MediaFormat {
        MediaFormat::video("video/avc", 640, 360)
    }

    fn audio_format() -> MediaFormat {
        MediaFormat::audio("audio/mp4a-latm", 44_100, 2)
    }

    /// Video every 40ms with two audio samples after each video sample.
    fn interleaved_source(video_frames: i64) -> MockSource {
        let source = MockSource::new(vec![video_format(), audio_format()]);
        for i in 0..video_frames {
            source.push_sample(VIDEO, i * 40_000, i == 0);
            source.push_sample(AUDIO, i * 40_000, false);
            source.push_sample(AUDIO, i * 40_000 + 20_000, false);
        }
        source
    }

    struct Fixture {
        decoder: Decoder,
        video: CodecProbe,
        audio: CodecProbe,
        sink: SinkProbe,
    }

    fn interleaved(video_frames: i64) -> Fixture {
        let video_codec = MockCodec::new(4, 4);
        let audio_codec = MockCodec::new(4, 4);
        let sink = MockSink::new();
        let fixture_probes = (video_codec.probe(), audio_codec.probe(), sink.probe());
        let decoder = Decoder::builder(codec_factory(vec![video_codec, audio_codec]))
            .with_video(Box::new(interleaved_source(video_frames)), VIDEO)
            .with_audio(AUDIO, Box::new(sink))
            .build()
            .unwrap();
        Fixture {
            decoder,
            video: fixture_probes.0,
            audio: fixture_probes.1,
            sink: fixture_probes.2,
        }
    }

    fn next(decoder: &mut Decoder, video_only: bool) -> FrameDescriptor {
        decoder.decode_frame(video_only).unwrap().expect("a frame")
    }

    fn decode_all(decoder: &mut Decoder, video_only: bool) -> Vec<i64> {
        let mut times = Vec::new();
        while let Some(frame) = decoder.decode_frame(video_only).unwrap() {
            if !frame.is_end_of_stream() {
                times.push(frame.presentation_time_us());
            }
            decoder.release_frame(frame, false).unwrap();
        }
        times
    }

    #[test]
    fn test_interleaved_audio_reaches_sink_in_order() {
        let mut f = interleaved(4);
        let times = decode_all(&mut f.decoder, false);

        assert_eq!(times, vec![0, 40_000, 80_000, 120_000]);
        let expected_audio: Vec<i64> = (0..8).map(|i| i * 20_000).collect();
        assert_eq!(f.sink.written_times(), expected_audio);
        assert_eq!(f.sink.written_bytes()[1], bytes::Bytes::from(20_000i64.to_be_bytes().to_vec()));
        assert_eq!(f.sink.init_formats(), vec![audio_format()]);
    }

    #[test]
    fn test_video_only_never_touches_audio() {
        let mut f = interleaved(3);
        let times = decode_all(&mut f.decoder, true);

        assert_eq!(times, vec![0, 40_000, 80_000]);
        assert!(f.audio.queued_inputs().is_empty());
        assert!(f.sink.written_times().is_empty());
        assert_eq!(f.video.queued_times(), vec![0, 40_000, 80_000]);
    }

    #[test]
    fn test_end_of_stream_is_sticky() {
        let mut f = interleaved(2);
        let mut last = None;
        while let Some(frame) = f.decoder.decode_frame(false).unwrap() {
            last = Some(frame.is_end_of_stream());
            f.decoder.release_frame(frame, false).unwrap();
        }
        assert_eq!(last, Some(true));
        for _ in 0..3 {
            assert!(f.decoder.decode_frame(false).unwrap().is_none());
            assert!(f.decoder.decode_frame(true).unwrap().is_none());
        }
    }

    #[test]
    fn test_descriptor_slots_are_reused() {
        let mut f = interleaved(6);
        let capacity = f.decoder.frame_pool_capacity();
        assert_eq!(capacity, 4);

        let first = next(&mut f.decoder, false);
        let id = first.id();
        assert_eq!(f.decoder.available_frames(), capacity - 1);
        f.decoder.release_frame(first, false).unwrap();

        for _ in 0..4 {
            let frame = next(&mut f.decoder, false);
            assert_eq!(frame.id(), id);
            f.decoder.release_frame(frame, false).unwrap();
        }
        assert_eq!(f.decoder.frame_pool_capacity(), capacity);
        assert_eq!(f.decoder.available_frames(), capacity);
    }

    #[test]
    fn test_frames_are_released_out_of_order() {
        let video_codec = MockCodec::new(8, 2);
        let source = MockSource::new(vec![video_format()]);
        for i in 0..5 {
            source.push_sample(VIDEO, i * 40_000, i == 0);
        }
        let mut decoder = Decoder::builder(codec_factory(vec![video_codec]))
            .with_video(Box::new(source), VIDEO)
            .build()
            .unwrap();

        let a = next(&mut decoder, false);
        let b = next(&mut decoder, false);
        assert_ne!(a.id(), b.id());
        // Both output slots are lent out; releasing one lets the codec continue.
        decoder.release_frame(a, false).unwrap();
        let c = next(&mut decoder, false);
        assert_eq!(c.presentation_time_us(), 80_000);
        decoder.release_frame(b, false).unwrap();
        decoder.release_frame(c, false).unwrap();
    }

    #[test]
    fn test_release_frame_renders_to_target() {
        let target = Arc::new(RecordingTarget::new());
        let source = MockSource::new(vec![video_format()]);
        source.push_sample(VIDEO, 0, true);
        source.push_sample(VIDEO, 40_000, false);
        let codec = MockCodec::new(2, 2);
        let probe = codec.probe();
        let mut decoder = Decoder::builder(codec_factory(vec![codec]))
            .with_video(Box::new(source), VIDEO)
            .with_render_target(target.clone())
            .build()
            .unwrap();

        let shown = next(&mut decoder, false);
        decoder.release_frame(shown, true).unwrap();
        let dropped = next(&mut decoder, false);
        decoder.release_frame(dropped, false).unwrap();

        assert_eq!(target.shown_times(), vec![0]);
        assert_eq!(probe.rendered_times(), vec![0]);
        assert_eq!(probe.released_output_count(), 2);
    }

    fn switching_source() -> MockSource {
        let source = MockSource::new(vec![video_format()]);
        source.push_sample(VIDEO, 0, true);
        source.push_sample(VIDEO, 40_000, false);
        source.push_format_change(VIDEO, MediaFormat::video("video/avc", 1280, 720));
        source.push_sample(VIDEO, 80_000, true);
        source.push_sample(VIDEO, 120_000, false);
        source
    }

    #[test]
    fn test_representation_change_is_reported_once() {
        let codec = MockCodec::new(4, 4);
        let probe = codec.probe();
        let mut decoder = Decoder::builder(codec_factory(vec![codec]))
            .with_video(Box::new(switching_source()), VIDEO)
            .build()
            .unwrap();

        for expected in [0, 40_000] {
            let frame = next(&mut decoder, false);
            assert_eq!(frame.presentation_time_us(), expected);
            assert!(!frame.representation_changed());
            assert_eq!(frame.width(), None);
            decoder.release_frame(frame, false).unwrap();
        }

        let switched = next(&mut decoder, false);
        assert_eq!(switched.presentation_time_us(), 80_000);
        assert!(switched.representation_changed());
        assert_eq!(switched.width(), Some(1280));
        assert_eq!(switched.height(), Some(720));
        assert_eq!(decoder.transition_state(), TransitionState::Stable);
        decoder.release_frame(switched, false).unwrap();

        let after = next(&mut decoder, false);
        assert_eq!(after.presentation_time_us(), 120_000);
        assert!(!after.representation_changed());
        decoder.release_frame(after, false).unwrap();

        assert_eq!((decoder.video_width(), decoder.video_height()), (1280, 720));
        assert_eq!(probe.start_count(), 2);
        assert_eq!(probe.stop_count(), 1);
        assert_eq!(probe.configured_formats().len(), 2);
        // Only the boundary marker, the stream itself has not ended.
        assert_eq!(probe.queued_inputs().iter().filter(|i| i.end_of_stream).count(), 1);
    }

    #[test]
    fn test_representation_change_resizes_pool() {
        let codec = MockCodec::new(4, 4);
        let probe = codec.probe();
        let mut decoder = Decoder::builder(codec_factory(vec![codec]))
            .with_video(Box::new(switching_source()), VIDEO)
            .build()
            .unwrap();
        assert_eq!(decoder.frame_pool_capacity(), 4);
        probe.set_output_slots_on_restart(6);

        let times = decode_all(&mut decoder, false);
        assert_eq!(times, vec![0, 40_000, 80_000, 120_000]);
        assert_eq!(decoder.frame_pool_capacity(), 6);
        assert_eq!(decoder.available_frames(), 6);
    }

    #[test]
    fn test_failed_reconfiguration_is_fatal() {
        let codec = MockCodec::new(4, 4);
        let probe = codec.probe();
        let mut decoder = Decoder::builder(codec_factory(vec![codec]))
            .with_video(Box::new(switching_source()), VIDEO)
            .build()
            .unwrap();

        probe.fail_next_configure();
        for _ in 0..2 {
            let frame = next(&mut decoder, false);
            decoder.release_frame(frame, false).unwrap();
        }
        let err = decoder.decode_frame(false).unwrap_err();
        assert!(matches!(err, DecodeError::CodecInit(_)));
    }

    #[test]
    fn test_representation_change_reinitializes_audio() {
        let source = switching_source();
        let audio = source.add_track(audio_format());
        let sink = MockSink::new();
        let sink_probe = sink.probe();
        let mut decoder = Decoder::builder(codec_factory(vec![MockCodec::new(4, 4), MockCodec::new(4, 4)]))
            .with_video(Box::new(source), VIDEO)
            .with_audio(audio, Box::new(sink))
            .build()
            .unwrap();

        decode_all(&mut decoder, false);
        assert_eq!(sink_probe.init_formats(), vec![audio_format(), audio_format()]);
    }

    #[test]
    fn test_codec_notifications_are_absorbed() {
        let mut f = interleaved(3);
        let stereo_48k = MediaFormat::audio("audio/raw", 48_000, 2);
        f.video.inject(OutputEvent::BuffersChanged);
        f.video.inject(OutputEvent::FormatChanged);
        f.video.inject(OutputEvent::TryAgainLater);
        f.audio.set_output_format(stereo_48k.clone());
        f.audio.inject(OutputEvent::FormatChanged);

        let times = decode_all(&mut f.decoder, false);
        assert_eq!(times, vec![0, 40_000, 80_000]);
        assert_eq!(f.sink.init_formats(), vec![audio_format(), stereo_48k]);
        // Audio writes resume after the sink was re-initialized.
        assert!(!f.sink.written_times().is_empty());
    }

    #[test]
    fn test_separate_audio_source_is_kept_ahead() {
        let video = MockSource::new(vec![video_format()]);
        for i in 0..4 {
            video.push_sample(0, i * 40_000, i == 0);
        }
        let audio = MockSource::new(vec![audio_format()]);
        for i in 0..50 {
            audio.push_sample(0, i * 20_000, true);
        }
        let sink = MockSink::with_frame_duration_us(20_000);
        let sink_probe = sink.probe();

        let mut decoder = Decoder::builder(codec_factory(vec![MockCodec::new(4, 4), MockCodec::new(4, 4)]))
            .with_video(Box::new(video), 0)
            .with_audio(0, Box::new(sink))
            .with_audio_source(Box::new(audio))
            .build()
            .unwrap();

        let frame = next(&mut decoder, false);
        decoder.release_frame(frame, false).unwrap();
        assert_eq!(sink_probe.written_times(), vec![0, 20_000, 40_000, 60_000, 80_000]);

        let frame = next(&mut decoder, false);
        decoder.release_frame(frame, false).unwrap();
        assert_eq!(sink_probe.written_times().len(), 5);

        sink_probe.play(40_000);
        let frame = next(&mut decoder, false);
        decoder.release_frame(frame, false).unwrap();
        assert_eq!(sink_probe.written_times().len(), 7);

        // Video-only decoding leaves the separate audio source alone.
        sink_probe.play(140_000);
        let frame = next(&mut decoder, true);
        decoder.release_frame(frame, false).unwrap();
        assert_eq!(sink_probe.written_times().len(), 7);
    }

    #[test]
    fn test_frame_from_before_seek_is_not_released_to_codec() {
        let mut f = interleaved(6);
        let stale = next(&mut f.decoder, false);
        let released_before = f.video.released_output_count();

        f.decoder.fast_seek(120_000).unwrap();
        f.decoder.release_frame(stale, true).unwrap();

        assert_eq!(f.video.released_output_count(), released_before);
        assert!(f.video.rendered_times().is_empty());
        assert_eq!(f.decoder.available_frames(), f.decoder.frame_pool_capacity());
    }

    #[test]
    fn test_frame_held_across_seek_does_not_starve_decoding() {
        let source = MockSource::new(vec![video_format()]);
        source.push_sample(VIDEO, 0, true);
        source.push_sample(VIDEO, 40_000, false);
        let codec = MockCodec::new(8, 2);
        let probe = codec.probe();
        let mut decoder = Decoder::builder(codec_factory(vec![codec]))
            .with_video(Box::new(source), VIDEO)
            .build()
            .unwrap();

        let held = next(&mut decoder, false);
        assert_eq!(decoder.fast_seek(0).unwrap(), 0);
        assert_eq!(decoder.available_frames(), 2);

        let first = next(&mut decoder, false);
        let second = next(&mut decoder, false);
        assert_eq!((first.presentation_time_us(), second.presentation_time_us()), (0, 40_000));

        decoder.release_frame(held, false).unwrap();
        decoder.release_frame(first, false).unwrap();
        decoder.release_frame(second, false).unwrap();
        assert_eq!(decoder.available_frames(), 2);

        let last = next(&mut decoder, false);
        assert!(last.is_end_of_stream());
        decoder.release_frame(last, false).unwrap();
        assert!(decoder.decode_frame(false).unwrap().is_none());
        // The stale frame never reached the codec; the other three did.
        assert_eq!(probe.released_output_count(), 3);
        assert_eq!(decoder.available_frames(), decoder.frame_pool_capacity());
    }

    #[test]
    fn test_frame_held_across_representation_change() {
        let codec = MockCodec::new(8, 2);
        let mut decoder = Decoder::builder(codec_factory(vec![codec]))
            .with_video(Box::new(switching_source()), VIDEO)
            .build()
            .unwrap();

        let held = next(&mut decoder, false);
        let frame = next(&mut decoder, false);
        decoder.release_frame(frame, false).unwrap();

        let switched = next(&mut decoder, false);
        assert!(switched.representation_changed());
        let after = next(&mut decoder, false);
        assert_eq!(after.presentation_time_us(), 120_000);

        for frame in [held, switched, after] {
            decoder.release_frame(frame, false).unwrap();
        }
        assert_eq!(decoder.available_frames(), decoder.frame_pool_capacity());
    }

    #[test]
    fn test_release_rejects_later_calls() {
        let mut f = interleaved(2);
        let frame = next(&mut f.decoder, false);
        f.decoder.release();
        f.decoder.release();

        assert!(matches!(f.decoder.release_frame(frame, false), Err(DecodeError::Released)));
        assert!(matches!(f.decoder.decode_frame(false), Err(DecodeError::Released)));
        assert_eq!(f.video.release_count(), 1);
        assert_eq!(f.audio.release_count(), 1);
    }

    #[quickcheck]
    fn prop_frames_arrive_in_order_and_descriptors_return(frames: u8, audio_pattern: Vec<u8>, video_only: bool) -> bool {
        let frames = frames as i64 % 40 + 1;
        let source = MockSource::new(vec![video_format(), audio_format()]);
        let mut expected_audio = Vec::new();
        for i in 0..frames {
            source.push_sample(VIDEO, i * 33_333, i == 0);
            let audio_samples = audio_pattern.get(i as usize).map_or(0, |n| n % 3) as i64;
            for k in 0..audio_samples {
                let t = i * 33_333 + k * 10_000;
                source.push_sample(AUDIO, t, false);
                expected_audio.push(t);
            }
        }
        let sink = MockSink::new();
        let sink_probe = sink.probe();
        let mut decoder = Decoder::builder(codec_factory(vec![MockCodec::new(4, 4), MockCodec::new(4, 4)]))
            .with_video(Box::new(source), VIDEO)
            .with_audio(AUDIO, Box::new(sink))
            .build()
            .unwrap();

        let mut times = Vec::new();
        for _ in 0..frames + 2 {
            match decoder.decode_frame(video_only) {
                Ok(Some(frame)) => {
                    if !frame.is_end_of_stream() {
                        times.push(frame.presentation_time_us());
                    }
                    if decoder.release_frame(frame, false).is_err() {
                        return false;
                    }
                }
                Ok(None) => break,
                Err(_) => return false,
            }
        }

        let expected_video: Vec<i64> = (0..frames).map(|i| i * 33_333).collect();
        if video_only {
            expected_audio.clear();
        }
        times == expected_video
            && sink_probe.written_times() == expected_audio
            && decoder.available_frames() == decoder.frame_pool_capacity()
            && matches!(decoder.decode_frame(video_only), Ok(None))
    }
}
