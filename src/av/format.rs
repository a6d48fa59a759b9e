/// Container-declared parameters of one elementary stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaFormat {
    /// Mime type, e.g. `video/avc`.
    pub mime: String,
    /// Coded width in pixels.
    pub width: Option<u32>,
    /// Coded height in pixels.
    pub height: Option<u32>,
    /// Display aspect ratio; takes precedence over `width` for display.
    pub display_aspect_ratio: Option<f32>,
    /// Audio sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// Audio channel count.
    pub channel_count: Option<u32>,
}

impl MediaFormat {
    /// A format with only its mime type set.
    pub fn new(mime: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            ..Self::default()
        }
    }

    /// A video format of the given coded size.
    pub fn video(mime: impl Into<String>, width: u32, height: u32) -> Self {
        Self::new(mime).with_size(width, height)
    }

    /// An audio format.
    pub fn audio(mime: impl Into<String>, sample_rate: u32, channel_count: u32) -> Self {
        let mut format = Self::new(mime);
        format.sample_rate = Some(sample_rate);
        format.channel_count = Some(channel_count);
        format
    }

    /// Sets the coded size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets the display aspect ratio (width / height).
    pub fn with_display_aspect_ratio(mut self, ratio: f32) -> Self {
        self.display_aspect_ratio = Some(ratio);
        self
    }

    /// Whether the mime type is `video/*`.
    pub fn is_video(&self) -> bool {
        self.mime.starts_with("video/")
    }

    /// Whether the mime type is `audio/*`.
    pub fn is_audio(&self) -> bool {
        self.mime.starts_with("audio/")
    }

    /// Width to present at, derived from the height and the display aspect
    /// ratio when the container declares one.
    pub fn display_width(&self) -> u32 {
        match (self.display_aspect_ratio, self.height) {
            (Some(ratio), Some(height)) => (height as f32 * ratio).round() as u32,
            _ => self.width.unwrap_or(0),
        }
    }

    /// Height to present at, 0 if unknown.
    pub fn display_height(&self) -> u32 {
        self.height.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_size_prefers_aspect_ratio() {
        let format = MediaFormat::video("video/avc", 720, 576).with_display_aspect_ratio(16.0 / 9.0);
        assert_eq!(format.display_width(), 1024);
        assert_eq!(format.display_height(), 576);

        let plain = MediaFormat::video("video/avc", 1280, 720);
        assert_eq!(plain.display_width(), 1280);
        assert_eq!(MediaFormat::new("video/avc").display_width(), 0);
    }

    #[test]
    fn test_track_kind() {
        let video = MediaFormat::video("video/hevc", 1920, 1080);
        assert!(video.is_video());
        assert!(!video.is_audio());

        let audio = MediaFormat::audio("audio/mp4a-latm", 48_000, 2);
        assert!(audio.is_audio());
        assert!(!audio.is_video());

        let text = MediaFormat::new("text/vtt");
        assert!(!text.is_video() && !text.is_audio());
    }
}
