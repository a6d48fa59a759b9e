use crate::error::Result;
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Bounded wait applied to every codec queue operation.
pub const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_micros(5_000);

/// Samples inspected past the first overshoot while resolving a seek target.
pub const DEFAULT_SEEK_LOOKAHEAD: usize = 20;

/// Audio kept buffered in the sink ahead of video when audio has its own source.
pub const DEFAULT_AUDIO_HIGH_WATER: Duration = Duration::from_millis(100);

const ENV_PREFIX: &str = "MEDIADECODE_";
const CONFIG_PATHS: [&str; 2] = ["./mediadecode.toml", "./mediadecode_config.toml"];

/// Tunables of the decode engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Timeout passed to `dequeue_input`/`dequeue_output`.
    pub dequeue_timeout: Duration,
    /// Lookahead window of the seek engine, in samples.
    pub seek_lookahead: usize,
    /// Audio sink high-water mark for opportunistic audio buffering.
    pub audio_high_water: Duration,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            dequeue_timeout: DEFAULT_DEQUEUE_TIMEOUT,
            seek_lookahead: DEFAULT_SEEK_LOOKAHEAD,
            audio_high_water: DEFAULT_AUDIO_HIGH_WATER,
        }
    }
}

impl DecoderConfig {
    /// Builds a configuration from defaults, then environment variables, then
    /// the first readable config file. Malformed values are logged and skipped.
    pub fn load() -> Self {
        let mut config = Self::default();

        for key in ["dequeue_timeout_us", "seek_lookahead", "audio_high_water_us"] {
            let var = format!("{}{}", ENV_PREFIX, key.to_uppercase());
            if let Ok(value) = env::var(&var) {
                if let Err(e) = config.set(key, &value) {
                    log::warn!("ignoring {}={:?}: {}", var, value, e);
                }
            }
        }

        for path in &CONFIG_PATHS {
            if let Ok(mut file) = File::open(path) {
                let mut content = String::new();
                if file.read_to_string(&mut content).is_ok() {
                    if let Err(e) = config.parse(&content) {
                        log::warn!("ignoring config file {}: {}", path, e);
                    }
                    break;
                }
            }
        }

        config
    }

    /// Applies `key = value` lines on top of the current values.
    ///
    /// Blank lines, `#` comments and unknown keys are ignored.
    pub fn parse(&mut self, content: &str) -> Result<()> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                self.set(key.trim(), value)?;
            }
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "dequeue_timeout_us" => {
                self.dequeue_timeout = Duration::from_micros(value.parse()?);
            }
            "seek_lookahead" => {
                self.seek_lookahead = value.parse()?;
            }
            "audio_high_water_us" => {
                self.audio_high_water = Duration::from_micros(value.parse()?);
            }
            other => log::debug!("unknown config key {}", other),
        }
        Ok(())
    }

    /// High-water mark in the sink's unit (microseconds).
    pub fn audio_high_water_us(&self) -> i64 {
        self.audio_high_water.as_micros() as i64
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# mediadecode configuration
# Copy this file to 'mediadecode.toml' and adjust as needed.

# Bounded wait for codec queue operations, in microseconds
dequeue_timeout_us = 5000

# Samples inspected past the seek target to tolerate B-frame reordering
seek_lookahead = 20

# Audio buffered ahead of video when audio has its own source, in microseconds
audio_high_water_us = 100000
"#;
        std::fs::write(path, template)?;
    }
    Ok(())
}
