use std::num::ParseIntError;
use thiserror::Error;

/// Errors raised by the decode engine and its collaborators.
///
/// Transient codec conditions (try-again-later, buffers or format changed,
/// source starvation) are never reported through this type.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The decoder could not be assembled from the given tracks.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A codec could not be created, configured or started.
    #[error("codec init error: {0}")]
    CodecInit(String),

    /// Every frame descriptor is currently issued to the caller.
    #[error("frame descriptor pool exhausted")]
    PoolExhausted,

    /// An audio operation was requested on a video-only decoder.
    #[error("no audio pipeline configured")]
    NoAudioPipeline,

    /// The codec engine rejected a queue operation.
    #[error("codec error: {0}")]
    Codec(String),

    /// The sample source failed.
    #[error("source error: {0}")]
    Source(String),

    /// The audio sink failed.
    #[error("audio sink error: {0}")]
    Sink(String),

    /// The decoder was used after `release()`.
    #[error("decoder already released")]
    Released,

    /// Reading or writing a configuration file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value was not a valid integer.
    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DecodeError>;
