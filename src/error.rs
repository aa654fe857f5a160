//! Error types for the voice streaming client

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio capture errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Input device not found: {0}")]
    DeviceNotFound(String),

    #[error("Unsupported capture format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),
}

/// Codec and resampler errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoder initialization failed: {0}")]
    EncoderInit(String),

    #[error("Decoder initialization failed: {0}")]
    DecoderInit(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Unexpected decoded frame length: {0}")]
    UnexpectedFrameLength(usize),

    #[error("Resampler initialization failed: {0}")]
    ResamplerInit(String),

    #[error("Resampling failed: {0}")]
    ResampleFailed(String),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("DNS lookup for '{0}' failed: {1}")]
    DnsFailed(String, String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
