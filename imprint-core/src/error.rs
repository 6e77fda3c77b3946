use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImprintError {
    #[error("Invalid dimensions: {width}x{height} (width and height must be non-zero)")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Pixel buffer size mismatch: expected {expected} bytes for RGBA, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Payload too large: {bits} bits exceeds segment capacity of {capacity} bits")]
    PayloadTooLarge { bits: usize, capacity: usize },

    #[error("Payload too long: {chars} characters exceeds the extraction window of {window}")]
    PayloadTooLong { chars: usize, window: usize },

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ImprintError>;
