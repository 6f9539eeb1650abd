use thiserror::Error;

/// Errors raised while validating configuration or starting a capture
/// session. Nothing in this enum is produced after the first packet.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported audio format: {reason}")]
    UnsupportedAudioFormat { reason: String },

    #[error("capture backend error: {0}")]
    Backend(String),
}

/// Per-call failures surfaced by `read_packet`. A failed call aborts only
/// the packet being built; the stream stays usable unless `Closed`.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("stream closed")]
    Closed,

    #[error("sample access failed: {0}")]
    Sample(#[from] SampleAccessError),

    #[error("malformed sample payload: {0}")]
    Malformed(String),
}

/// Opaque failure reported by a capture backend while locking or copying
/// out a native buffer.
#[derive(Error, Debug, Clone)]
#[error("{reason}")]
pub struct SampleAccessError {
    reason: String,
}

impl SampleAccessError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_wraps_sample_access() {
        let err: ReadError = SampleAccessError::new("buffer lock refused").into();
        assert!(matches!(err, ReadError::Sample(_)));
        assert_eq!(err.to_string(), "sample access failed: buffer lock refused");
    }

    #[test]
    fn capture_error_messages() {
        let err = CaptureError::UnsupportedAudioFormat {
            reason: "float PCM must be 32-bit".into(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported audio format: float PCM must be 32-bit"
        );
    }
}
