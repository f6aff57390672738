//! Codec error types.

use thiserror::Error;

/// Codec errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Settings or codec selection rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The deflate engine reported an error.
    #[error("zlib error: {0}")]
    Zlib(String),

    /// `get_packet` called while no packet is pending.
    #[error("No packet available")]
    NoPacket,

    /// Input offered before the previous packets were drained.
    #[error("Codec not ready: pending packets must be drained first")]
    NotReady,

    /// Pixel buffer shorter than `stride * (height - 1) + width`.
    #[error("Frame buffer too small: need {needed} pixels, have {available}")]
    FrameTooSmall {
        /// Required pixel count.
        needed: usize,
        /// Provided pixel count.
        available: usize,
    },

    /// A buffer could not be grown.
    #[error("Failed to allocate {0} bytes")]
    Allocation(usize),
}

/// Codec result type.
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::InvalidConfiguration("block size 4".into());
        assert!(err.to_string().contains("block size 4"));

        let err = CodecError::FrameTooSmall {
            needed: 4096,
            available: 100,
        };
        assert!(err.to_string().contains("4096"));
        assert!(err.to_string().contains("100"));
    }
}
