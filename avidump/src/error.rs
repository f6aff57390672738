//! Error types for the dump engine.

use avidump_avi::AviError;
use avidump_codecs::CodecError;
use avidump_resample::ResampleError;
use thiserror::Error;

/// Result type for dump operations.
pub type Result<T> = std::result::Result<T, DumpError>;

/// Errors raised by the dump engine.
///
/// Errors that happen on a worker thread are stored and returned from the
/// producer's next call; every call after that returns [`DumpError::Aborted`].
#[derive(Error, Debug)]
pub enum DumpError {
    /// A buffer could not be grown.
    #[error("Allocation failed: could not reserve a buffer of {0} elements")]
    AllocationFailure(usize),

    /// Configuration or codec selection rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Frame or audio block rejected at the call site.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Codec errors other than allocation failures.
    #[error("Codec error: {0}")]
    Codec(CodecError),

    /// Container errors.
    #[error("Container error: {0}")]
    Container(#[from] AviError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resampler errors.
    #[error("Resample error: {0}")]
    Resample(#[from] ResampleError),

    /// A worker thread panicked.
    #[error("Worker thread panicked")]
    WorkerPanicked,

    /// A previous error stopped the dump.
    #[error("Dump aborted by an earlier error")]
    Aborted,

    /// The dump was already ended.
    #[error("Dump already ended")]
    Ended,
}

impl From<CodecError> for DumpError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Allocation(size) => DumpError::AllocationFailure(size),
            other => DumpError::Codec(other),
        }
    }
}

impl DumpError {
    /// Lift codec configuration errors to [`DumpError::InvalidConfiguration`].
    pub(crate) fn from_codec_setup(err: CodecError) -> Self {
        match err {
            CodecError::InvalidConfiguration(message) => DumpError::InvalidConfiguration(message),
            other => other.into(),
        }
    }
}
