//! Error types for the AVI container

use std::fmt;
use std::io;

/// Result type for AVI operations
pub type Result<T> = std::result::Result<T, AviError>;

/// Errors that can occur while writing or inspecting AVI segments
#[derive(Debug)]
pub enum AviError {
    /// IO error during read/write
    Io(io::Error),
    /// Invalid RIFF header
    InvalidRiff,
    /// Invalid AVI signature
    InvalidAvi,
    /// Invalid chunk structure
    InvalidChunk {
        id: [u8; 4],
        message: String,
    },
    /// Missing required chunk
    MissingChunk(&'static str),
    /// Packet addressed to a track the segment does not have
    InvalidTrack(usize),
    /// Insufficient data for operation
    InsufficientData {
        needed: usize,
        available: usize,
    },
    /// Segment already finalized
    Finished,
    /// A size field would overflow the 32-bit RIFF limit
    TooLarge(u64),
}

impl fmt::Display for AviError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AviError::Io(e) => write!(f, "IO error: {}", e),
            AviError::InvalidRiff => write!(f, "Invalid RIFF header"),
            AviError::InvalidAvi => write!(f, "Invalid AVI signature"),
            AviError::InvalidChunk { id, message } => {
                let id_str = String::from_utf8_lossy(id);
                write!(f, "Invalid chunk '{}': {}", id_str, message)
            }
            AviError::MissingChunk(name) => write!(f, "Missing required chunk: {}", name),
            AviError::InvalidTrack(idx) => write!(f, "Invalid track index: {}", idx),
            AviError::InsufficientData { needed, available } => {
                write!(
                    f,
                    "Insufficient data: need {} bytes, have {}",
                    needed, available
                )
            }
            AviError::Finished => write!(f, "Segment already finalized"),
            AviError::TooLarge(size) => write!(f, "Size {} exceeds the RIFF 4 GiB limit", size),
        }
    }
}

impl std::error::Error for AviError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AviError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for AviError {
    fn from(e: io::Error) -> Self {
        AviError::Io(e)
    }
}
