//! Encoded packets as they land in the `movi` list

use crate::chunks::IndexEntry;

/// Chunk typecode for uncompressed video (`db`)
pub const TYPE_VIDEO_UNCOMPRESSED: u16 = 0x6264;
/// Chunk typecode for compressed video (`dc`)
pub const TYPE_VIDEO_COMPRESSED: u16 = 0x6364;
/// Chunk typecode for audio (`wb`)
pub const TYPE_AUDIO: u16 = 0x6277;

/// One encoded unit destined for the `movi` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Two-character chunk suffix, little-endian (`0x6364` is `dc`)
    pub typecode: u16,
    /// Encoded payload
    pub payload: Vec<u8>,
    /// idx1 flags (`IndexEntry::KEYFRAME` for keyframes)
    pub index_flags: u32,
    /// Written to `movi` but left out of `idx1`
    pub hidden: bool,
}

impl Packet {
    /// Compressed or uncompressed video packet
    pub fn video(typecode: u16, payload: Vec<u8>, keyframe: bool) -> Self {
        Packet {
            typecode,
            payload,
            index_flags: if keyframe { IndexEntry::KEYFRAME } else { 0 },
            hidden: false,
        }
    }

    /// Audio packet; audio chunks are always independently decodable
    pub fn audio(payload: Vec<u8>) -> Self {
        Packet {
            typecode: TYPE_AUDIO,
            payload,
            index_flags: IndexEntry::KEYFRAME,
            hidden: false,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        self.index_flags & IndexEntry::KEYFRAME != 0
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
