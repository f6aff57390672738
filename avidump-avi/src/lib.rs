//! AVI Container Format
//!
//! Serializer for the RIFF/AVI segments produced by the dump engine, plus a
//! small read-back inspector.
//!
//! # Features
//!
//! - RIFF chunk primitives and `idx1` entries
//! - Two-pass segment writing: a placeholder header is reserved up front and
//!   patched in place once the stream lengths are known
//! - `movi` aligned to a 2048-byte boundary through a `JUNK` chunk
//! - Read-back summaries for verification
//!
//! # Example
//!
//! ```no_run
//! use avidump_avi::{AudioFormat, AudioTrack, ContainerWriter, Packet, VideoFormat, VideoTrack};
//! use avidump_avi::{AUDIO_TRACK, TYPE_VIDEO_UNCOMPRESSED, VIDEO_TRACK};
//!
//! let file = std::fs::File::create("dump_00000.avi").unwrap();
//! let video = VideoTrack {
//!     handler: *b"DIB ",
//!     format: VideoFormat { width: 64, height: 64, ..Default::default() },
//!     fps_n: 60,
//!     fps_d: 1,
//! };
//! let audio = AudioTrack::new(AudioFormat::pcm16(48000, 2));
//!
//! let mut writer = ContainerWriter::new(file, video, audio).unwrap();
//! writer.write_packet(VIDEO_TRACK, &Packet::video(TYPE_VIDEO_UNCOMPRESSED, vec![0; 64 * 64 * 3], true)).unwrap();
//! writer.write_packet(AUDIO_TRACK, &Packet::audio(vec![0; 3200])).unwrap();
//! writer.finish().unwrap();
//! ```

mod chunks;
mod error;
mod packet;
mod summary;
mod types;
mod writer;

pub use chunks::{chunk_ids, ChunkId, ChunkType, FourCC, IndexEntry, ListChunk, RiffChunk};
pub use error::{AviError, Result};
pub use packet::{Packet, TYPE_AUDIO, TYPE_VIDEO_COMPRESSED, TYPE_VIDEO_UNCOMPRESSED};
pub use summary::{MoviChunk, SegmentSummary, StreamInfo};
pub use types::{
    codec, AudioFormat, AudioTrack, AviFlags, AviHeader, Rect, StreamHeader, StreamType,
    VideoFormat, VideoTrack,
};
pub use writer::{ContainerWriter, AUDIO_TRACK, VIDEO_TRACK};
