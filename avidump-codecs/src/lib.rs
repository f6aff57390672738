//! # avidump codecs
//!
//! Lossless video codecs and PCM audio for AVI capture.
//!
//! ## Video Codecs
//! - `uncompressed`: bottom-up BGR24 DIB, dimensions padded to multiples of 4
//! - `cscd`: CamStudio lossless, whole-frame delta + zlib
//! - `zmbv`: Zip Motion Blocks Video, block motion compensation + zlib
//!
//! ## Audio Codecs
//! - `pcm`: signed 16-bit little-endian
//!
//! ## Trait System
//!
//! All codecs implement [`VideoCodec`] or [`AudioCodec`] and are created by
//! name through a [`CodecRegistry`].

pub mod audio;
pub mod cadence;
pub mod error;
pub mod pixels;
pub mod registry;
pub mod traits;
pub mod video;
pub mod zlib;

pub use audio::PcmCodec;
pub use cadence::KeyframeCadence;
pub use error::{CodecError, Result};
pub use registry::{CodecPair, CodecRegistry};
pub use traits::{
    AudioCodec, AudioCodecExt, AudioStreamFormat, CodecInfo, CodecSettings, VideoCodec,
    VideoCodecExt, VideoStreamFormat,
};
pub use video::{CscdCodec, UncompressedCodec, ZmbvCodec};
pub use zlib::ZlibStream;
