//! Audio codecs.

pub mod pcm;

pub use pcm::PcmCodec;
