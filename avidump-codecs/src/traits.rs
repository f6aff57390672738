//! Common codec traits.
//!
//! This module defines the contract every capture codec follows:
//!
//! - [`VideoCodec`] / [`AudioCodec`] - push input, then drain packets
//! - [`VideoCodecExt`] / [`AudioCodecExt`] - drain helpers with buffer reuse
//!
//! # Handshake
//!
//! A codec accepts input only while [`ready`](VideoCodec::ready) returns
//! `true`. Feeding input leaves one or more packets pending; the caller then
//! calls `get_packet` until the codec reports ready again.
//!
//! ```ignore
//! let format = codec.reset(width, height, 60, 1)?;
//! let mut packets = Vec::new();
//!
//! for frame in frames {
//!     codec.encode_into(&frame, width as usize, &mut packets)?;
//!     for packet in packets.drain(..) {
//!         writer.write_packet(VIDEO_TRACK, &packet)?;
//!     }
//! }
//! ```

use crate::error::Result;
use avidump_avi::{AudioFormat, AudioTrack, Packet, VideoFormat, VideoTrack};

/// Information about a codec.
#[derive(Debug, Clone)]
pub struct CodecInfo {
    /// Registry name.
    pub name: &'static str,
    /// Long name/description.
    pub long_name: &'static str,
    /// Whether every packet is a keyframe.
    pub intra_only: bool,
}

/// Tunables shared by the codec factories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecSettings {
    /// zlib level, 0..=9.
    pub compression_level: u32,
    /// Frames between keyframes; 0 or 1 makes every frame a keyframe.
    pub keyframe_interval: u32,
    /// ZMBV block edge in pixels, 8..=64.
    pub block_size: u32,
}

impl Default for CodecSettings {
    fn default() -> Self {
        CodecSettings {
            compression_level: 7,
            keyframe_interval: 300,
            block_size: 16,
        }
    }
}

/// What a video codec declares for the current segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoStreamFormat {
    /// Stored width (after any codec padding).
    pub width: u32,
    /// Stored height (after any codec padding).
    pub height: u32,
    /// Frame rate numerator.
    pub fps_n: u32,
    /// Frame rate denominator.
    pub fps_d: u32,
    /// strh fccHandler.
    pub handler: [u8; 4],
    /// BITMAPINFOHEADER biCompression.
    pub compression: [u8; 4],
    /// BITMAPINFOHEADER biBitCount.
    pub bit_count: u16,
    /// BITMAPINFOHEADER biSizeImage.
    pub image_size: u32,
    /// movi chunk typecode (`TYPE_VIDEO_COMPRESSED` or `TYPE_VIDEO_UNCOMPRESSED`).
    pub typecode: u16,
    /// Bytes appended to the BITMAPINFOHEADER.
    pub extra_data: Vec<u8>,
}

impl VideoStreamFormat {
    /// Container track for this format
    pub fn to_track(&self) -> VideoTrack {
        VideoTrack {
            handler: self.handler,
            format: VideoFormat {
                width: self.width as i32,
                height: self.height as i32,
                bit_count: self.bit_count,
                compression: self.compression,
                image_size: self.image_size,
                extra_data: self.extra_data.clone(),
                ..Default::default()
            },
            fps_n: self.fps_n,
            fps_d: self.fps_d,
        }
    }
}

/// What an audio codec declares for the current segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStreamFormat {
    /// strh fccHandler.
    pub handler: [u8; 4],
    /// WAVEFORMATEX wFormatTag.
    pub format_tag: u16,
    /// Channel count.
    pub channels: u16,
    /// Sample frames per second.
    pub sample_rate: u32,
    /// Bytes per second.
    pub avg_bytes_per_sec: u32,
    /// Bytes per sample frame.
    pub block_align: u16,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Bytes appended after cbSize.
    pub extra_data: Vec<u8>,
}

impl AudioStreamFormat {
    /// Container track for this format
    pub fn to_track(&self) -> AudioTrack {
        AudioTrack {
            handler: self.handler,
            format: AudioFormat {
                format_tag: self.format_tag,
                channels: self.channels,
                samples_per_sec: self.sample_rate,
                avg_bytes_per_sec: self.avg_bytes_per_sec,
                block_align: self.block_align,
                bits_per_sample: self.bits_per_sample,
                extra_data: self.extra_data.clone(),
            },
        }
    }
}

/// Video encoder fed with packed `0x00RRGGBB` pixels.
pub trait VideoCodec: Send {
    /// Get codec information.
    fn codec_info(&self) -> CodecInfo;

    /// Start a new stream. Reference state is dropped and the next frame is a
    /// keyframe; allocations are reused where the geometry allows.
    fn reset(&mut self, width: u32, height: u32, fps_n: u32, fps_d: u32) -> Result<VideoStreamFormat>;

    /// Encode one frame. `stride` is in pixels.
    fn frame(&mut self, pixels: &[u32], stride: usize) -> Result<()>;

    /// Whether the codec can take another frame.
    fn ready(&self) -> bool;

    /// Take the next pending packet.
    fn get_packet(&mut self) -> Result<Packet>;
}

/// Audio encoder fed with interleaved signed 16-bit samples.
pub trait AudioCodec: Send {
    /// Get codec information.
    fn codec_info(&self) -> CodecInfo;

    /// Start a new stream.
    fn reset(&mut self, sample_rate: u32, channels: u16) -> Result<AudioStreamFormat>;

    /// Encode interleaved samples.
    fn samples(&mut self, pcm: &[i16]) -> Result<()>;

    /// Whether the codec can take more samples.
    fn ready(&self) -> bool;

    /// Take the next pending packet.
    fn get_packet(&mut self) -> Result<Packet>;

    /// Emit whatever is still buffered at the end of a segment.
    fn flush(&mut self) -> Result<()>;
}

/// Extension trait for video codecs with buffer reuse.
pub trait VideoCodecExt: VideoCodec {
    /// Encode a frame and collect every packet it produced.
    ///
    /// The output buffer is cleared first.
    fn encode_into(&mut self, pixels: &[u32], stride: usize, out: &mut Vec<Packet>) -> Result<()> {
        out.clear();
        self.frame(pixels, stride)?;
        while !self.ready() {
            out.push(self.get_packet()?);
        }
        Ok(())
    }
}

// Blanket implementation for all VideoCodec types
impl<T: VideoCodec + ?Sized> VideoCodecExt for T {}

/// Extension trait for audio codecs with buffer reuse.
pub trait AudioCodecExt: AudioCodec {
    /// Encode samples and collect the packets.
    ///
    /// The output buffer is cleared first.
    fn encode_into(&mut self, pcm: &[i16], out: &mut Vec<Packet>) -> Result<()> {
        out.clear();
        self.samples(pcm)?;
        self.drain_into(out)
    }

    /// Flush and collect the trailing packets.
    ///
    /// The output buffer is cleared first.
    fn flush_into(&mut self, out: &mut Vec<Packet>) -> Result<()> {
        out.clear();
        self.flush()?;
        self.drain_into(out)
    }

    /// Append pending packets to `out`.
    fn drain_into(&mut self, out: &mut Vec<Packet>) -> Result<()> {
        while !self.ready() {
            out.push(self.get_packet()?);
        }
        Ok(())
    }
}

// Blanket implementation for all AudioCodec types
impl<T: AudioCodec + ?Sized> AudioCodecExt for T {}
