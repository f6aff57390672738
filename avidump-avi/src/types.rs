//! AVI type definitions

use crate::error::{AviError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// AVI main header (avih chunk)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AviHeader {
    /// Microseconds per frame
    pub microseconds_per_frame: u32,
    /// Maximum bytes per second
    pub max_bytes_per_sec: u32,
    /// Padding granularity
    pub padding_granularity: u32,
    /// AVI flags
    pub flags: AviFlags,
    /// Total number of frames
    pub total_frames: u32,
    /// Initial frames (for interleaved files)
    pub initial_frames: u32,
    /// Number of streams
    pub streams: u32,
    /// Suggested buffer size
    pub suggested_buffer_size: u32,
    /// Video width
    pub width: u32,
    /// Video height
    pub height: u32,
}

impl AviHeader {
    /// Serialized size of the avih payload
    pub const SIZE: usize = 56;

    /// Calculate frame rate in fps
    pub fn frame_rate(&self) -> f64 {
        if self.microseconds_per_frame > 0 {
            1_000_000.0 / self.microseconds_per_frame as f64
        } else {
            0.0
        }
    }

    /// Calculate duration in seconds
    pub fn duration(&self) -> f64 {
        (self.total_frames as f64 * self.microseconds_per_frame as f64) / 1_000_000.0
    }

    /// Serialize the avih payload
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::SIZE);
        self.write_to(&mut out)?;
        Ok(out)
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u32::<LittleEndian>(self.microseconds_per_frame)?;
        w.write_u32::<LittleEndian>(self.max_bytes_per_sec)?;
        w.write_u32::<LittleEndian>(self.padding_granularity)?;
        w.write_u32::<LittleEndian>(self.flags.to_u32())?;
        w.write_u32::<LittleEndian>(self.total_frames)?;
        w.write_u32::<LittleEndian>(self.initial_frames)?;
        w.write_u32::<LittleEndian>(self.streams)?;
        w.write_u32::<LittleEndian>(self.suggested_buffer_size)?;
        w.write_u32::<LittleEndian>(self.width)?;
        w.write_u32::<LittleEndian>(self.height)?;
        w.write_all(&[0u8; 16])
    }

    /// Parse an avih payload
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 40 {
            return Err(AviError::InvalidChunk {
                id: *b"avih",
                message: format!("too short: {} bytes", data.len()),
            });
        }

        let mut cursor = Cursor::new(data);

        Ok(AviHeader {
            microseconds_per_frame: cursor.read_u32::<LittleEndian>()?,
            max_bytes_per_sec: cursor.read_u32::<LittleEndian>()?,
            padding_granularity: cursor.read_u32::<LittleEndian>()?,
            flags: AviFlags::from_u32(cursor.read_u32::<LittleEndian>()?),
            total_frames: cursor.read_u32::<LittleEndian>()?,
            initial_frames: cursor.read_u32::<LittleEndian>()?,
            streams: cursor.read_u32::<LittleEndian>()?,
            suggested_buffer_size: cursor.read_u32::<LittleEndian>()?,
            width: cursor.read_u32::<LittleEndian>()?,
            height: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

impl Default for AviHeader {
    fn default() -> Self {
        AviHeader {
            microseconds_per_frame: 16667,
            max_bytes_per_sec: 0,
            padding_granularity: 0,
            flags: AviFlags::default(),
            total_frames: 0,
            initial_frames: 0,
            streams: 0,
            suggested_buffer_size: 0,
            width: 0,
            height: 0,
        }
    }
}

/// AVI header flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AviFlags {
    /// File has an index
    pub has_index: bool,
    /// File must use index
    pub must_use_index: bool,
    /// File is interleaved
    pub is_interleaved: bool,
    /// Trust chunk type for seeking
    pub trust_chunk_type: bool,
}

impl AviFlags {
    /// Flags written on every dump segment
    pub const INDEXED_INTERLEAVED: AviFlags = AviFlags {
        has_index: true,
        must_use_index: false,
        is_interleaved: true,
        trust_chunk_type: false,
    };

    pub fn from_u32(value: u32) -> Self {
        AviFlags {
            has_index: (value & 0x10) != 0,
            must_use_index: (value & 0x20) != 0,
            is_interleaved: (value & 0x100) != 0,
            trust_chunk_type: (value & 0x800) != 0,
        }
    }

    pub fn to_u32(self) -> u32 {
        let mut value = 0u32;
        if self.has_index {
            value |= 0x10;
        }
        if self.must_use_index {
            value |= 0x20;
        }
        if self.is_interleaved {
            value |= 0x100;
        }
        if self.trust_chunk_type {
            value |= 0x800;
        }
        value
    }
}

/// Stream header (strh chunk)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Stream type (vids, auds)
    pub stream_type: StreamType,
    /// FourCC handler/codec
    pub handler: [u8; 4],
    /// Stream flags
    pub flags: u32,
    /// Priority
    pub priority: u16,
    /// Language
    pub language: u16,
    /// Initial frames
    pub initial_frames: u32,
    /// Time scale
    pub scale: u32,
    /// Rate (units per second = rate/scale)
    pub rate: u32,
    /// Start time
    pub start: u32,
    /// Length (number of frames or audio sample frames)
    pub length: u32,
    /// Suggested buffer size
    pub suggested_buffer_size: u32,
    /// Quality (-1 for default)
    pub quality: u32,
    /// Sample size (0 for variable)
    pub sample_size: u32,
    /// Frame rectangle
    pub frame: Rect,
}

impl StreamHeader {
    /// Serialized size of the strh payload
    pub const SIZE: usize = 56;

    /// Serialize the strh payload
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::SIZE);
        self.write_to(&mut out)?;
        Ok(out)
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&self.stream_type.to_fourcc())?;
        w.write_all(&self.handler)?;
        w.write_u32::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.priority)?;
        w.write_u16::<LittleEndian>(self.language)?;
        w.write_u32::<LittleEndian>(self.initial_frames)?;
        w.write_u32::<LittleEndian>(self.scale)?;
        w.write_u32::<LittleEndian>(self.rate)?;
        w.write_u32::<LittleEndian>(self.start)?;
        w.write_u32::<LittleEndian>(self.length)?;
        w.write_u32::<LittleEndian>(self.suggested_buffer_size)?;
        w.write_u32::<LittleEndian>(self.quality)?;
        w.write_u32::<LittleEndian>(self.sample_size)?;
        w.write_i16::<LittleEndian>(self.frame.left)?;
        w.write_i16::<LittleEndian>(self.frame.top)?;
        w.write_i16::<LittleEndian>(self.frame.right)?;
        w.write_i16::<LittleEndian>(self.frame.bottom)
    }

    /// Parse a strh payload
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 48 {
            return Err(AviError::InvalidChunk {
                id: *b"strh",
                message: format!("too short: {} bytes", data.len()),
            });
        }

        let mut cursor = Cursor::new(data);

        let mut type_bytes = [0u8; 4];
        cursor.read_exact(&mut type_bytes)?;

        let mut handler = [0u8; 4];
        cursor.read_exact(&mut handler)?;

        let mut header = StreamHeader {
            stream_type: StreamType::from_fourcc(&type_bytes),
            handler,
            flags: cursor.read_u32::<LittleEndian>()?,
            priority: cursor.read_u16::<LittleEndian>()?,
            language: cursor.read_u16::<LittleEndian>()?,
            initial_frames: cursor.read_u32::<LittleEndian>()?,
            scale: cursor.read_u32::<LittleEndian>()?,
            rate: cursor.read_u32::<LittleEndian>()?,
            start: cursor.read_u32::<LittleEndian>()?,
            length: cursor.read_u32::<LittleEndian>()?,
            suggested_buffer_size: cursor.read_u32::<LittleEndian>()?,
            quality: cursor.read_u32::<LittleEndian>()?,
            sample_size: cursor.read_u32::<LittleEndian>()?,
            frame: Rect::default(),
        };

        // rcFrame is optional in some writers
        if data.len() >= Self::SIZE {
            header.frame = Rect {
                left: cursor.read_i16::<LittleEndian>()?,
                top: cursor.read_i16::<LittleEndian>()?,
                right: cursor.read_i16::<LittleEndian>()?,
                bottom: cursor.read_i16::<LittleEndian>()?,
            };
        }

        Ok(header)
    }
}

impl Default for StreamHeader {
    fn default() -> Self {
        StreamHeader {
            stream_type: StreamType::Video,
            handler: [0; 4],
            flags: 0,
            priority: 0,
            language: 0,
            initial_frames: 0,
            scale: 1,
            rate: 60,
            start: 0,
            length: 0,
            suggested_buffer_size: 0,
            quality: u32::MAX,
            sample_size: 0,
            frame: Rect::default(),
        }
    }
}

/// Stream type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Video,
    Audio,
    Unknown([u8; 4]),
}

impl StreamType {
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Self {
        match fourcc {
            b"vids" => StreamType::Video,
            b"auds" => StreamType::Audio,
            _ => StreamType::Unknown(*fourcc),
        }
    }

    pub fn to_fourcc(self) -> [u8; 4] {
        match self {
            StreamType::Video => *b"vids",
            StreamType::Audio => *b"auds",
            StreamType::Unknown(fourcc) => fourcc,
        }
    }
}

/// Rectangle structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
}

/// Pad a strf payload to a multiple of four bytes
fn pad_to_dword(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// Video format (BITMAPINFOHEADER)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFormat {
    /// Width in pixels
    pub width: i32,
    /// Height in pixels (negative for top-down)
    pub height: i32,
    /// Number of planes (always 1)
    pub planes: u16,
    /// Bits per pixel
    pub bit_count: u16,
    /// Compression FourCC (`BI_RGB` is all zero)
    pub compression: [u8; 4],
    /// Image size in bytes
    pub image_size: u32,
    /// Horizontal resolution
    pub x_pels_per_meter: i32,
    /// Vertical resolution
    pub y_pels_per_meter: i32,
    /// Colors used
    pub colors_used: u32,
    /// Important colors
    pub colors_important: u32,
    /// Codec-specific bytes appended after the 40-byte header
    pub extra_data: Vec<u8>,
}

impl Default for VideoFormat {
    fn default() -> Self {
        VideoFormat {
            width: 0,
            height: 0,
            planes: 1,
            bit_count: 24,
            compression: [0; 4],
            image_size: 0,
            x_pels_per_meter: 0,
            y_pels_per_meter: 0,
            colors_used: 0,
            colors_important: 0,
            extra_data: Vec::new(),
        }
    }
}

impl VideoFormat {
    /// Size of the fixed BITMAPINFOHEADER part
    pub const HEADER_SIZE: usize = 40;

    /// Get absolute height (handles negative for top-down)
    pub fn abs_height(&self) -> u32 {
        self.height.unsigned_abs()
    }

    /// Check if image is top-down
    pub fn is_top_down(&self) -> bool {
        self.height < 0
    }

    /// Get codec FourCC as string
    pub fn codec_string(&self) -> String {
        if self.compression == [0; 4] {
            return "BI_RGB".to_string();
        }
        String::from_utf8_lossy(&self.compression).trim().to_string()
    }

    /// Serialize as a strf payload padded to a multiple of four bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::HEADER_SIZE + self.extra_data.len() + 3);
        self.write_to(&mut out)?;
        pad_to_dword(&mut out);
        Ok(out)
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u32::<LittleEndian>((Self::HEADER_SIZE + self.extra_data.len()) as u32)?;
        w.write_i32::<LittleEndian>(self.width)?;
        w.write_i32::<LittleEndian>(self.height)?;
        w.write_u16::<LittleEndian>(self.planes)?;
        w.write_u16::<LittleEndian>(self.bit_count)?;
        w.write_all(&self.compression)?;
        w.write_u32::<LittleEndian>(self.image_size)?;
        w.write_i32::<LittleEndian>(self.x_pels_per_meter)?;
        w.write_i32::<LittleEndian>(self.y_pels_per_meter)?;
        w.write_u32::<LittleEndian>(self.colors_used)?;
        w.write_u32::<LittleEndian>(self.colors_important)?;
        w.write_all(&self.extra_data)
    }

    /// Parse a BITMAPINFOHEADER strf payload
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(AviError::InvalidChunk {
                id: *b"strf",
                message: "BITMAPINFOHEADER too short".into(),
            });
        }

        let mut cursor = Cursor::new(data);

        let size = cursor.read_u32::<LittleEndian>()? as usize;
        let width = cursor.read_i32::<LittleEndian>()?;
        let height = cursor.read_i32::<LittleEndian>()?;
        let planes = cursor.read_u16::<LittleEndian>()?;
        let bit_count = cursor.read_u16::<LittleEndian>()?;

        let mut compression = [0u8; 4];
        cursor.read_exact(&mut compression)?;

        let image_size = cursor.read_u32::<LittleEndian>()?;
        let x_pels_per_meter = cursor.read_i32::<LittleEndian>()?;
        let y_pels_per_meter = cursor.read_i32::<LittleEndian>()?;
        let colors_used = cursor.read_u32::<LittleEndian>()?;
        let colors_important = cursor.read_u32::<LittleEndian>()?;

        let extra_end = size.clamp(Self::HEADER_SIZE, data.len());

        Ok(VideoFormat {
            width,
            height,
            planes,
            bit_count,
            compression,
            image_size,
            x_pels_per_meter,
            y_pels_per_meter,
            colors_used,
            colors_important,
            extra_data: data[Self::HEADER_SIZE..extra_end].to_vec(),
        })
    }
}

/// Audio format (WAVEFORMATEX)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    /// Format tag
    pub format_tag: u16,
    /// Number of channels
    pub channels: u16,
    /// Samples per second
    pub samples_per_sec: u32,
    /// Average bytes per second
    pub avg_bytes_per_sec: u32,
    /// Block alignment
    pub block_align: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
    /// Extra codec-specific data (cbSize is derived from its length)
    pub extra_data: Vec<u8>,
}

impl Default for AudioFormat {
    fn default() -> Self {
        AudioFormat::pcm16(48000, 2)
    }
}

impl AudioFormat {
    /// Size of the fixed WAVEFORMATEX part including cbSize
    pub const HEADER_SIZE: usize = 18;

    /// Signed 16-bit PCM
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        let block_align = channels * 2;
        AudioFormat {
            format_tag: 1,
            channels,
            samples_per_sec: sample_rate,
            avg_bytes_per_sec: sample_rate * block_align as u32,
            block_align,
            bits_per_sample: 16,
            extra_data: Vec::new(),
        }
    }

    /// Get format name
    pub fn format_name(&self) -> &'static str {
        match self.format_tag {
            0x0001 => "PCM",
            0x0003 => "IEEE Float",
            0x0006 => "A-Law",
            0x0007 => "μ-Law",
            0xFFFE => "Extensible",
            _ => "Unknown",
        }
    }

    /// Serialize as a strf payload padded to a multiple of four bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::HEADER_SIZE + self.extra_data.len() + 3);
        self.write_to(&mut out)?;
        pad_to_dword(&mut out);
        Ok(out)
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u16::<LittleEndian>(self.format_tag)?;
        w.write_u16::<LittleEndian>(self.channels)?;
        w.write_u32::<LittleEndian>(self.samples_per_sec)?;
        w.write_u32::<LittleEndian>(self.avg_bytes_per_sec)?;
        w.write_u16::<LittleEndian>(self.block_align)?;
        w.write_u16::<LittleEndian>(self.bits_per_sample)?;
        w.write_u16::<LittleEndian>(self.extra_data.len() as u16)?;
        w.write_all(&self.extra_data)
    }

    /// Parse a WAVEFORMAT / WAVEFORMATEX strf payload
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(AviError::InvalidChunk {
                id: *b"strf",
                message: "WAVEFORMATEX too short".into(),
            });
        }

        let mut cursor = Cursor::new(data);

        let format_tag = cursor.read_u16::<LittleEndian>()?;
        let channels = cursor.read_u16::<LittleEndian>()?;
        let samples_per_sec = cursor.read_u32::<LittleEndian>()?;
        let avg_bytes_per_sec = cursor.read_u32::<LittleEndian>()?;
        let block_align = cursor.read_u16::<LittleEndian>()?;
        let bits_per_sample = cursor.read_u16::<LittleEndian>()?;

        let extra_data = if data.len() >= Self::HEADER_SIZE {
            let size = cursor.read_u16::<LittleEndian>()? as usize;
            let end = (Self::HEADER_SIZE + size).min(data.len());
            data[Self::HEADER_SIZE..end].to_vec()
        } else {
            Vec::new()
        };

        Ok(AudioFormat {
            format_tag,
            channels,
            samples_per_sec,
            avg_bytes_per_sec,
            block_align,
            bits_per_sample,
            extra_data,
        })
    }
}

/// Video track description handed to the container writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTrack {
    /// strh handler FourCC
    pub handler: [u8; 4],
    /// strf contents
    pub format: VideoFormat,
    /// Frame rate numerator
    pub fps_n: u32,
    /// Frame rate denominator
    pub fps_d: u32,
}

impl VideoTrack {
    /// Frame duration in microseconds, rounded to nearest
    pub fn microseconds_per_frame(&self) -> u32 {
        if self.fps_n == 0 {
            return 0;
        }
        let us = (1_000_000u64 * self.fps_d as u64 + self.fps_n as u64 / 2) / self.fps_n as u64;
        us.min(u32::MAX as u64) as u32
    }
}

/// Audio track description handed to the container writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    /// strh handler FourCC (zero for PCM)
    pub handler: [u8; 4],
    /// strf contents
    pub format: AudioFormat,
}

impl AudioTrack {
    pub fn new(format: AudioFormat) -> Self {
        AudioTrack {
            handler: [0; 4],
            format,
        }
    }
}

/// Common AVI codec FourCCs
pub mod codec {
    /// Uncompressed RGB handler
    pub const DIB: [u8; 4] = *b"DIB ";
    /// CamStudio lossless
    pub const CSCD: [u8; 4] = *b"CSCD";
    /// Zip Motion Blocks Video
    pub const ZMBV: [u8; 4] = *b"ZMBV";
    /// BITMAPINFOHEADER compression for uncompressed RGB
    pub const BI_RGB: [u8; 4] = [0; 4];
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_avi_header_frame_rate() {
        let header = AviHeader {
            microseconds_per_frame: 33333,
            ..Default::default()
        };
        let fps = header.frame_rate();
        assert!((fps - 30.0).abs() < 0.1);
    }

    #[test]
    fn test_avi_header_layout() {
        let header = AviHeader {
            microseconds_per_frame: 16667,
            flags: AviFlags::INDEXED_INTERLEAVED,
            total_frames: 7,
            streams: 2,
            width: 320,
            height: 240,
            ..Default::default()
        };
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), AviHeader::SIZE);
        assert_eq!(&bytes[12..16], &0x110u32.to_le_bytes());
        assert_eq!(AviHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_avi_flags() {
        let flags = AviFlags::from_u32(0x110);
        assert!(flags.has_index);
        assert!(flags.is_interleaved);
        assert!(!flags.must_use_index);

        assert_eq!(flags.to_u32(), 0x110);
        assert_eq!(flags, AviFlags::INDEXED_INTERLEAVED);
    }

    #[test]
    fn test_stream_type() {
        assert_eq!(StreamType::from_fourcc(b"vids"), StreamType::Video);
        assert_eq!(StreamType::from_fourcc(b"auds"), StreamType::Audio);
        assert_eq!(StreamType::Video.to_fourcc(), *b"vids");
        assert_eq!(StreamType::from_fourcc(b"txts"), StreamType::Unknown(*b"txts"));
    }

    #[test]
    fn test_stream_header_layout() {
        let strh = StreamHeader {
            stream_type: StreamType::Audio,
            scale: 4,
            rate: 192000,
            length: 1600,
            sample_size: 4,
            ..Default::default()
        };
        let bytes = strh.to_bytes().unwrap();
        assert_eq!(bytes.len(), StreamHeader::SIZE);
        assert_eq!(&bytes[0..4], b"auds");
        assert_eq!(StreamHeader::parse(&bytes).unwrap(), strh);
    }

    #[test]
    fn test_video_format() {
        let fmt = VideoFormat {
            height: -480,
            ..Default::default()
        };
        assert!(fmt.is_top_down());
        assert_eq!(fmt.abs_height(), 480);
        assert_eq!(fmt.codec_string(), "BI_RGB");
    }

    #[test]
    fn test_video_format_extra_padding() {
        let fmt = VideoFormat {
            width: 64,
            height: 64,
            compression: codec::ZMBV,
            extra_data: vec![1, 2, 3],
            ..Default::default()
        };
        let bytes = fmt.to_bytes().unwrap();
        assert_eq!(bytes.len(), 44);
        assert_eq!(&bytes[0..4], &43u32.to_le_bytes());

        let parsed = VideoFormat::parse(&bytes).unwrap();
        assert_eq!(parsed.extra_data, vec![1, 2, 3]);
        assert_eq!(parsed.codec_string(), "ZMBV");
    }

    #[test]
    fn test_audio_format() {
        let pcm = AudioFormat::pcm16(48000, 2);
        assert_eq!(pcm.format_name(), "PCM");
        assert_eq!(pcm.block_align, 4);
        assert_eq!(pcm.avg_bytes_per_sec, 192000);

        let bytes = pcm.to_bytes().unwrap();
        assert_eq!(bytes.len(), 20);
        assert_eq!(AudioFormat::parse(&bytes).unwrap(), pcm);
    }

    #[test]
    fn test_microseconds_per_frame() {
        let track = VideoTrack {
            handler: codec::DIB,
            format: VideoFormat::default(),
            fps_n: 60,
            fps_d: 1,
        };
        assert_eq!(track.microseconds_per_frame(), 16667);
    }
}
