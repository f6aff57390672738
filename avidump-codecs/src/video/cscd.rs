//! CamStudio lossless (CSCD) video.
//!
//! Each packet starts with two bytes: `(method << 1) | keyframe` with method 1
//! (zlib), then the compression level. The remainder is a complete zlib stream
//! of the padded bottom-up BGR24 frame, or of its byte-wise difference to the
//! previous frame for delta packets.

use crate::cadence::KeyframeCadence;
use crate::error::{CodecError, Result};
use crate::pixels::{check_frame, pad4, resize_buffer, write_bgr24_bottom_up};
use crate::traits::{CodecInfo, CodecSettings, VideoCodec, VideoStreamFormat};
use crate::zlib::ZlibStream;
use avidump_avi::{codec, Packet, TYPE_VIDEO_COMPRESSED};
use tracing::trace;

/// Compression method 1 is zlib.
const METHOD_ZLIB: u8 = 1;

/// CSCD encoder.
#[derive(Debug)]
pub struct CscdCodec {
    zlib: ZlibStream,
    cadence: KeyframeCadence,
    width: u32,
    height: u32,
    padded_width: u32,
    padded_height: u32,
    /// Previous frame as stored (pre-subtraction values).
    reference: Vec<u8>,
    current: Vec<u8>,
    pending: Option<Packet>,
}

impl CscdCodec {
    /// Create an encoder from the shared settings.
    pub fn new(settings: &CodecSettings) -> Result<Self> {
        Ok(CscdCodec {
            zlib: ZlibStream::new(settings.compression_level)?,
            cadence: KeyframeCadence::new(settings.keyframe_interval),
            width: 0,
            height: 0,
            padded_width: 0,
            padded_height: 0,
            reference: Vec::new(),
            current: Vec::new(),
            pending: None,
        })
    }

    fn image_size(&self) -> usize {
        self.padded_width as usize * self.padded_height as usize * 3
    }
}

impl VideoCodec for CscdCodec {
    fn codec_info(&self) -> CodecInfo {
        CodecInfo {
            name: "cscd",
            long_name: "CamStudio lossless (zlib)",
            intra_only: false,
        }
    }

    fn reset(&mut self, width: u32, height: u32, fps_n: u32, fps_d: u32) -> Result<VideoStreamFormat> {
        self.width = width;
        self.height = height;
        self.padded_width = pad4(width);
        self.padded_height = pad4(height);

        let size = self.image_size();
        resize_buffer(&mut self.reference, size)?;
        resize_buffer(&mut self.current, size)?;
        self.cadence.reset();
        self.pending = None;

        Ok(VideoStreamFormat {
            width: self.padded_width,
            height: self.padded_height,
            fps_n,
            fps_d,
            handler: codec::CSCD,
            compression: codec::CSCD,
            bit_count: 24,
            image_size: size as u32,
            typecode: TYPE_VIDEO_COMPRESSED,
            extra_data: Vec::new(),
        })
    }

    fn frame(&mut self, pixels: &[u32], stride: usize) -> Result<()> {
        if self.pending.is_some() {
            return Err(CodecError::NotReady);
        }
        check_frame(pixels, stride, self.width, self.height)?;

        write_bgr24_bottom_up(
            pixels,
            stride,
            self.width,
            self.height,
            self.padded_width,
            self.padded_height,
            &mut self.current,
        );

        let keyframe = self.cadence.next_is_keyframe();
        if keyframe {
            self.reference.copy_from_slice(&self.current);
        } else {
            for (cur, prev) in self.current.iter_mut().zip(self.reference.iter_mut()) {
                let value = *cur;
                *cur = value.wrapping_sub(*prev);
                *prev = value;
            }
        }

        let mut payload = Vec::new();
        payload
            .try_reserve(self.current.len() / 4 + 64)
            .map_err(|_| CodecError::Allocation(self.current.len() / 4 + 64))?;
        payload.push((METHOD_ZLIB << 1) | keyframe as u8);
        payload.push(self.zlib.level() as u8);

        // Decoders inflate each packet on its own
        self.zlib.reset();
        self.zlib.finish(&self.current, &mut payload)?;

        trace!(keyframe, bytes = payload.len(), "cscd frame");
        self.pending = Some(Packet::video(TYPE_VIDEO_COMPRESSED, payload, keyframe));
        Ok(())
    }

    fn ready(&self) -> bool {
        self.pending.is_none()
    }

    fn get_packet(&mut self) -> Result<Packet> {
        self.pending.take().ok_or(CodecError::NoPacket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::VideoCodecExt;

    fn settings(keyframe_interval: u32) -> CodecSettings {
        CodecSettings {
            compression_level: 6,
            keyframe_interval,
            block_size: 16,
        }
    }

    #[test]
    fn test_header_bytes() {
        let mut codec = CscdCodec::new(&settings(2)).unwrap();
        let format = codec.reset(10, 10, 30, 1).unwrap();
        assert_eq!((format.width, format.height), (12, 12));
        assert_eq!(format.handler, *b"CSCD");

        let pixels = vec![0x0012_3456u32; 100];
        let mut packets = Vec::new();

        codec.encode_into(&pixels, 10, &mut packets).unwrap();
        assert_eq!(&packets[0].payload[..2], &[0x03, 6]);
        assert!(packets[0].is_keyframe());

        codec.encode_into(&pixels, 10, &mut packets).unwrap();
        assert_eq!(&packets[0].payload[..2], &[0x02, 6]);
        assert!(!packets[0].is_keyframe());

        codec.encode_into(&pixels, 10, &mut packets).unwrap();
        assert!(packets[0].is_keyframe());
    }

    #[test]
    fn test_reset_restarts_on_keyframe() {
        let mut codec = CscdCodec::new(&settings(1000)).unwrap();
        codec.reset(4, 4, 30, 1).unwrap();
        let pixels = [0u32; 16];
        let mut packets = Vec::new();

        codec.encode_into(&pixels, 4, &mut packets).unwrap();
        codec.encode_into(&pixels, 4, &mut packets).unwrap();
        assert!(!packets[0].is_keyframe());
        codec.reset(4, 4, 30, 1).unwrap();
        codec.encode_into(&pixels, 4, &mut packets).unwrap();
        assert!(packets[0].is_keyframe());
    }

    #[test]
    fn test_invalid_level() {
        let bad = CodecSettings {
            compression_level: 12,
            ..CodecSettings::default()
        };
        assert!(matches!(CscdCodec::new(&bad), Err(CodecError::InvalidConfiguration(_))));
    }
}
