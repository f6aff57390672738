//! Uncompressed 24-bit DIB video.

use crate::error::{CodecError, Result};
use crate::pixels::{check_frame, pad4, resize_buffer, write_bgr24_bottom_up};
use crate::traits::{CodecInfo, VideoCodec, VideoStreamFormat};
use avidump_avi::{codec, Packet, TYPE_VIDEO_UNCOMPRESSED};

/// Stores every frame as a bottom-up BGR24 bitmap with dimensions padded to
/// multiples of four.
#[derive(Debug, Default)]
pub struct UncompressedCodec {
    width: u32,
    height: u32,
    padded_width: u32,
    padded_height: u32,
    pending: Option<Packet>,
}

impl UncompressedCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn image_size(&self) -> usize {
        self.padded_width as usize * self.padded_height as usize * 3
    }
}

impl VideoCodec for UncompressedCodec {
    fn codec_info(&self) -> CodecInfo {
        CodecInfo {
            name: "uncompressed",
            long_name: "Uncompressed RGB24",
            intra_only: true,
        }
    }

    fn reset(&mut self, width: u32, height: u32, fps_n: u32, fps_d: u32) -> Result<VideoStreamFormat> {
        self.width = width;
        self.height = height;
        self.padded_width = pad4(width);
        self.padded_height = pad4(height);
        self.pending = None;

        Ok(VideoStreamFormat {
            width: self.padded_width,
            height: self.padded_height,
            fps_n,
            fps_d,
            handler: codec::DIB,
            compression: codec::BI_RGB,
            bit_count: 24,
            image_size: self.image_size() as u32,
            typecode: TYPE_VIDEO_UNCOMPRESSED,
            extra_data: Vec::new(),
        })
    }

    fn frame(&mut self, pixels: &[u32], stride: usize) -> Result<()> {
        if self.pending.is_some() {
            return Err(CodecError::NotReady);
        }
        check_frame(pixels, stride, self.width, self.height)?;

        let mut payload = Vec::new();
        resize_buffer(&mut payload, self.image_size())?;
        write_bgr24_bottom_up(
            pixels,
            stride,
            self.width,
            self.height,
            self.padded_width,
            self.padded_height,
            &mut payload,
        );

        self.pending = Some(Packet::video(TYPE_VIDEO_UNCOMPRESSED, payload, true));
        Ok(())
    }

    fn ready(&self) -> bool {
        self.pending.is_none()
    }

    fn get_packet(&mut self) -> Result<Packet> {
        self.pending.take().ok_or(CodecError::NoPacket)
    }
}
