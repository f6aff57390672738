//! Pixel layout conversions.
//!
//! Input frames are packed `0x00RRGGBB` words, row-major, with a stride in
//! pixels. Serialized forms are produced with explicit little-endian byte
//! order so output does not depend on the host.

use crate::error::{CodecError, Result};

/// Round a dimension up to the next multiple of four.
pub fn pad4(value: u32) -> u32 {
    value.div_ceil(4) * 4
}

/// Check that `pixels` covers a `width` x `height` frame at `stride`.
pub fn check_frame(pixels: &[u32], stride: usize, width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Ok(());
    }
    if stride < width as usize {
        return Err(CodecError::InvalidConfiguration(format!(
            "stride {} is smaller than width {}",
            stride, width
        )));
    }
    let needed = stride * (height as usize - 1) + width as usize;
    if pixels.len() < needed {
        return Err(CodecError::FrameTooSmall {
            needed,
            available: pixels.len(),
        });
    }
    Ok(())
}

/// Little-endian bytes of one pixel with the unused top byte cleared.
#[inline]
pub fn pixel_le(pixel: u32) -> [u8; 4] {
    (pixel & 0x00FF_FFFF).to_le_bytes()
}

/// BGR bytes of one pixel.
#[inline]
pub fn pixel_bgr(pixel: u32) -> [u8; 3] {
    let [b, g, r, _] = pixel.to_le_bytes();
    [b, g, r]
}

/// Write a frame as bottom-up 24-bit BGR into `out`, padded to
/// `padded_width` x `padded_height` with black.
///
/// `out` must hold `padded_width * padded_height * 3` bytes.
pub fn write_bgr24_bottom_up(
    pixels: &[u32],
    stride: usize,
    width: u32,
    height: u32,
    padded_width: u32,
    padded_height: u32,
    out: &mut [u8],
) {
    let row_bytes = padded_width as usize * 3;
    let width = width as usize;
    let height = height as usize;

    for (out_row, dst) in out.chunks_exact_mut(row_bytes).enumerate() {
        // Bottom-up: output row 0 is the last image row
        let src_row = padded_height as usize - 1 - out_row;
        if src_row >= height {
            dst.fill(0);
            continue;
        }
        let src = &pixels[src_row * stride..src_row * stride + width];
        for (bgr, &pixel) in dst.chunks_exact_mut(3).zip(src) {
            bgr.copy_from_slice(&pixel_bgr(pixel));
        }
        dst[width * 3..].fill(0);
    }
}

/// Grow `buf` to `len` bytes, reporting allocation failure.
pub fn resize_buffer<T: Clone + Default>(buf: &mut Vec<T>, len: usize) -> Result<()> {
    if len > buf.len() {
        buf.try_reserve(len - buf.len())
            .map_err(|_| CodecError::Allocation(len * std::mem::size_of::<T>()))?;
    }
    buf.resize(len, T::default());
    Ok(())
}
