//! Producer-side frame preprocessing: integer scaling and black borders.

use crate::config::DumpConfig;
use crate::error::{DumpError, Result};

/// Scale and border settings for incoming frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTransform {
    pub scale_x: u32,
    pub scale_y: u32,
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Default for FrameTransform {
    fn default() -> Self {
        FrameTransform {
            scale_x: 1,
            scale_y: 1,
            top: 0,
            bottom: 0,
            left: 0,
            right: 0,
        }
    }
}

impl FrameTransform {
    /// Transform described by `config`; automatic scale is 1.
    pub fn from_config(config: &DumpConfig) -> Self {
        FrameTransform {
            scale_x: config.fixed_scale_x.max(1),
            scale_y: config.fixed_scale_y.max(1),
            top: config.border_top,
            bottom: config.border_bottom,
            left: config.border_left,
            right: config.border_right,
        }
    }

    /// Whether frames pass through unchanged.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Dimensions of a transformed `width` x `height` frame.
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        (
            width * self.scale_x + self.left + self.right,
            height * self.scale_y + self.top + self.bottom,
        )
    }

    /// Write the transformed frame into `out`, tightly packed.
    ///
    /// `stride` is in pixels. Returns the output dimensions.
    pub fn apply(
        &self,
        pixels: &[u32],
        stride: usize,
        width: u32,
        height: u32,
        out: &mut Vec<u32>,
    ) -> Result<(u32, u32)> {
        check_input(pixels, stride, width, height)?;

        let (out_w, out_h) = self.output_size(width, height);
        let len = out_w as usize * out_h as usize;
        out.clear();
        out.try_reserve(len)
            .map_err(|_| DumpError::AllocationFailure(len))?;
        out.resize(len, 0);

        let out_w = out_w as usize;
        let scale_x = self.scale_x as usize;
        let left = self.left as usize;
        let mut row_out = self.top as usize;

        for row in pixels.chunks(stride).take(height as usize) {
            let row = &row[..width as usize];
            let first = row_out * out_w + left;
            let line = &mut out[first..first + row.len() * scale_x];
            for (dst, &px) in line.chunks_exact_mut(scale_x).zip(row) {
                dst.fill(px);
            }
            for extra in 1..self.scale_y as usize {
                let copy = first + extra * out_w;
                out.copy_within(first..first + row.len() * scale_x, copy);
            }
            row_out += self.scale_y as usize;
        }

        Ok((out_w as u32, out_h))
    }
}

/// Reject frames whose buffer cannot hold `height` rows of `width` pixels.
pub fn check_input(pixels: &[u32], stride: usize, width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(DumpError::InvalidInput(format!(
            "frame dimensions {}x{} are empty",
            width, height
        )));
    }
    if stride < width as usize {
        return Err(DumpError::InvalidInput(format!(
            "stride {} is narrower than width {}",
            stride, width
        )));
    }
    let needed = stride * (height as usize - 1) + width as usize;
    if pixels.len() < needed {
        return Err(DumpError::InvalidInput(format!(
            "frame buffer holds {} pixels, {}x{} with stride {} needs {}",
            pixels.len(),
            width,
            height,
            stride,
            needed
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identity_repacks_stride() {
        let transform = FrameTransform::default();
        assert!(transform.is_identity());

        // 2x2 frame in a stride-3 buffer, last row short
        let pixels = [1, 2, 99, 3, 4];
        let mut out = Vec::new();
        let size = transform.apply(&pixels, 3, 2, 2, &mut out).unwrap();
        assert_eq!(size, (2, 2));
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_scale_and_borders() {
        let transform = FrameTransform {
            scale_x: 2,
            scale_y: 2,
            top: 1,
            bottom: 0,
            left: 1,
            right: 1,
        };
        let mut out = Vec::new();
        let size = transform.apply(&[5, 6], 2, 2, 1, &mut out).unwrap();
        assert_eq!(size, (6, 3));
        assert_eq!(
            out,
            vec![
                0, 0, 0, 0, 0, 0, //
                0, 5, 5, 6, 6, 0, //
                0, 5, 5, 6, 6, 0,
            ]
        );
    }

    #[test]
    fn test_from_config_auto_scale() {
        let config = DumpConfig {
            fixed_scale_x: 0,
            fixed_scale_y: 3,
            border_bottom: 4,
            ..Default::default()
        };
        let transform = FrameTransform::from_config(&config);
        assert_eq!(transform.output_size(10, 10), (10, 34));
        assert!(!transform.is_identity());
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut out = Vec::new();
        let transform = FrameTransform::default();
        assert!(transform.apply(&[0; 4], 1, 2, 2, &mut out).is_err());
        assert!(transform.apply(&[0; 3], 2, 2, 2, &mut out).is_err());
        assert!(transform.apply(&[], 0, 0, 0, &mut out).is_err());
    }
}
