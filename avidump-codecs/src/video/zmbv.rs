//! Zip Motion Blocks Video (ZMBV), 32-bit format.
//!
//! The frame is split into `block_size` squares (edge blocks are clipped).
//! Keyframes carry the whole frame; delta frames carry one motion vector per
//! block plus the XOR of every changed block against the motion-compensated
//! reference. All frame data goes through one zlib stream that is restarted
//! at keyframes and sync-flushed after every frame.

use crate::cadence::KeyframeCadence;
use crate::error::{CodecError, Result};
use crate::pixels::{check_frame, pixel_le, resize_buffer};
use crate::traits::{CodecInfo, CodecSettings, VideoCodec, VideoStreamFormat};
use crate::zlib::ZlibStream;
use avidump_avi::{codec, Packet, TYPE_VIDEO_COMPRESSED};
use tracing::trace;

/// Keyframe flag in the first packet byte.
const FLAG_KEYFRAME: u8 = 0x01;
/// Version 0.1.
const VERSION: [u8; 2] = [0, 1];
/// Compression 1 is zlib.
const COMPRESSION_ZLIB: u8 = 1;
/// Format 8 is 32 bits per pixel.
const FORMAT_32BPP: u8 = 8;
/// Largest axis probe distance in the motion search.
const SEARCH_RADIUS: i32 = 10;
/// Scale of the entropy cost table.
const COST_SCALE: f64 = 256.0;

/// Motion vector in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionVector {
    pub x: i8,
    pub y: i8,
}

impl MotionVector {
    pub fn new(x: i8, y: i8) -> Self {
        MotionVector { x, y }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// Per-block search result.
#[derive(Debug, Clone, Copy)]
struct BlockMatch {
    vector: MotionVector,
    changed: bool,
}

/// ZMBV encoder.
#[derive(Debug)]
pub struct ZmbvCodec {
    zlib: ZlibStream,
    cadence: KeyframeCadence,
    block_size: u32,
    width: u32,
    height: u32,
    /// Current frame, masked to 24 bits.
    current: Vec<u32>,
    /// Previous frame.
    reference: Vec<u32>,
    /// Uncompressed frame data handed to zlib.
    diff: Vec<u8>,
    matches: Vec<BlockMatch>,
    /// `cost[n]` for a byte value seen `n` times in one block.
    cost: Vec<u32>,
    pending: Option<Packet>,
}

impl ZmbvCodec {
    /// Create an encoder from the shared settings.
    pub fn new(settings: &CodecSettings) -> Result<Self> {
        if !(8..=64).contains(&settings.block_size) {
            return Err(CodecError::InvalidConfiguration(format!(
                "ZMBV block size {} out of range 8..=64",
                settings.block_size
            )));
        }

        let block_bytes = (settings.block_size * settings.block_size * 4) as usize;

        Ok(ZmbvCodec {
            zlib: ZlibStream::new(settings.compression_level)?,
            cadence: KeyframeCadence::new(settings.keyframe_interval),
            block_size: settings.block_size,
            width: 0,
            height: 0,
            current: Vec::new(),
            reference: Vec::new(),
            diff: Vec::new(),
            matches: Vec::new(),
            cost: build_cost_table(block_bytes),
            pending: None,
        })
    }

    fn blocks_x(&self) -> usize {
        self.width.div_ceil(self.block_size) as usize
    }

    fn blocks_y(&self) -> usize {
        self.height.div_ceil(self.block_size) as usize
    }

    fn load_frame(&mut self, pixels: &[u32], stride: usize) {
        let width = self.width as usize;
        for (y, row) in self.current.chunks_exact_mut(width).enumerate() {
            let src = &pixels[y * stride..y * stride + width];
            for (dst, &pixel) in row.iter_mut().zip(src) {
                *dst = pixel & 0x00FF_FFFF;
            }
        }
    }

    fn encode_keyframe(&mut self, payload: &mut Vec<u8>) -> Result<()> {
        payload.extend_from_slice(&[
            FLAG_KEYFRAME,
            VERSION[0],
            VERSION[1],
            COMPRESSION_ZLIB,
            FORMAT_32BPP,
            self.block_size as u8,
            self.block_size as u8,
        ]);

        resize_buffer(&mut self.diff, self.current.len() * 4)?;
        for (dst, &pixel) in self.diff.chunks_exact_mut(4).zip(&self.current) {
            dst.copy_from_slice(&pixel_le(pixel));
        }

        self.zlib.reset();
        self.zlib.sync(&self.diff, payload)
    }

    fn encode_delta(&mut self, payload: &mut Vec<u8>) -> Result<()> {
        payload.push(0);

        let bx = self.blocks_x();
        let by = self.blocks_y();
        let blocks = bx * by;
        let vector_bytes = (blocks * 2 + 3) & !3;

        self.matches.clear();
        self.matches
            .try_reserve(blocks)
            .map_err(|_| CodecError::Allocation(blocks * std::mem::size_of::<BlockMatch>()))?;

        let mut previous = MotionVector::zero();
        let mut xor_bytes = 0usize;
        for block_y in 0..by {
            for block_x in 0..bx {
                let rect = self.block_rect(block_x, block_y);
                let found = self.search(rect, previous);
                if found.changed {
                    xor_bytes += rect.w * rect.h * 4;
                }
                previous = found.vector;
                self.matches.push(found);
            }
        }

        self.diff.clear();
        self.diff
            .try_reserve(vector_bytes + xor_bytes)
            .map_err(|_| CodecError::Allocation(vector_bytes + xor_bytes))?;

        for found in &self.matches {
            self.diff.push(((found.vector.x as u8) << 1) | found.changed as u8);
            self.diff.push((found.vector.y as u8) << 1);
        }
        self.diff.resize(vector_bytes, 0);

        for block_y in 0..by {
            for block_x in 0..bx {
                let found = self.matches[block_y * bx + block_x];
                if !found.changed {
                    continue;
                }
                let rect = self.block_rect(block_x, block_y);
                self.append_xor(rect, found.vector);
            }
        }

        self.zlib.sync(&self.diff, payload)
    }

    fn block_rect(&self, block_x: usize, block_y: usize) -> BlockRect {
        let size = self.block_size as usize;
        let x = block_x * size;
        let y = block_y * size;
        BlockRect {
            x,
            y,
            w: size.min(self.width as usize - x),
            h: size.min(self.height as usize - y),
        }
    }

    /// Whether the reference block displaced by `v` lies inside the frame.
    fn in_bounds(&self, rect: BlockRect, v: MotionVector) -> bool {
        let x = rect.x as i64 + v.x as i64;
        let y = rect.y as i64 + v.y as i64;
        x >= 0
            && y >= 0
            && x + rect.w as i64 <= self.width as i64
            && y + rect.h as i64 <= self.height as i64
    }

    fn search(&self, rect: BlockRect, previous: MotionVector) -> BlockMatch {
        let mut best = MotionVector::zero();
        let mut best_cost = self.block_cost(rect, best);

        if best_cost > 0 {
            let mut candidates = Vec::with_capacity(1 + 4 * SEARCH_RADIUS as usize);
            candidates.push(previous);
            for r in 1..=SEARCH_RADIUS as i8 {
                candidates.push(MotionVector::new(r, 0));
                candidates.push(MotionVector::new(-r, 0));
                candidates.push(MotionVector::new(0, r));
                candidates.push(MotionVector::new(0, -r));
            }

            for candidate in candidates {
                if candidate == best || !self.in_bounds(rect, candidate) {
                    continue;
                }
                let cost = self.block_cost(rect, candidate);
                if cost < best_cost {
                    best = candidate;
                    best_cost = cost;
                    if cost == 0 {
                        break;
                    }
                }
            }
        }

        BlockMatch {
            vector: best,
            changed: self.differs(rect, best),
        }
    }

    /// Entropy estimate of the XOR between the block and its displaced
    /// reference; zero bytes are free.
    fn block_cost(&self, rect: BlockRect, v: MotionVector) -> u64 {
        let mut histogram = [0u32; 256];
        let width = self.width as usize;
        let rx = (rect.x as isize + v.x as isize) as usize;
        let ry = (rect.y as isize + v.y as isize) as usize;

        for row in 0..rect.h {
            let cur = &self.current[(rect.y + row) * width + rect.x..][..rect.w];
            let prev = &self.reference[(ry + row) * width + rx..][..rect.w];
            for (&a, &b) in cur.iter().zip(prev) {
                for byte in (a ^ b).to_le_bytes() {
                    histogram[byte as usize] += 1;
                }
            }
        }

        histogram[1..]
            .iter()
            .filter(|&&count| count > 0)
            .map(|&count| count as u64 * self.cost[count as usize] as u64)
            .sum()
    }

    fn differs(&self, rect: BlockRect, v: MotionVector) -> bool {
        let width = self.width as usize;
        let rx = (rect.x as isize + v.x as isize) as usize;
        let ry = (rect.y as isize + v.y as isize) as usize;
        (0..rect.h).any(|row| {
            let cur = &self.current[(rect.y + row) * width + rect.x..][..rect.w];
            let prev = &self.reference[(ry + row) * width + rx..][..rect.w];
            cur != prev
        })
    }

    fn append_xor(&mut self, rect: BlockRect, v: MotionVector) {
        let width = self.width as usize;
        let rx = (rect.x as isize + v.x as isize) as usize;
        let ry = (rect.y as isize + v.y as isize) as usize;
        for row in 0..rect.h {
            let cur = &self.current[(rect.y + row) * width + rect.x..][..rect.w];
            let prev = &self.reference[(ry + row) * width + rx..][..rect.w];
            for (&a, &b) in cur.iter().zip(prev) {
                self.diff.extend_from_slice(&(a ^ b).to_le_bytes());
            }
        }
    }
}

/// Block geometry in pixels.
#[derive(Debug, Clone, Copy)]
struct BlockRect {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

/// `cost[i] = round(256 * (ln(block_bytes) - ln(i)))`, i.e. the scaled
/// information content of a byte value seen `i` times.
fn build_cost_table(block_bytes: usize) -> Vec<u32> {
    let m0 = (block_bytes as f64).ln();
    let mut table = vec![0u32; block_bytes + 1];
    for (i, slot) in table.iter_mut().enumerate().skip(1) {
        *slot = (COST_SCALE * (m0 - (i as f64).ln())).round() as u32;
    }
    table
}

impl VideoCodec for ZmbvCodec {
    fn codec_info(&self) -> CodecInfo {
        CodecInfo {
            name: "zmbv",
            long_name: "Zip Motion Blocks Video",
            intra_only: false,
        }
    }

    fn reset(&mut self, width: u32, height: u32, fps_n: u32, fps_d: u32) -> Result<VideoStreamFormat> {
        self.width = width;
        self.height = height;

        let pixels = width as usize * height as usize;
        resize_buffer(&mut self.current, pixels)?;
        resize_buffer(&mut self.reference, pixels)?;
        self.cadence.reset();
        self.zlib.reset();
        self.pending = None;

        Ok(VideoStreamFormat {
            width,
            height,
            fps_n,
            fps_d,
            handler: codec::ZMBV,
            compression: codec::ZMBV,
            bit_count: 32,
            image_size: (pixels * 4) as u32,
            typecode: TYPE_VIDEO_COMPRESSED,
            extra_data: Vec::new(),
        })
    }

    fn frame(&mut self, pixels: &[u32], stride: usize) -> Result<()> {
        if self.pending.is_some() {
            return Err(CodecError::NotReady);
        }
        check_frame(pixels, stride, self.width, self.height)?;

        if self.width == 0 || self.height == 0 {
            // Nothing to code; still emit a keyframe marker so frame counts line up
            let keyframe = self.cadence.next_is_keyframe();
            self.pending = Some(Packet::video(TYPE_VIDEO_COMPRESSED, Vec::new(), keyframe));
            return Ok(());
        }

        self.load_frame(pixels, stride);

        let keyframe = self.cadence.next_is_keyframe();
        let mut payload = Vec::new();
        payload
            .try_reserve(self.current.len() + 64)
            .map_err(|_| CodecError::Allocation(self.current.len() + 64))?;

        if keyframe {
            self.encode_keyframe(&mut payload)?;
        } else {
            self.encode_delta(&mut payload)?;
        }

        std::mem::swap(&mut self.current, &mut self.reference);

        trace!(keyframe, bytes = payload.len(), "zmbv frame");
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
