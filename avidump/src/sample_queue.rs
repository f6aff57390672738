//! Growable ring of interleaved audio samples shared between threads.

use crate::error::{DumpError, Result};
use parking_lot::Mutex;

/// Growth granularity in samples.
pub const BLOCK_SAMPLES: usize = 4096;

#[derive(Debug, Default)]
struct Ring {
    buffer: Vec<i16>,
    read: usize,
    len: usize,
}

impl Ring {
    fn grow(&mut self, needed: usize) -> Result<()> {
        let target = needed.div_ceil(BLOCK_SAMPLES) * BLOCK_SAMPLES;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(target)
            .map_err(|_| DumpError::AllocationFailure(target))?;

        let (first, second) = self.unread();
        buffer.extend_from_slice(first);
        buffer.extend_from_slice(second);
        buffer.resize(target, 0);

        self.buffer = buffer;
        self.read = 0;
        Ok(())
    }

    /// Unread samples as two contiguous runs.
    fn unread(&self) -> (&[i16], &[i16]) {
        let cap = self.buffer.len();
        if self.read + self.len <= cap {
            (&self.buffer[self.read..self.read + self.len], &[])
        } else {
            let tail = cap - self.read;
            (&self.buffer[self.read..], &self.buffer[..self.len - tail])
        }
    }
}

/// Thread-safe FIFO of `i16` samples.
///
/// Writers never block on readers: the ring grows in [`BLOCK_SAMPLES`] steps
/// when full. Readers never block either: a short read is padded with
/// silence.
#[derive(Debug, Default)]
pub struct SampleQueue {
    ring: Mutex<Ring>,
}

impl SampleQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append samples, growing the ring if needed.
    pub fn push(&self, samples: &[i16]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut ring = self.ring.lock();
        let needed = ring.len + samples.len();
        if needed > ring.buffer.len() {
            ring.grow(needed)?;
        }

        let cap = ring.buffer.len();
        let write = (ring.read + ring.len) % cap;
        let first = samples.len().min(cap - write);
        ring.buffer[write..write + first].copy_from_slice(&samples[..first]);
        ring.buffer[..samples.len() - first].copy_from_slice(&samples[first..]);
        ring.len = needed;
        Ok(())
    }

    /// Fill `out` from the queue.
    ///
    /// Returns how many samples were real; the rest of `out` is zeroed.
    pub fn pull(&self, out: &mut [i16]) -> usize {
        let mut ring = self.ring.lock();
        let count = out.len().min(ring.len);

        let (first, second) = ring.unread();
        let from_first = count.min(first.len());
        out[..from_first].copy_from_slice(&first[..from_first]);
        out[from_first..count].copy_from_slice(&second[..count - from_first]);
        out[count..].fill(0);

        if count > 0 {
            let cap = ring.buffer.len();
            ring.read = (ring.read + count) % cap;
            ring.len -= count;
        }
        count
    }

    /// Unread sample count.
    pub fn available(&self) -> usize {
        self.ring.lock().len
    }

    /// Allocated size in samples. Never shrinks.
    pub fn capacity(&self) -> usize {
        self.ring.lock().buffer.len()
    }
}
