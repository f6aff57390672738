//! Reusable deflate stream on top of `flate2::Compress`.

use crate::error::{CodecError, Result};
use flate2::{Compress, Compression, FlushCompress, Status};

/// Minimum spare output space offered to the deflater per call.
const OUTPUT_CHUNK: usize = 4096;

/// A zlib-wrapped deflate stream whose engine is allocated once.
pub struct ZlibStream {
    compress: Compress,
    level: u32,
}

impl ZlibStream {
    /// Create a stream at `level` (0..=9).
    pub fn new(level: u32) -> Result<Self> {
        if level > 9 {
            return Err(CodecError::InvalidConfiguration(format!(
                "compression level {} out of range 0..=9",
                level
            )));
        }
        Ok(ZlibStream {
            compress: Compress::new(Compression::new(level), true),
            level,
        })
    }

    /// Configured level.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Restart the stream; the next output begins with a fresh zlib header.
    pub fn reset(&mut self) {
        self.compress.reset();
    }

    /// Deflate `input` and sync-flush, appending to `out`. The stream stays
    /// open so later calls can reference earlier data.
    pub fn sync(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        self.run(input, out, FlushCompress::Sync)
    }

    /// Deflate `input` and terminate the stream, appending to `out`.
    pub fn finish(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        self.run(input, out, FlushCompress::Finish)
    }

    fn run(&mut self, input: &[u8], out: &mut Vec<u8>, flush: FlushCompress) -> Result<()> {
        let mut consumed = 0usize;

        loop {
            if out.capacity() - out.len() < OUTPUT_CHUNK {
                let additional = OUTPUT_CHUNK.max((input.len() - consumed) / 2);
                out.try_reserve(additional)
                    .map_err(|_| CodecError::Allocation(out.len() + additional))?;
            }

            let in_before = self.compress.total_in();
            let out_before = out.len();

            let status = self
                .compress
                .compress_vec(&input[consumed..], out, flush)
                .map_err(|e| CodecError::Zlib(e.to_string()))?;

            consumed += (self.compress.total_in() - in_before) as usize;
            let produced = out.len() - out_before;

            match flush {
                FlushCompress::Finish => {
                    if status == Status::StreamEnd {
                        return Ok(());
                    }
                }
                _ => {
                    // A flush is complete once the deflater stops filling the
                    // space it was given.
                    if consumed == input.len() && out.len() < out.capacity() {
                        return Ok(());
                    }
                }
            }

            if status == Status::BufError && produced == 0 && out.len() < out.capacity() {
                return Err(CodecError::Zlib("deflate made no progress".into()));
            }
        }
    }
}

impl std::fmt::Debug for ZlibStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZlibStream")
            .field("level", &self.level)
            .field("total_in", &self.compress.total_in())
            .field("total_out", &self.compress.total_out())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Decompress, FlushDecompress};

    fn inflate(decompress: &mut Decompress, data: &[u8], expected_len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(expected_len + 64);
        decompress
            .decompress_vec(data, &mut out, FlushDecompress::Sync)
            .unwrap();
        out
    }

    #[test]
    fn test_rejects_level() {
        assert!(matches!(
            ZlibStream::new(10),
            Err(CodecError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_finish_produces_standalone_streams() {
        let mut stream = ZlibStream::new(6).unwrap();
        let input: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

        for _ in 0..2 {
            stream.reset();
            let mut out = Vec::new();
            stream.finish(&input, &mut out).unwrap();

            let mut decompress = Decompress::new(true);
            assert_eq!(inflate(&mut decompress, &out, input.len()), input);
        }
    }

    #[test]
    fn test_sync_units_decode_in_sequence() {
        let mut stream = ZlibStream::new(9).unwrap();
        let mut decompress = Decompress::new(true);

        let first = vec![0xAAu8; 5000];
        let second: Vec<u8> = (0..70_000u32).map(|i| (i * 7 % 256) as u8).collect();

        let mut out = Vec::new();
        stream.sync(&first, &mut out).unwrap();
        assert_eq!(inflate(&mut decompress, &out, first.len()), first);

        let mut out = Vec::new();
        stream.sync(&second, &mut out).unwrap();
        assert_eq!(inflate(&mut decompress, &out, second.len()), second);
    }

    #[test]
    fn test_level_zero_stores() {
        let mut stream = ZlibStream::new(0).unwrap();
        let input = vec![1u8; 100_000];
        let mut out = Vec::new();
        stream.finish(&input, &mut out).unwrap();
        assert!(out.len() > input.len());

        let mut decompress = Decompress::new(true);
        assert_eq!(inflate(&mut decompress, &out, input.len()), input);
    }
}
