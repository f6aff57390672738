//! # avidump resample
//!
//! Sample rate conversion for the high-quality sound modes of the dumper.
//!
//! A windowed-sinc interpolator with a precomputed polyphase coefficient
//! table. Input rates may be fractional (emulated sound chips rarely run at
//! integral rates); the output rate is fixed per instance.
//!
//! ## Example
//!
//! ```
//! use avidump_resample::{ResamplerImpl, SincResampler};
//!
//! let mut resampler = SincResampler::with_defaults(32040.5, 48000.0, 2).unwrap();
//! let input = vec![0.0f32; 4096 * 2];
//! let output = resampler.process_interleaved(&input, 2).unwrap();
//! assert_eq!(output.len() % 2, 0);
//! ```

#![allow(clippy::needless_range_loop)]

pub mod error;
pub mod sinc;

pub use error::{ResampleError, Result};
pub use sinc::{SincResampler, WindowFunction};

/// Trait for resampling implementations.
pub trait ResamplerImpl: Send + Sync {
    /// Process mono input samples and return resampled output.
    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>>;

    /// Process interleaved multi-channel input samples.
    fn process_interleaved(&mut self, input: &[f32], channels: usize) -> Result<Vec<f32>>;

    /// Get the input sample rate.
    fn input_rate(&self) -> f64;

    /// Get the output sample rate.
    fn output_rate(&self) -> f64;

    /// Get the resampling ratio (output_rate / input_rate).
    fn ratio(&self) -> f64 {
        self.output_rate() / self.input_rate()
    }

    /// Reset the resampler state (clear internal buffers).
    fn reset(&mut self);

    /// Get the latency in input samples.
    fn latency(&self) -> usize;

    /// Drain the samples still held in the filter history.
    fn flush(&mut self) -> Result<Vec<f32>>;

    /// Drain the interleaved history of a multi-channel stream.
    fn flush_interleaved(&mut self, channels: usize) -> Result<Vec<f32>>;
}
