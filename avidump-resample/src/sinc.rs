//! Sinc interpolation resampler with configurable window functions.
//!
//! High-quality resampling using windowed sinc interpolation.
//! Supports various window functions for different quality/performance tradeoffs.

use crate::error::{ResampleError, Result};
use crate::ResamplerImpl;
use std::f64::consts::PI;

/// Number of fractional phases in the coefficient table.
const NUM_PHASES: usize = 256;

/// Window functions for sinc interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowFunction {
    /// Rectangular window (no windowing).
    Rectangular,
    /// Hann window - good balance of main lobe width and side lobe attenuation.
    Hann,
    /// Hamming window - slightly better side lobe attenuation than Hann.
    Hamming,
    /// Blackman window - excellent side lobe attenuation.
    #[default]
    Blackman,
    /// Kaiser window with configurable beta parameter.
    Kaiser { beta: u32 },
}

impl WindowFunction {
    /// Calculate the window value at position n for a window of size N.
    pub fn value(&self, n: usize, size: usize) -> f64 {
        let n = n as f64;
        let size = size as f64;

        match self {
            Self::Rectangular => 1.0,
            Self::Hann => 0.5 * (1.0 - (2.0 * PI * n / (size - 1.0)).cos()),
            Self::Hamming => 0.54 - 0.46 * (2.0 * PI * n / (size - 1.0)).cos(),
            Self::Blackman => {
                0.42 - 0.5 * (2.0 * PI * n / (size - 1.0)).cos()
                    + 0.08 * (4.0 * PI * n / (size - 1.0)).cos()
            }
            Self::Kaiser { beta } => {
                let beta = *beta as f64;
                let x = 2.0 * n / (size - 1.0) - 1.0;
                bessel_i0(beta * (1.0 - x * x).max(0.0).sqrt()) / bessel_i0(beta)
            }
        }
    }
}

/// Approximate Bessel function I0 using a polynomial approximation.
fn bessel_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 3.75 {
        let y = (x / 3.75) * (x / 3.75);
        1.0 + y
            * (3.5156229
                + y * (3.0899424
                    + y * (1.2067492 + y * (0.2659732 + y * (0.0360768 + y * 0.0045813)))))
    } else {
        let y = 3.75 / ax;
        (ax.exp() / ax.sqrt())
            * (0.39894228
                + y * (0.01328592
                    + y * (0.00225319
                        + y * (-0.00157565
                            + y * (0.00916281
                                + y * (-0.02057706
                                    + y * (0.02635537 + y * (-0.01647633 + y * 0.00392377))))))))
    }
}

/// Sinc interpolation resampler.
///
/// Uses windowed sinc interpolation for high-quality resampling. Channel
/// state is kept interleaved, so one instance serves a whole stream.
///
/// # Latency
/// Output lags input by half a window. [`flush`](ResamplerImpl::flush) feeds
/// a window of silence to push the tail out.
#[derive(Debug)]
pub struct SincResampler {
    input_rate: f64,
    output_rate: f64,
    ratio: f64,
    window_size: usize,
    /// Pre-computed filter coefficients (window * sinc)
    filter_table: Vec<Vec<f32>>,
    /// Last `window_size` input frames, interleaved
    input_buffer: Vec<f32>,
    /// Fractional read position carried between calls
    position: f64,
    channels: usize,
    /// Per-channel scratch, reused between calls
    scratch: Vec<f32>,
}

impl SincResampler {
    /// Create a new sinc resampler.
    ///
    /// # Arguments
    /// * `input_rate` - Input sample rate in Hz, may be fractional
    /// * `output_rate` - Output sample rate in Hz
    /// * `channels` - Number of audio channels
    /// * `window_size` - Size of the sinc window (must be even, typically 32-256)
    /// * `window_function` - Window function to use
    ///
    /// # Errors
    /// Returns an error if parameters are invalid.
    pub fn new(
        input_rate: f64,
        output_rate: f64,
        channels: usize,
        window_size: usize,
        window_function: WindowFunction,
    ) -> Result<Self> {
        for rate in [input_rate, output_rate] {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(ResampleError::InvalidSampleRate { rate });
            }
        }
        if channels == 0 {
            return Err(ResampleError::InvalidChannelCount { count: channels });
        }
        if window_size == 0 || window_size % 2 != 0 {
            return Err(ResampleError::InvalidWindowSize { size: window_size });
        }

        let ratio = input_rate / output_rate;

        if !(1.0 / 256.0..=256.0).contains(&ratio) {
            return Err(ResampleError::RatioTooExtreme { ratio });
        }

        let filter_table = Self::compute_filter_table(window_size, NUM_PHASES, ratio, window_function);

        Ok(Self {
            input_rate,
            output_rate,
            ratio,
            window_size,
            filter_table,
            input_buffer: vec![0.0; window_size * channels],
            position: 0.0,
            channels,
            scratch: Vec::new(),
        })
    }

    /// Create with default settings (Blackman window, 64 taps).
    pub fn with_defaults(input_rate: f64, output_rate: f64, channels: usize) -> Result<Self> {
        Self::new(input_rate, output_rate, channels, 64, WindowFunction::Blackman)
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Compute the filter coefficient table.
    fn compute_filter_table(
        window_size: usize,
        num_phases: usize,
        ratio: f64,
        window_function: WindowFunction,
    ) -> Vec<Vec<f32>> {
        let half_size = window_size / 2;
        // Downsampling narrows the passband to the output Nyquist
        let cutoff = if ratio > 1.0 { 1.0 / ratio } else { 1.0 };

        (0..num_phases)
            .map(|phase| {
                let phase_offset = phase as f64 / num_phases as f64;

                (0..window_size)
                    .map(|i| {
                        let x = (i as f64 - half_size as f64) - phase_offset;

                        let sinc = if x.abs() < 1e-10 {
                            1.0
                        } else {
                            (PI * x * cutoff).sin() / (PI * x * cutoff)
                        };

                        let window = window_function.value(i, window_size);

                        (sinc * window * cutoff) as f32
                    })
                    .collect()
            })
            .collect()
    }

    #[inline]
    fn apply_filter(input: &[f32], start_idx: usize, coeffs: &[f32]) -> f32 {
        let end = (start_idx + coeffs.len()).min(input.len());
        input[start_idx..end]
            .iter()
            .zip(coeffs)
            .map(|(&s, &c)| s * c)
            .sum()
    }
}

impl ResamplerImpl for SincResampler {
    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if self.channels != 1 {
            return Err(ResampleError::InvalidChannelCount { count: 1 });
        }
        self.process_interleaved(input, 1)
    }

    fn process_interleaved(&mut self, input: &[f32], channels: usize) -> Result<Vec<f32>> {
        if channels != self.channels {
            return Err(ResampleError::InvalidChannelCount { count: channels });
        }
        if input.is_empty() {
            return Ok(Vec::new());
        }
        if input.len() % channels != 0 {
            return Err(ResampleError::BufferSizeMismatch {
                actual: input.len(),
                channels,
            });
        }

        let input_frames = input.len() / channels;
        let half_window = self.window_size / 2;

        let output_frames = ((input_frames as f64) / self.ratio).ceil() as usize + 1;
        let mut output = Vec::with_capacity(output_frames * channels);

        let mut next_position = self.position;
        let mut frames_out = 0;

        for ch in 0..channels {
            let mut extended = std::mem::take(&mut self.scratch);
            extended.clear();
            extended.extend(self.input_buffer.iter().skip(ch).step_by(channels));
            extended.extend(input.iter().skip(ch).step_by(channels));

            let mut pos = self.position + half_window as f64;
            let max_pos = extended.len() as f64 - half_window as f64;

            let mut frame_idx = 0;
            while pos < max_pos {
                let int_pos = pos.floor() as usize;
                let frac_pos = pos - int_pos as f64;
                let phase = ((frac_pos * NUM_PHASES as f64) as usize).min(NUM_PHASES - 1);
                let start_idx = int_pos.saturating_sub(half_window);

                let sample = Self::apply_filter(&extended, start_idx, &self.filter_table[phase]);

                let output_pos = frame_idx * channels + ch;
                if output_pos >= output.len() {
                    output.resize(output_pos + 1, 0.0);
                }
                output[output_pos] = sample;

                pos += self.ratio;
                frame_idx += 1;
            }

            // Every channel walks the same positions
            next_position = pos - max_pos;
            frames_out = frame_idx;
            self.scratch = extended;
        }

        output.truncate(frames_out * channels);
        self.position = next_position;

        // Keep the last window of frames, spanning old history when the
        // input is shorter than a window
        let history_samples = self.window_size * channels;
        if input.len() >= history_samples {
            self.input_buffer.clear();
            self.input_buffer
                .extend_from_slice(&input[input.len() - history_samples..]);
        } else {
            self.input_buffer.drain(..input.len());
            self.input_buffer.extend_from_slice(input);
        }

        Ok(output)
    }

    fn input_rate(&self) -> f64 {
        self.input_rate
    }

    fn output_rate(&self) -> f64 {
        self.output_rate
    }

    fn reset(&mut self) {
        self.position = 0.0;
        self.input_buffer.fill(0.0);
    }

    fn latency(&self) -> usize {
        self.window_size / 2
    }

    fn flush(&mut self) -> Result<Vec<f32>> {
        self.flush_interleaved(self.channels)
    }

    fn flush_interleaved(&mut self, channels: usize) -> Result<Vec<f32>> {
        let padding = vec![0.0f32; self.window_size * channels];
        let result = self.process_interleaved(&padding, channels)?;
        self.reset();
        Ok(result)
    }
}
