//! Mapping from the emulated sound rate to the file's sample rate.

use crate::config::SoundRateMode;
use crate::error::{DumpError, Result};

/// Rates offered by `nearest-common`, ascending.
pub const COMMON_RATES: [u32; 15] = [
    8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000, 64000, 88200, 96000, 128000,
    176400, 192000,
];

/// Largest repeat factor accepted by `multiply`.
pub const MAX_MULTIPLY: u32 = 64;

/// Rational source sample rate, kept reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRate {
    n: u32,
    d: u32,
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl SourceRate {
    /// `n / d` samples per second.
    pub fn new(n: u32, d: u32) -> Result<Self> {
        if n == 0 || d == 0 {
            return Err(DumpError::InvalidConfiguration(format!(
                "sound rate {}/{} is not positive",
                n, d
            )));
        }
        let g = gcd(n, d);
        Ok(SourceRate { n: n / g, d: d / g })
    }

    /// Integral rate.
    pub fn hz(rate: u32) -> Result<Self> {
        Self::new(rate, 1)
    }

    pub fn numerator(&self) -> u32 {
        self.n
    }

    pub fn denominator(&self) -> u32 {
        self.d
    }

    pub fn as_f64(&self) -> f64 {
        self.n as f64 / self.d as f64
    }
}

/// What the dump does with incoming audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioPlan {
    /// Sample rate written to the file.
    pub output_rate: u32,
    /// Times each sample frame is written.
    pub repeat: u32,
    /// Resample to `output_rate` before muxing.
    pub resample: bool,
}

impl AudioPlan {
    fn pass_through(output_rate: u32) -> Result<Self> {
        if output_rate == 0 {
            return Err(DumpError::InvalidConfiguration(
                "sound rate rounds to 0 Hz".to_string(),
            ));
        }
        Ok(AudioPlan {
            output_rate,
            repeat: 1,
            resample: false,
        })
    }

    fn resampled(output_rate: u32) -> Self {
        AudioPlan {
            output_rate,
            repeat: 1,
            resample: true,
        }
    }
}

/// Choose the output rate for `source` under `mode`.
pub fn plan(mode: SoundRateMode, source: SourceRate) -> Result<AudioPlan> {
    let (n, d) = (source.n as u64, source.d as u64);
    match mode {
        SoundRateMode::NearestCommon => {
            let exact = source.as_f64();
            let nearest = COMMON_RATES
                .iter()
                .copied()
                .min_by(|a, b| {
                    let da = (*a as f64 - exact).abs();
                    let db = (*b as f64 - exact).abs();
                    da.total_cmp(&db)
                })
                .unwrap_or(48000);
            AudioPlan::pass_through(nearest)
        }
        SoundRateMode::RoundDown => AudioPlan::pass_through((n / d) as u32),
        SoundRateMode::RoundUp => AudioPlan::pass_through(n.div_ceil(d) as u32),
        SoundRateMode::Multiply => {
            if source.d > MAX_MULTIPLY {
                return Err(DumpError::InvalidConfiguration(format!(
                    "sound rate {}/{} needs a repeat factor above {}",
                    source.n, source.d, MAX_MULTIPLY
                )));
            }
            Ok(AudioPlan {
                output_rate: source.n,
                repeat: source.d,
                resample: false,
            })
        }
        SoundRateMode::Hq44100 => Ok(AudioPlan::resampled(44100)),
        SoundRateMode::Hq48000 => Ok(AudioPlan::resampled(48000)),
    }
}

/// Write every `channels`-sample frame of `input` `times` times into `out`.
pub fn repeat_frames(input: &[i16], channels: usize, times: u32, out: &mut Vec<i16>) {
    out.clear();
    out.reserve(input.len() * times as usize);
    for frame in input.chunks(channels) {
        for _ in 0..times {
            out.extend_from_slice(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_rate_is_reduced() {
        let rate = SourceRate::new(64000, 2).unwrap();
        assert_eq!((rate.numerator(), rate.denominator()), (32000, 1));
        assert!(SourceRate::new(48000, 0).is_err());
        assert!(SourceRate::hz(0).is_err());
    }

    #[test]
    fn test_nearest_common() {
        let snes = SourceRate::new(32040, 1).unwrap();
        assert_eq!(plan(SoundRateMode::NearestCommon, snes).unwrap().output_rate, 32000);

        let odd = SourceRate::new(44_743, 1).unwrap();
        let chosen = plan(SoundRateMode::NearestCommon, odd).unwrap();
        assert_eq!(chosen.output_rate, 44100);
        assert_eq!(chosen.repeat, 1);
        assert!(!chosen.resample);
    }

    #[test]
    fn test_rounding_modes() {
        let rate = SourceRate::new(64081, 2).unwrap();
        assert_eq!(plan(SoundRateMode::RoundDown, rate).unwrap().output_rate, 32040);
        assert_eq!(plan(SoundRateMode::RoundUp, rate).unwrap().output_rate, 32041);

        let exact = SourceRate::hz(48000).unwrap();
        assert_eq!(plan(SoundRateMode::RoundUp, exact).unwrap().output_rate, 48000);

        let tiny = SourceRate::new(1, 2).unwrap();
        assert!(plan(SoundRateMode::RoundDown, tiny).is_err());
    }

    #[test]
    fn test_multiply() {
        let rate = SourceRate::new(64081, 2).unwrap();
        let chosen = plan(SoundRateMode::Multiply, rate).unwrap();
        assert_eq!(chosen.output_rate, 64081);
        assert_eq!(chosen.repeat, 2);

        let too_fine = SourceRate::new(1_000_003, 65).unwrap();
        assert!(plan(SoundRateMode::Multiply, too_fine).is_err());
    }

    #[test]
    fn test_hq_modes() {
        let rate = SourceRate::new(64081, 2).unwrap();
        assert_eq!(
            plan(SoundRateMode::Hq44100, rate).unwrap(),
            AudioPlan {
                output_rate: 44100,
                repeat: 1,
                resample: true
            }
        );
        assert_eq!(plan(SoundRateMode::Hq48000, rate).unwrap().output_rate, 48000);
    }

    #[test]
    fn test_repeat_frames() {
        let mut out = Vec::new();
        repeat_frames(&[1, 2, 3, 4], 2, 3, &mut out);
        assert_eq!(out, vec![1, 2, 1, 2, 1, 2, 3, 4, 3, 4, 3, 4]);

        repeat_frames(&[5, 6], 2, 1, &mut out);
        assert_eq!(out, vec![5, 6]);
    }
}
