//! Dump configuration.

use crate::error::{DumpError, Result};
use avidump_codecs::CodecSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default segment size limit: 2 GiB minus 16 MiB of headroom for the index.
pub const DEFAULT_MAX_SEGMENT_BYTES: u64 = (2 << 30) - (16 << 20);

/// Largest segment size limit: the RIFF 4 GiB ceiling minus the same headroom.
pub const MAX_SEGMENT_BYTES: u64 = (4 << 30) - (16 << 20);

/// Largest integer scale factor accepted.
pub const MAX_SCALE: u32 = 16;

/// Largest border accepted on any side, in pixels.
pub const MAX_BORDER: u32 = 8192;

/// How the emulated sound rate is mapped to the file's sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundRateMode {
    /// Closest common rate, samples pass through.
    #[default]
    NearestCommon,
    /// Source rate rounded down, samples pass through.
    RoundDown,
    /// Source rate rounded up, samples pass through.
    RoundUp,
    /// Numerator as the rate, each sample frame repeated denominator times.
    Multiply,
    /// Resampled to 44100 Hz.
    #[serde(rename = "hq-44100")]
    Hq44100,
    /// Resampled to 48000 Hz.
    #[serde(rename = "hq-48000")]
    Hq48000,
}

impl SoundRateMode {
    /// All modes, in menu order.
    pub const ALL: [SoundRateMode; 6] = [
        SoundRateMode::NearestCommon,
        SoundRateMode::RoundDown,
        SoundRateMode::RoundUp,
        SoundRateMode::Multiply,
        SoundRateMode::Hq44100,
        SoundRateMode::Hq48000,
    ];

    /// Option value for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NearestCommon => "nearest-common",
            Self::RoundDown => "round-down",
            Self::RoundUp => "round-up",
            Self::Multiply => "multiply",
            Self::Hq44100 => "hq-44100",
            Self::Hq48000 => "hq-48000",
        }
    }
}

impl fmt::Display for SoundRateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SoundRateMode {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| DumpError::InvalidConfiguration(format!("unknown sound rate mode '{}'", s)))
    }
}

/// Settings for one dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DumpConfig {
    /// zlib level for CSCD and ZMBV, 0..=9.
    pub compression_level: u32,
    /// Frames between keyframes.
    pub keyframe_interval: u32,
    /// ZMBV block edge, 8..=64.
    pub block_size: u32,
    /// Frames per segment, 0 = unlimited.
    pub max_frames_per_segment: u32,
    /// Segment size limit in bytes.
    pub max_segment_bytes: u64,
    /// Horizontal integer scale, 0 = automatic.
    pub fixed_scale_x: u32,
    /// Vertical integer scale, 0 = automatic.
    pub fixed_scale_y: u32,
    pub border_top: u32,
    pub border_bottom: u32,
    pub border_left: u32,
    pub border_right: u32,
    /// Audio rate policy.
    pub sound_rate_mode: SoundRateMode,
}

impl Default for DumpConfig {
    fn default() -> Self {
        let codec = CodecSettings::default();
        DumpConfig {
            compression_level: codec.compression_level,
            keyframe_interval: codec.keyframe_interval,
            block_size: codec.block_size,
            max_frames_per_segment: 0,
            max_segment_bytes: DEFAULT_MAX_SEGMENT_BYTES,
            fixed_scale_x: 0,
            fixed_scale_y: 0,
            border_top: 0,
            border_bottom: 0,
            border_left: 0,
            border_right: 0,
            sound_rate_mode: SoundRateMode::default(),
        }
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        DumpError::InvalidConfiguration(format!("invalid value '{}' for option '{}'", value, name))
    })
}

impl DumpConfig {
    /// Option names accepted by [`set_option`](Self::set_option).
    pub const OPTIONS: [&'static str; 12] = [
        "compression-level",
        "keyframe-interval",
        "block-size",
        "max-frames-per-segment",
        "max-segment-bytes",
        "fixed-scale-x",
        "fixed-scale-y",
        "border-top",
        "border-bottom",
        "border-left",
        "border-right",
        "sound-rate-mode",
    ];

    /// Set one option by its kebab-case name.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "compression-level" => self.compression_level = parse_value(name, value)?,
            "keyframe-interval" => self.keyframe_interval = parse_value(name, value)?,
            "block-size" => self.block_size = parse_value(name, value)?,
            "max-frames-per-segment" => self.max_frames_per_segment = parse_value(name, value)?,
            "max-segment-bytes" => self.max_segment_bytes = parse_value(name, value)?,
            "fixed-scale-x" => self.fixed_scale_x = parse_value(name, value)?,
            "fixed-scale-y" => self.fixed_scale_y = parse_value(name, value)?,
            "border-top" => self.border_top = parse_value(name, value)?,
            "border-bottom" => self.border_bottom = parse_value(name, value)?,
            "border-left" => self.border_left = parse_value(name, value)?,
            "border-right" => self.border_right = parse_value(name, value)?,
            "sound-rate-mode" => self.sound_rate_mode = value.trim().parse()?,
            _ => {
                return Err(DumpError::InvalidConfiguration(format!(
                    "unknown option '{}'",
                    name
                )))
            }
        }
        Ok(())
    }

    /// Check every range.
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(DumpError::InvalidConfiguration(format!(
                "compression-level {} out of range 0..=9",
                self.compression_level
            )));
        }
        if !(8..=64).contains(&self.block_size) {
            return Err(DumpError::InvalidConfiguration(format!(
                "block-size {} out of range 8..=64",
                self.block_size
            )));
        }
        if self.max_segment_bytes == 0 || self.max_segment_bytes > MAX_SEGMENT_BYTES {
            return Err(DumpError::InvalidConfiguration(format!(
                "max-segment-bytes {} must be between 1 and {}",
                self.max_segment_bytes, MAX_SEGMENT_BYTES
            )));
        }
        for (name, scale) in [("fixed-scale-x", self.fixed_scale_x), ("fixed-scale-y", self.fixed_scale_y)] {
            if scale > MAX_SCALE {
                return Err(DumpError::InvalidConfiguration(format!(
                    "{} {} exceeds {}",
                    name, scale, MAX_SCALE
                )));
            }
        }
        for (name, border) in [
            ("border-top", self.border_top),
            ("border-bottom", self.border_bottom),
            ("border-left", self.border_left),
            ("border-right", self.border_right),
        ] {
            if border > MAX_BORDER {
                return Err(DumpError::InvalidConfiguration(format!(
                    "{} {} exceeds {}",
                    name, border, MAX_BORDER
                )));
            }
        }
        Ok(())
    }

    /// Settings handed to the codec factories.
    pub fn codec_settings(&self) -> CodecSettings {
        CodecSettings {
            compression_level: self.compression_level,
            keyframe_interval: self.keyframe_interval,
            block_size: self.block_size,
        }
    }
}
