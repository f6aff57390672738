//! Dump a synthetic source to AVI segments.

use crate::commands::info::{format_size, inspect, SegmentReport};
use crate::pattern::{parse_key_value, parse_rational, TestPattern, Tone};
use anyhow::Context;
use avidump::{AviWriter, DumpConfig, DumpStats, SourceRate, Timer};
use avidump_codecs::CodecRegistry;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};

/// Dump a moving test pattern and a sine tone.
#[derive(Args, Debug)]
pub struct CmdDump {
    /// Segment file prefix; files are named PREFIX_NNNNN.avi.
    #[arg(short, long, default_value = "avidump")]
    pub prefix: String,

    /// Codec pair as <video>/<audio>.
    #[arg(short, long, default_value = "zmbv/pcm")]
    pub codecs: String,

    /// Number of frames to dump.
    #[arg(short = 'n', long, default_value_t = 300)]
    pub frames: u64,

    /// Source width in pixels.
    #[arg(long, default_value_t = 256)]
    pub width: u32,

    /// Source height in pixels.
    #[arg(long, default_value_t = 224)]
    pub height: u32,

    /// Frame rate as N or N/D.
    #[arg(long, default_value = "60", value_parser = parse_rational)]
    pub fps: (u32, u32),

    /// Source sound rate as N or N/D.
    #[arg(long, default_value = "48000", value_parser = parse_rational)]
    pub sound_rate: (u32, u32),

    /// Tone frequency in Hz.
    #[arg(long, default_value_t = 440.0)]
    pub tone: f64,

    /// TOML settings file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override one setting (repeatable).
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// Re-read every segment and check its index.
    #[arg(long)]
    pub verify: bool,

    /// Output in JSON format.
    #[arg(long)]
    pub json: bool,
}

/// What the command reports.
#[derive(Debug, Serialize)]
struct DumpReport {
    audio_rate: u32,
    elapsed_seconds: f64,
    stats: DumpStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    verified: Option<Vec<SegmentReport>>,
}

impl CmdDump {
    /// Settings from the config file, then the `-o` overrides.
    pub fn load_config(&self) -> anyhow::Result<DumpConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
            }
            None => DumpConfig::default(),
        };
        for (key, value) in &self.options {
            config.set_option(key, value)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Execute the dump command.
    pub fn run(&self) -> anyhow::Result<()> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("Frame size must be non-zero, got {}x{}", self.width, self.height);
        }

        let config = self.load_config()?;
        let (fps_n, fps_d) = self.fps;
        let (rate_n, rate_d) = self.sound_rate;
        let source_rate = SourceRate::new(rate_n, rate_d)?;

        if !self.json {
            self.print_config(&config);
        }

        let registry = CodecRegistry::with_builtin();
        let mut writer = AviWriter::start(&config, &registry, &self.codecs, source_rate, self.prefix.as_str())?;

        // Source sample frames per video frame
        let mut samples = Timer::new(
            rate_n as u64 * fps_d as u64,
            rate_d as u64 * fps_n as u64,
        );
        let mut pattern = TestPattern::new(self.width, self.height);
        let mut tone = Tone::new(self.tone, source_rate.as_f64());
        let mut audio = Vec::new();

        let progress = if self.json {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(self.frames);
            pb.set_style(progress_style());
            pb
        };

        let started = Instant::now();
        for _ in 0..self.frames {
            let before = samples.read();
            let count = samples.read_next() - before;
            tone.fill(count as usize, &mut audio);
            writer.push_audio(&audio)?;

            let pixels = pattern.next_frame();
            writer.push_frame(pixels, self.width as usize, self.width, self.height, fps_n, fps_d, false)?;
            progress.inc(1);
        }
        let stats = writer.end()?;
        let elapsed = started.elapsed().as_secs_f64();
        progress.finish_and_clear();
        debug!(elapsed, "dump complete");

        let verified = if self.verify {
            let mut reports = Vec::with_capacity(stats.segments.len());
            for segment in &stats.segments {
                let report = inspect(&segment.path)?;
                if !report.is_valid() || report.total_frames != segment.frames {
                    warn!(file = %report.file, error = ?report.index_error, "segment failed verification");
                }
                reports.push(report);
            }
            Some(reports)
        } else {
            None
        };

        let report = DumpReport {
            audio_rate: writer.audio_rate(),
            elapsed_seconds: elapsed,
            stats,
            verified,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        if let Some(reports) = &report.verified {
            let failed = reports
                .iter()
                .zip(&report.stats.segments)
                .filter(|(r, s)| !r.is_valid() || r.total_frames != s.frames)
                .count();
            if failed > 0 {
                anyhow::bail!("{} segment(s) failed verification", failed);
            }
        }

        Ok(())
    }

    fn print_config(&self, config: &DumpConfig) {
        println!();
        println!("{}", style("Configuration:").cyan().bold());
        println!("  Prefix:       {}", style(&self.prefix).white());
        println!("  Codecs:       {}", style(&self.codecs).white());
        println!(
            "  Source:       {}x{} @ {}/{} fps",
            style(self.width).white(),
            style(self.height).white(),
            self.fps.0,
            self.fps.1
        );
        println!(
            "  Sound rate:   {}/{} Hz ({})",
            self.sound_rate.0,
            self.sound_rate.1,
            style(config.sound_rate_mode).white()
        );
        println!("  Level:        {}", style(config.compression_level).white());
        println!("  Keyframes:    every {} frames", style(config.keyframe_interval).white());
        if config.max_frames_per_segment > 0 {
            println!("  Split at:     {} frames", style(config.max_frames_per_segment).white());
        }
        println!("  Split size:   {}", style(format_size(config.max_segment_bytes)).white());
        println!();
    }
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} frames | ETA: {eta}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-")
}

fn print_report(report: &DumpReport) {
    let stats = &report.stats;
    println!("{}", style("Dump complete!").green().bold());
    println!();
    println!("{}", style("Statistics:").cyan().bold());
    println!("  Frames:       {}", style(stats.frames).white());
    println!(
        "  Audio:        {} samples @ {} Hz",
        style(stats.audio_samples).white(),
        report.audio_rate
    );
    println!("  Elapsed:      {:.2}s", report.elapsed_seconds);
    if report.elapsed_seconds > 0.0 {
        println!(
            "  Speed:        {}",
            style(format!("{:.1} fps", stats.frames as f64 / report.elapsed_seconds)).yellow()
        );
    }

    println!();
    println!("{}", style("Segments:").cyan().bold());
    for (i, segment) in stats.segments.iter().enumerate() {
        let check = match report.verified.as_ref().and_then(|v| v.get(i)) {
            Some(r) if r.is_valid() && r.total_frames == segment.frames => style(" ok").green(),
            Some(_) => style(" bad").red(),
            None => style("").dim(),
        };
        println!(
            "  {}  {:>6} frames  {:>10}{}",
            style(segment.path.display()).green(),
            segment.frames,
            format_size(segment.bytes),
            check
        );
    }
    println!();
}
