//! Segment inspection command.

use avidump_avi::{SegmentSummary, StreamInfo};
use clap::Args;
use console::style;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One declared stream.
#[derive(Debug, Clone, Serialize)]
pub struct StreamReport {
    /// Stream index.
    pub index: u32,
    /// Stream type (video/audio).
    #[serde(rename = "type")]
    pub stream_type: String,
    /// strh fccHandler.
    pub handler: String,
    /// strh dwLength.
    pub length: u32,
    /// rate / scale.
    pub rate: f64,
    /// Video-specific: biCompression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    /// Video-specific: width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Video-specific: height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Video-specific: bits per pixel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_count: Option<u16>,
    /// Audio-specific: format name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Audio-specific: channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
    /// Audio-specific: bits per sample.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits_per_sample: Option<u16>,
}

impl StreamReport {
    fn from_stream(stream: &StreamInfo) -> Self {
        let video = stream.video_format.as_ref();
        let audio = stream.audio_format.as_ref();
        StreamReport {
            index: stream.index,
            stream_type: if stream.is_video() {
                "video"
            } else if stream.is_audio() {
                "audio"
            } else {
                "unknown"
            }
            .to_string(),
            handler: String::from_utf8_lossy(&stream.header.handler).to_string(),
            length: stream.header.length,
            rate: stream.rate(),
            compression: video.map(|v| v.codec_string()),
            width: video.map(|v| v.width.unsigned_abs()),
            height: video.map(|v| v.abs_height()),
            bit_count: video.map(|v| v.bit_count),
            format: audio.map(|a| a.format_name().to_string()),
            channels: audio.map(|a| a.channels),
            bits_per_sample: audio.map(|a| a.bits_per_sample),
        }
    }
}

/// Structure of one segment file.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentReport {
    /// File path.
    pub file: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// avih dwTotalFrames.
    pub total_frames: u32,
    /// Frames per second from avih.
    pub frame_rate: f64,
    /// Video chunks in movi.
    pub video_chunks: usize,
    /// Video chunks flagged as keyframes in idx1.
    pub keyframes: usize,
    /// Audio chunks in movi.
    pub audio_chunks: usize,
    /// Audio payload bytes.
    pub audio_bytes: usize,
    /// idx1 entries.
    pub index_entries: usize,
    /// Absolute offset of the movi list.
    pub movi_offset: u64,
    /// Problem found by the index check, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_error: Option<String>,
    /// Declared streams.
    pub streams: Vec<StreamReport>,
}

impl SegmentReport {
    /// Whether the idx1 check passed and the segment opens on a keyframe.
    pub fn is_valid(&self) -> bool {
        self.index_error.is_none() && (self.video_chunks == 0 || self.keyframes > 0)
    }
}

/// Read a segment and summarize it.
pub fn inspect(path: &Path) -> anyhow::Result<SegmentReport> {
    let data = std::fs::read(path)?;
    let summary = SegmentSummary::parse(&data)?;

    let video_chunks = summary.video_chunks().count();
    let keyframes = summary
        .video_chunks()
        .filter(|c| summary.is_keyframe(c))
        .count();
    let mut index_error = summary.check_index().err().map(|e| e.to_string());
    if index_error.is_none() {
        if let Some(first) = summary.video_chunks().next() {
            if !summary.is_keyframe(first) {
                index_error = Some("first video chunk is not a keyframe".to_string());
            }
        }
    }

    Ok(SegmentReport {
        file: path.display().to_string(),
        size_bytes: data.len() as u64,
        total_frames: summary.header.total_frames,
        frame_rate: summary.header.frame_rate(),
        video_chunks,
        keyframes,
        audio_chunks: summary.audio_chunks().count(),
        audio_bytes: summary.audio_bytes(),
        index_entries: summary.index.len(),
        movi_offset: summary.movi_offset,
        index_error,
        streams: summary.streams.iter().map(StreamReport::from_stream).collect(),
    })
}

/// Inspect an AVI segment.
#[derive(Args, Debug)]
pub struct CmdInfo {
    /// Path to the segment file.
    pub file: PathBuf,

    /// Output in JSON format.
    #[arg(long)]
    pub json: bool,
}

impl CmdInfo {
    /// Execute the info command.
    pub fn run(&self) -> anyhow::Result<()> {
        if !self.file.exists() {
            anyhow::bail!("File not found: {}", self.file.display());
        }

        let report = inspect(&self.file)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        Ok(())
    }
}

fn print_report(report: &SegmentReport) {
    println!();
    println!("{}", style("Segment Information").cyan().bold());
    println!();

    println!("  {:<16} {}", style("File:").white(), report.file);
    println!("  {:<16} {}", style("Size:").white(), format_size(report.size_bytes));
    println!("  {:<16} {}", style("Frames:").white(), report.total_frames);
    println!("  {:<16} {:.3} fps", style("Frame Rate:").white(), report.frame_rate);
    println!(
        "  {:<16} {} video ({} key), {} audio",
        style("Chunks:").white(),
        report.video_chunks,
        report.keyframes,
        report.audio_chunks
    );
    println!("  {:<16} {} entries", style("Index:").white(), report.index_entries);
    match &report.index_error {
        Some(error) => println!("  {:<16} {}", style("Check:").white(), style(error).red()),
        None => println!("  {:<16} {}", style("Check:").white(), style("ok").green()),
    }

    if !report.streams.is_empty() {
        println!();
        println!("{}", style("Streams:").cyan().bold());

        for stream in &report.streams {
            println!();
            println!(
                "  {} #{} ({})",
                style("Stream").white(),
                stream.index,
                style(&stream.stream_type).yellow()
            );
            println!("    {:<14} {}", style("Handler:").dim(), stream.handler);
            println!("    {:<14} {}", style("Length:").dim(), stream.length);
            println!("    {:<14} {:.3}", style("Rate:").dim(), stream.rate);

            if let Some(compression) = &stream.compression {
                println!("    {:<14} {}", style("Compression:").dim(), compression);
            }
            if let (Some(w), Some(h)) = (stream.width, stream.height) {
                println!("    {:<14} {}x{}", style("Resolution:").dim(), w, h);
            }
            if let Some(bits) = stream.bit_count {
                println!("    {:<14} {} bpp", style("Depth:").dim(), bits);
            }

            if let Some(format) = &stream.format {
                println!("    {:<14} {}", style("Format:").dim(), format);
            }
            if let Some(ch) = stream.channels {
                let ch_str = match ch {
                    1 => "mono".to_string(),
                    2 => "stereo".to_string(),
                    _ => format!("{} channels", ch),
                };
                println!("    {:<14} {}", style("Channels:").dim(), ch_str);
            }
            if let Some(bits) = stream.bits_per_sample {
                println!("    {:<14} {} bit", style("Sample Size:").dim(), bits);
            }
        }
    }

    println!();
}

pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avidump::{AviWriter, DumpConfig, SourceRate};
    use avidump_codecs::CodecRegistry;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_inspect_written_segment() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("info").display().to_string();
        let registry = CodecRegistry::with_builtin();
        let mut writer = AviWriter::start(
            &DumpConfig::default(),
            &registry,
            "cscd/pcm",
            SourceRate::hz(48000).unwrap(),
            prefix,
        )
        .unwrap();

        let pixels = vec![0x0000_ff00u32; 32 * 16];
        for _ in 0..3 {
            writer.push_audio(&[0i16; 1600]).unwrap();
            writer.push_frame(&pixels, 32, 32, 16, 60, 1, false).unwrap();
        }
        let stats = writer.end().unwrap();

        let report = inspect(&stats.segments[0].path).unwrap();
        assert!(report.is_valid(), "{:?}", report.index_error);
        assert_eq!(report.total_frames, 3);
        assert_eq!(report.video_chunks, 3);
        assert_eq!(report.keyframes, 1);
        assert_eq!(report.streams.len(), 2);
        assert_eq!(report.streams[0].handler, "CSCD");
        assert_eq!(report.streams[0].width, Some(32));
        assert_eq!(report.streams[1].channels, Some(2));
        assert_eq!(report.movi_offset % 2048, 0);
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.avi");
        std::fs::write(&path, b"not an avi file").unwrap();
        assert!(inspect(&path).is_err());
    }
}
