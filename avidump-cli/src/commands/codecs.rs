//! List available codecs command.

use avidump_codecs::{CodecRegistry, CodecSettings};
use clap::Args;
use console::style;
use serde::Serialize;

/// Information about a codec.
#[derive(Debug, Clone, Serialize)]
pub struct CodecEntry {
    /// Registry name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Codec type (video/audio).
    #[serde(rename = "type")]
    pub codec_type: &'static str,
    /// Whether every packet is a keyframe.
    pub intra_only: bool,
}

/// List available codecs.
#[derive(Args, Debug)]
pub struct CmdCodecs {
    /// Output in JSON format.
    #[arg(long)]
    pub json: bool,
}

impl CmdCodecs {
    /// Execute the codecs command.
    pub fn run(&self) -> anyhow::Result<()> {
        let codecs = available_codecs(&CodecRegistry::with_builtin())?;

        if self.json {
            let output = serde_json::json!({ "codecs": codecs });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!();
        println!("{}", style("Available Codecs").cyan().bold());
        for (title, kind) in [("Video Codecs:", "video"), ("Audio Codecs:", "audio")] {
            println!();
            println!("{}", style(title).white().bold());
            for codec in codecs.iter().filter(|c| c.codec_type == kind) {
                let intra = if codec.intra_only {
                    style("I").green()
                } else {
                    style("-").dim()
                };
                println!("  {} [{}] {}", style(&codec.name).yellow(), intra, codec.description);
            }
        }
        println!();
        println!("  Select a pair with {}", style("--codecs <video>/<audio>").white());
        Ok(())
    }
}

/// Instantiate every registered codec once to describe it.
pub fn available_codecs(registry: &CodecRegistry) -> anyhow::Result<Vec<CodecEntry>> {
    let settings = CodecSettings::default();
    let mut entries = Vec::new();

    for name in registry.video_names() {
        let info = registry.create_video(name, &settings)?.codec_info();
        entries.push(CodecEntry {
            name: name.to_string(),
            description: info.long_name.to_string(),
            codec_type: "video",
            intra_only: info.intra_only,
        });
    }
    for name in registry.audio_names() {
        let info = registry.create_audio(name, &settings)?.codec_info();
        entries.push(CodecEntry {
            name: name.to_string(),
            description: info.long_name.to_string(),
            codec_type: "audio",
            intra_only: info.intra_only,
        });
    }

    Ok(entries)
}
