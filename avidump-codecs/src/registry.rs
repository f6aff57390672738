//! Name-based codec lookup.

use crate::audio::PcmCodec;
use crate::error::{CodecError, Result};
use crate::traits::{AudioCodec, CodecSettings, VideoCodec};
use crate::video::{CscdCodec, UncompressedCodec, ZmbvCodec};

/// Builds a video codec from the shared settings.
pub type VideoFactory = Box<dyn Fn(&CodecSettings) -> Result<Box<dyn VideoCodec>> + Send + Sync>;

/// Builds an audio codec from the shared settings.
pub type AudioFactory = Box<dyn Fn(&CodecSettings) -> Result<Box<dyn AudioCodec>> + Send + Sync>;

/// A video and an audio codec resolved from one selection string.
pub struct CodecPair {
    pub video: Box<dyn VideoCodec>,
    pub audio: Box<dyn AudioCodec>,
}

impl std::fmt::Debug for CodecPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecPair")
            .field("video", &self.video.codec_info().name)
            .field("audio", &self.audio.codec_info().name)
            .finish()
    }
}

/// Codec factories keyed by name, in registration order.
#[derive(Default)]
pub struct CodecRegistry {
    video: Vec<(String, VideoFactory)>,
    audio: Vec<(String, AudioFactory)>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `uncompressed`, `cscd`, `zmbv` and `pcm`.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_video("uncompressed", |_| Ok(Box::new(UncompressedCodec::new())));
        registry.register_video("cscd", |s| Ok(Box::new(CscdCodec::new(s)?)));
        registry.register_video("zmbv", |s| Ok(Box::new(ZmbvCodec::new(s)?)));
        registry.register_audio("pcm", |_| Ok(Box::new(PcmCodec::new())));
        registry
    }

    /// Add or replace a video codec.
    pub fn register_video<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&CodecSettings) -> Result<Box<dyn VideoCodec>> + Send + Sync + 'static,
    {
        self.video.retain(|(n, _)| n != name);
        self.video.push((name.to_string(), Box::new(factory)));
    }

    /// Add or replace an audio codec.
    pub fn register_audio<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&CodecSettings) -> Result<Box<dyn AudioCodec>> + Send + Sync + 'static,
    {
        self.audio.retain(|(n, _)| n != name);
        self.audio.push((name.to_string(), Box::new(factory)));
    }

    /// Instantiate the named video codec.
    pub fn create_video(&self, name: &str, settings: &CodecSettings) -> Result<Box<dyn VideoCodec>> {
        let (_, factory) = self
            .video
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| CodecError::InvalidConfiguration(format!("unknown video codec '{}'", name)))?;
        factory(settings)
    }

    /// Instantiate the named audio codec.
    pub fn create_audio(&self, name: &str, settings: &CodecSettings) -> Result<Box<dyn AudioCodec>> {
        let (_, factory) = self
            .audio
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| CodecError::InvalidConfiguration(format!("unknown audio codec '{}'", name)))?;
        factory(settings)
    }

    /// Resolve a `"<video>/<audio>"` selection.
    pub fn resolve(&self, selection: &str, settings: &CodecSettings) -> Result<CodecPair> {
        let (video, audio) = selection.split_once('/').ok_or_else(|| {
            CodecError::InvalidConfiguration(format!(
                "codec selection '{}' is not of the form <video>/<audio>",
                selection
            ))
        })?;

        Ok(CodecPair {
            video: self.create_video(video.trim(), settings)?,
            audio: self.create_audio(audio.trim(), settings)?,
        })
    }

    /// Registered video codec names.
    pub fn video_names(&self) -> Vec<&str> {
        self.video.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Registered audio codec names.
    pub fn audio_names(&self) -> Vec<&str> {
        self.audio.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("video", &self.video_names())
            .field("audio", &self.audio_names())
            .finish()
    }
}
