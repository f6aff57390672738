//! The dump handle used by the emulation loop.

use crate::config::DumpConfig;
use crate::error::{DumpError, Result};
use crate::frame::Frame;
use crate::resample_worker::ResampleHandle;
use crate::segment::DumpStats;
use crate::sound_rate::{plan, repeat_frames, AudioPlan, SourceRate};
use crate::transform::{check_input, FrameTransform};
use crate::worker::{MuxerHandle, MuxerSettings, CHANNELS};
use avidump_codecs::CodecRegistry;
use avidump_resample::SincResampler;
use tracing::{debug, info};

/// A running dump.
///
/// Frames block only while the previous frame is still being encoded; audio
/// never blocks. Errors from the worker threads come back from the next call.
///
/// ```no_run
/// use avidump::{AviWriter, DumpConfig, SourceRate};
/// use avidump_codecs::CodecRegistry;
///
/// # fn main() -> avidump::Result<()> {
/// let registry = CodecRegistry::with_builtin();
/// let config = DumpConfig::default();
/// let mut writer = AviWriter::start(&config, &registry, "zmbv/pcm", SourceRate::hz(48000)?, "capture")?;
///
/// let pixels = vec![0x00ff0000u32; 256 * 224];
/// writer.push_audio(&[0i16; 1600])?;
/// writer.push_frame(&pixels, 256, 256, 224, 60, 1, false)?;
///
/// let stats = writer.end()?;
/// println!("{} frames in {} files", stats.frames, stats.segments.len());
/// # Ok(())
/// # }
/// ```
pub struct AviWriter {
    muxer: MuxerHandle,
    resampler: Option<ResampleHandle>,
    transform: FrameTransform,
    plan: AudioPlan,
    repeated: Vec<i16>,
    ended: bool,
}

impl AviWriter {
    /// Validate everything, then spawn the workers.
    ///
    /// `codecs` is `"<video>/<audio>"` as registered in `registry`. Segment
    /// files are named `prefix_NNNNN.avi`.
    pub fn start(
        config: &DumpConfig,
        registry: &CodecRegistry,
        codecs: &str,
        sound_rate: SourceRate,
        prefix: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(DumpError::InvalidConfiguration("empty file prefix".to_string()));
        }

        let pair = registry
            .resolve(codecs, &config.codec_settings())
            .map_err(DumpError::from_codec_setup)?;
        let plan = plan(config.sound_rate_mode, sound_rate)?;

        let resampler = if plan.resample {
            Some(SincResampler::with_defaults(
                sound_rate.as_f64(),
                plan.output_rate as f64,
                CHANNELS as usize,
            )?)
        } else {
            None
        };

        info!(
            codecs,
            prefix = %prefix,
            source_rate = sound_rate.as_f64(),
            audio_rate = plan.output_rate,
            mode = %config.sound_rate_mode,
            "starting dump"
        );

        let muxer = MuxerHandle::spawn(
            MuxerSettings {
                prefix,
                audio_rate: plan.output_rate,
                max_frames_per_segment: config.max_frames_per_segment,
                max_segment_bytes: config.max_segment_bytes,
            },
            pair.video,
            pair.audio,
        )?;
        let resampler = match resampler {
            Some(resampler) => Some(ResampleHandle::spawn(resampler, muxer.audio_sink())?),
            None => None,
        };

        Ok(AviWriter {
            muxer,
            resampler,
            transform: FrameTransform::from_config(config),
            plan,
            repeated: Vec::new(),
            ended: false,
        })
    }

    /// Sample rate written to the files.
    pub fn audio_rate(&self) -> u32 {
        self.plan.output_rate
    }

    /// Queue one frame of packed `0x00RRGGBB` pixels; `stride` is in pixels.
    ///
    /// Blocks until the previous frame has been encoded.
    #[allow(clippy::too_many_arguments)]
    pub fn push_frame(
        &mut self,
        pixels: &[u32],
        stride: usize,
        width: u32,
        height: u32,
        fps_n: u32,
        fps_d: u32,
        force_break: bool,
    ) -> Result<()> {
        if self.ended {
            return Err(DumpError::Ended);
        }
        self.muxer.check()?;
        if fps_n == 0 || fps_d == 0 {
            return Err(DumpError::InvalidInput(format!(
                "frame rate {}/{} is not positive",
                fps_n, fps_d
            )));
        }

        let mut owned = Vec::new();
        let (width, height) = if self.transform.is_identity() {
            check_input(pixels, stride, width, height)?;
            if stride == width as usize {
                owned.extend_from_slice(&pixels[..width as usize * height as usize]);
            } else {
                for row in pixels.chunks(stride).take(height as usize) {
                    owned.extend_from_slice(&row[..width as usize]);
                }
            }
            (width, height)
        } else {
            self.transform.apply(pixels, stride, width, height, &mut owned)?
        };

        self.muxer.queue_video(Frame {
            pixels: owned,
            width,
            height,
            fps_n,
            fps_d,
            force_break,
        })
    }

    /// Queue interleaved stereo samples at the source rate.
    pub fn push_audio(&mut self, samples: &[i16]) -> Result<()> {
        if self.ended {
            return Err(DumpError::Ended);
        }
        if samples.len() % CHANNELS as usize != 0 {
            return Err(DumpError::InvalidInput(format!(
                "{} samples do not form whole stereo frames",
                samples.len()
            )));
        }

        if let Some(resampler) = self.resampler.as_mut() {
            self.muxer.check()?;
            return resampler.queue_audio(samples);
        }
        if self.plan.repeat > 1 {
            repeat_frames(samples, CHANNELS as usize, self.plan.repeat, &mut self.repeated);
            return self.muxer.queue_audio(&self.repeated);
        }
        self.muxer.queue_audio(samples)
    }

    /// Write everything still pending, close the last segment and stop the
    /// workers.
    pub fn end(&mut self) -> Result<DumpStats> {
        if self.ended {
            return Err(DumpError::Ended);
        }
        self.ended = true;

        // The resampler feeds the muxer, so it drains first
        let resampled = match self.resampler.as_mut() {
            Some(resampler) => resampler.send_end(),
            None => Ok(()),
        };
        let stats = self.muxer.finish()?;
        resampled?;

        debug!(
            segments = stats.segments.len(),
            frames = stats.frames,
            audio_samples = stats.audio_samples,
            "dump ended"
        );
        Ok(stats)
    }
}

impl Drop for AviWriter {
    fn drop(&mut self) {
        if !self.ended {
            if let Some(resampler) = self.resampler.as_mut() {
                let _ = resampler.send_end();
            }
            let _ = self.muxer.finish();
        }
    }
}
