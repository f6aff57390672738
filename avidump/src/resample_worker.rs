//! Resample worker for the `hq-*` sound rate modes.
//!
//! Sits between the producer and the muxer's [`AudioSink`]: converts blocks
//! of at most [`BLOCK_FRAMES`] sample frames to float, resamples them and
//! forwards clamped 16-bit samples. Input is handled as soon as the channel
//! runs dry, so the only added delay is the filter's.

use crate::error::{DumpError, Result};
use crate::worker::{AudioSink, CHANNELS};
use avidump_resample::{ResamplerImpl, SincResampler};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Largest block handed to the resampler, in sample frames.
pub const BLOCK_FRAMES: usize = 4096;

enum ResampleCommand {
    Samples(Vec<i16>),
    End,
}

/// Producer-side handle of the resample thread.
pub struct ResampleHandle {
    commands: Sender<ResampleCommand>,
    thread: Option<JoinHandle<()>>,
    error: Arc<Mutex<Option<DumpError>>>,
    failed: bool,
}

impl ResampleHandle {
    /// Spawn a thread running `resampler` and feeding `sink`.
    pub fn spawn(resampler: SincResampler, sink: AudioSink) -> Result<Self> {
        if resampler.channels() != CHANNELS as usize {
            return Err(DumpError::InvalidConfiguration(format!(
                "resampler has {} channels, dumps carry {}",
                resampler.channels(),
                CHANNELS
            )));
        }

        let (commands, rx) = unbounded();
        let error = Arc::new(Mutex::new(None));
        let worker_error = Arc::clone(&error);

        debug!(
            input_rate = resampler.input_rate(),
            output_rate = resampler.output_rate(),
            "starting resample worker"
        );

        let thread = std::thread::Builder::new()
            .name("avidump-resample".to_string())
            .spawn(move || {
                let mut worker = ResampleWorker {
                    resampler,
                    sink,
                    input: Vec::new(),
                    output: Vec::new(),
                };
                if let Err(err) = worker.run(&rx) {
                    warn!(error = %err, "resample worker stopped");
                    *worker_error.lock() = Some(err);
                }
            })?;

        Ok(ResampleHandle {
            commands,
            thread: Some(thread),
            error,
            failed: false,
        })
    }

    fn check(&mut self) -> Result<()> {
        if self.failed {
            return Err(DumpError::Aborted);
        }
        if let Some(err) = self.error.lock().take() {
            self.failed = true;
            return Err(err);
        }
        Ok(())
    }

    /// Queue interleaved samples at the source rate. Never blocks.
    pub fn queue_audio(&mut self, samples: &[i16]) -> Result<()> {
        self.check()?;
        if samples.is_empty() {
            return Ok(());
        }
        if self
            .commands
            .send(ResampleCommand::Samples(samples.to_vec()))
            .is_err()
        {
            self.failed = true;
            return Err(self.error.lock().take().unwrap_or(DumpError::Aborted));
        }
        Ok(())
    }

    /// Resample everything queued, drain the filter delay and join the
    /// thread.
    pub fn send_end(&mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            let _ = self.commands.send(ResampleCommand::End);
            thread.join().map_err(|_| DumpError::WorkerPanicked)?;
        }
        self.check()
    }
}

impl Drop for ResampleHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.commands.send(ResampleCommand::End);
            if thread.join().is_err() {
                warn!("resample worker panicked");
            }
        }
    }
}

struct ResampleWorker {
    resampler: SincResampler,
    sink: AudioSink,
    /// Normalized input not yet resampled
    input: Vec<f32>,
    output: Vec<i16>,
}

impl ResampleWorker {
    fn run(&mut self, commands: &Receiver<ResampleCommand>) -> Result<()> {
        loop {
            let command = match commands.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty) => {
                    self.process(false)?;
                    match commands.recv() {
                        Ok(command) => command,
                        Err(_) => return self.end(),
                    }
                }
                Err(TryRecvError::Disconnected) => return self.end(),
            };

            match command {
                ResampleCommand::Samples(samples) => {
                    self.input
                        .extend(samples.iter().map(|&s| s as f32 / 32768.0));
                    self.process(true)?;
                }
                ResampleCommand::End => return self.end(),
            }
        }
    }

    /// Resample buffered input: whole blocks only when `full_blocks`,
    /// everything otherwise.
    fn process(&mut self, full_blocks: bool) -> Result<()> {
        let channels = CHANNELS as usize;
        let block = BLOCK_FRAMES * channels;
        let usable = self.input.len() - self.input.len() % channels;
        let mut start = 0;

        while usable - start >= block || (!full_blocks && start < usable) {
            let end = (start + block).min(usable);
            let resampled = self
                .resampler
                .process_interleaved(&self.input[start..end], channels)?;
            self.forward(&resampled)?;
            start = end;
        }

        self.input.drain(..start);
        Ok(())
    }

    fn forward(&mut self, resampled: &[f32]) -> Result<()> {
        self.output.clear();
        self.output.extend(
            resampled
                .iter()
                .map(|&s| (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16),
        );
        self.sink.push(&self.output)
    }

    fn end(&mut self) -> Result<()> {
        self.process(false)?;
        let tail = self.resampler.flush_interleaved(CHANNELS as usize)?;
        self.forward(&tail)?;
        debug!(tail_samples = tail.len(), "resampler drained");
        Ok(())
    }
}
