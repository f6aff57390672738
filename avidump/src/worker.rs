//! Muxer worker.
//!
//! The worker thread owns both codecs and the open [`Segment`]. The producer
//! talks to it through two channels:
//!
//! - a command channel carrying frames, audio wake-ups and the final `End`
//! - a one-token slot channel: the producer takes the token before handing
//!   over a frame and the worker returns it once the frame is encoded, so at
//!   most one frame is ever in flight
//!
//! Audio bypasses the command channel and lands in a shared [`SampleQueue`].
//! An encoded frame waits in the worker until its share of audio (from the
//! sample [`Timer`]) is queued, or until the next frame, a forced break or
//! `End` pushes it out with the shortfall zero-filled.

use crate::error::{DumpError, Result};
use crate::frame::Frame;
use crate::sample_queue::SampleQueue;
use crate::segment::{segment_path, DumpStats, Segment};
use crate::timer::Timer;
use avidump_avi::{Packet, AUDIO_TRACK, VIDEO_TRACK};
use avidump_codecs::{AudioCodec, AudioCodecExt, VideoCodec, VideoCodecExt};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, trace, warn};

/// Interleaved channels in every dump.
pub const CHANNELS: u16 = 2;

/// Chunk header plus idx1 entry of one packet.
const PACKET_OVERHEAD: u64 = 8 + 16;

/// Codec framing and zlib expansion on top of 4 bytes per pixel.
const FRAME_SLACK: u64 = 4096;

enum Command {
    Frame(Frame),
    /// New audio is queued
    Flush,
    End,
}

#[derive(Debug, Default)]
struct Shared {
    queue: SampleQueue,
    flush_pending: AtomicBool,
    error: Mutex<Option<DumpError>>,
}

/// Where a dump's audio goes. Cloneable so a resample stage can feed it from
/// its own thread.
#[derive(Clone)]
pub struct AudioSink {
    shared: Arc<Shared>,
    commands: Sender<Command>,
}

impl AudioSink {
    /// Queue interleaved samples and wake the worker.
    ///
    /// Wake-ups are coalesced: at most one is outstanding at a time.
    pub fn push(&self, samples: &[i16]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        self.shared.queue.push(samples)?;
        if !self.shared.flush_pending.swap(true, Ordering::AcqRel) {
            self.commands
                .send(Command::Flush)
                .map_err(|_| DumpError::Aborted)?;
        }
        Ok(())
    }
}

/// What the worker needs besides its codecs.
#[derive(Debug, Clone)]
pub struct MuxerSettings {
    /// Segment files are `prefix_NNNNN.avi`
    pub prefix: String,
    /// Sample rate written to every segment
    pub audio_rate: u32,
    /// 0 = unlimited
    pub max_frames_per_segment: u32,
    pub max_segment_bytes: u64,
}

/// Producer-side handle of the muxer thread.
pub struct MuxerHandle {
    sink: AudioSink,
    slot: Receiver<()>,
    thread: Option<JoinHandle<DumpStats>>,
    failed: bool,
}

impl MuxerHandle {
    /// Spawn the worker thread.
    pub fn spawn(
        settings: MuxerSettings,
        video: Box<dyn VideoCodec>,
        audio: Box<dyn AudioCodec>,
    ) -> Result<Self> {
        let (commands_tx, commands_rx) = unbounded();
        let (slot_tx, slot_rx) = bounded(1);
        slot_tx
            .send(())
            .map_err(|_| DumpError::InvalidConfiguration("slot channel closed".to_string()))?;

        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);

        let thread = std::thread::Builder::new()
            .name("avidump-muxer".to_string())
            .spawn(move || {
                let mut muxer = Muxer::new(settings, video, audio, Arc::clone(&worker_shared), slot_tx);
                if let Err(err) = muxer.run(&commands_rx) {
                    warn!(error = %err, "muxer worker stopped");
                    *worker_shared.error.lock() = Some(err);
                }
                muxer.stats
            })?;

        Ok(MuxerHandle {
            sink: AudioSink {
                shared,
                commands: commands_tx,
            },
            slot: slot_rx,
            thread: Some(thread),
            failed: false,
        })
    }

    /// A sink feeding this worker's audio queue.
    pub fn audio_sink(&self) -> AudioSink {
        self.sink.clone()
    }

    /// Return a stored worker error once; `Aborted` afterwards.
    pub fn check(&mut self) -> Result<()> {
        if self.failed {
            return Err(DumpError::Aborted);
        }
        if let Some(err) = self.sink.shared.error.lock().take() {
            self.failed = true;
            return Err(err);
        }
        Ok(())
    }

    /// The worker went away: report why.
    fn worker_gone(&mut self) -> DumpError {
        if let Err(err) = self.check() {
            return err;
        }
        self.failed = true;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                return DumpError::WorkerPanicked;
            }
        }
        self.sink
            .shared
            .error
            .lock()
            .take()
            .unwrap_or(DumpError::Aborted)
    }

    /// Hand a frame over, blocking until the previous one is encoded.
    pub fn queue_video(&mut self, frame: Frame) -> Result<()> {
        self.check()?;
        if self.slot.recv().is_err() {
            return Err(self.worker_gone());
        }
        if self.sink.commands.send(Command::Frame(frame)).is_err() {
            return Err(self.worker_gone());
        }
        Ok(())
    }

    /// Queue interleaved audio. Never blocks.
    pub fn queue_audio(&mut self, samples: &[i16]) -> Result<()> {
        self.check()?;
        if self.sink.push(samples).is_err() {
            return Err(self.worker_gone());
        }
        Ok(())
    }

    /// Write everything pending, close the last segment and join the thread.
    pub fn finish(&mut self) -> Result<DumpStats> {
        let stats = match self.thread.take() {
            Some(thread) => {
                let _ = self.sink.commands.send(Command::End);
                thread.join().map_err(|_| DumpError::WorkerPanicked)?
            }
            None => DumpStats::default(),
        };
        self.check()?;
        Ok(stats)
    }
}

impl Drop for MuxerHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.sink.commands.send(Command::End);
            if thread.join().is_err() {
                warn!("muxer worker panicked");
            }
        }
    }
}

/// An encoded frame waiting for its audio.
struct PendingFrame {
    packets: Vec<Packet>,
    /// Interleaved samples owed with this frame
    quota: usize,
}

struct Muxer {
    settings: MuxerSettings,
    video: Box<dyn VideoCodec>,
    audio: Box<dyn AudioCodec>,
    shared: Arc<Shared>,
    slot: Sender<()>,
    segment: Option<Segment>,
    next_index: u32,
    /// Sample frames owed per video frame
    timer: Timer,
    pending: Option<PendingFrame>,
    video_packets: Vec<Packet>,
    audio_packets: Vec<Packet>,
    audio_buf: Vec<i16>,
    stats: DumpStats,
}

impl Muxer {
    fn new(
        settings: MuxerSettings,
        video: Box<dyn VideoCodec>,
        audio: Box<dyn AudioCodec>,
        shared: Arc<Shared>,
        slot: Sender<()>,
    ) -> Self {
        let timer = Timer::new(settings.audio_rate as u64, 60);
        Muxer {
            settings,
            video,
            audio,
            shared,
            slot,
            segment: None,
            next_index: 0,
            timer,
            pending: None,
            video_packets: Vec::new(),
            audio_packets: Vec::new(),
            audio_buf: Vec::new(),
            stats: DumpStats::default(),
        }
    }

    fn run(&mut self, commands: &Receiver<Command>) -> Result<()> {
        loop {
            match commands.recv() {
                Ok(Command::Frame(frame)) => self.on_frame(frame)?,
                Ok(Command::Flush) => {
                    self.shared.flush_pending.store(false, Ordering::Release);
                    self.write_pending(false)?;
                }
                Ok(Command::End) | Err(_) => return self.end(),
            }
        }
    }

    fn on_frame(&mut self, frame: Frame) -> Result<()> {
        self.write_pending(true)?;

        if let Some(reason) = self.break_reason(&frame) {
            debug!(reason, segment = self.next_index, "segment break");
            self.close_segment()?;
            self.open_segment(&frame)?;
        }

        self.video
            .encode_into(&frame.pixels, frame.width as usize, &mut self.video_packets)?;
        // The producer is waiting on the only other token
        let _ = self.slot.try_send(());

        let before = self.timer.read();
        let owed = self.timer.read_next() - before;
        self.pending = Some(PendingFrame {
            packets: std::mem::take(&mut self.video_packets),
            quota: owed as usize * CHANNELS as usize,
        });

        self.write_pending(frame.force_break)
    }

    fn break_reason(&self, frame: &Frame) -> Option<&'static str> {
        let Some(segment) = &self.segment else {
            return Some("first frame");
        };
        if frame.force_break {
            return Some("forced");
        }
        if !segment.accepts(frame) {
            return Some("format change");
        }
        let max_frames = self.settings.max_frames_per_segment;
        if max_frames > 0 && segment.frame_count() >= max_frames {
            return Some("frame limit");
        }
        if segment.size_estimate() + self.frame_budget(frame) > self.settings.max_segment_bytes {
            return Some("size limit");
        }
        None
    }

    /// Upper bound on what `frame` and its audio quota add to the segment.
    fn frame_budget(&self, frame: &Frame) -> u64 {
        let pixels = frame.width as u64 * frame.height as u64;
        let video = pixels * 4 + pixels / 64 + FRAME_SLACK;
        let owed = self.timer.peek_next() - self.timer.read();
        let audio = owed * CHANNELS as u64 * 2;
        video + audio + 2 * PACKET_OVERHEAD
    }

    fn open_segment(&mut self, frame: &Frame) -> Result<()> {
        let video_format = self
            .video
            .reset(frame.width, frame.height, frame.fps_n, frame.fps_d)?;
        let audio_format = self.audio.reset(self.settings.audio_rate, CHANNELS)?;
        debug!(
            video = self.video.codec_info().name,
            audio = self.audio.codec_info().name,
            "codecs reset"
        );

        self.timer.rate(
            self.settings.audio_rate as u64 * frame.fps_d as u64,
            frame.fps_n as u64,
        );

        let path = segment_path(&self.settings.prefix, self.next_index);
        self.segment = Some(Segment::create(path, frame, &video_format, &audio_format)?);
        self.next_index += 1;
        Ok(())
    }

    fn close_segment(&mut self) -> Result<()> {
        let Some(mut segment) = self.segment.take() else {
            return Ok(());
        };
        self.audio.flush_into(&mut self.audio_packets)?;
        for packet in &self.audio_packets {
            segment.write_packet(AUDIO_TRACK, packet)?;
        }
        let info = segment.finish()?;
        self.stats.record(info);
        Ok(())
    }

    /// Write the pending frame if its audio is queued, or regardless when
    /// `force` is set.
    fn write_pending(&mut self, force: bool) -> Result<()> {
        let quota = match &self.pending {
            Some(pending) => pending.quota,
            None => return Ok(()),
        };
        if !force && self.shared.queue.available() < quota {
            return Ok(());
        }
        let (Some(pending), Some(segment)) = (self.pending.take(), self.segment.as_mut()) else {
            return Ok(());
        };

        for packet in &pending.packets {
            segment.write_packet(VIDEO_TRACK, packet)?;
        }

        self.audio_buf.clear();
        self.audio_buf.resize(quota, 0);
        let got = self.shared.queue.pull(&mut self.audio_buf);
        if got < quota {
            trace!(missing = quota - got, "audio underrun, zero-filled");
        }
        self.audio.encode_into(&self.audio_buf, &mut self.audio_packets)?;
        for packet in &self.audio_packets {
            segment.write_packet(AUDIO_TRACK, packet)?;
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.write_pending(true)?;

        let available = self.shared.queue.available();
        let remaining = available - available % CHANNELS as usize;
        match self.segment.as_mut() {
            Some(segment) if remaining > 0 => {
                self.audio_buf.clear();
                self.audio_buf.resize(remaining, 0);
                self.shared.queue.pull(&mut self.audio_buf);
                self.audio.encode_into(&self.audio_buf, &mut self.audio_packets)?;
                for packet in &self.audio_packets {
                    segment.write_packet(AUDIO_TRACK, packet)?;
                }
            }
            None if available > 0 => {
                warn!(samples = available, "audio without video discarded");
            }
            _ => {}
        }

        self.close_segment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avidump_avi::SegmentSummary;
    use avidump_codecs::{CodecInfo, CodecRegistry, UncompressedCodec, VideoStreamFormat};
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn settings(dir: &std::path::Path) -> MuxerSettings {
        MuxerSettings {
            prefix: dir.join("unit").to_string_lossy().into_owned(),
            audio_rate: 48000,
            max_frames_per_segment: 0,
            max_segment_bytes: crate::config::DEFAULT_MAX_SEGMENT_BYTES,
        }
    }

    fn frame(width: u32, height: u32) -> Frame {
        Frame {
            pixels: vec![0x00FF0000; (width * height) as usize],
            width,
            height,
            fps_n: 60,
            fps_d: 1,
            force_break: false,
        }
    }

    fn spawn(dir: &std::path::Path) -> MuxerHandle {
        let registry = CodecRegistry::with_builtin();
        let codecs = registry
            .resolve("uncompressed/pcm", &Default::default())
            .unwrap();
        MuxerHandle::spawn(settings(dir), codecs.video, codecs.audio).unwrap()
    }

    #[test]
    fn test_frames_wait_for_their_audio() {
        let dir = tempfile::tempdir().unwrap();
        let mut muxer = spawn(dir.path());

        muxer.queue_audio(&vec![1; 1600]).unwrap();
        muxer.queue_video(frame(8, 8)).unwrap();
        muxer.queue_video(frame(8, 8)).unwrap();

        let stats = muxer.finish().unwrap();
        assert_eq!(stats.segments.len(), 1);
        assert_eq!(stats.frames, 2);
        // First frame's quota was queued, the second one's zero-filled
        assert_eq!(stats.audio_samples, 1600);
    }

    #[test]
    fn test_leftover_audio_is_written_at_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut muxer = spawn(dir.path());

        muxer.queue_video(frame(8, 8)).unwrap();
        muxer.queue_audio(&vec![1; 3000]).unwrap();

        let stats = muxer.finish().unwrap();
        assert_eq!(stats.audio_samples, 1500);
    }

    #[test]
    fn test_audio_without_video_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut muxer = spawn(dir.path());

        muxer.queue_audio(&[1; 64]).unwrap();
        let stats = muxer.finish().unwrap();
        assert!(stats.segments.is_empty());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_finish_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut muxer = spawn(dir.path());
        muxer.queue_video(frame(8, 8)).unwrap();

        assert_eq!(muxer.finish().unwrap().segments.len(), 1);
        assert!(muxer.finish().unwrap().segments.is_empty());
    }

    #[test]
    fn test_size_limit_leaves_room_for_the_next_frame() {
        let dir = tempfile::tempdir().unwrap();
        let limit = 24_000;
        let registry = CodecRegistry::with_builtin();
        let codecs = registry
            .resolve("uncompressed/pcm", &Default::default())
            .unwrap();
        let settings = MuxerSettings {
            max_segment_bytes: limit,
            ..settings(dir.path())
        };
        let mut muxer = MuxerHandle::spawn(settings, codecs.video, codecs.audio).unwrap();

        // One 64x64 frame plus its audio fits, a second one does not
        for _ in 0..3 {
            muxer.queue_audio(&[0; 1600]).unwrap();
            muxer.queue_video(frame(64, 64)).unwrap();
        }
        let stats = muxer.finish().unwrap();

        assert_eq!(stats.segments.len(), 3);
        for segment in &stats.segments {
            assert_eq!(segment.frames, 1);
            let data = std::fs::read(&segment.path).unwrap();
            assert!(data.len() as u64 <= limit, "{} bytes", data.len());
            SegmentSummary::parse(&data).unwrap().check_index().unwrap();
        }
    }

    /// Uncompressed video that takes a while per frame and counts frames
    /// handed over but not yet encoded.
    struct SlowCodec {
        inner: UncompressedCodec,
        in_flight: Arc<AtomicUsize>,
    }

    impl VideoCodec for SlowCodec {
        fn codec_info(&self) -> CodecInfo {
            self.inner.codec_info()
        }

        fn reset(&mut self, width: u32, height: u32, fps_n: u32, fps_d: u32) -> avidump_codecs::Result<VideoStreamFormat> {
            self.inner.reset(width, height, fps_n, fps_d)
        }

        fn frame(&mut self, pixels: &[u32], stride: usize) -> avidump_codecs::Result<()> {
            std::thread::sleep(Duration::from_millis(20));
            self.inner.frame(pixels, stride)?;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        fn ready(&self) -> bool {
            self.inner.ready()
        }

        fn get_packet(&mut self) -> avidump_codecs::Result<Packet> {
            self.inner.get_packet()
        }
    }

    #[test]
    fn test_one_frame_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let video = Box::new(SlowCodec {
            inner: UncompressedCodec::new(),
            in_flight: Arc::clone(&in_flight),
        });
        let audio = CodecRegistry::with_builtin()
            .create_audio("pcm", &Default::default())
            .unwrap();
        let mut muxer = MuxerHandle::spawn(settings(dir.path()), video, audio).unwrap();

        let started = Instant::now();
        let mut max_in_flight = 0;
        for _ in 0..10 {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight = max_in_flight.max(now);
            muxer.queue_video(frame(8, 8)).unwrap();
        }
        // The tenth frame was only taken once the ninth was encoded
        assert!(started.elapsed() >= Duration::from_millis(160));

        let stats = muxer.finish().unwrap();
        assert_eq!(stats.frames, 10);
        assert!(max_in_flight <= 2, "{} frames in flight", max_in_flight);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }
}
