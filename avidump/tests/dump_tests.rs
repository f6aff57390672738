//! End-to-end dump tests: frames and audio in, AVI segments on disk.

use avidump::{AviWriter, DumpConfig, DumpError, SoundRateMode, SourceRate};
use avidump_avi::{codec, FourCC, Packet, SegmentSummary};
use avidump_codecs::{
    CodecError, CodecInfo, CodecRegistry, UncompressedCodec, VideoCodec, VideoStreamFormat,
};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RED: u32 = 0x00FF_0000;

fn prefix(dir: &TempDir) -> String {
    dir.path().join("dump").to_string_lossy().into_owned()
}

fn read_segment(path: &Path) -> SegmentSummary {
    let data = std::fs::read(path).unwrap();
    let summary = SegmentSummary::parse(&data).unwrap();
    summary.check_index().unwrap();
    summary
}

fn segment_files(dir: &TempDir) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    files.sort();
    files
}

/// A 16x16 frame with a moving bar so consecutive frames differ.
fn bar_frame(n: usize) -> Vec<u32> {
    (0..16 * 16)
        .map(|i| if i % 16 == n % 16 { 0x0000_FF00 } else { 0x0010_1010 })
        .collect()
}

#[test]
fn test_single_red_frame_uncompressed_pcm() {
    let dir = TempDir::new().unwrap();
    let registry = CodecRegistry::with_builtin();
    let mut writer = AviWriter::start(
        &DumpConfig::default(),
        &registry,
        "uncompressed/pcm",
        SourceRate::hz(48000).unwrap(),
        prefix(&dir),
    )
    .unwrap();

    writer.push_audio(&[0i16; 1600 * 2]).unwrap();
    writer
        .push_frame(&[RED; 64 * 64], 64, 64, 64, 60, 1, false)
        .unwrap();
    let stats = writer.end().unwrap();

    assert_eq!(stats.segments.len(), 1);
    assert_eq!(stats.frames, 1);
    assert_eq!(stats.audio_samples, 1600);

    let path = dir.path().join("dump_00000.avi");
    assert_eq!(stats.segments[0].path, path);
    assert_eq!(stats.segments[0].bytes, std::fs::metadata(&path).unwrap().len());

    let summary = read_segment(&path);
    assert_eq!(summary.header.total_frames, 1);
    assert_eq!(summary.header.streams, 2);
    assert_eq!(summary.movi_offset % 2048, 0);

    let video = summary.video_stream().unwrap();
    assert_eq!(video.header.handler, codec::DIB);
    let format = video.video_format.as_ref().unwrap();
    assert_eq!((format.width, format.height), (64, 64));
    assert_eq!(format.bit_count, 24);
    assert_eq!(format.compression, [0; 4]);
    assert_eq!((video.header.rate, video.header.scale), (60, 1));

    let audio = summary.audio_stream().unwrap();
    let wave = audio.audio_format.as_ref().unwrap();
    assert_eq!(wave.format_tag, 1);
    assert_eq!(wave.samples_per_sec, 48000);
    assert_eq!(wave.channels, 2);
    assert_eq!(wave.bits_per_sample, 16);

    let video_chunks: Vec<_> = summary.video_chunks().collect();
    assert_eq!(video_chunks.len(), 1);
    assert_eq!(video_chunks[0].id.fourcc, FourCC(*b"00db"));
    assert!(video_chunks[0].data.chunks(3).all(|px| px == [0, 0, 255]));
    assert!(summary.audio_chunks().count() >= 1);
    assert_eq!(summary.audio_bytes(), 1600 * 4);

    let tags: Vec<FourCC> = summary.index.iter().map(|e| e.chunk_id).collect();
    assert!(tags.contains(&FourCC(*b"00db")));
    assert!(tags.contains(&FourCC(*b"01wb")));
}

#[test]
fn test_frame_limit_splits_segments() {
    let dir = TempDir::new().unwrap();
    let registry = CodecRegistry::with_builtin();
    let config = DumpConfig {
        max_frames_per_segment: 3,
        keyframe_interval: 100,
        ..Default::default()
    };
    let mut writer = AviWriter::start(
        &config,
        &registry,
        "zmbv/pcm",
        SourceRate::hz(48000).unwrap(),
        prefix(&dir),
    )
    .unwrap();

    for n in 0..10 {
        writer.push_audio(&[0i16; 1600]).unwrap();
        writer.push_frame(&bar_frame(n), 16, 16, 16, 60, 1, false).unwrap();
    }
    let stats = writer.end().unwrap();

    let counts: Vec<u32> = stats.segments.iter().map(|s| s.frames).collect();
    assert_eq!(counts, vec![3, 3, 3, 1]);
    assert_eq!(stats.frames, 10);

    let files = segment_files(&dir);
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["dump_00000.avi", "dump_00001.avi", "dump_00002.avi", "dump_00003.avi"]
    );

    for (file, expected) in files.iter().zip([3, 3, 3, 1]) {
        let summary = read_segment(file);
        let chunks: Vec<_> = summary.video_chunks().collect();
        assert_eq!(chunks.len(), expected);
        assert_eq!(summary.header.total_frames, expected as u32);
        assert_eq!(summary.video_stream().unwrap().header.handler, codec::ZMBV);
        // Every segment starts on a keyframe, the rest are deltas
        assert!(summary.is_keyframe(chunks[0]));
        assert_eq!(chunks[0].data[0] & 1, 1);
        for chunk in &chunks[1..] {
            assert!(!summary.is_keyframe(chunk));
            assert_eq!(chunk.data[0] & 1, 0);
        }
    }
}

#[test]
fn test_size_limit_splits_segments() {
    let dir = TempDir::new().unwrap();
    let registry = CodecRegistry::with_builtin();
    let config = DumpConfig {
        max_segment_bytes: 16 * 1024,
        ..Default::default()
    };
    let mut writer = AviWriter::start(
        &config,
        &registry,
        "uncompressed/pcm",
        SourceRate::hz(48000).unwrap(),
        prefix(&dir),
    )
    .unwrap();

    for n in 0..20 {
        let pixels = vec![n as u32 * 0x0101_01; 32 * 32];
        writer.push_frame(&pixels, 32, 32, 32, 60, 1, false).unwrap();
    }
    let stats = writer.end().unwrap();

    assert!(stats.segments.len() > 1);
    assert_eq!(stats.frames, 20);
    // One frame is 3072 bytes of video plus 3200 of audio
    for segment in &stats.segments {
        assert!(segment.bytes <= 16 * 1024, "{} bytes", segment.bytes);
        assert_eq!(std::fs::metadata(&segment.path).unwrap().len(), segment.bytes);
        read_segment(&segment.path);
    }
}

#[test]
fn test_format_change_and_forced_break() {
    let dir = TempDir::new().unwrap();
    let registry = CodecRegistry::with_builtin();
    let mut writer = AviWriter::start(
        &DumpConfig::default(),
        &registry,
        "cscd/pcm",
        SourceRate::hz(44100).unwrap(),
        prefix(&dir),
    )
    .unwrap();

    writer.push_frame(&[RED; 16], 4, 4, 4, 60, 1, false).unwrap();
    writer.push_frame(&[RED; 16], 4, 4, 4, 60, 1, false).unwrap();
    // Resolution change
    writer.push_frame(&[RED; 32], 8, 8, 4, 60, 1, false).unwrap();
    // Rate change
    writer.push_frame(&[RED; 32], 8, 8, 4, 50, 1, false).unwrap();
    // Same rate written differently: no break
    writer.push_frame(&[RED; 32], 8, 8, 4, 100, 2, false).unwrap();
    writer.push_frame(&[RED; 32], 8, 8, 4, 50, 1, true).unwrap();
    let stats = writer.end().unwrap();

    let counts: Vec<u32> = stats.segments.iter().map(|s| s.frames).collect();
    assert_eq!(counts, vec![2, 1, 2, 1]);

    let summary = read_segment(&stats.segments[2].path);
    let video = summary.video_stream().unwrap();
    assert_eq!((video.header.rate, video.header.scale), (50, 1));
    assert_eq!(video.video_format.as_ref().unwrap().width, 8);
    assert_eq!(summary.audio_stream().unwrap().audio_format.as_ref().unwrap().samples_per_sec, 44100);
}

#[test]
fn test_scale_and_borders_reach_the_file() {
    let dir = TempDir::new().unwrap();
    let registry = CodecRegistry::with_builtin();
    let mut config = DumpConfig::default();
    config.set_option("fixed-scale-x", "2").unwrap();
    config.set_option("border-top", "3").unwrap();
    config.set_option("border-right", "2").unwrap();

    let mut writer = AviWriter::start(
        &config,
        &registry,
        "uncompressed/pcm",
        SourceRate::hz(48000).unwrap(),
        prefix(&dir),
    )
    .unwrap();
    writer.push_frame(&[RED; 5 * 5], 5, 5, 5, 60, 1, false).unwrap();
    let stats = writer.end().unwrap();

    let summary = read_segment(&stats.segments[0].path);
    let format = summary.video_stream().unwrap().video_format.clone().unwrap();
    // 12x8 already multiples of 4
    assert_eq!((format.width, format.height), (12, 8));
}

#[test]
fn test_hq_mode_resamples_to_48000() {
    let dir = TempDir::new().unwrap();
    let registry = CodecRegistry::with_builtin();
    let config = DumpConfig {
        sound_rate_mode: SoundRateMode::Hq48000,
        ..Default::default()
    };
    let mut writer = AviWriter::start(
        &config,
        &registry,
        "zmbv/pcm",
        SourceRate::hz(32000).unwrap(),
        prefix(&dir),
    )
    .unwrap();
    assert_eq!(writer.audio_rate(), 48000);

    let mut phase = 0.0f64;
    for n in 0..60 {
        let frames = if n % 3 == 0 { 534 } else { 533 };
        let mut block = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            let s = (phase.sin() * 8000.0) as i16;
            block.extend_from_slice(&[s, s]);
            phase += 2.0 * std::f64::consts::PI * 440.0 / 32000.0;
        }
        writer.push_audio(&block).unwrap();
        writer.push_frame(&bar_frame(n), 16, 16, 16, 60, 1, false).unwrap();
    }
    let stats = writer.end().unwrap();

    assert_eq!(stats.frames, 60);
    // 32000 frames plus a 64-frame flush window come out as about 48096;
    // underruns only add zero-filled frames on top
    assert!(stats.audio_samples >= 48095, "{}", stats.audio_samples);
    assert!(stats.audio_samples <= 48000 + 48097, "{}", stats.audio_samples);

    let summary = read_segment(&stats.segments[0].path);
    let audio = summary.audio_stream().unwrap();
    assert_eq!(audio.audio_format.as_ref().unwrap().samples_per_sec, 48000);
    assert_eq!(audio.header.length as u64, stats.audio_samples);
}

/// Uncompressed video that fails on a chosen frame.
struct FailingCodec {
    inner: UncompressedCodec,
    frames: usize,
    fail_at: usize,
}

impl VideoCodec for FailingCodec {
    fn codec_info(&self) -> CodecInfo {
        CodecInfo {
            name: "failing",
            long_name: "fails on purpose",
            intra_only: true,
        }
    }

    fn reset(&mut self, width: u32, height: u32, fps_n: u32, fps_d: u32) -> avidump_codecs::Result<VideoStreamFormat> {
        self.inner.reset(width, height, fps_n, fps_d)
    }

    fn frame(&mut self, pixels: &[u32], stride: usize) -> avidump_codecs::Result<()> {
        self.frames += 1;
        if self.frames == self.fail_at {
            return Err(CodecError::Zlib("injected failure".to_string()));
        }
        self.inner.frame(pixels, stride)
    }

    fn ready(&self) -> bool {
        self.inner.ready()
    }

    fn get_packet(&mut self) -> avidump_codecs::Result<Packet> {
        self.inner.get_packet()
    }
}

#[test]
fn test_worker_error_surfaces_on_next_call() {
    let dir = TempDir::new().unwrap();
    let mut registry = CodecRegistry::with_builtin();
    registry.register_video("failing", |_| {
        Ok(Box::new(FailingCodec {
            inner: UncompressedCodec::new(),
            frames: 0,
            fail_at: 2,
        }))
    });

    let mut writer = AviWriter::start(
        &DumpConfig::default(),
        &registry,
        "failing/pcm",
        SourceRate::hz(48000).unwrap(),
        prefix(&dir),
    )
    .unwrap();

    writer.push_frame(&[RED; 16], 4, 4, 4, 60, 1, false).unwrap();
    writer.push_frame(&[RED; 16], 4, 4, 4, 60, 1, false).unwrap();

    // The third frame waits for the second, which failed
    let err = writer.push_frame(&[RED; 16], 4, 4, 4, 60, 1, false).unwrap_err();
    assert!(matches!(err, DumpError::Codec(CodecError::Zlib(_))), "{:?}", err);

    assert!(matches!(writer.push_audio(&[0, 0]), Err(DumpError::Aborted)));
    assert!(matches!(
        writer.push_frame(&[RED; 16], 4, 4, 4, 60, 1, false),
        Err(DumpError::Aborted)
    ));
    assert!(matches!(writer.end(), Err(DumpError::Aborted)));

    // The partial segment stays on disk
    assert_eq!(segment_files(&dir).len(), 1);
}

#[test]
fn test_unwritable_prefix_surfaces_io_error() {
    let dir = TempDir::new().unwrap();
    let registry = CodecRegistry::with_builtin();
    let missing = dir.path().join("no-such-dir").join("dump");
    let mut writer = AviWriter::start(
        &DumpConfig::default(),
        &registry,
        "uncompressed/pcm",
        SourceRate::hz(48000).unwrap(),
        missing.to_string_lossy().into_owned(),
    )
    .unwrap();

    writer.push_frame(&[RED; 16], 4, 4, 4, 60, 1, false).unwrap();
    assert!(matches!(writer.end(), Err(DumpError::Io(_))));
}

#[test]
fn test_drop_without_end_closes_segment() {
    let dir = TempDir::new().unwrap();
    let registry = CodecRegistry::with_builtin();
    {
        let mut writer = AviWriter::start(
            &DumpConfig::default(),
            &registry,
            "zmbv/pcm",
            SourceRate::hz(48000).unwrap(),
            prefix(&dir),
        )
        .unwrap();
        for n in 0..5 {
            writer.push_frame(&bar_frame(n), 16, 16, 16, 60, 1, false).unwrap();
        }
    }

    let files = segment_files(&dir);
    assert_eq!(files.len(), 1);
    let summary = read_segment(&files[0]);
    assert_eq!(summary.header.total_frames, 5);
}
