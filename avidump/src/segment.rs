//! One output file of a dump.

use crate::error::Result;
use crate::frame::Frame;
use avidump_avi::{ContainerWriter, Packet};
use avidump_codecs::{AudioStreamFormat, VideoStreamFormat};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// `prefix_NNNNN.avi`
pub fn segment_path(prefix: &str, index: u32) -> PathBuf {
    PathBuf::from(format!("{}_{:05}.avi", prefix, index))
}

/// What a closed segment holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentInfo {
    pub path: PathBuf,
    pub frames: u32,
    /// Audio sample frames
    pub audio_samples: u64,
    pub bytes: u64,
}

/// Totals of a finished dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DumpStats {
    pub segments: Vec<SegmentInfo>,
    pub frames: u64,
    pub audio_samples: u64,
}

impl DumpStats {
    pub(crate) fn record(&mut self, segment: SegmentInfo) {
        self.frames += segment.frames as u64;
        self.audio_samples += segment.audio_samples;
        self.segments.push(segment);
    }
}

/// An open segment file and the format it was opened for.
pub struct Segment {
    path: PathBuf,
    width: u32,
    height: u32,
    fps_n: u32,
    fps_d: u32,
    container: ContainerWriter<BufWriter<File>>,
}

impl Segment {
    /// Create the file and write the placeholder header.
    pub fn create(
        path: PathBuf,
        frame: &Frame,
        video: &VideoStreamFormat,
        audio: &AudioStreamFormat,
    ) -> Result<Self> {
        let file = File::create(&path)?;
        let container = ContainerWriter::new(BufWriter::new(file), video.to_track(), audio.to_track())?;

        info!(
            path = %path.display(),
            width = frame.width,
            height = frame.height,
            fps_n = frame.fps_n,
            fps_d = frame.fps_d,
            sample_rate = audio.sample_rate,
            "segment opened"
        );

        Ok(Segment {
            path,
            width: frame.width,
            height: frame.height,
            fps_n: frame.fps_n,
            fps_d: frame.fps_d,
            container,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `frame` can go into this segment format-wise.
    pub fn accepts(&self, frame: &Frame) -> bool {
        frame.same_format(self.width, self.height, self.fps_n, self.fps_d)
    }

    pub fn write_packet(&mut self, track: usize, packet: &Packet) -> Result<()> {
        self.container.write_packet(track, packet)?;
        Ok(())
    }

    /// Video frames written.
    pub fn frame_count(&self) -> u32 {
        self.container.frame_count()
    }

    /// File size if closed now.
    pub fn size_estimate(&self) -> u64 {
        self.container.size_estimate()
    }

    /// Write the index, patch the header and close the file.
    pub fn finish(mut self) -> Result<SegmentInfo> {
        let bytes = self.container.size_estimate();
        self.container.finish()?;

        let info = SegmentInfo {
            path: self.path,
            frames: self.container.frame_count(),
            audio_samples: self.container.audio_samples(),
            bytes,
        };
        info!(
            path = %info.path.display(),
            frames = info.frames,
            audio_samples = info.audio_samples,
            bytes = info.bytes,
            "segment closed"
        );
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_path() {
        assert_eq!(segment_path("out/run", 0), PathBuf::from("out/run_00000.avi"));
        assert_eq!(segment_path("run", 123), PathBuf::from("run_00123.avi"));
        assert_eq!(segment_path("run", 100_000), PathBuf::from("run_100000.avi"));
    }

    #[test]
    fn test_stats_totals() {
        let mut stats = DumpStats::default();
        for frames in [3, 1] {
            stats.record(SegmentInfo {
                path: PathBuf::from("x.avi"),
                frames,
                audio_samples: 800 * frames as u64,
                bytes: 0,
            });
        }
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.audio_samples, 3200);
        assert_eq!(stats.segments.len(), 2);
    }
}
