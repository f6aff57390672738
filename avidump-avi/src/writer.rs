//! Two-pass AVI segment writer

use crate::chunks::{chunk_ids, padded_chunk_size, write_chunk_header, ChunkId, IndexEntry, ListChunk, RiffChunk};
use crate::error::{AviError, Result};
use crate::packet::Packet;
use crate::types::{AudioTrack, AviFlags, AviHeader, Rect, StreamHeader, StreamType, VideoTrack};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Seek, SeekFrom, Write};
use tracing::{debug, trace};

/// Track number of the video stream
pub const VIDEO_TRACK: usize = 0;
/// Track number of the audio stream
pub const AUDIO_TRACK: usize = 1;

/// `movi` starts on a multiple of this
const MOVI_ALIGNMENT: u64 = 2048;

/// Writes one AVI file.
///
/// The header region is written as a placeholder on construction and
/// rewritten in place by [`finish`](Self::finish) once frame counts and
/// buffer sizes are known. Its length depends only on the track formats,
/// so the second pass always fits exactly.
pub struct ContainerWriter<W: Write + Seek> {
    writer: W,
    video: VideoTrack,
    audio: AudioTrack,
    index: Vec<IndexEntry>,
    /// Absolute position of the `LIST` tag of `movi`
    movi_offset: u64,
    /// Absolute write position
    position: u64,
    /// Absolute end of the last `movi` chunk
    movi_end: u64,
    video_frames: u32,
    audio_bytes: u64,
    max_video_chunk: u32,
    max_audio_chunk: u32,
    finished: bool,
}

impl<W: Write + Seek> ContainerWriter<W> {
    /// Create a writer and emit the placeholder header
    pub fn new(mut writer: W, video: VideoTrack, audio: AudioTrack) -> Result<Self> {
        let start = writer.stream_position()?;
        if start != 0 {
            writer.seek(SeekFrom::Start(0))?;
        }

        let mut this = ContainerWriter {
            writer,
            video,
            audio,
            index: Vec::new(),
            movi_offset: 0,
            position: 0,
            movi_end: 0,
            video_frames: 0,
            audio_bytes: 0,
            max_video_chunk: 0,
            max_audio_chunk: 0,
            finished: false,
        };

        let header = this.render_header()?;
        this.writer.write_all(&header)?;
        this.position = header.len() as u64;
        this.movi_end = this.position;
        this.movi_offset = this.position - 12;

        debug!(
            header_bytes = header.len(),
            movi_offset = this.movi_offset,
            "placeholder header written"
        );

        Ok(this)
    }

    /// Append a packet to `movi` on the given track
    pub fn write_packet(&mut self, track: usize, packet: &Packet) -> Result<()> {
        if self.finished {
            return Err(AviError::Finished);
        }
        if track > AUDIO_TRACK {
            return Err(AviError::InvalidTrack(track));
        }

        let size = packet.payload.len();
        let total = padded_chunk_size(size) as u64;
        // Leave room for this packet's idx1 entry and the idx1 header
        let projected = self.position + total + 8 + (self.index.len() as u64 + 1) * 16;
        if projected > u32::MAX as u64 {
            return Err(AviError::TooLarge(projected));
        }

        let tag = ChunkId::stream_chunk(track as u16, packet.typecode).fourcc;
        let offset = (self.position - self.movi_offset - 8) as u32;

        write_chunk_header(&mut self.writer, tag, size)?;
        self.writer.write_all(&packet.payload)?;
        if size % 2 != 0 {
            self.writer.write_all(&[0])?;
        }
        self.position += total;
        self.movi_end = self.position;

        if !packet.hidden {
            self.index.push(IndexEntry {
                chunk_id: tag,
                flags: packet.index_flags,
                offset,
                size: size as u32,
            });
        }

        if track == VIDEO_TRACK {
            if !packet.hidden {
                self.video_frames += 1;
            }
            self.max_video_chunk = self.max_video_chunk.max(size as u32);
        } else {
            self.audio_bytes += size as u64;
            self.max_audio_chunk = self.max_audio_chunk.max(size as u32);
        }

        trace!(%tag, offset, size, "packet written");

        Ok(())
    }

    /// File size if the segment were finished now
    pub fn size_estimate(&self) -> u64 {
        self.position + 8 + self.index.len() as u64 * IndexEntry::SIZE as u64
    }

    /// Number of video frames written
    pub fn frame_count(&self) -> u32 {
        self.video_frames
    }

    /// Number of audio sample frames written
    pub fn audio_samples(&self) -> u64 {
        match self.audio.format.block_align {
            0 => 0,
            align => self.audio_bytes / align as u64,
        }
    }

    /// Whether `finish` has completed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Write idx1 and patch the header. Calling it again is a no-op.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        let idx_size = self.index.len() * IndexEntry::SIZE;
        write_chunk_header(&mut self.writer, chunk_ids::IDX1, idx_size)?;
        for entry in &self.index {
            entry.write(&mut self.writer)?;
        }
        self.position += 8 + idx_size as u64;

        let header = self.render_header()?;
        self.writer.seek(SeekFrom::Start(0))?;
        self.writer.write_all(&header)?;
        self.writer.seek(SeekFrom::Start(self.position))?;
        self.writer.flush()?;
        self.finished = true;

        debug!(
            frames = self.video_frames,
            audio_samples = self.audio_samples(),
            bytes = self.position,
            "segment finalized"
        );

        Ok(())
    }

    /// Borrow the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consume the writer, returning the sink
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Everything up to and including the `movi` list type, sized from the
    /// current state.
    fn render_header(&self) -> Result<Vec<u8>> {
        let mut hdrl = ListChunk::new(chunk_ids::HDRL);
        hdrl.add_chunk(RiffChunk::new(chunk_ids::AVIH, self.main_header().to_bytes()?));

        let mut video_strl = ListChunk::new(chunk_ids::STRL);
        video_strl.add_chunk(RiffChunk::new(chunk_ids::STRH, self.video_stream_header().to_bytes()?));
        video_strl.add_chunk(RiffChunk::new(chunk_ids::STRF, self.video.format.to_bytes()?));
        hdrl.add_list(video_strl);

        let mut audio_strl = ListChunk::new(chunk_ids::STRL);
        audio_strl.add_chunk(RiffChunk::new(chunk_ids::STRH, self.audio_stream_header().to_bytes()?));
        audio_strl.add_chunk(RiffChunk::new(chunk_ids::STRF, self.audio.format.to_bytes()?));
        hdrl.add_list(audio_strl);

        let hdrl_end = 12 + 8 + hdrl.content_size() as u64;
        let movi_start = (hdrl_end + 8).div_ceil(MOVI_ALIGNMENT) * MOVI_ALIGNMENT;
        let junk_size = movi_start - hdrl_end - 8;

        let mut out = Vec::with_capacity(movi_start as usize + 12);

        let riff_size = self.position.max(movi_start + 12) - 8;
        let riff_size = u32::try_from(riff_size).map_err(|_| AviError::TooLarge(riff_size))?;
        out.write_all(chunk_ids::RIFF.as_bytes())?;
        out.write_u32::<LittleEndian>(riff_size)?;
        out.write_all(chunk_ids::AVI.as_bytes())?;

        hdrl.write(&mut out)?;

        write_chunk_header(&mut out, chunk_ids::JUNK, junk_size as usize)?;
        out.resize(out.len() + junk_size as usize, 0);

        let movi_end = self.movi_end.max(movi_start + 12);
        let movi_size = movi_end - movi_start - 8;
        write_chunk_header(&mut out, chunk_ids::LIST, movi_size as usize)?;
        out.write_all(chunk_ids::MOVI.as_bytes())?;

        Ok(out)
    }

    fn main_header(&self) -> AviHeader {
        let fps_n = self.video.fps_n as u64;
        let fps_d = self.video.fps_d.max(1) as u64;
        let video_rate = self.max_video_chunk as u64 * fps_n / fps_d;
        let max_bytes_per_sec = (video_rate + self.audio.format.avg_bytes_per_sec as u64).min(u32::MAX as u64);

        AviHeader {
            microseconds_per_frame: self.video.microseconds_per_frame(),
            max_bytes_per_sec: max_bytes_per_sec as u32,
            padding_granularity: 0,
            flags: AviFlags::INDEXED_INTERLEAVED,
            total_frames: self.video_frames,
            initial_frames: 0,
            streams: 2,
            suggested_buffer_size: self.max_video_chunk.max(self.max_audio_chunk),
            width: self.video.format.width.unsigned_abs(),
            height: self.video.format.abs_height(),
        }
    }

    fn video_stream_header(&self) -> StreamHeader {
        StreamHeader {
            stream_type: StreamType::Video,
            handler: self.video.handler,
            scale: self.video.fps_d,
            rate: self.video.fps_n,
            length: self.video_frames,
            suggested_buffer_size: self.max_video_chunk,
            frame: Rect {
                left: 0,
                top: 0,
                right: self.video.format.width.clamp(0, i16::MAX as i32) as i16,
                bottom: self.video.format.abs_height().min(i16::MAX as u32) as i16,
            },
            ..Default::default()
        }
    }

    fn audio_stream_header(&self) -> StreamHeader {
        let format = &self.audio.format;
        StreamHeader {
            stream_type: StreamType::Audio,
            handler: self.audio.handler,
            scale: format.block_align as u32,
            rate: format.avg_bytes_per_sec,
            length: self.audio_samples().min(u32::MAX as u64) as u32,
            suggested_buffer_size: self.max_audio_chunk,
            sample_size: format.block_align as u32,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{TYPE_VIDEO_COMPRESSED, TYPE_VIDEO_UNCOMPRESSED};
    use crate::summary::SegmentSummary;
    use crate::types::{codec, AudioFormat, VideoFormat};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn tracks(width: i32, height: i32) -> (VideoTrack, AudioTrack) {
        let video = VideoTrack {
            handler: codec::DIB,
            format: VideoFormat {
                width,
                height,
                image_size: (width * height * 3) as u32,
                ..Default::default()
            },
            fps_n: 60,
            fps_d: 1,
        };
        (video, AudioTrack::new(AudioFormat::pcm16(48000, 2)))
    }

    #[test]
    fn test_placeholder_aligns_movi() {
        let (video, audio) = tracks(64, 64);
        let writer = ContainerWriter::new(Cursor::new(Vec::new()), video, audio).unwrap();
        let bytes = writer.into_inner().into_inner();

        assert_eq!(bytes.len() % 2048, 12);
        let movi_at = bytes.len() - 12;
        assert_eq!(&bytes[movi_at..movi_at + 4], b"LIST");
        assert_eq!(&bytes[movi_at + 8..], b"movi");
    }

    #[test]
    fn test_header_size_is_stable() {
        let (video, audio) = tracks(64, 64);
        let mut writer = ContainerWriter::new(Cursor::new(Vec::new()), video, audio).unwrap();
        let placeholder = writer.get_ref().get_ref().len();

        writer
            .write_packet(VIDEO_TRACK, &Packet::video(TYPE_VIDEO_UNCOMPRESSED, vec![0; 64 * 64 * 3], true))
            .unwrap();
        writer.write_packet(AUDIO_TRACK, &Packet::audio(vec![0; 3200])).unwrap();
        writer.finish().unwrap();

        let bytes = writer.into_inner().into_inner();
        let summary = SegmentSummary::parse(&bytes).unwrap();
        assert_eq!(summary.movi_offset as usize, placeholder - 12);
    }

    #[test]
    fn test_finished_segment_layout() {
        let (video, audio) = tracks(64, 48);
        let mut writer = ContainerWriter::new(Cursor::new(Vec::new()), video, audio).unwrap();

        writer
            .write_packet(VIDEO_TRACK, &Packet::video(TYPE_VIDEO_COMPRESSED, vec![7; 11], true))
            .unwrap();
        writer.write_packet(AUDIO_TRACK, &Packet::audio(vec![1; 400])).unwrap();
        writer
            .write_packet(VIDEO_TRACK, &Packet::video(TYPE_VIDEO_COMPRESSED, vec![8; 5], false))
            .unwrap();
        writer.write_packet(AUDIO_TRACK, &Packet::audio(vec![2; 400])).unwrap();

        assert_eq!(writer.frame_count(), 2);
        assert_eq!(writer.audio_samples(), 200);
        let estimate = writer.size_estimate();

        writer.finish().unwrap();
        let bytes = writer.into_inner().into_inner();
        assert_eq!(bytes.len() as u64, estimate);

        let riff_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(riff_size as usize, bytes.len() - 8);

        let summary = SegmentSummary::parse(&bytes).unwrap();
        summary.check_index().unwrap();

        assert_eq!(summary.header.total_frames, 2);
        assert_eq!(summary.header.streams, 2);
        assert_eq!(summary.header.flags, AviFlags::INDEXED_INTERLEAVED);
        assert_eq!(summary.header.suggested_buffer_size, 400);

        let video = summary.video_stream().unwrap();
        assert_eq!(video.header.length, 2);
        assert_eq!(video.header.rate, 60);
        assert_eq!(video.header.scale, 1);
        assert_eq!(video.header.suggested_buffer_size, 11);
        assert_eq!(video.header.frame.right, 64);
        assert_eq!(video.header.frame.bottom, 48);

        let audio = summary.audio_stream().unwrap();
        assert_eq!(audio.header.length, 200);
        assert_eq!(audio.header.scale, 4);
        assert_eq!(audio.header.rate, 192000);
        assert_eq!(audio.header.sample_size, 4);

        let tags: Vec<String> = summary.chunks.iter().map(|c| c.id.fourcc.as_str()).collect();
        assert_eq!(tags, vec!["00dc", "01wb", "00dc", "01wb"]);

        // first chunk sits right after the 'movi' fourcc
        assert_eq!(summary.index[0].offset, 4);
        assert!(summary.index[0].is_keyframe());
        assert!(!summary.index[2].is_keyframe());
        // odd payload is padded on disk
        assert_eq!(summary.index[1].offset, 4 + 8 + 12);
    }

    #[test]
    fn test_hidden_packets_skip_index() {
        let (video, audio) = tracks(16, 16);
        let mut writer = ContainerWriter::new(Cursor::new(Vec::new()), video, audio).unwrap();

        let mut hidden = Packet::video(TYPE_VIDEO_COMPRESSED, vec![0; 4], false);
        hidden.hidden = true;
        writer.write_packet(VIDEO_TRACK, &hidden).unwrap();
        writer
            .write_packet(VIDEO_TRACK, &Packet::video(TYPE_VIDEO_COMPRESSED, vec![0; 4], true))
            .unwrap();
        writer.finish().unwrap();

        let summary = SegmentSummary::parse(&writer.into_inner().into_inner()).unwrap();
        assert_eq!(summary.chunks.len(), 2);
        assert_eq!(summary.index.len(), 1);
        assert_eq!(summary.index[0].offset, 4 + 12);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let (video, audio) = tracks(16, 16);
        let mut writer = ContainerWriter::new(Cursor::new(Vec::new()), video, audio).unwrap();
        writer.finish().unwrap();
        let len = writer.get_ref().get_ref().len();
        writer.finish().unwrap();
        assert_eq!(writer.get_ref().get_ref().len(), len);
        assert!(writer.is_finished());

        assert!(matches!(
            writer.write_packet(AUDIO_TRACK, &Packet::audio(vec![0; 4])),
            Err(AviError::Finished)
        ));
    }

    #[test]
    fn test_invalid_track() {
        let (video, audio) = tracks(16, 16);
        let mut writer = ContainerWriter::new(Cursor::new(Vec::new()), video, audio).unwrap();
        assert!(matches!(
            writer.write_packet(2, &Packet::audio(vec![0; 4])),
            Err(AviError::InvalidTrack(2))
        ));
    }
}
