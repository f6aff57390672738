//! Read-back inspection of written segments

use crate::chunks::{chunk_ids, parse_index, ChunkId, ChunkType, FourCC, IndexEntry, ListChunk, RiffChunk};
use crate::error::{AviError, Result};
use crate::types::{AudioFormat, AviHeader, StreamHeader, StreamType, VideoFormat};

/// Stream information
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Stream index
    pub index: u32,
    /// Stream header
    pub header: StreamHeader,
    /// Video format (if video stream)
    pub video_format: Option<VideoFormat>,
    /// Audio format (if audio stream)
    pub audio_format: Option<AudioFormat>,
}

impl StreamInfo {
    /// Check if this is a video stream
    pub fn is_video(&self) -> bool {
        self.header.stream_type == StreamType::Video
    }

    /// Check if this is an audio stream
    pub fn is_audio(&self) -> bool {
        self.header.stream_type == StreamType::Audio
    }

    /// Units per second as declared by rate/scale
    pub fn rate(&self) -> f64 {
        if self.header.scale > 0 {
            self.header.rate as f64 / self.header.scale as f64
        } else {
            0.0
        }
    }
}

/// One chunk found inside `movi`
#[derive(Debug, Clone)]
pub struct MoviChunk {
    /// Chunk tag, e.g. `00dc`
    pub id: ChunkId,
    /// Offset of the tag relative to the `movi` fourcc
    pub offset: u32,
    /// Payload bytes
    pub data: Vec<u8>,
}

/// Structural summary of one AVI file
#[derive(Debug, Clone)]
pub struct SegmentSummary {
    /// Main header
    pub header: AviHeader,
    /// Declared streams in strl order
    pub streams: Vec<StreamInfo>,
    /// Chunks of the `movi` list in file order
    pub chunks: Vec<MoviChunk>,
    /// idx1 entries
    pub index: Vec<IndexEntry>,
    /// Absolute offset of the `movi` LIST tag
    pub movi_offset: u64,
}

impl SegmentSummary {
    /// Parse a complete AVI file held in memory
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 12 || &data[0..4] != chunk_ids::RIFF.as_bytes() {
            return Err(AviError::InvalidRiff);
        }
        if &data[8..12] != chunk_ids::AVI.as_bytes() {
            return Err(AviError::InvalidAvi);
        }

        let mut header = None;
        let mut streams = Vec::new();
        let mut chunks = None;
        let mut index = Vec::new();
        let mut movi_offset = 0;

        let mut offset = 12;
        while offset + 8 <= data.len() {
            let (chunk, next) = RiffChunk::read(data, offset)?;

            if chunk.id == chunk_ids::LIST && chunk.data.len() >= 4 {
                let list_type = FourCC([chunk.data[0], chunk.data[1], chunk.data[2], chunk.data[3]]);
                if list_type == chunk_ids::HDRL {
                    let list = ListChunk::parse(&chunk.data)?;
                    header = Some(Self::parse_hdrl(&list, &mut streams)?);
                } else if list_type == chunk_ids::MOVI {
                    movi_offset = offset as u64;
                    chunks = Some(Self::parse_movi(&chunk.data)?);
                }
            } else if chunk.id == chunk_ids::IDX1 {
                index = parse_index(&chunk.data);
            }

            offset = next;
        }

        Ok(SegmentSummary {
            header: header.ok_or(AviError::MissingChunk("hdrl"))?,
            streams,
            chunks: chunks.ok_or(AviError::MissingChunk("movi"))?,
            index,
            movi_offset,
        })
    }

    fn parse_hdrl(list: &ListChunk, streams: &mut Vec<StreamInfo>) -> Result<AviHeader> {
        let avih = list.find_chunk(chunk_ids::AVIH).ok_or(AviError::MissingChunk("avih"))?;
        let header = AviHeader::parse(&avih.data)?;

        for strl_chunk in list.find_chunks(chunk_ids::LIST) {
            let strl = ListChunk::parse(&strl_chunk.data)?;
            if strl.list_type != chunk_ids::STRL {
                continue;
            }

            let strh = strl.find_chunk(chunk_ids::STRH).ok_or(AviError::MissingChunk("strh"))?;
            let stream_header = StreamHeader::parse(&strh.data)?;

            let mut info = StreamInfo {
                index: streams.len() as u32,
                header: stream_header,
                video_format: None,
                audio_format: None,
            };

            if let Some(strf) = strl.find_chunk(chunk_ids::STRF) {
                match info.header.stream_type {
                    StreamType::Video => info.video_format = Some(VideoFormat::parse(&strf.data)?),
                    StreamType::Audio => info.audio_format = Some(AudioFormat::parse(&strf.data)?),
                    StreamType::Unknown(_) => {}
                }
            }

            streams.push(info);
        }

        Ok(header)
    }

    fn parse_movi(list_data: &[u8]) -> Result<Vec<MoviChunk>> {
        let mut chunks = Vec::new();
        // Offsets inside the list payload are relative to the 'movi' fourcc
        let mut offset = 4;
        while offset + 8 <= list_data.len() {
            let (chunk, next) = RiffChunk::read(list_data, offset)?;
            chunks.push(MoviChunk {
                id: ChunkId::parse(chunk.id),
                offset: offset as u32,
                data: chunk.data,
            });
            offset = next;
        }
        Ok(chunks)
    }

    /// Video stream, if declared
    pub fn video_stream(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.is_video())
    }

    /// Audio stream, if declared
    pub fn audio_stream(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.is_audio())
    }

    /// Video chunks in file order
    pub fn video_chunks(&self) -> impl Iterator<Item = &MoviChunk> {
        self.chunks.iter().filter(|c| c.id.chunk_type.is_video())
    }

    /// Audio chunks in file order
    pub fn audio_chunks(&self) -> impl Iterator<Item = &MoviChunk> {
        self.chunks.iter().filter(|c| c.id.chunk_type == ChunkType::Audio)
    }

    /// Total audio payload bytes
    pub fn audio_bytes(&self) -> usize {
        self.audio_chunks().map(|c| c.data.len()).sum()
    }

    /// Whether the idx1 entry for a video chunk carries the keyframe flag
    pub fn is_keyframe(&self, chunk: &MoviChunk) -> bool {
        self.index
            .iter()
            .any(|e| e.offset == chunk.offset && e.is_keyframe())
    }

    /// Check that every idx1 entry points at a matching `movi` chunk and
    /// that header counters agree with the chunk list.
    pub fn check_index(&self) -> Result<()> {
        for entry in &self.index {
            let chunk = self
                .chunks
                .iter()
                .find(|c| c.offset == entry.offset)
                .ok_or_else(|| AviError::InvalidChunk {
                    id: *b"idx1",
                    message: format!("no movi chunk at offset {}", entry.offset),
                })?;
            if chunk.id.fourcc != entry.chunk_id || chunk.data.len() != entry.size as usize {
                return Err(AviError::InvalidChunk {
                    id: *b"idx1",
                    message: format!(
                        "entry {} ({} bytes) does not match chunk {} ({} bytes)",
                        entry.chunk_id,
                        entry.size,
                        chunk.id.fourcc,
                        chunk.data.len()
                    ),
                });
            }
        }

        let video_frames = self.video_chunks().count() as u32;
        if self.header.total_frames != video_frames {
            return Err(AviError::InvalidChunk {
                id: *b"avih",
                message: format!(
                    "declares {} frames, movi holds {}",
                    self.header.total_frames, video_frames
                ),
            });
        }

        Ok(())
    }
}
