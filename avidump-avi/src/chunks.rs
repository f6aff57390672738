//! RIFF chunk parsing and writing

use crate::error::{AviError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// FourCC (Four Character Code) identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create from bytes
    pub const fn new(bytes: [u8; 4]) -> Self {
        FourCC(bytes)
    }

    /// Get as string
    pub fn as_str(&self) -> String {
        String::from_utf8_lossy(&self.0).to_string()
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::fmt::Debug for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FourCC(\"{}\")", self.as_str())
    }
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(bytes: [u8; 4]) -> Self {
        FourCC(bytes)
    }
}

impl From<&[u8; 4]> for FourCC {
    fn from(bytes: &[u8; 4]) -> Self {
        FourCC(*bytes)
    }
}

impl TryFrom<&str> for FourCC {
    type Error = AviError;

    fn try_from(s: &str) -> Result<Self> {
        let bytes: [u8; 4] = s.as_bytes().try_into().map_err(|_| AviError::InvalidChunk {
            id: [b'?'; 4],
            message: format!("'{}' is not a four character code", s),
        })?;
        Ok(FourCC(bytes))
    }
}

/// Well-known chunk IDs
pub mod chunk_ids {
    use super::FourCC;

    pub const RIFF: FourCC = FourCC(*b"RIFF");
    pub const AVI: FourCC = FourCC(*b"AVI ");
    pub const LIST: FourCC = FourCC(*b"LIST");
    pub const HDRL: FourCC = FourCC(*b"hdrl");
    pub const AVIH: FourCC = FourCC(*b"avih");
    pub const STRL: FourCC = FourCC(*b"strl");
    pub const STRH: FourCC = FourCC(*b"strh");
    pub const STRF: FourCC = FourCC(*b"strf");
    pub const MOVI: FourCC = FourCC(*b"movi");
    pub const IDX1: FourCC = FourCC(*b"idx1");
    pub const JUNK: FourCC = FourCC(*b"JUNK");
}

/// Chunk identifier with stream number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkId {
    /// Raw FourCC
    pub fourcc: FourCC,
    /// Stream number (if applicable)
    pub stream_number: Option<u16>,
    /// Chunk type
    pub chunk_type: ChunkType,
}

impl ChunkId {
    /// Parse chunk ID from FourCC
    pub fn parse(fourcc: FourCC) -> Self {
        let bytes = fourcc.as_bytes();

        // Stream chunks look like "00dc", "01wb"
        if bytes[0].is_ascii_digit() && bytes[1].is_ascii_digit() {
            let stream_num = ((bytes[0] - b'0') as u16) * 10 + ((bytes[1] - b'0') as u16);
            let typecode = u16::from_le_bytes([bytes[2], bytes[3]]);

            ChunkId {
                fourcc,
                stream_number: Some(stream_num),
                chunk_type: ChunkType::from_typecode(typecode),
            }
        } else {
            ChunkId {
                fourcc,
                stream_number: None,
                chunk_type: ChunkType::Unknown,
            }
        }
    }

    /// Build the movi tag for a track: two decimal digits followed by the
    /// little-endian typecode bytes (`0x6364` on track 0 gives `00dc`).
    pub fn stream_chunk(stream_num: u16, typecode: u16) -> Self {
        let suffix = typecode.to_le_bytes();
        let fourcc = FourCC([
            b'0' + (stream_num / 10 % 10) as u8,
            b'0' + (stream_num % 10) as u8,
            suffix[0],
            suffix[1],
        ]);

        ChunkId {
            fourcc,
            stream_number: Some(stream_num),
            chunk_type: ChunkType::from_typecode(typecode),
        }
    }
}

/// Chunk type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    /// Compressed video frame (`dc`)
    VideoCompressed,
    /// Uncompressed video frame (`db`)
    VideoUncompressed,
    /// Audio data (`wb`)
    Audio,
    /// Unknown type
    Unknown,
}

impl ChunkType {
    fn from_typecode(typecode: u16) -> Self {
        match &typecode.to_le_bytes() {
            b"dc" | b"DC" => ChunkType::VideoCompressed,
            b"db" | b"DB" => ChunkType::VideoUncompressed,
            b"wb" | b"WB" => ChunkType::Audio,
            _ => ChunkType::Unknown,
        }
    }

    /// Whether the chunk carries a video frame
    pub fn is_video(self) -> bool {
        matches!(self, ChunkType::VideoCompressed | ChunkType::VideoUncompressed)
    }
}

/// RIFF chunk
#[derive(Debug, Clone)]
pub struct RiffChunk {
    /// Chunk ID
    pub id: FourCC,
    /// Chunk size (not including header)
    pub size: u32,
    /// Chunk data
    pub data: Vec<u8>,
}

impl RiffChunk {
    /// Create new chunk
    pub fn new(id: FourCC, data: Vec<u8>) -> Self {
        RiffChunk {
            id,
            size: data.len() as u32,
            data,
        }
    }

    /// Read chunk from data
    pub fn read(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        if offset + 8 > data.len() {
            return Err(AviError::InsufficientData {
                needed: 8,
                available: data.len().saturating_sub(offset),
            });
        }

        let mut cursor = Cursor::new(&data[offset..]);
        let mut id_bytes = [0u8; 4];
        cursor.read_exact(&mut id_bytes)?;
        let id = FourCC(id_bytes);

        let size = cursor.read_u32::<LittleEndian>()?;

        // RIFF chunks are word-aligned; a missing final pad byte is tolerated
        let padded_size = ((size as usize) + 1) & !1;

        if offset + 8 + size as usize > data.len() {
            return Err(AviError::InsufficientData {
                needed: size as usize,
                available: data.len().saturating_sub(offset + 8),
            });
        }

        let chunk_data = data[offset + 8..offset + 8 + size as usize].to_vec();

        Ok((
            RiffChunk {
                id,
                size,
                data: chunk_data,
            },
            (offset + 8 + padded_size).min(data.len()),
        ))
    }

    /// Write chunk to writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_chunk_header(writer, self.id, self.data.len())?;
        writer.write_all(&self.data)?;

        if self.data.len() % 2 != 0 {
            writer.write_all(&[0])?;
        }

        Ok(())
    }

    /// Total size including header and padding
    pub fn total_size(&self) -> usize {
        padded_chunk_size(self.data.len())
    }
}

/// Bytes occupied on disk by a chunk with `payload` data bytes
pub fn padded_chunk_size(payload: usize) -> usize {
    8 + ((payload + 1) & !1)
}

/// Write an 8-byte chunk header
pub fn write_chunk_header<W: Write>(writer: &mut W, id: FourCC, size: usize) -> Result<()> {
    let size = u32::try_from(size).map_err(|_| AviError::TooLarge(size as u64))?;
    writer.write_all(id.as_bytes())?;
    writer.write_u32::<LittleEndian>(size)?;
    Ok(())
}

/// LIST chunk (container for other chunks)
#[derive(Debug, Clone)]
pub struct ListChunk {
    /// List type
    pub list_type: FourCC,
    /// Child chunks
    pub chunks: Vec<RiffChunk>,
}

impl ListChunk {
    /// Create new list chunk
    pub fn new(list_type: FourCC) -> Self {
        ListChunk {
            list_type,
            chunks: Vec::new(),
        }
    }

    /// Add a child chunk
    pub fn add_chunk(&mut self, chunk: RiffChunk) {
        self.chunks.push(chunk);
    }

    /// Add a nested list
    pub fn add_list(&mut self, list: ListChunk) {
        self.chunks.push(list.into_chunk());
    }

    /// Parse LIST chunk from data
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(AviError::InsufficientData {
                needed: 4,
                available: data.len(),
            });
        }

        let mut list_type = [0u8; 4];
        list_type.copy_from_slice(&data[0..4]);

        let mut chunks = Vec::new();
        let mut offset = 4;

        while offset + 8 <= data.len() {
            match RiffChunk::read(data, offset) {
                Ok((chunk, next_offset)) => {
                    chunks.push(chunk);
                    offset = next_offset;
                }
                Err(_) => break,
            }
        }

        Ok(ListChunk {
            list_type: FourCC(list_type),
            chunks,
        })
    }

    /// Size of the list payload (type tag plus children)
    pub fn content_size(&self) -> usize {
        4 + self.chunks.iter().map(|c| c.total_size()).sum::<usize>()
    }

    /// Serialize into a plain `LIST` chunk
    pub fn into_chunk(self) -> RiffChunk {
        let mut data = Vec::with_capacity(self.content_size());
        data.extend_from_slice(self.list_type.as_bytes());
        for chunk in &self.chunks {
            data.extend_from_slice(chunk.id.as_bytes());
            data.extend_from_slice(&(chunk.data.len() as u32).to_le_bytes());
            data.extend_from_slice(&chunk.data);
            if chunk.data.len() % 2 != 0 {
                data.push(0);
            }
        }
        RiffChunk::new(chunk_ids::LIST, data)
    }

    /// Write LIST chunk
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_chunk_header(writer, chunk_ids::LIST, self.content_size())?;
        writer.write_all(self.list_type.as_bytes())?;

        for chunk in &self.chunks {
            chunk.write(writer)?;
        }

        Ok(())
    }

    /// Find chunk by ID
    pub fn find_chunk(&self, id: FourCC) -> Option<&RiffChunk> {
        self.chunks.iter().find(|c| c.id == id)
    }

    /// Find all chunks by ID
    pub fn find_chunks(&self, id: FourCC) -> Vec<&RiffChunk> {
        self.chunks.iter().filter(|c| c.id == id).collect()
    }
}

/// AVI index entry (idx1 format)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Chunk ID
    pub chunk_id: FourCC,
    /// Flags
    pub flags: u32,
    /// Offset relative to the `movi` fourcc
    pub offset: u32,
    /// Size of chunk data
    pub size: u32,
}

impl IndexEntry {
    /// AVIIF_KEYFRAME
    pub const KEYFRAME: u32 = 0x10;

    /// On-disk size of one entry
    pub const SIZE: usize = 16;

    /// Read from data
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(AviError::InsufficientData {
                needed: Self::SIZE,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let mut id_bytes = [0u8; 4];
        cursor.read_exact(&mut id_bytes)?;

        Ok(IndexEntry {
            chunk_id: FourCC(id_bytes),
            flags: cursor.read_u32::<LittleEndian>()?,
            offset: cursor.read_u32::<LittleEndian>()?,
            size: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Write to writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.chunk_id.as_bytes())?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        Ok(())
    }

    /// Check if this is a keyframe
    pub fn is_keyframe(&self) -> bool {
        (self.flags & Self::KEYFRAME) != 0
    }
}

/// Parse idx1 index
pub fn parse_index(data: &[u8]) -> Vec<IndexEntry> {
    data.chunks_exact(IndexEntry::SIZE)
        .filter_map(|entry| IndexEntry::read(entry).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc() {
        let fourcc = FourCC::new(*b"RIFF");
        assert_eq!(fourcc.as_str(), "RIFF");
        assert_eq!(fourcc.as_bytes(), b"RIFF");

        let fourcc2 = FourCC::try_from("AVI ").unwrap();
        assert_eq!(fourcc2, chunk_ids::AVI);
        assert!(FourCC::try_from("AVI").is_err());
    }

    #[test]
    fn test_chunk_id_parse() {
        let video = ChunkId::parse(FourCC(*b"00dc"));
        assert_eq!(video.stream_number, Some(0));
        assert_eq!(video.chunk_type, ChunkType::VideoCompressed);

        let audio = ChunkId::parse(FourCC(*b"01wb"));
        assert_eq!(audio.stream_number, Some(1));
        assert_eq!(audio.chunk_type, ChunkType::Audio);

        let avih = ChunkId::parse(FourCC(*b"avih"));
        assert_eq!(avih.stream_number, None);
    }

    #[test]
    fn test_chunk_id_from_typecode() {
        let video = ChunkId::stream_chunk(0, 0x6364);
        assert_eq!(video.fourcc.as_str(), "00dc");

        let raw = ChunkId::stream_chunk(0, 0x6264);
        assert_eq!(raw.fourcc.as_str(), "00db");
        assert!(raw.chunk_type.is_video());

        let audio = ChunkId::stream_chunk(1, 0x6277);
        assert_eq!(audio.fourcc.as_str(), "01wb");
        assert_eq!(audio.chunk_type, ChunkType::Audio);
    }

    #[test]
    fn test_riff_chunk_read_write() {
        let original = RiffChunk::new(FourCC(*b"test"), vec![1, 2, 3, 4, 5]);

        let mut buffer = Vec::new();
        original.write(&mut buffer).unwrap();

        // header + data + pad
        assert_eq!(buffer.len(), 8 + 6);
        assert_eq!(original.total_size(), buffer.len());

        let (parsed, next) = RiffChunk::read(&buffer, 0).unwrap();
        assert_eq!(parsed.id, original.id);
        assert_eq!(parsed.data, original.data);
        assert_eq!(next, buffer.len());
    }

    #[test]
    fn test_list_chunk_serialization() {
        let mut strl = ListChunk::new(chunk_ids::STRL);
        strl.add_chunk(RiffChunk::new(chunk_ids::STRH, vec![0; 56]));
        strl.add_chunk(RiffChunk::new(FourCC(*b"test"), vec![1, 2, 3]));

        let mut list = ListChunk::new(chunk_ids::HDRL);
        list.add_chunk(RiffChunk::new(chunk_ids::AVIH, vec![0; 56]));
        list.add_list(strl);

        let mut written = Vec::new();
        list.write(&mut written).unwrap();
        assert_eq!(written.len(), 8 + list.content_size());

        let (outer, _) = RiffChunk::read(&written, 0).unwrap();
        let parsed = ListChunk::parse(&outer.data).unwrap();
        assert_eq!(parsed.list_type, chunk_ids::HDRL);
        assert!(parsed.find_chunk(chunk_ids::AVIH).is_some());

        let nested = ListChunk::parse(&parsed.find_chunk(chunk_ids::LIST).unwrap().data).unwrap();
        assert_eq!(nested.list_type, chunk_ids::STRL);
        assert_eq!(nested.find_chunks(FourCC(*b"test"))[0].data, vec![1, 2, 3]);
    }

    #[test]
    fn test_index_entry() {
        let entry = IndexEntry {
            chunk_id: FourCC(*b"00dc"),
            flags: IndexEntry::KEYFRAME,
            offset: 1000,
            size: 5000,
        };

        assert!(entry.is_keyframe());

        let mut buffer = Vec::new();
        entry.write(&mut buffer).unwrap();
        assert_eq!(buffer.len(), IndexEntry::SIZE);

        assert_eq!(IndexEntry::read(&buffer).unwrap(), entry);
    }

    #[test]
    fn test_parse_index() {
        let mut data = Vec::new();

        IndexEntry {
            chunk_id: FourCC(*b"00dc"),
            flags: IndexEntry::KEYFRAME,
            offset: 4,
            size: 1000,
        }
        .write(&mut data)
        .unwrap();

        IndexEntry {
            chunk_id: FourCC(*b"01wb"),
            flags: 0,
            offset: 1012,
            size: 500,
        }
        .write(&mut data)
        .unwrap();

        let entries = parse_index(&data);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_keyframe());
        assert!(!entries[1].is_keyframe());
    }
}
