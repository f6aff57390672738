//! Signed 16-bit little-endian PCM.

use crate::error::{CodecError, Result};
use crate::traits::{AudioCodec, CodecInfo, AudioStreamFormat};
use avidump_avi::Packet;
use byteorder::{ByteOrder, LittleEndian};
use std::collections::VecDeque;

/// WAVE_FORMAT_PCM.
const FORMAT_TAG_PCM: u16 = 1;

/// PCM encoder: one packet per `samples` call.
#[derive(Debug, Default)]
pub struct PcmCodec {
    sample_rate: u32,
    channels: u16,
    samples_encoded: u64,
    pending: VecDeque<Packet>,
}

impl PcmCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample values encoded since the last reset.
    pub fn samples_encoded(&self) -> u64 {
        self.samples_encoded
    }

    /// Encoded size of `sample_count` interleaved values.
    pub fn bytes_for_samples(&self, sample_count: usize) -> usize {
        sample_count * 2
    }
}

impl AudioCodec for PcmCodec {
    fn codec_info(&self) -> CodecInfo {
        CodecInfo {
            name: "pcm",
            long_name: "PCM signed 16-bit little-endian",
            intra_only: true,
        }
    }

    fn reset(&mut self, sample_rate: u32, channels: u16) -> Result<AudioStreamFormat> {
        if sample_rate == 0 || channels == 0 {
            return Err(CodecError::InvalidConfiguration(format!(
                "PCM needs a positive rate and channel count, got {} Hz x {}",
                sample_rate, channels
            )));
        }
        self.sample_rate = sample_rate;
        self.channels = channels;
        self.samples_encoded = 0;
        self.pending.clear();

        let block_align = channels * 2;
        Ok(AudioStreamFormat {
            handler: [0; 4],
            format_tag: FORMAT_TAG_PCM,
            channels,
            sample_rate,
            avg_bytes_per_sec: sample_rate * block_align as u32,
            block_align,
            bits_per_sample: 16,
            extra_data: Vec::new(),
        })
    }

    fn samples(&mut self, pcm: &[i16]) -> Result<()> {
        if pcm.is_empty() {
            return Ok(());
        }

        let mut payload = Vec::new();
        payload
            .try_reserve_exact(self.bytes_for_samples(pcm.len()))
            .map_err(|_| CodecError::Allocation(self.bytes_for_samples(pcm.len())))?;
        payload.resize(self.bytes_for_samples(pcm.len()), 0);
        LittleEndian::write_i16_into(pcm, &mut payload);

        self.samples_encoded += pcm.len() as u64;
        self.pending.push_back(Packet::audio(payload));
        Ok(())
    }

    fn ready(&self) -> bool {
        self.pending.is_empty()
    }

    fn get_packet(&mut self) -> Result<Packet> {
        self.pending.pop_front().ok_or(CodecError::NoPacket)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
