//! services/api/src/app/audio.rs
//!
//! Wraps the raw narration PCM in a WAV container the browser can play.

use hound::{WavSpec, WavWriter};
use study_aid_core::ports::{PortError, PortResult};

/// A decoded, playable narration clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableAudio {
    pub wav: Vec<u8>,
    pub duration_ms: u64,
}

impl PlayableAudio {
    /// Encodes 16-bit little-endian mono PCM as WAV. A trailing odd byte is dropped.
    pub fn from_pcm(pcm_data: &[u8], sample_rate: u32) -> PortResult<Self> {
        if pcm_data.len() < 2 {
            return Err(PortError::InvalidResponse("audio payload is empty".to_string()));
        }
        let wav = pcm16_to_wav(pcm_data, sample_rate)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode WAV: {}", e)))?;
        let samples = (pcm_data.len() / 2) as u64;
        Ok(Self {
            wav,
            duration_ms: samples * 1000 / u64::from(sample_rate.max(1)),
        })
    }
}

fn pcm16_to_wav(pcm_data: &[u8], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = std::io::Cursor::new(Vec::new());

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for chunk in pcm_data.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}
