//! PCM conversion and frame codecs
//!
//! The live session speaks base64-encoded little-endian signed 16-bit mono
//! PCM in both directions: 16 kHz up to the model, 24 kHz back down.

use base64::Engine as _;

use crate::{Error, Result};

/// Sample rate for microphone capture (16 kHz for speech input)
pub const INPUT_SAMPLE_RATE: u32 = 16000;

/// Sample rate for model audio output
pub const OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Convert f32 samples in `[-1.0, 1.0]` to little-endian i16 PCM bytes
#[must_use]
pub fn samples_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let value = (sample * 32768.0).clamp(-32768.0, 32767.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert little-endian i16 PCM bytes to f32 samples; a trailing odd byte
/// is dropped
#[must_use]
pub fn pcm16_to_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect()
}

/// Encode a captured frame as a base64 realtime input unit
#[must_use]
pub fn encode_frame(samples: &[f32]) -> String {
    base64::engine::general_purpose::STANDARD.encode(samples_to_pcm16(samples))
}

/// Decode a base64 audio frame from the model into f32 samples
///
/// # Errors
///
/// Returns error if the payload is not valid base64
pub fn decode_frame(base64_frame: &str) -> Result<Vec<f32>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(base64_frame)
        .map_err(|e| Error::Media(format!("bad audio frame: {e}")))?;
    Ok(pcm16_to_samples(&bytes))
}

/// Convert f32 samples to WAV bytes (for saving synthesized answers)
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
