use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use tracing::debug;

use super::codec::le_bytes_to_pcm;
use super::PcmAudio;

const RIFF_MAGIC: &[u8; 4] = b"RIFF";

/// Interpret synthesized audio bytes as mono 16-bit PCM.
///
/// LINEAR16 synthesis hands back a complete WAV container; other engines
/// stream headerless little-endian samples at `fallback_rate`.
pub fn decode_linear16(bytes: &[u8], fallback_rate: u32) -> Result<PcmAudio> {
    if !bytes.starts_with(RIFF_MAGIC) {
        debug!("Treating {} bytes as raw PCM at {}Hz", bytes.len(), fallback_rate);
        return Ok(PcmAudio {
            samples: le_bytes_to_pcm(bytes),
            sample_rate: fallback_rate,
        });
    }

    let reader = WavReader::new(Cursor::new(bytes)).context("Failed to parse WAV header")?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        bail!(
            "Unsupported WAV format: {:?} {} bits",
            spec.sample_format,
            spec.bits_per_sample
        );
    }

    let interleaved: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read WAV samples")?;

    // Keep the first channel only; the call leg is mono
    let samples = if spec.channels > 1 {
        interleaved
            .chunks_exact(spec.channels as usize)
            .map(|frame| frame[0])
            .collect()
    } else {
        interleaved
    };

    debug!(
        "Decoded WAV: {}Hz, {} channels, {} samples",
        spec.sample_rate,
        spec.channels,
        samples.len()
    );

    Ok(PcmAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}
