// Telephony transcoding
//
// The call leg carries 8kHz G.711 μ-law; recognition and synthesis engines
// work on 16-bit linear PCM (usually 16kHz). Everything here is pure and
// allocation-bounded by the input size, so it runs inline on the reactor.

use super::{PcmAudio, LINEAR16_SAMPLE_RATE, TELEPHONY_SAMPLE_RATE};

const MULAW_BIAS: i32 = 0x84;
const MULAW_CLIP: i32 = 32635;

/// Encode one 16-bit linear sample as G.711 μ-law
pub fn linear_to_mulaw(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign = if magnitude < 0 {
        magnitude = -magnitude;
        0x80
    } else {
        0x00
    };

    if magnitude > MULAW_CLIP {
        magnitude = MULAW_CLIP;
    }
    magnitude += MULAW_BIAS;

    // Segment = position of the highest set bit above bit 7
    let mut exponent = 7;
    let mut mask = 0x4000;
    while exponent > 0 && magnitude & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = (magnitude >> (exponent + 3)) & 0x0F;
    !(sign | (exponent << 4) | mantissa) as u8
}

/// Decode one G.711 μ-law byte to 16-bit linear
pub fn mulaw_to_linear(byte: u8) -> i16 {
    let byte = !byte as i32;
    let sign = byte & 0x80;
    let exponent = (byte >> 4) & 0x07;
    let mantissa = byte & 0x0F;

    let magnitude = (((mantissa << 3) + MULAW_BIAS) << exponent) - MULAW_BIAS;
    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

pub fn mulaw_decode(data: &[u8]) -> Vec<i16> {
    data.iter().map(|&b| mulaw_to_linear(b)).collect()
}

pub fn mulaw_encode(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| linear_to_mulaw(s)).collect()
}

/// Resample mono PCM by linear interpolation
pub fn resample(samples: &[i16], from_hz: u32, to_hz: u32) -> Vec<i16> {
    if from_hz == to_hz || samples.is_empty() || from_hz == 0 || to_hz == 0 {
        return samples.to_vec();
    }

    let out_len = (samples.len() as u64 * to_hz as u64 / from_hz as u64) as usize;
    let step = from_hz as f64 / to_hz as f64;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = pos.floor() as usize;
            if idx >= last {
                return samples[last];
            }
            let frac = pos - idx as f64;
            let a = samples[idx] as f64;
            let b = samples[idx + 1] as f64;
            (a + (b - a) * frac).round() as i16
        })
        .collect()
}

/// 8kHz μ-law call audio -> 16kHz linear PCM
pub fn telephony_to_linear16(mulaw: &[u8]) -> Vec<i16> {
    resample(
        &mulaw_decode(mulaw),
        TELEPHONY_SAMPLE_RATE,
        LINEAR16_SAMPLE_RATE,
    )
}

/// Linear PCM at any rate -> 8kHz μ-law call audio
pub fn linear16_to_telephony(audio: &PcmAudio) -> Vec<u8> {
    mulaw_encode(&resample(
        &audio.samples,
        audio.sample_rate,
        TELEPHONY_SAMPLE_RATE,
    ))
}

/// Little-endian byte view of PCM samples, as engines expect on the wire
pub fn pcm_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

pub fn le_bytes_to_pcm(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}
