pub mod codec;
pub mod wav;

pub use codec::{
    linear16_to_telephony, mulaw_decode, mulaw_encode, resample, telephony_to_linear16,
};
pub use wav::decode_linear16;

/// Sample rate of the narrowband call leg
pub const TELEPHONY_SAMPLE_RATE: u32 = 8000;

/// Sample rate of the higher-fidelity engine leg
pub const LINEAR16_SAMPLE_RATE: u32 = 16000;

/// Mono 16-bit PCM with its sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl PcmAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
