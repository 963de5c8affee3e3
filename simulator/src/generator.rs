use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use radarcore::config::RadarParameters;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Configuration for synthesizing chirp-major ADC frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Beat frequency of the injected point target, in cycles per window.
    pub target_cycles: f32,
    /// Static offset added to every sample; the preprocessor should remove
    /// it entirely.
    pub dc_bias: f32,
    pub noise: f32,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            target_cycles: 6.0,
            dc_bias: 0.25,
            noise: 0.02,
            seed: 0,
        }
    }
}

/// Builds one frame of complex samples in the radar wire format:
/// native-endian (real, imag) f32 pairs, chirp-major
/// `[chirp][channel][sample]`.
pub fn build_frame(
    params: &RadarParameters,
    config: &GeneratorConfig,
    frame_index: u64,
) -> anyhow::Result<Vec<u8>> {
    let channels = params.channel_count() as usize;
    let chirps = params.num_chirps as usize;
    let samples = params.adc_samples as usize;
    let total_samples = channels
        .checked_mul(chirps)
        .and_then(|v| v.checked_mul(samples))
        .context("overflow computing frame sample count")?;

    let mut rng = StdRng::seed_from_u64(config.seed ^ frame_index);
    let mut bytes = Vec::with_capacity(total_samples * 8);

    for chirp in 0..chirps {
        for channel in 0..channels {
            // Phase offsets emulate per-channel path differences and a
            // slowly moving target across chirps.
            let phase_offset = channel as f32 * 0.35 + chirp as f32 * 0.05;
            for sample in 0..samples {
                let phase = 2.0 * PI * config.target_cycles * (sample as f32 / samples as f32)
                    + phase_offset;
                let jitter_re = rng.gen_range(-config.noise..=config.noise);
                let jitter_im = rng.gen_range(-config.noise..=config.noise);
                let re = phase.cos() + config.dc_bias + jitter_re;
                let im = phase.sin() + config.dc_bias + jitter_im;
                bytes.extend_from_slice(&re.to_ne_bytes());
                bytes.extend_from_slice(&im.to_ne_bytes());
            }
        }
    }

    Ok(bytes)
}
