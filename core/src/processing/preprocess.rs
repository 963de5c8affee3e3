use crate::config::RadarParameters;
use crate::prelude::{RadarError, RadarResult};
use ndarray::{s, ArrayView3, ArrayViewMut3};
use num_complex::Complex32;

/// DC removal and chirp-major to channel-major reordering.
///
/// Frames arrive as `[chirp][channel][sample]`; the engine's range
/// processing expects `[channel][chirp][sample]`. Both passes work on one
/// (chirp, channel) window of `adc_samples` IQ values at a time: the
/// complex window mean (independent real and imaginary means) is
/// subtracted from every sample to remove static clutter bias, then the
/// corrected window is written to its permuted position. The output holds
/// the same multiset of window positions as the input; only the index
/// mapping changes.
pub struct Preprocessor {
    chirps: usize,
    channels: usize,
    samples: usize,
}

impl Preprocessor {
    pub fn new(params: &RadarParameters) -> Self {
        Self {
            chirps: params.num_chirps as usize,
            channels: params.channel_count() as usize,
            samples: params.adc_samples as usize,
        }
    }

    /// Complex samples per frame.
    pub fn frame_len(&self) -> usize {
        self.chirps * self.channels * self.samples
    }

    /// Runs both passes, reading `input` chirp-major and writing the
    /// DC-removed, channel-major frame into `output`. Both slices must be
    /// exactly `frame_len()` long.
    pub fn process(&self, input: &[Complex32], output: &mut [Complex32]) -> RadarResult<()> {
        let expected = self.frame_len();
        if input.len() != expected {
            return Err(sample_len_error(expected, input.len()));
        }
        if output.len() != expected {
            return Err(sample_len_error(expected, output.len()));
        }
        if self.samples == 0 {
            return Ok(());
        }

        let input = ArrayView3::from_shape((self.chirps, self.channels, self.samples), input)
            .map_err(|_| sample_len_error(expected, input.len()))?;
        let mut output =
            ArrayViewMut3::from_shape((self.channels, self.chirps, self.samples), output)
                .map_err(|_| sample_len_error(expected, expected))?;

        for chirp in 0..self.chirps {
            for channel in 0..self.channels {
                let window = input.slice(s![chirp, channel, ..]);
                let mean = window.sum() / self.samples as f32;
                let mut out_window = output.slice_mut(s![channel, chirp, ..]);
                for (dst, &src) in out_window.iter_mut().zip(window.iter()) {
                    *dst = src - mean;
                }
            }
        }
        Ok(())
    }
}

fn sample_len_error(expected: usize, actual: usize) -> RadarError {
    let bytes = std::mem::size_of::<Complex32>();
    RadarError::FrameSizeMismatch {
        expected: expected * bytes,
        actual: actual * bytes,
    }
}
