//! Validated, immutable radar parameters derived from [`RadarConfig`].

use super::RadarConfig;
use crate::engine::abi::RadarParam;
use crate::prelude::{RadarError, RadarResult};
use num_complex::Complex32;

/// Window applied before range/Doppler processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Hanning = 1,
    Hamming = 2,
    Chebyshev = 3,
}

impl WindowKind {
    fn try_from_code(code: i32) -> RadarResult<Self> {
        match code {
            1 => Ok(WindowKind::Hanning),
            2 => Ok(WindowKind::Hamming),
            3 => Ok(WindowKind::Chebyshev),
            other => Err(RadarError::Config(format!(
                "window type code out of range: {}",
                other
            ))),
        }
    }
}

/// Angle-of-arrival estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AoaMethod {
    Fft = 1,
    Music = 2,
    Dbf = 3,
    Capon = 4,
}

impl AoaMethod {
    fn try_from_code(code: i32) -> RadarResult<Self> {
        match code {
            1 => Ok(AoaMethod::Fft),
            2 => Ok(AoaMethod::Music),
            3 => Ok(AoaMethod::Dbf),
            4 => Ok(AoaMethod::Capon),
            other => Err(RadarError::Config(format!(
                "AoA estimation code out of range: {}",
                other
            ))),
        }
    }

    /// Config files use 1-based codes; the engine enum is 0-based.
    pub fn engine_code(self) -> i32 {
        self as i32 - 1
    }
}

/// CFAR thresholding method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfarMethod {
    CellAveraging = 1,
    SmallestOf = 2,
    GreatestOf = 3,
    OrderedStatistic = 4,
}

impl CfarMethod {
    fn try_from_code(code: i32) -> RadarResult<Self> {
        match code {
            1 => Ok(CfarMethod::CellAveraging),
            2 => Ok(CfarMethod::SmallestOf),
            3 => Ok(CfarMethod::GreatestOf),
            4 => Ok(CfarMethod::OrderedStatistic),
            other => Err(RadarError::Config(format!(
                "CFAR method code out of range: {}",
                other
            ))),
        }
    }
}

/// Immutable parameter set built once at pipeline start.
#[derive(Debug, Clone)]
pub struct RadarParameters {
    pub num_rx: u32,
    pub num_tx: u32,
    pub num_chirps: u32,
    pub adc_samples: u32,
    pub start_frequency: f64,
    pub idle: f64,
    pub adc_start_time: f64,
    pub ramp_end_time: f64,
    pub freq_slope_const: f64,
    pub adc_sample_rate: f64,
    pub fps: f32,
    pub range_window: WindowKind,
    pub doppler_window: WindowKind,
    pub aoa_method: AoaMethod,
    pub range_cfar: CfarMethod,
    pub doppler_cfar: CfarMethod,
    pub range_pfa: f32,
    pub doppler_pfa: f32,
    pub range_guard_len: u32,
    pub range_train_len: u32,
    pub doppler_guard_len: u32,
    pub doppler_train_len: u32,
    pub eps: f32,
    pub weight: f32,
    pub min_points_in_cluster: u32,
    pub max_clusters: u32,
    pub max_points: u32,
    pub association_threshold: f32,
    pub measurement_noise_variance: f32,
    pub time_per_frame: f32,
    pub forget_factor: f32,
    pub active_threshold: i32,
    pub forget_threshold: i32,
}

fn positive(what: &str, value: i32) -> RadarResult<u32> {
    if value > 0 {
        Ok(value as u32)
    } else {
        Err(RadarError::Config(format!(
            "{} must be positive, got {}",
            what, value
        )))
    }
}

fn non_negative(what: &str, value: i32) -> RadarResult<u32> {
    if value >= 0 {
        Ok(value as u32)
    } else {
        Err(RadarError::Config(format!(
            "{} must not be negative, got {}",
            what, value
        )))
    }
}

impl RadarParameters {
    pub fn from_config(config: &RadarConfig) -> RadarResult<Self> {
        let basic = &config.basic;
        let detection = &config.detection;
        let clustering = &config.clustering;
        let tracking = &config.tracking;

        Ok(Self {
            num_rx: positive("numRx", basic.num_rx)?,
            num_tx: positive("numTx", basic.num_tx)?,
            num_chirps: positive("numChirps", basic.num_chirps)?,
            adc_samples: positive("adcSamples", basic.adc_samples)?,
            start_frequency: basic.start_frequency,
            idle: basic.idle,
            adc_start_time: basic.adc_start_time,
            ramp_end_time: basic.ramp_end_time,
            freq_slope_const: basic.freq_slope_const,
            adc_sample_rate: basic.adc_sample_rate,
            fps: basic.fps,
            range_window: WindowKind::try_from_code(detection.range_win_type)?,
            doppler_window: WindowKind::try_from_code(detection.doppler_win_type)?,
            aoa_method: AoaMethod::try_from_code(detection.aoa_estimation_type)?,
            range_cfar: CfarMethod::try_from_code(detection.range_cfar_method)?,
            doppler_cfar: CfarMethod::try_from_code(detection.doppler_cfar_method)?,
            range_pfa: detection.range_pfa,
            doppler_pfa: detection.doppler_pfa,
            range_guard_len: non_negative("RangeWinGuardLen", detection.range_win_guard_len)?,
            range_train_len: non_negative("RangeWinTrainLen", detection.range_win_train_len)?,
            doppler_guard_len: non_negative("DopplerWinGuardLen", detection.doppler_win_guard_len)?,
            doppler_train_len: non_negative("DopplerWinTrainLen", detection.doppler_win_train_len)?,
            eps: clustering.eps,
            weight: clustering.weight,
            min_points_in_cluster: positive("minPointsInCluster", clustering.min_points_in_cluster)?,
            max_clusters: positive("maxClusters", clustering.max_clusters)?,
            max_points: positive("maxPoints", clustering.max_points)?,
            association_threshold: tracking.association_threshold,
            measurement_noise_variance: tracking.measurement_noise_variance,
            time_per_frame: tracking.time_per_frame,
            forget_factor: tracking.forget_factor,
            active_threshold: tracking.active_threshold,
            forget_threshold: tracking.forget_threshold,
        })
    }

    /// Virtual channel count: one per (rx, tx) antenna pair.
    pub fn channel_count(&self) -> u32 {
        self.num_rx * self.num_tx
    }

    /// Complex samples per frame.
    pub fn frame_sample_count(&self) -> usize {
        self.channel_count() as usize * self.num_chirps as usize * self.adc_samples as usize
    }

    /// Expected wire size of one frame in bytes.
    pub fn frame_byte_len(&self) -> usize {
        self.frame_sample_count() * std::mem::size_of::<Complex32>()
    }

    /// Maps to the C parameter block handed to the engine.
    pub fn to_engine_param(&self) -> RadarParam {
        RadarParam {
            start_freq: self.start_frequency,
            idle: self.idle,
            adc_start_time: self.adc_start_time,
            ramp_end_time: self.ramp_end_time,
            freq_slope_const: self.freq_slope_const,
            adc_sample_rate: self.adc_sample_rate,
            rn: self.num_rx as i32,
            tn: self.num_tx as i32,
            sn: self.adc_samples as i32,
            cn: self.num_chirps as i32,
            fps: self.fps,
            d_far: self.doppler_pfa,
            r_far: self.range_pfa,
            d_gwl: self.doppler_guard_len as i32,
            d_twl: self.doppler_train_len as i32,
            r_gwl: self.range_guard_len as i32,
            r_twl: self.range_train_len as i32,
            doa_type: self.aoa_method.engine_code(),
            eps: self.eps,
            weight: self.weight,
            mpc: self.min_points_in_cluster as i32,
            mc: self.max_clusters as i32,
            mp: self.max_points as i32,
            tat: self.association_threshold,
            mnv: self.measurement_noise_variance,
            tpf: self.time_per_frame,
            iff: self.forget_factor,
            at: self.active_threshold,
            ft: self.forget_threshold,
        }
    }
}
