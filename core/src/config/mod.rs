//! Radar configuration input.
//!
//! The on-disk format is a JSON document with four sections, each an array
//! holding a single object (the capture tooling emits them that way).
//! Missing fields and missing sections fall back to the documented
//! defaults; malformed input is a load failure.

pub mod params;

pub use params::{AoaMethod, CfarMethod, RadarParameters, WindowKind};

use crate::prelude::{RadarError, RadarResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// `RadarBasicConfig` section: antenna geometry, chirp timing, sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    #[serde(rename = "numRx")]
    pub num_rx: i32,
    #[serde(rename = "numTx")]
    pub num_tx: i32,
    #[serde(rename = "Start_frequency")]
    pub start_frequency: f64,
    pub idle: f64,
    #[serde(rename = "adcStartTime")]
    pub adc_start_time: f64,
    #[serde(rename = "rampEndTime")]
    pub ramp_end_time: f64,
    #[serde(rename = "freqSlopeConst")]
    pub freq_slope_const: f64,
    #[serde(rename = "adcSamples")]
    pub adc_samples: i32,
    #[serde(rename = "adcSampleRate")]
    pub adc_sample_rate: f64,
    #[serde(rename = "numChirps")]
    pub num_chirps: i32,
    pub fps: f32,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            num_rx: 4,
            num_tx: 2,
            start_frequency: 77.0,
            idle: 4.0,
            adc_start_time: 6.0,
            ramp_end_time: 32.0,
            freq_slope_const: 30.0,
            adc_samples: 256,
            adc_sample_rate: 10_000.0,
            num_chirps: 64,
            fps: 10.0,
        }
    }
}

/// `RadarDetectionConfig` section: windowing, angle estimation, CFAR.
///
/// Enum-valued fields carry the raw 1-based codes from the file; they are
/// range-checked when [`RadarParameters`] is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    #[serde(rename = "RangeWinType")]
    pub range_win_type: i32,
    #[serde(rename = "DopplerWinType")]
    pub doppler_win_type: i32,
    #[serde(rename = "AoaEstimationType")]
    pub aoa_estimation_type: i32,
    #[serde(rename = "DopplerCfarMethod")]
    pub doppler_cfar_method: i32,
    #[serde(rename = "DopplerPfa")]
    pub doppler_pfa: f32,
    #[serde(rename = "DopplerWinGuardLen")]
    pub doppler_win_guard_len: i32,
    #[serde(rename = "DopplerWinTrainLen")]
    pub doppler_win_train_len: i32,
    #[serde(rename = "RangeCfarMethod")]
    pub range_cfar_method: i32,
    #[serde(rename = "RangePfa")]
    pub range_pfa: f32,
    #[serde(rename = "RangeWinGuardLen")]
    pub range_win_guard_len: i32,
    #[serde(rename = "RangeWinTrainLen")]
    pub range_win_train_len: i32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            range_win_type: 1,
            doppler_win_type: 1,
            aoa_estimation_type: 1,
            doppler_cfar_method: 1,
            doppler_pfa: 2.0,
            doppler_win_guard_len: 4,
            doppler_win_train_len: 8,
            range_cfar_method: 1,
            range_pfa: 3.0,
            range_win_guard_len: 6,
            range_win_train_len: 10,
        }
    }
}

/// `RadarClusteringConfig` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub eps: f32,
    pub weight: f32,
    #[serde(rename = "minPointsInCluster")]
    pub min_points_in_cluster: i32,
    #[serde(rename = "maxClusters")]
    pub max_clusters: i32,
    #[serde(rename = "maxPoints")]
    pub max_points: i32,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            eps: 5.0,
            weight: 0.0,
            min_points_in_cluster: 5,
            max_clusters: 20,
            max_points: 1000,
        }
    }
}

/// `RadarTrackingConfig` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    #[serde(rename = "trackerAssociationThreshold")]
    pub association_threshold: f32,
    #[serde(rename = "measurementNoiseVariance")]
    pub measurement_noise_variance: f32,
    #[serde(rename = "timePerFrame")]
    pub time_per_frame: f32,
    #[serde(rename = "iirForgetFactor")]
    pub forget_factor: f32,
    #[serde(rename = "trackerActiveThreshold")]
    pub active_threshold: i32,
    #[serde(rename = "trackerForgetThreshold")]
    pub forget_threshold: i32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            association_threshold: 2.0,
            measurement_noise_variance: 0.1,
            time_per_frame: 10.0,
            forget_factor: 1.0,
            active_threshold: 0,
            forget_threshold: 0,
        }
    }
}

/// Wire shape of the config document: every section is an array of one.
#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default, rename = "RadarBasicConfig")]
    basic: Vec<BasicConfig>,
    #[serde(default, rename = "RadarDetectionConfig")]
    detection: Vec<DetectionConfig>,
    #[serde(default, rename = "RadarClusteringConfig")]
    clustering: Vec<ClusteringConfig>,
    #[serde(default, rename = "RadarTrackingConfig")]
    tracking: Vec<TrackingConfig>,
}

/// Merged radar configuration, one struct per section.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RadarConfig {
    pub basic: BasicConfig,
    pub detection: DetectionConfig,
    pub clustering: ClusteringConfig,
    pub tracking: TrackingConfig,
}

impl RadarConfig {
    /// Loads a configuration document, falling back to defaults for any
    /// section or field the file does not carry.
    pub fn load<P: AsRef<Path>>(path: P) -> RadarResult<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            RadarError::Config(format!("reading {}: {}", path_ref.display(), err))
        })?;
        let document: ConfigDocument = serde_json::from_str(&contents).map_err(|err| {
            RadarError::Config(format!("parsing {}: {}", path_ref.display(), err))
        })?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: ConfigDocument) -> Self {
        Self {
            basic: document.basic.into_iter().next().unwrap_or_default(),
            detection: document.detection.into_iter().next().unwrap_or_default(),
            clustering: document.clustering.into_iter().next().unwrap_or_default(),
            tracking: document.tracking.into_iter().next().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_documented_values() {
        let config = RadarConfig::default();
        assert_eq!(config.basic.num_rx, 4);
        assert_eq!(config.basic.num_tx, 2);
        assert_eq!(config.basic.adc_samples, 256);
        assert_eq!(config.basic.num_chirps, 64);
        assert_eq!(config.clustering.max_points, 1000);
        assert_eq!(config.tracking.association_threshold, 2.0);
    }

    #[test]
    fn load_merges_sections_over_defaults() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            br#"{
                "RadarBasicConfig": [{"numRx": 8, "numChirps": 32}],
                "RadarClusteringConfig": [{"maxPoints": 250}]
            }"#,
        )
        .unwrap();
        let config = RadarConfig::load(temp.path()).unwrap();
        assert_eq!(config.basic.num_rx, 8);
        assert_eq!(config.basic.num_chirps, 32);
        // untouched fields keep defaults
        assert_eq!(config.basic.num_tx, 2);
        assert_eq!(config.clustering.max_points, 250);
        assert_eq!(config.detection.range_pfa, 3.0);
    }

    #[test]
    fn load_rejects_malformed_json() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"{ not json").unwrap();
        let err = RadarConfig::load(temp.path()).unwrap_err();
        assert!(matches!(err, RadarError::Config(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = RadarConfig::load("/nonexistent/radar.json").unwrap_err();
        assert!(matches!(err, RadarError::Config(_)));
    }
}
