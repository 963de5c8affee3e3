//! Immutable per-frame result snapshots.
//!
//! The engine's result views live in its scratch memory and are only valid
//! until the next engine call, so everything a frame carries onward is
//! copied into independently owned arrays here.

use crate::engine::abi::{ClusterResult, RadarPointClouds, TrackingResult};
use crate::prelude::{RadarError, RadarResult};
use serde::{Deserialize, Serialize};
use std::slice;

/// Detected points, one entry per index across all four arrays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointCloudRecord {
    pub range: Vec<f32>,
    pub speed: Vec<f32>,
    pub angle: Vec<f32>,
    pub snr: Vec<f32>,
}

/// Clusters, one entry per index across all six arrays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub index: Vec<i32>,
    pub center_x: Vec<f32>,
    pub center_y: Vec<f32>,
    pub radius_x: Vec<f32>,
    pub radius_y: Vec<f32>,
    pub avg_velocity: Vec<f32>,
}

/// Tracked objects, one entry per index across all five arrays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: Vec<i32>,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub vx: Vec<f32>,
    pub vy: Vec<f32>,
}

/// Self-owned snapshot of one frame's detection, clustering, and tracking
/// output, released together with the frame that produced it.
///
/// Whether a record travels with downstream copies of its frame is host
/// policy; the type is `Clone` and serde-serializable to allow it, and the
/// core never forwards records implicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RadarFrameRecord {
    pub frame_id: u64,
    pub points: PointCloudRecord,
    pub clusters: ClusterRecord,
    pub tracks: TrackRecord,
}

fn checked_len(what: &str, len: i32, capacity: Option<i32>) -> RadarResult<usize> {
    if len < 0 {
        return Err(RadarError::RecordAttach(format!(
            "{} count is negative: {}",
            what, len
        )));
    }
    if let Some(capacity) = capacity {
        if len > capacity {
            return Err(RadarError::RecordAttach(format!(
                "{} count {} exceeds capacity {}",
                what, len, capacity
            )));
        }
    }
    Ok(len as usize)
}

fn copy_array<T: Copy>(what: &str, ptr: *const T, len: usize) -> RadarResult<Vec<T>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(RadarError::RecordAttach(format!(
            "{} array is null with count {}",
            what, len
        )));
    }
    Ok(unsafe { slice::from_raw_parts(ptr, len) }.to_vec())
}

impl RadarFrameRecord {
    /// Copies the engine's scratch views into a fully independent record.
    /// Inconsistent views (negative counts, counts over capacity, null
    /// arrays with a positive count) fail with `RecordAttach`.
    pub fn from_engine_results(
        frame_id: u64,
        points: &RadarPointClouds,
        clusters: &ClusterResult,
        tracks: &TrackingResult,
    ) -> RadarResult<Self> {
        let n_points = checked_len("point cloud", points.len, Some(points.max_len))?;
        let point_record = PointCloudRecord {
            range: copy_array("point range", points.range, n_points)?,
            speed: copy_array("point speed", points.speed, n_points)?,
            angle: copy_array("point angle", points.angle, n_points)?,
            snr: copy_array("point snr", points.snr, n_points)?,
        };

        let n_clusters = checked_len("cluster", clusters.n, None)?;
        let mut cluster_record = ClusterRecord::default();
        if n_clusters > 0 {
            if clusters.cd.is_null() {
                return Err(RadarError::RecordAttach(format!(
                    "cluster description array is null with count {}",
                    n_clusters
                )));
            }
            let descriptions = unsafe { slice::from_raw_parts(clusters.cd, n_clusters) };
            // A null index array means the engine kept implicit ordering.
            let index = if clusters.idx.is_null() {
                (0..n_clusters as i32).collect()
            } else {
                unsafe { slice::from_raw_parts(clusters.idx, n_clusters) }.to_vec()
            };
            cluster_record = ClusterRecord {
                index,
                center_x: descriptions.iter().map(|d| d.cx).collect(),
                center_y: descriptions.iter().map(|d| d.cy).collect(),
                radius_x: descriptions.iter().map(|d| d.rx).collect(),
                radius_y: descriptions.iter().map(|d| d.ry).collect(),
                avg_velocity: descriptions.iter().map(|d| d.av).collect(),
            };
        }

        let n_tracks = checked_len("track", tracks.len, Some(tracks.max_len))?;
        let mut track_record = TrackRecord::default();
        if n_tracks > 0 {
            if tracks.td.is_null() {
                return Err(RadarError::RecordAttach(format!(
                    "tracking array is null with count {}",
                    n_tracks
                )));
            }
            let descriptions = unsafe { slice::from_raw_parts(tracks.td, n_tracks) };
            track_record = TrackRecord {
                id: descriptions.iter().map(|d| d.tid).collect(),
                x: descriptions.iter().map(|d| d.s_hat[0]).collect(),
                y: descriptions.iter().map(|d| d.s_hat[1]).collect(),
                vx: descriptions.iter().map(|d| d.s_hat[2]).collect(),
                vy: descriptions.iter().map(|d| d.s_hat[3]).collect(),
            };
        }

        Ok(Self {
            frame_id,
            points: point_record,
            clusters: cluster_record,
            tracks: track_record,
        })
    }

    pub fn point_count(&self) -> usize {
        self.points.range.len()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.index.len()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::abi::{ClusterDescription, TrackingDescription};

    struct Fixture {
        range: Vec<f32>,
        speed: Vec<f32>,
        angle: Vec<f32>,
        snr: Vec<f32>,
        cluster_idx: Vec<i32>,
        cluster_desc: Vec<ClusterDescription>,
        track_desc: Vec<TrackingDescription>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                range: vec![1.0, 2.0, 3.0],
                speed: vec![0.1, -0.2, 0.3],
                angle: vec![-5.0, 0.0, 5.0],
                snr: vec![12.0, 14.0, 16.0],
                cluster_idx: vec![7],
                cluster_desc: vec![ClusterDescription {
                    cx: 1.5,
                    cy: 2.5,
                    rx: 0.4,
                    ry: 0.6,
                    av: 0.05,
                }],
                track_desc: vec![TrackingDescription {
                    tid: 42,
                    s_hat: [1.0, 2.0, 0.1, -0.1],
                }],
            }
        }

        fn points(&mut self) -> RadarPointClouds {
            RadarPointClouds {
                len: self.range.len() as i32,
                max_len: 16,
                range_idx: std::ptr::null_mut(),
                speed_idx: std::ptr::null_mut(),
                range: self.range.as_mut_ptr(),
                speed: self.speed.as_mut_ptr(),
                angle: self.angle.as_mut_ptr(),
                snr: self.snr.as_mut_ptr(),
            }
        }

        fn clusters(&mut self) -> ClusterResult {
            ClusterResult {
                n: self.cluster_desc.len() as i32,
                idx: self.cluster_idx.as_mut_ptr(),
                cd: self.cluster_desc.as_mut_ptr(),
            }
        }

        fn tracks(&mut self) -> TrackingResult {
            TrackingResult {
                len: self.track_desc.len() as i32,
                max_len: 64,
                td: self.track_desc.as_mut_ptr(),
            }
        }
    }

    #[test]
    fn record_copies_all_arrays() {
        let mut fixture = Fixture::new();
        let (points, clusters, tracks) =
            (fixture.points(), fixture.clusters(), fixture.tracks());
        let record =
            RadarFrameRecord::from_engine_results(9, &points, &clusters, &tracks).unwrap();

        assert_eq!(record.frame_id, 9);
        assert_eq!(record.point_count(), 3);
        assert_eq!(record.points.range, vec![1.0, 2.0, 3.0]);
        assert_eq!(record.points.snr, vec![12.0, 14.0, 16.0]);
        assert_eq!(record.cluster_count(), 1);
        assert_eq!(record.clusters.index, vec![7]);
        assert_eq!(record.clusters.center_y, vec![2.5]);
        assert_eq!(record.track_count(), 1);
        assert_eq!(record.tracks.id, vec![42]);
        assert_eq!(record.tracks.vy, vec![-0.1]);

        // The record owns its storage; mutating the source must not leak
        // through.
        fixture.range[0] = 99.0;
        assert_eq!(record.points.range[0], 1.0);
    }

    #[test]
    fn zero_counts_produce_empty_arrays() {
        let points = RadarPointClouds::with_max_len(16);
        let clusters = ClusterResult::empty();
        let tracks = TrackingResult {
            len: 0,
            max_len: 64,
            td: std::ptr::null_mut(),
        };
        let record =
            RadarFrameRecord::from_engine_results(0, &points, &clusters, &tracks).unwrap();
        assert_eq!(record.point_count(), 0);
        assert_eq!(record.cluster_count(), 0);
        assert_eq!(record.track_count(), 0);
        assert!(record.points.range.is_empty());
    }

    #[test]
    fn negative_count_is_rejected() {
        let mut fixture = Fixture::new();
        let mut points = fixture.points();
        points.len = -1;
        let err = RadarFrameRecord::from_engine_results(
            0,
            &points,
            &fixture.clusters(),
            &fixture.tracks(),
        )
        .unwrap_err();
        assert!(matches!(err, RadarError::RecordAttach(_)));
    }

    #[test]
    fn count_over_capacity_is_rejected() {
        let mut fixture = Fixture::new();
        let mut points = fixture.points();
        points.len = points.max_len + 1;
        let err = RadarFrameRecord::from_engine_results(
            0,
            &points,
            &fixture.clusters(),
            &fixture.tracks(),
        )
        .unwrap_err();
        assert!(matches!(err, RadarError::RecordAttach(_)));
    }

    #[test]
    fn null_array_with_positive_count_is_rejected() {
        let mut fixture = Fixture::new();
        let mut points = fixture.points();
        points.range = std::ptr::null_mut();
        let err = RadarFrameRecord::from_engine_results(
            0,
            &points,
            &fixture.clusters(),
            &fixture.tracks(),
        )
        .unwrap_err();
        assert!(matches!(err, RadarError::RecordAttach(_)));
    }

    #[test]
    fn null_cluster_index_falls_back_to_ordinal() {
        let mut fixture = Fixture::new();
        let mut clusters = fixture.clusters();
        clusters.idx = std::ptr::null_mut();
        let record = RadarFrameRecord::from_engine_results(
            0,
            &fixture.points(),
            &clusters,
            &fixture.tracks(),
        )
        .unwrap();
        assert_eq!(record.clusters.index, vec![0]);
    }
}
