//! Software stand-in for the native compute engine.
//!
//! `SyntheticEngine` honors the same call contract as `libradar` (scratch
//! sizing, handle lifecycle, engine-owned result views valid until the
//! next call) while fabricating bounded, deterministic detections from
//! the cube content. It lets the full frame path run on hosts without the
//! native module installed. It performs no real CFAR, clustering, or
//! tracking.

use crate::engine::abi::{
    ClusterDescription, ClusterResult, RadarCube, RadarHandle, RadarParam, RadarPointClouds,
    TrackingResult,
};
use crate::engine::binding::{EngineHandle, RadarEngine};
use crate::engine::session::ScratchBuffer;
use crate::prelude::{EngineStage, RadarError, RadarResult};
use std::slice;

const STATUS_BAD_PARAM: i32 = 1;
const STATUS_BAD_INPUT: i32 = 2;

pub struct SyntheticEngine {
    detections_per_frame: usize,
    max_points: usize,
    max_clusters: usize,
    min_points_in_cluster: usize,
    live: bool,
    // Result storage the views point into, engine-owned like the native
    // library's scratch. Rewritten on every call.
    range_idx: Vec<u16>,
    speed_idx: Vec<u16>,
    range: Vec<f32>,
    speed: Vec<f32>,
    angle: Vec<f32>,
    snr: Vec<f32>,
    cluster_idx: Vec<i32>,
    cluster_desc: Vec<ClusterDescription>,
}

impl SyntheticEngine {
    pub fn new(detections_per_frame: usize) -> Self {
        Self {
            detections_per_frame,
            max_points: 0,
            max_clusters: 0,
            min_points_in_cluster: 1,
            live: false,
            range_idx: Vec::new(),
            speed_idx: Vec::new(),
            range: Vec::new(),
            speed: Vec::new(),
            angle: Vec::new(),
            snr: Vec::new(),
            cluster_idx: Vec::new(),
            cluster_desc: Vec::new(),
        }
    }
}

impl Default for SyntheticEngine {
    fn default() -> Self {
        Self::new(8)
    }
}

impl RadarEngine for SyntheticEngine {
    fn query_mem_size(&self, param: &RadarParam) -> RadarResult<usize> {
        if param.mp <= 0 || param.mc <= 0 {
            return Err(RadarError::Allocation(
                "synthetic engine needs positive point and cluster capacities".into(),
            ));
        }
        Ok(param.mp as usize * 24 + param.mc as usize * 40 + 4096)
    }

    fn init_handle(
        &mut self,
        param: &RadarParam,
        scratch: &mut ScratchBuffer,
    ) -> RadarResult<EngineHandle> {
        if param.rn <= 0 || param.tn <= 0 || param.sn <= 0 || param.cn <= 0 {
            return Err(RadarError::EngineInit(STATUS_BAD_PARAM));
        }
        if scratch.is_empty() {
            return Err(RadarError::EngineInit(STATUS_BAD_PARAM));
        }
        self.max_points = param.mp as usize;
        self.max_clusters = param.mc as usize;
        self.min_points_in_cluster = param.mpc.max(1) as usize;
        self.live = true;
        let raw = Box::into_raw(Box::new(0u64)) as *mut RadarHandle;
        Ok(EngineHandle::new(raw))
    }

    fn detect(
        &mut self,
        _handle: &EngineHandle,
        cube: &mut RadarCube,
        points: &mut RadarPointClouds,
    ) -> RadarResult<()> {
        if cube.mat.is_null() || cube.sn <= 0 {
            return Err(RadarError::EngineRuntime {
                stage: EngineStage::Detection,
                status: STATUS_BAD_INPUT,
            });
        }

        // Scale SNR by the mean magnitude of the first sample window so the
        // output depends on the cube that was handed in.
        let lane = unsafe { slice::from_raw_parts(cube.mat, cube.sn as usize) };
        let amplitude = lane.iter().map(|s| s.norm()).sum::<f32>() / lane.len() as f32;

        let n = self
            .detections_per_frame
            .min(self.max_points)
            .min(points.max_len.max(0) as usize);

        self.range_idx.clear();
        self.speed_idx.clear();
        self.range.clear();
        self.speed.clear();
        self.angle.clear();
        self.snr.clear();
        for i in 0..n {
            self.range_idx.push((i * 3) as u16);
            self.speed_idx.push(i as u16);
            self.range.push(2.5 * (i + 1) as f32);
            let sign = if i % 2 == 0 { 0.5 } else { -0.5 };
            self.speed.push(sign * i as f32);
            self.angle.push(-30.0 + 60.0 * i as f32 / n.max(1) as f32);
            self.snr.push(10.0 + amplitude);
        }

        points.len = n as i32;
        points.range_idx = self.range_idx.as_mut_ptr();
        points.speed_idx = self.speed_idx.as_mut_ptr();
        points.range = self.range.as_mut_ptr();
        points.speed = self.speed.as_mut_ptr();
        points.angle = self.angle.as_mut_ptr();
        points.snr = self.snr.as_mut_ptr();
        Ok(())
    }

    fn cluster(
        &mut self,
        _handle: &EngineHandle,
        points: &mut RadarPointClouds,
        clusters: &mut ClusterResult,
    ) -> RadarResult<()> {
        let n_points = points.len.max(0) as usize;
        if n_points > 0
            && (points.range.is_null() || points.angle.is_null() || points.speed.is_null())
        {
            return Err(RadarError::EngineRuntime {
                stage: EngineStage::Clustering,
                status: STATUS_BAD_INPUT,
            });
        }

        self.cluster_idx.clear();
        self.cluster_desc.clear();
        if n_points == 0 {
            clusters.n = 0;
            clusters.idx = self.cluster_idx.as_mut_ptr();
            clusters.cd = self.cluster_desc.as_mut_ptr();
            return Ok(());
        }

        let n = (n_points / self.min_points_in_cluster).clamp(1, self.max_clusters.max(1));
        let ranges = unsafe { slice::from_raw_parts(points.range, n_points) };
        let angles = unsafe { slice::from_raw_parts(points.angle, n_points) };
        let speeds = unsafe { slice::from_raw_parts(points.speed, n_points) };

        for k in 0..n {
            let pivot = (k * self.min_points_in_cluster).min(n_points - 1);
            let bearing = angles[pivot].to_radians();
            self.cluster_idx.push(k as i32);
            self.cluster_desc.push(ClusterDescription {
                cx: ranges[pivot] * bearing.sin(),
                cy: ranges[pivot] * bearing.cos(),
                rx: 0.5,
                ry: 0.5,
                av: speeds[pivot],
            });
        }

        clusters.n = n as i32;
        clusters.idx = self.cluster_idx.as_mut_ptr();
        clusters.cd = self.cluster_desc.as_mut_ptr();
        Ok(())
    }

    fn track(
        &mut self,
        _handle: &EngineHandle,
        clusters: &mut ClusterResult,
        tracks: &mut TrackingResult,
    ) -> RadarResult<()> {
        if tracks.td.is_null() || tracks.max_len < 0 {
            return Err(RadarError::EngineRuntime {
                stage: EngineStage::Tracking,
                status: STATUS_BAD_INPUT,
            });
        }
        let n_clusters = clusters.n.max(0) as usize;
        if n_clusters == 0 {
            tracks.len = 0;
            return Ok(());
        }
        if clusters.cd.is_null() {
            return Err(RadarError::EngineRuntime {
                stage: EngineStage::Tracking,
                status: STATUS_BAD_INPUT,
            });
        }

        let n = n_clusters.min(tracks.max_len as usize);
        let descs = unsafe { slice::from_raw_parts(clusters.cd, n_clusters) };
        let out = unsafe { slice::from_raw_parts_mut(tracks.td, tracks.max_len as usize) };
        for (k, slot) in out.iter_mut().take(n).enumerate() {
            slot.tid = 100 + k as i32;
            slot.s_hat = [descs[k].cx, descs[k].cy, 0.0, descs[k].av];
        }
        tracks.len = n as i32;
        Ok(())
    }

    fn destroy_handle(&mut self, handle: &EngineHandle) -> RadarResult<()> {
        if !self.live {
            return Err(RadarError::Teardown(STATUS_BAD_PARAM));
        }
        unsafe { drop(Box::from_raw(handle.as_ptr() as *mut u64)) };
        self.live = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RadarConfig, RadarParameters};
    use crate::engine::abi::TrackingDescription;
    use crate::engine::session::EngineSession;
    use num_complex::Complex32;

    fn small_params() -> RadarParameters {
        let mut config = RadarConfig::default();
        config.basic.num_rx = 2;
        config.basic.num_tx = 1;
        config.basic.num_chirps = 4;
        config.basic.adc_samples = 16;
        config.clustering.max_points = 32;
        RadarParameters::from_config(&config).unwrap()
    }

    #[test]
    fn full_stage_sequence_produces_bounded_results() {
        let params = small_params();
        let engine_param = params.to_engine_param();
        let mut session =
            EngineSession::open(Box::new(SyntheticEngine::default()), &engine_param).unwrap();

        let mut samples = vec![Complex32::new(1.0, 0.0); params.frame_sample_count()];
        let mut cube = RadarCube {
            rn: engine_param.rn,
            tn: engine_param.tn,
            sn: engine_param.sn,
            cn: engine_param.cn,
            mat: samples.as_mut_ptr(),
        };
        let mut points = RadarPointClouds::with_max_len(engine_param.mp);
        let mut clusters = ClusterResult::empty();
        let mut td = vec![TrackingDescription::default(); 64];
        let mut tracks = TrackingResult {
            len: 0,
            max_len: td.len() as i32,
            td: td.as_mut_ptr(),
        };

        session.detect(&mut cube, &mut points).unwrap();
        assert_eq!(points.len, 8);
        assert!(!points.range.is_null());

        session.cluster(&mut points, &mut clusters).unwrap();
        assert!(clusters.n >= 1);
        assert!(clusters.n <= engine_param.mc);

        session.track(&mut clusters, &mut tracks).unwrap();
        assert_eq!(tracks.len, clusters.n.min(tracks.max_len));
        assert_eq!(td[0].tid, 100);
    }

    #[test]
    fn detect_rejects_null_cube() {
        let params = small_params();
        let engine_param = params.to_engine_param();
        let mut engine = SyntheticEngine::default();
        let mut scratch = ScratchBuffer::allocate(
            engine.query_mem_size(&engine_param).unwrap(),
            crate::engine::session::SCRATCH_ALIGNMENT,
        )
        .unwrap();
        let handle = engine.init_handle(&engine_param, &mut scratch).unwrap();

        let mut cube = RadarCube {
            rn: 2,
            tn: 1,
            sn: 16,
            cn: 4,
            mat: std::ptr::null_mut(),
        };
        let mut points = RadarPointClouds::with_max_len(engine_param.mp);
        let err = engine.detect(&handle, &mut cube, &mut points).unwrap_err();
        assert!(matches!(
            err,
            RadarError::EngineRuntime {
                stage: EngineStage::Detection,
                ..
            }
        ));
        engine.destroy_handle(&handle).unwrap();
    }
}
