use crate::config::RadarParameters;
use crate::engine::abi::{
    ClusterResult, RadarCube, RadarPointClouds, TrackingDescription, TrackingResult,
};
use crate::engine::binding::RadarEngine;
use crate::engine::session::EngineSession;
use crate::prelude::{RadarError, RadarResult};
use crate::processing::pacing::RateLimiter;
use crate::processing::preprocess::Preprocessor;
use crate::record::RadarFrameRecord;
use crate::telemetry::log::LogManager;
use crate::telemetry::stats::{FrameStats, FrameStatsSnapshot};
use log::warn;
use num_complex::Complex32;
use std::time::{Duration, Instant};

/// Fixed capacity of the tracking result buffer.
pub const MAX_TRACKED_OBJECTS: usize = 64;

/// Outcome of one successfully processed frame.
#[derive(Debug)]
pub struct ProcessedFrame {
    pub frame_id: u64,
    /// `None` when the result snapshot could not be built; the frame body
    /// is still transformed and emitted.
    pub record: Option<RadarFrameRecord>,
    pub elapsed: Duration,
}

/// Per-frame orchestrator.
///
/// Construction performs every start-time acquisition (engine session,
/// staging buffers); a constructed pipeline is ready for frames, and a
/// start-time failure unwinds whatever was already acquired. Per-frame
/// failures reject only that frame. Frames are processed strictly
/// sequentially; the engine handle serves one in-flight frame at a time,
/// and callers must serialize lifecycle transitions themselves.
pub struct RadarPipeline {
    params: RadarParameters,
    session: EngineSession,
    preprocessor: Preprocessor,
    pacer: RateLimiter,
    // Staging buffers sized once at start and reused for every frame.
    input_data: Vec<Complex32>,
    output_data: Vec<Complex32>,
    cube: RadarCube,
    point_clouds: RadarPointClouds,
    cluster_result: ClusterResult,
    tracking_result: TrackingResult,
    // Host-side backing for `tracking_result.td`; never resized, so the
    // pointer stored in the view stays valid for the pipeline's lifetime.
    _tracking_buf: Vec<TrackingDescription>,
    stats: FrameStats,
    frame_id: u64,
    logger: LogManager,
}

impl RadarPipeline {
    /// Acquires the engine session and staging buffers. `target_fps` of
    /// zero disables pacing.
    pub fn start(
        params: RadarParameters,
        engine: Box<dyn RadarEngine>,
        target_fps: f64,
    ) -> RadarResult<Self> {
        let engine_param = params.to_engine_param();
        let session = EngineSession::open(engine, &engine_param)?;

        let total_samples = params.frame_sample_count();
        let input_data = vec![Complex32::new(0.0, 0.0); total_samples];
        let output_data = vec![Complex32::new(0.0, 0.0); total_samples];

        let cube = RadarCube {
            rn: engine_param.rn,
            tn: engine_param.tn,
            sn: engine_param.sn,
            cn: engine_param.cn,
            mat: std::ptr::null_mut(),
        };
        let point_clouds = RadarPointClouds::with_max_len(engine_param.mp);
        let cluster_result = ClusterResult::empty();
        let mut tracking_buf = vec![TrackingDescription::default(); MAX_TRACKED_OBJECTS];
        let tracking_result = TrackingResult {
            len: 0,
            max_len: MAX_TRACKED_OBJECTS as i32,
            td: tracking_buf.as_mut_ptr(),
        };

        let logger = LogManager::new();
        logger.record(&format!(
            "radar pipeline started: rx={} tx={} chirps={} samples={} ({} complex samples per frame, {} byte scratch)",
            params.num_rx,
            params.num_tx,
            params.num_chirps,
            params.adc_samples,
            total_samples,
            session.scratch_len()
        ));

        Ok(Self {
            preprocessor: Preprocessor::new(&params),
            pacer: RateLimiter::new(target_fps),
            params,
            session,
            input_data,
            output_data,
            cube,
            point_clouds,
            cluster_result,
            tracking_result,
            _tracking_buf: tracking_buf,
            stats: FrameStats::new(),
            frame_id: 0,
            logger,
        })
    }

    /// Identifier the next successful frame will carry.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn expected_frame_bytes(&self) -> usize {
        self.params.frame_byte_len()
    }

    pub fn stats(&self) -> FrameStatsSnapshot {
        self.stats.snapshot()
    }

    /// Runs one frame through the full path: pacing, size validation,
    /// preprocessing, the three engine stages, in-place write-back of the
    /// transformed samples, and the result snapshot.
    ///
    /// A `FrameSizeMismatch` or `EngineRuntime` error rejects this frame
    /// only; the pipeline stays ready for the next one. A failed record
    /// build is logged and the frame is emitted with `record: None`.
    pub fn process_frame(&mut self, frame: &mut [u8]) -> RadarResult<ProcessedFrame> {
        self.pacer.pace();
        let started = Instant::now();

        let expected = self.params.frame_byte_len();
        if frame.len() != expected {
            return Err(RadarError::FrameSizeMismatch {
                expected,
                actual: frame.len(),
            });
        }

        decode_samples(frame, &mut self.input_data);
        self.preprocessor
            .process(&self.input_data, &mut self.output_data)?;

        // The engine reads the cube straight out of the output staging
        // buffer; no copy.
        self.cube.mat = self.output_data.as_mut_ptr();

        self.session
            .detect(&mut self.cube, &mut self.point_clouds)?;
        self.logger.record_frame(&format!(
            "frame {}: radarDetection found {} points",
            self.frame_id, self.point_clouds.len
        ));

        self.session
            .cluster(&mut self.point_clouds, &mut self.cluster_result)?;
        self.logger.record_frame(&format!(
            "frame {}: radarClustering found {} clusters",
            self.frame_id, self.cluster_result.n
        ));

        self.session
            .track(&mut self.cluster_result, &mut self.tracking_result)?;
        self.logger.record_frame(&format!(
            "frame {}: radarTracking holds {} objects",
            self.frame_id, self.tracking_result.len
        ));

        // The frame is transformed in place: the emitted bytes carry the
        // DC-removed, channel-major samples.
        encode_samples(&self.output_data, frame);

        let record = match RadarFrameRecord::from_engine_results(
            self.frame_id,
            &self.point_clouds,
            &self.cluster_result,
            &self.tracking_result,
        ) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(
                    "failed to build result record for frame {}: {}",
                    self.frame_id, err
                );
                None
            }
        };

        let elapsed = started.elapsed();
        self.stats.record_frame(elapsed);
        let frame_id = self.frame_id;
        self.frame_id += 1;

        Ok(ProcessedFrame {
            frame_id,
            record,
            elapsed,
        })
    }

    /// Logs the cumulative statistics and tears the pipeline down. The
    /// engine handle is destroyed before its scratch memory is freed.
    pub fn stop(self) {
        self.stats.log_summary();
    }
}

fn decode_samples(bytes: &[u8], samples: &mut [Complex32]) {
    for (sample, chunk) in samples.iter_mut().zip(bytes.chunks_exact(8)) {
        let re = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let im = f32::from_ne_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
        *sample = Complex32::new(re, im);
    }
}

fn encode_samples(samples: &[Complex32], bytes: &mut [u8]) {
    for (sample, chunk) in samples.iter().zip(bytes.chunks_exact_mut(8)) {
        chunk[0..4].copy_from_slice(&sample.re.to_ne_bytes());
        chunk[4..8].copy_from_slice(&sample.im.to_ne_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RadarConfig, RadarParameters};
    use crate::engine::abi::RadarParam;
    use crate::engine::binding::EngineHandle;
    use crate::engine::session::ScratchBuffer;
    use crate::engine::synthetic::SyntheticEngine;
    use crate::prelude::EngineStage;

    fn test_params() -> RadarParameters {
        let mut config = RadarConfig::default();
        config.basic.num_rx = 2;
        config.basic.num_tx = 1;
        config.basic.num_chirps = 4;
        config.basic.adc_samples = 8;
        config.clustering.max_points = 16;
        RadarParameters::from_config(&config).unwrap()
    }

    fn test_frame(params: &RadarParameters) -> Vec<u8> {
        // Chirp-major frame with a deliberate DC bias so the preprocessor
        // visibly rewrites the payload.
        let mut samples = Vec::with_capacity(params.frame_sample_count());
        for i in 0..params.frame_sample_count() {
            samples.push(Complex32::new(
                0.5 + (i as f32 * 0.7).sin(),
                0.5 + (i as f32 * 0.3).cos(),
            ));
        }
        let mut bytes = vec![0u8; params.frame_byte_len()];
        encode_samples(&samples, &mut bytes);
        bytes
    }

    fn start_pipeline(params: &RadarParameters) -> RadarPipeline {
        RadarPipeline::start(params.clone(), Box::new(SyntheticEngine::default()), 0.0).unwrap()
    }

    #[test]
    fn processes_frames_and_increments_ids() {
        let params = test_params();
        let mut pipeline = start_pipeline(&params);
        for expected_id in 0..3 {
            let mut frame = test_frame(&params);
            let processed = pipeline.process_frame(&mut frame).unwrap();
            assert_eq!(processed.frame_id, expected_id);
            let record = processed.record.expect("record should be built");
            assert_eq!(record.frame_id, expected_id);
            assert!(record.point_count() > 0);
        }
        assert_eq!(pipeline.stats().frames_processed, 3);
        pipeline.stop();
    }

    #[test]
    fn transforms_the_frame_in_place() {
        let params = test_params();
        let mut pipeline = start_pipeline(&params);
        let mut frame = test_frame(&params);
        let original = frame.clone();
        pipeline.process_frame(&mut frame).unwrap();
        assert_ne!(frame, original);

        // Emitted samples are DC-removed: every output window sums to ~0.
        let mut samples = vec![Complex32::new(0.0, 0.0); params.frame_sample_count()];
        decode_samples(&frame, &mut samples);
        for window in samples.chunks_exact(params.adc_samples as usize) {
            let mean = window.iter().sum::<Complex32>() / window.len() as f32;
            assert!(mean.re.abs() < 1e-4);
            assert!(mean.im.abs() < 1e-4);
        }
    }

    #[test]
    fn wrong_sized_frame_is_rejected_without_counting() {
        let params = test_params();
        let mut pipeline = start_pipeline(&params);
        let mut frame = vec![0u8; params.frame_byte_len() - 1];
        let err = pipeline.process_frame(&mut frame).unwrap_err();
        match err {
            RadarError::FrameSizeMismatch { expected, actual } => {
                assert_eq!(expected, params.frame_byte_len());
                assert_eq!(actual, params.frame_byte_len() - 1);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(pipeline.stats().frames_processed, 0);
        assert_eq!(pipeline.frame_id(), 0);

        // The pipeline stays usable for the next, correctly sized frame.
        let mut frame = test_frame(&params);
        pipeline.process_frame(&mut frame).unwrap();
        assert_eq!(pipeline.stats().frames_processed, 1);
    }

    #[test]
    fn default_geometry_rejects_off_by_one_frame() {
        // rx=4, tx=2, chirps=64, samples=256 -> 8 * 64 * 256 * 8 bytes.
        let params = RadarParameters::from_config(&RadarConfig::default()).unwrap();
        let mut pipeline = start_pipeline(&params);
        assert_eq!(pipeline.expected_frame_bytes(), 1_048_576);
        let mut frame = vec![0u8; 1_048_575];
        let err = pipeline.process_frame(&mut frame).unwrap_err();
        assert!(matches!(err, RadarError::FrameSizeMismatch { .. }));
        assert_eq!(pipeline.stats().frames_processed, 0);
    }

    /// Delegates to the synthetic engine but fails one scripted detect call.
    struct FlakyEngine {
        inner: SyntheticEngine,
        fail_on_call: u64,
        calls: u64,
    }

    impl RadarEngine for FlakyEngine {
        fn query_mem_size(&self, param: &RadarParam) -> RadarResult<usize> {
            self.inner.query_mem_size(param)
        }

        fn init_handle(
            &mut self,
            param: &RadarParam,
            scratch: &mut ScratchBuffer,
        ) -> RadarResult<EngineHandle> {
            self.inner.init_handle(param, scratch)
        }

        fn detect(
            &mut self,
            handle: &EngineHandle,
            cube: &mut RadarCube,
            points: &mut RadarPointClouds,
        ) -> RadarResult<()> {
            self.calls += 1;
            if self.calls == self.fail_on_call {
                return Err(RadarError::EngineRuntime {
                    stage: EngineStage::Detection,
                    status: 7,
                });
            }
            self.inner.detect(handle, cube, points)
        }

        fn cluster(
            &mut self,
            handle: &EngineHandle,
            points: &mut RadarPointClouds,
            clusters: &mut ClusterResult,
        ) -> RadarResult<()> {
            self.inner.cluster(handle, points, clusters)
        }

        fn track(
            &mut self,
            handle: &EngineHandle,
            clusters: &mut ClusterResult,
            tracks: &mut TrackingResult,
        ) -> RadarResult<()> {
            self.inner.track(handle, clusters, tracks)
        }

        fn destroy_handle(&mut self, handle: &EngineHandle) -> RadarResult<()> {
            self.inner.destroy_handle(handle)
        }
    }

    #[test]
    fn detect_failure_skips_only_that_frame() {
        let params = test_params();
        let engine = FlakyEngine {
            inner: SyntheticEngine::default(),
            fail_on_call: 3,
            calls: 0,
        };
        let mut pipeline = RadarPipeline::start(params.clone(), Box::new(engine), 0.0).unwrap();

        let mut records = Vec::new();
        let mut failures = 0;
        for _ in 0..5 {
            let mut frame = test_frame(&params);
            match pipeline.process_frame(&mut frame) {
                Ok(processed) => records.push(processed.frame_id),
                Err(err) => {
                    assert!(matches!(err, RadarError::EngineRuntime { .. }));
                    failures += 1;
                }
            }
        }

        assert_eq!(failures, 1);
        assert_eq!(records, vec![0, 1, 2, 3]);
        assert_eq!(pipeline.stats().frames_processed, 4);
        pipeline.stop();
    }
}
