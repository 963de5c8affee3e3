/// Engine call stage, used to attribute per-frame failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStage {
    Detection,
    Clustering,
    Tracking,
}

impl std::fmt::Display for EngineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineStage::Detection => "radarDetection",
            EngineStage::Clustering => "radarClustering",
            EngineStage::Tracking => "radarTracking",
        };
        f.write_str(name)
    }
}

/// Common error type for the radar processing core.
///
/// `Config`, `EngineBind`, `Allocation`, and `EngineInit` are fatal to
/// pipeline start. `FrameSizeMismatch` and `EngineRuntime` reject one frame
/// and leave the pipeline ready for the next. `RecordAttach` is logged and
/// the frame is emitted without a record. `Teardown` is only ever logged.
#[derive(thiserror::Error, Debug)]
pub enum RadarError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("engine bind failure: {0}")]
    EngineBind(String),
    #[error("scratch allocation failure: {0}")]
    Allocation(String),
    #[error("engine rejected parameters during handle init, status {0}")]
    EngineInit(i32),
    #[error("frame size mismatch: got {actual} bytes, expected {expected} bytes")]
    FrameSizeMismatch { expected: usize, actual: usize },
    #[error("{stage} failed with status {status}")]
    EngineRuntime { stage: EngineStage, status: i32 },
    #[error("record build failure: {0}")]
    RecordAttach(String),
    #[error("engine handle teardown returned status {0}")]
    Teardown(i32),
}

pub type RadarResult<T> = Result<T, RadarError>;
