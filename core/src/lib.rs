//! Core processing for the millimeter-wave radar pipeline.
//!
//! Turns raw chirp-major ADC sample frames into structured detections by
//! way of DC removal, channel-major reordering, and a three-stage call
//! sequence (detect, cluster, track) into the dynamically bound `libradar`
//! compute engine.

pub mod config;
pub mod engine;
pub mod prelude;
pub mod processing;
pub mod record;
pub mod telemetry;

pub use prelude::{EngineStage, RadarError, RadarResult};
pub use processing::{ProcessedFrame, RadarPipeline};
pub use record::RadarFrameRecord;
