pub mod pacing;
pub mod pipeline;
pub mod preprocess;

pub use pacing::RateLimiter;
pub use pipeline::{ProcessedFrame, RadarPipeline, MAX_TRACKED_OBJECTS};
pub use preprocess::Preprocessor;
