pub mod abi;
pub mod binding;
pub mod session;
pub mod synthetic;

pub use binding::{EngineHandle, LibRadarEngine, RadarEngine};
pub use session::{EngineSession, ScratchBuffer, SCRATCH_ALIGNMENT};
pub use synthetic::SyntheticEngine;
