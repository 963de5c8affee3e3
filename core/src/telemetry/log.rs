use log::{debug, info};

/// Thin logging facade used by pipeline components.
pub struct LogManager;

impl LogManager {
    pub fn new() -> Self {
        Self
    }

    /// Lifecycle events worth seeing in a normal run.
    pub fn record(&self, message: &str) {
        info!("{}", message);
    }

    /// Per-frame chatter; kept off the info level so steady-state runs
    /// stay quiet.
    pub fn record_frame(&self, message: &str) {
        debug!("{}", message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
