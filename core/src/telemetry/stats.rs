use log::info;
use serde::Serialize;
use std::time::Duration;

/// Cumulative frame statistics, scoped to one pipeline instance.
pub struct FrameStats {
    frames_processed: u64,
    total_processing_time: Duration,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FrameStatsSnapshot {
    pub frames_processed: u64,
    pub total_processing_time: Duration,
    pub average_frame_time: Option<Duration>,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            frames_processed: 0,
            total_processing_time: Duration::ZERO,
        }
    }

    /// Counts one frame that completed every engine stage.
    pub fn record_frame(&mut self, elapsed: Duration) {
        self.frames_processed += 1;
        self.total_processing_time += elapsed;
    }

    pub fn snapshot(&self) -> FrameStatsSnapshot {
        let average_frame_time = if self.frames_processed > 0 {
            Some(Duration::from_secs_f64(
                self.total_processing_time.as_secs_f64() / self.frames_processed as f64,
            ))
        } else {
            None
        };
        FrameStatsSnapshot {
            frames_processed: self.frames_processed,
            total_processing_time: self.total_processing_time,
            average_frame_time,
        }
    }

    /// Logs the end-of-run summary; silent when no frame ever completed.
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        if snapshot.frames_processed == 0 {
            return;
        }
        let average_ms = snapshot
            .average_frame_time
            .map(|avg| avg.as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        info!("=== Radar Process Statistics ===");
        info!("Total frames processed: {}", snapshot.frames_processed);
        info!(
            "Total processing time: {:.3} seconds",
            snapshot.total_processing_time.as_secs_f64()
        );
        info!("Average time per frame: {:.3} ms", average_ms);
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}
