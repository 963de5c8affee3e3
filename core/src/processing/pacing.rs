use log::warn;
use std::time::{Duration, Instant};

/// Wall-clock pacing toward a target frame rate.
///
/// A target of zero, a negative value, or a non-finite value disables
/// pacing entirely; every call returns immediately. The first frame is
/// never delayed.
pub struct RateLimiter {
    frame_duration: Option<Duration>,
    last_frame: Option<Instant>,
}

impl RateLimiter {
    pub fn new(target_fps: f64) -> Self {
        let frame_duration = if target_fps.is_finite() && target_fps > 0.0 {
            let duration = Duration::from_secs_f64(1.0 / target_fps);
            if duration < Duration::from_micros(100) {
                warn!(
                    "target fps {} leaves a frame duration under 100us; sleep timing may be inaccurate",
                    target_fps
                );
            }
            Some(duration)
        } else {
            None
        };
        Self {
            frame_duration,
            last_frame: None,
        }
    }

    pub fn is_limiting(&self) -> bool {
        self.frame_duration.is_some()
    }

    /// Blocks the calling thread until the next frame slot opens, then
    /// records the post-wait instant as the new reference point.
    pub fn pace(&mut self) {
        let frame_duration = match self.frame_duration {
            Some(duration) => duration,
            None => return,
        };
        if let Some(last) = self.last_frame {
            let elapsed = last.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());
    }
}
