use std::time::{Duration, Instant};

/// Longest gap a single tick may report. Stalls past this (debugger,
/// minimised window) count as one slow frame instead of a burst.
const MAX_TICK: Duration = Duration::from_millis(250);

/// Decides how many logic updates each host tick should run.
///
/// The measured delta is expressed as a rate of the desired frame period,
/// smoothed exponentially (factor 0.8, input clamped at 2x). A smoothed
/// rate of 0.9 or more runs `round(rate)` updates; a faster host
/// accumulates partial frames and runs one update per whole frame.
#[derive(Debug, Clone)]
pub struct FramePacer {
    frame_rate: u32,
    smooth_rate: f64,
    elapsed: f64,
    last: Instant,
}

impl FramePacer {
    pub fn new(frame_rate: u32) -> Self {
        Self {
            frame_rate: frame_rate.max(1),
            smooth_rate: 1.0,
            elapsed: 0.0,
            last: Instant::now(),
        }
    }

    #[inline]
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn set_frame_rate(&mut self, frame_rate: u32) {
        self.frame_rate = frame_rate.max(1);
    }

    /// Desired period of one frame.
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate as f64)
    }

    /// Forgets accumulated timing. Call after long pauses or loads.
    pub fn reset(&mut self) {
        self.smooth_rate = 1.0;
        self.elapsed = 0.0;
        self.last = Instant::now();
    }

    /// Measures the time since the previous tick and paces it.
    pub fn tick(&mut self) -> u32 {
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last).min(MAX_TICK);
        self.last = now;
        self.pace(delta)
    }

    /// Number of logic updates to run for a tick that took `delta`.
    pub fn pace(&mut self, delta: Duration) -> u32 {
        let rate = delta.as_secs_f64() * self.frame_rate as f64;

        self.smooth_rate = self.smooth_rate * 0.8 + rate.min(2.0) * 0.2;

        if self.smooth_rate >= 0.9 {
            self.elapsed = 0.0;
            return self.smooth_rate.round() as u32;
        }

        self.elapsed += rate;
        if self.elapsed >= 1.0 {
            self.elapsed -= 1.0;
            return 1;
        }
        0
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new(60)
    }
}
