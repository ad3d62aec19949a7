use std::time::{Duration, Instant};

pub const TIMER_PERIOD: Duration = Duration::from_secs(1);

/// Host-side clock that turns wall time into whole countdown ticks.
///
/// The engine only knows how to decrement; this decides how many decrements
/// are due. Time spent while not running (paused, inactive, popup showing)
/// never produces ticks, and any partial period is dropped on stop.
#[derive(Debug, Clone)]
pub struct TimerDriver {
    period: Duration,
    anchor: Option<Instant>,
}

impl TimerDriver {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            anchor: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    /// Number of whole periods elapsed since the last due tick.
    pub fn poll(&mut self, running: bool, now: Instant) -> u32 {
        if !running {
            self.anchor = None;
            return 0;
        }

        let Some(anchor) = self.anchor else {
            self.anchor = Some(now);
            return 0;
        };

        let period_ms = self.period.as_millis().max(1);
        let due = (now.saturating_duration_since(anchor).as_millis() / period_ms) as u32;
        if due > 0 {
            self.anchor = Some(anchor + self.period * due);
        }
        due
    }
}

impl Default for TimerDriver {
    fn default() -> Self {
        Self::new(TIMER_PERIOD)
    }
}
