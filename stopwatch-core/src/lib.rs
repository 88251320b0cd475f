//! Pure timing logic library with no platform dependencies.
//! Time is always passed in as a millisecond reading of some [`Clock`],
//! so everything here is testable on host without real timers.

mod clock;
mod laps;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use laps::{laps_to_csv, Lap, LapLedger, CSV_HEADER, CSV_MIME_TYPE};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimerState {
    Stopped,
    Running,
    Paused,
}

/// Elapsed-time accounting under a pause/resume model.
///
/// While running, elapsed time is `accumulated + (now - segment_start)`.
/// While stopped or paused only `accumulated` counts.
#[derive(Clone, Debug)]
pub struct TimerCore {
    state: TimerState,
    accumulated_ms: u64,
    segment_start_ms: u64,
}

impl Default for TimerCore {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerCore {
    pub fn new() -> Self {
        Self {
            state: TimerState::Stopped,
            accumulated_ms: 0,
            segment_start_ms: 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Starts or resumes. Returns `false` if the timer was already running.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.state == TimerState::Running {
            return false;
        }
        // Accumulated time is kept; only the open segment restarts.
        self.segment_start_ms = now_ms;
        self.state = TimerState::Running;
        true
    }

    /// Freezes elapsed time. Returns `false` if the timer was not running.
    pub fn stop(&mut self, now_ms: u64) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.accumulated_ms = self.elapsed_ms(now_ms);
        self.segment_start_ms = 0;
        self.state = TimerState::Paused;
        true
    }

    pub fn reset(&mut self) {
        self.accumulated_ms = 0;
        self.segment_start_ms = 0;
        self.state = TimerState::Stopped;
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.state {
            TimerState::Running => self
                .accumulated_ms
                .saturating_add(now_ms.saturating_sub(self.segment_start_ms)),
            TimerState::Stopped | TimerState::Paused => self.accumulated_ms,
        }
    }
}

/// Format milliseconds as "HH:MM:SS.CC" (centiseconds).
///
/// Negative input clamps to zero. Every field is floored, never rounded.
/// Two digits is a minimum width: hours keep growing past 99.
pub fn format_hms_cs(ms: i64) -> String {
    let ms = ms.max(0);
    let h = ms / 3_600_000;
    let m = (ms % 3_600_000) / 60_000;
    let s = (ms % 60_000) / 1000;
    let cs = (ms % 1000) / 10;
    format!("{:02}:{:02}:{:02}.{:02}", h, m, s, cs)
}

/// [`format_hms_cs`] for the unsigned readings the timer produces.
pub fn format_elapsed(ms: u64) -> String {
    format_hms_cs(i64::try_from(ms).unwrap_or(i64::MAX))
}
