use stopwatch_core::{Lap, LapLedger, TimerCore};

/// Which actions the control bar currently offers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Affordances {
    pub running: bool,
    pub lap: bool,
    pub reset: bool,
    pub clear_laps: bool,
    pub export: bool,
}

impl Affordances {
    pub fn start_stop_label(&self) -> &'static str {
        if self.running { "Stop" } else { "Start" }
    }
}

/// Timer plus its laps. Reset clears both in one step.
#[derive(Clone, Debug, Default)]
pub struct StopwatchState {
    pub timer: TimerCore,
    pub laps: LapLedger,
}

impl StopwatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.timer.elapsed_ms(now_ms)
    }

    pub fn start(&mut self, now_ms: u64) -> bool {
        self.timer.start(now_ms)
    }

    pub fn stop(&mut self, now_ms: u64) -> bool {
        self.timer.stop(now_ms)
    }

    /// Silently ignored unless running.
    pub fn record_lap(&mut self, now_ms: u64) -> Option<Lap> {
        if !self.is_running() {
            return None;
        }
        let total = self.timer.elapsed_ms(now_ms);
        Some(self.laps.record(total))
    }

    pub fn clear_laps(&mut self) {
        self.laps.clear();
    }

    pub fn reset(&mut self) {
        self.timer.reset();
        self.laps.clear();
    }

    pub fn affordances(&self, now_ms: u64) -> Affordances {
        let running = self.is_running();
        let has_laps = !self.laps.is_empty();
        Affordances {
            running,
            lap: running,
            reset: !running && (self.elapsed_ms(now_ms) > 0 || has_laps),
            clear_laps: has_laps,
            export: has_laps,
        }
    }
}
