use crate::format_elapsed;

pub const CSV_HEADER: &str = "Lap #,Lap Time,Total Time";
pub const CSV_MIME_TYPE: &str = "text/csv";

/// A checkpoint taken while running.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Lap {
    /// 1-based, chronological.
    pub index: u32,
    /// Time since the previous lap, or since start for the first one.
    pub lap_ms: u64,
    /// Total elapsed time when the lap was taken.
    pub total_ms: u64,
}

/// Laps in chronological storage, handed out most-recent-first.
#[derive(Clone, Debug, Default)]
pub struct LapLedger {
    laps: Vec<Lap>,
    last_lap_total_ms: u64,
}

impl LapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a lap ending at `total_ms`. Callers are responsible for only
    /// recording while the timer runs.
    pub fn record(&mut self, total_ms: u64) -> Lap {
        let lap = Lap {
            index: self.laps.len() as u32 + 1,
            lap_ms: total_ms.saturating_sub(self.last_lap_total_ms),
            total_ms,
        };
        self.last_lap_total_ms = total_ms;
        self.laps.push(lap);
        lap
    }

    pub fn clear(&mut self) {
        self.laps.clear();
        self.last_lap_total_ms = 0;
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    pub fn last_lap_total_ms(&self) -> u64 {
        self.last_lap_total_ms
    }

    /// Most recent lap first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Lap> + ExactSizeIterator {
        self.laps.iter().rev()
    }

    pub fn export(&self) -> Vec<Lap> {
        self.iter().copied().collect()
    }
}

/// Renders the ledger as CSV, most recent lap first. `None` when there is
/// nothing to export.
pub fn laps_to_csv(ledger: &LapLedger) -> Option<String> {
    if ledger.is_empty() {
        return None;
    }
    let mut out = String::from(CSV_HEADER);
    for lap in ledger.iter() {
        out.push('\n');
        out.push_str(&format!(
            "{},{},{}",
            lap.index,
            format_elapsed(lap.lap_ms),
            format_elapsed(lap.total_ms)
        ));
    }
    Some(out)
}
