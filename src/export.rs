use std::fs;
use std::path::Path;

use stopwatch_core::{laps_to_csv, LapLedger, CSV_MIME_TYPE};

pub const DEFAULT_EXPORT_FILE: &str = "laps.csv";

/// Writes the ledger as CSV to `path`. Returns the number of laps written,
/// or `None` without touching the file when there are no laps.
pub fn export_laps(path: &Path, ledger: &LapLedger) -> std::io::Result<Option<usize>> {
    let csv = match laps_to_csv(ledger) {
        Some(csv) => csv,
        None => return Ok(None),
    };
    fs::write(path, csv)?;
    log::info!("wrote {} laps ({}) to {}", ledger.len(), CSV_MIME_TYPE, path.display());
    Ok(Some(ledger.len()))
}
