//! CSV export of selected trains.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Local;
use csv::{QuoteStyle, WriterBuilder};
use tracing::info;

use crate::models::Train;

/// Header row of every export.
pub const HEADERS: [&str; 8] = [
    "ID",
    "Operator",
    "From",
    "To",
    "Arrival Time",
    "Track",
    "Status",
    "Notes",
];

/// Write `trains` as CSV with every field quoted.
pub fn write_csv<W: Write>(writer: W, trains: &[Train]) -> Result<()> {
    let mut csv = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);
    csv.write_record(HEADERS).context("failed to write CSV header")?;
    for train in trains {
        csv.write_record([
            train.id.as_str(),
            train.operator.as_str(),
            train.from.as_deref().unwrap_or_default(),
            train.to.as_deref().unwrap_or_default(),
            train.arrival_time.as_deref().unwrap_or_default(),
            train.track.as_deref().unwrap_or_default(),
            train.status_label(),
            train.notes.as_deref().unwrap_or_default(),
        ])
        .with_context(|| format!("failed to write CSV row for train {}", train.id))?;
    }
    csv.flush().context("failed to flush CSV output")?;
    Ok(())
}

/// Render `trains` to an in-memory CSV string.
pub fn to_csv_string(trains: &[Train]) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, trains)?;
    String::from_utf8(buffer).context("CSV output was not UTF-8")
}

/// Write a timestamped export file into `dir` and return its path.
pub fn export_to_dir(dir: impl AsRef<Path>, trains: &[Train]) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;
    let path = dir.join(format!(
        "trains_export_{}.csv",
        Local::now().format("%Y%m%d%H%M%S")
    ));
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(file, trains)?;
    info!(path = %path.display(), rows = trains.len(), "Exported trains");
    Ok(path)
}
