//! CSV output for scan results.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "ID Number,Score,Final Marks";

/// One graded student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub id: String,
    pub score: u8,
    pub final_marks: u8,
}

impl StudentRecord {
    pub fn new(id: &str, score: u8) -> Self {
        Self {
            id: id.to_string(),
            score,
            final_marks: score,
        }
    }
}

/// Builds a timestamped results path under the given directory.
pub fn results_file_path(results_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    results_dir.join(format!("scan_results_{}.csv", timestamp))
}

/// Appends one record, creating the file with its header on first use.
/// Records are written as they are produced, so an aborted batch keeps
/// everything scanned so far.
pub fn append_record(path: &Path, record: &StudentRecord) -> Result<()> {
    let new_file = !path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open {}", path.display()))?;
    if new_file {
        writeln!(file, "{}", CSV_HEADER)?;
    }
    writeln!(file, "{},{},{}", record.id, record.score, record.final_marks)?;
    Ok(())
}
