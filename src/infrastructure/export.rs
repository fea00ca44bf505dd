//! Record and ranking export
//!
//! Records go to a UTF-8 CSV file, one row per record, columns in
//! `RECORD_COLUMNS` order. The ranking report is plain text with one line per
//! requested category:
//!
//! ```text
//! 喜剧 | 美国,英国,法国 | 50.00,30.00,20.00
//! 动作 | insufficient data: 2 distinct locations, 3 required
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{format_percentage, AggregationError, Rankings, Record, RECORD_COLUMNS};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl ExportError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<(), ExportError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Write `records` to any writer as CSV
pub fn write_records_to<W: Write>(writer: W, records: &[Record], include_headers: bool) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    if include_headers {
        wtr.write_record(RECORD_COLUMNS)?;
    }
    for record in records {
        wtr.write_record(record.to_row())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `records` to `path`, replacing any existing file
pub fn export_records(path: &Path, records: &[Record], include_headers: bool) -> Result<(), ExportError> {
    debug!("Exporting {} records to CSV: {:?}", records.len(), path);
    ensure_parent(path)?;

    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    write_records_to(file, records, include_headers).map_err(|e| ExportError::csv(path, e))?;

    info!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}

/// One report line per category, in request order
pub fn render_report(rankings: &Rankings) -> String {
    let mut out = String::new();
    for (category, outcome) in rankings.iter() {
        let line = match outcome {
            Ok(stats) => {
                let ranking = stats.ranking();
                let locations: Vec<&str> = ranking.iter().map(|entry| entry.location.as_str()).collect();
                let percentages: Vec<String> = ranking.iter().map(|entry| format_percentage(entry.percentage)).collect();
                format!("{} | {} | {}", category, locations.join(","), percentages.join(","))
            }
            Err(AggregationError::InsufficientData {
                required, available, ..
            }) => format!(
                "{category} | insufficient data: {available} distinct locations, {required} required"
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Write the ranking report to `path`
pub fn export_report(path: &Path, rankings: &Rankings) -> Result<(), ExportError> {
    ensure_parent(path)?;

    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(render_report(rankings).as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|e| ExportError::io(path, e))?;

    info!("Wrote ranking report for {} categories to {:?}", rankings.len(), path);
    Ok(())
}
