use tracing::warn;

use crate::common::Entry;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Output formats for the `export` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("Unknown export format: {other}")),
        }
    }
}

/// One row per entry. The columns follow the kind of the first entry; entries of the
/// other kind are skipped.
pub fn to_csv(entries: &[Entry]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let reports = entries.first().is_some_and(Entry::is_report);

    let mut skipped = 0;
    for entry in entries {
        match entry {
            Entry::News(item) if !reports => writer.serialize(item)?,
            Entry::Report(report) if reports => writer.serialize(report)?,
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("Skipped {skipped} entries of a different kind in the CSV export");
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Pretty JSON array of the flat records, `type` included
pub fn to_json(entries: &[Entry]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(entries)?)
}

pub fn export(entries: &[Entry], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(entries),
        ExportFormat::Json => to_json(entries),
    }
}
