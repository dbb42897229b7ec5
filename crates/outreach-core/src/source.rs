use crate::error::{OutreachError, Result};
use crate::record::{preprocess, RawRecord, Record};
use serde_json::Value;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Raw row loading
// ---------------------------------------------------------------------------

/// Load raw rows from a tabular file. CSV headers become the field keys;
/// JSON input must be an array of flat objects. Anything else is rejected.
pub fn load_raw(path: &Path) -> Result<Vec<RawRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => {
            let data = std::fs::read_to_string(path)?;
            let rows: Vec<RawRecord> = serde_json::from_str(&data)?;
            Ok(rows)
        }
        _ => Err(OutreachError::UnsupportedFormat(
            path.display().to_string(),
        )),
    }
}

fn load_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result?;
        let mut map = RawRecord::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            map.insert(header.to_string(), Value::String(cell.to_string()));
        }
        rows.push(map);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// An imported batch: the preserved raw rows plus their preprocessed form.
/// Keeping the raw rows allows classification to be re-run in place.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub path: PathBuf,
    pub raw: Vec<RawRecord>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = load_raw(path)?;
        let records = preprocess(&raw);
        Ok(Self {
            path: path.to_path_buf(),
            raw,
            records,
        })
    }

    /// Re-run preprocessing over the preserved raw rows.
    pub fn reprocess(&mut self) {
        self.records = preprocess(&self.raw);
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn preview(&self, max_rows: usize) -> &[Record] {
        &self.records[..max_rows.min(self.records.len())]
    }

    pub fn file_info(&self) -> String {
        let filename = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        format!("File: {} ({} records)", filename, self.record_count())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
