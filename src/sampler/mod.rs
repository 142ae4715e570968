//! File Sampler
//!
//! Turns an uploaded file into a short, human-readable preview that can be
//! placed in a chat message. Format is chosen from the filename extension:
//!
//! - `.csv`, `.xlsx`, `.xls` → first rows rendered as a fixed-width table
//! - `.json` → pretty-printed, top-level lists cut to the first elements
//! - anything else → first lines of UTF-8 text
//!
//! Failures never escape: they come back as a [`FilePreview::Failed`] whose
//! text reads `Error parsing file: ...`, so the message can still be shown
//! and sent to the model.

pub mod data_url;
pub mod table;

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::Timelike;
use tracing::{debug, warn};

use crate::config::{UploadConfig, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_SAMPLE_ROWS};
use table::{Table, MISSING};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Excel,
    Json,
    Text,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            FileKind::Csv
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            FileKind::Excel
        } else if lower.ends_with(".json") {
            FileKind::Json
        } else {
            FileKind::Text
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("invalid UTF-8 text: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Excel(#[from] calamine::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Encoding(String),

    #[error("{0}")]
    Malformed(String),

    #[error("file is {size} bytes, larger than the {max} byte upload limit")]
    TooLarge { size: usize, max: usize },
}

/// Outcome of sampling a file; both variants carry displayable text.
#[derive(Debug, Clone, PartialEq)]
pub enum FilePreview {
    Sample { kind: FileKind, text: String },
    Failed { reason: String },
}

impl FilePreview {
    pub fn is_failed(&self) -> bool {
        matches!(self, FilePreview::Failed { .. })
    }

    /// The preview as it is placed into the conversation.
    pub fn text(&self) -> String {
        match self {
            FilePreview::Sample { text, .. } => text.clone(),
            FilePreview::Failed { reason } => format!("Error parsing file: {}", reason),
        }
    }
}

impl std::fmt::Display for FilePreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}

#[derive(Debug, Clone)]
pub struct FileSampler {
    rows: usize,
    max_bytes: usize,
}

impl Default for FileSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_ROWS, DEFAULT_MAX_UPLOAD_BYTES)
    }
}

impl FileSampler {
    pub fn new(rows: usize, max_bytes: usize) -> Self {
        Self {
            rows: rows.max(1),
            max_bytes,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.sample_rows, config.max_bytes)
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn preview(&self, filename: &str, bytes: &[u8]) -> FilePreview {
        let kind = FileKind::from_filename(filename);
        debug!(filename, bytes = bytes.len(), kind = ?kind, "Sampling uploaded file");

        match self.sample(kind, filename, bytes) {
            Ok(text) => FilePreview::Sample { kind, text },
            Err(e) => {
                warn!(filename, error = %e, "Failed to sample file");
                FilePreview::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Sample a browser data URL (`data:<mime>;base64,<payload>`).
    pub fn preview_data_url(&self, filename: &str, contents: &str) -> FilePreview {
        match data_url::decode(contents) {
            Ok((_, bytes)) => self.preview(filename, &bytes),
            Err(e) => {
                warn!(filename, error = %e, "Failed to decode upload");
                FilePreview::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn sample(&self, kind: FileKind, filename: &str, bytes: &[u8]) -> Result<String, SampleError> {
        if bytes.len() > self.max_bytes {
            return Err(SampleError::TooLarge {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }

        match kind {
            FileKind::Csv => {
                let table = self.read_csv(std::str::from_utf8(bytes)?)?;
                Ok(self.tabular_preview(filename, &table))
            }
            FileKind::Excel => {
                let table = self.read_excel(bytes)?;
                Ok(self.tabular_preview(filename, &table))
            }
            FileKind::Json => {
                let sample = self.json_sample(std::str::from_utf8(bytes)?)?;
                Ok(format!("File: {}\nSample data:\n\n{}", filename, sample))
            }
            FileKind::Text => {
                let text = std::str::from_utf8(bytes)?;
                let lines: Vec<&str> = text.split('\n').take(self.rows).collect();
                Ok(format!(
                    "File: {}\nSample data (first {} lines):\n\n{}",
                    filename,
                    self.rows,
                    lines.join("\n")
                ))
            }
        }
    }

    fn tabular_preview(&self, filename: &str, table: &Table) -> String {
        format!(
            "File: {}\nSample data (first {} rows):\n\n{}",
            filename,
            self.rows,
            table.render()
        )
    }

    /// Read the header and the first rows. Every record is still parsed so
    /// that a malformed line anywhere in the file is reported.
    fn read_csv(&self, text: &str) -> Result<Table, SampleError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
            return Err(SampleError::Malformed(
                "No columns to parse from file".to_string(),
            ));
        }

        let mut table = Table::new(headers);
        for record in rdr.records() {
            let record = record?;
            if record.len() > table.headers.len() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(SampleError::Malformed(format!(
                    "Error tokenizing data. Expected {} fields in line {}, saw {}",
                    table.headers.len(),
                    line,
                    record.len()
                )));
            }
            if table.row_count() < self.rows {
                table.push_row(record.iter().map(cell_or_missing).collect());
            }
        }

        Ok(table)
    }

    /// First worksheet, first row as header.
    fn read_excel(&self, bytes: &[u8]) -> Result<Table, SampleError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SampleError::Malformed("Workbook contains no worksheets".to_string()))??;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row
                .iter()
                .enumerate()
                .map(|(idx, cell)| match cell {
                    Data::Empty => format!("Unnamed: {}", idx),
                    other => excel_cell(other),
                })
                .collect(),
            None => {
                return Err(SampleError::Malformed(
                    "No columns to parse from file".to_string(),
                ))
            }
        };

        let mut table = Table::new(headers);
        for row in rows.take(self.rows) {
            table.push_row(
                row.iter()
                    .map(|cell| match cell {
                        Data::Empty => MISSING.to_string(),
                        other => excel_cell(other),
                    })
                    .collect(),
            );
        }

        Ok(table)
    }

    fn json_sample(&self, text: &str) -> Result<String, SampleError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let sample = match value {
            serde_json::Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().take(self.rows).collect())
            }
            other => other,
        };
        Ok(serde_json::to_string_pretty(&sample)?)
    }
}

/// Date cells are stored as day serials; show them as calendar dates, with
/// the time only when it is not midnight.
fn excel_cell(cell: &Data) -> String {
    match cell {
        Data::DateTime(value) if !value.is_duration() => match cell.as_datetime() {
            Some(dt) if dt.time().num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 => {
                dt.format("%Y-%m-%d").to_string()
            }
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

fn cell_or_missing(cell: &str) -> String {
    if cell.is_empty() {
        MISSING.to_string()
    } else {
        cell.to_string()
    }
}
