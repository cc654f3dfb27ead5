//! Flat-file shape inference.
//!
//! CSV and Excel files carry no schema, so the scanner reads a bounded
//! prefix (at most [`FILE_ROW_CAP`] data rows, never the whole file) and
//! infers per-column shape from it: a column is nullable when any sampled
//! value was missing, and its type is the most frequent runtime type among
//! the non-missing sampled values. The first row is always the header.
//!
//! One container object represents the file; flat files carry no key
//! metadata, so every field reports `primary_key: false`.

use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Reader};
use std::fs::File;
use std::path::Path;

use crate::error::{IntrospectResult, ScanError};
use crate::metadata::{assemble, MetadataObject, ObjectType, ScanResult};
use crate::scan::{ScanRequest, SourceScanner};
use crate::source::{SourceDescriptor, SourceFamily};

/// Upper bound on data rows read for inference.
pub const FILE_ROW_CAP: usize = 200;

/// The scanning strategy for file sources (csv and excel).
#[derive(Debug, Default)]
pub struct FileScanner;

impl FileScanner {
    /// Create the strategy.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceScanner for FileScanner {
    fn family(&self) -> SourceFamily {
        SourceFamily::File
    }

    /// File sources have no server to ping; the probe checks that the
    /// descriptor's connection string names a readable file. Any failure,
    /// the empty descriptor included, renders as a connection error.
    async fn probe(&self, source: &SourceDescriptor) -> Result<(), ScanError> {
        let path = source.connection_string.trim();
        if path.is_empty() {
            return Err(ScanError::connection("file source names no path"));
        }
        File::open(path).map_err(ScanError::connection)?;
        Ok(())
    }

    async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let path = request.file_path.as_deref().ok_or(ScanError::FileRequired)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let stats = match extension.as_str() {
            "csv" => infer_csv(path).map_err(ScanError::connection)?,
            "xlsx" | "xls" => infer_excel(path).map_err(ScanError::connection)?,
            _ => return Err(ScanError::UnsupportedFormat { extension }),
        };
        tracing::debug!(path = %path.display(), columns = stats.len(), "inferred file shape");

        let table = path.display().to_string();
        let mut objects = Vec::with_capacity(stats.len() + 1);
        objects.push(MetadataObject::container(ObjectType::Table, &table));
        objects.extend(stats_members(&table, stats));
        Ok(assemble(SourceFamily::File, objects)?)
    }
}

/// Tallies for one column across the sampled prefix.
struct ColumnStats {
    name: String,
    missing: bool,
    // type name -> occurrences, in first-observation order
    counts: Vec<(&'static str, usize)>,
}

impl ColumnStats {
    fn new(name: String) -> Self {
        Self {
            name,
            missing: false,
            counts: Vec::new(),
        }
    }

    fn observe(&mut self, type_name: Option<&'static str>) {
        match type_name {
            None => self.missing = true,
            Some(observed) => {
                match self.counts.iter_mut().find(|(t, _)| *t == observed) {
                    Some((_, n)) => *n += 1,
                    None => self.counts.push((observed, 1)),
                }
            }
        }
    }

    /// Most frequent observed type; ties go to the earliest observed, and a
    /// column with no non-missing values at all reports `unknown`.
    fn dominant(&self) -> &'static str {
        let mut best: Option<(&'static str, usize)> = None;
        for (t, n) in &self.counts {
            if best.map_or(true, |(_, best_n)| *n > best_n) {
                best = Some((t, *n));
            }
        }
        best.map_or("unknown", |(t, _)| t)
    }
}

fn stats_members(table: &str, stats: Vec<ColumnStats>) -> Vec<MetadataObject> {
    stats
        .into_iter()
        .map(|column| {
            let dominant = column.dominant().to_string();
            MetadataObject::member(
                ObjectType::Field,
                table,
                column.name,
                vec![dominant],
                Some(column.missing),
                Some(false),
            )
        })
        .collect()
}

fn infer_csv(path: &Path) -> IntrospectResult<Vec<ColumnStats>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut stats: Vec<ColumnStats> = headers
        .iter()
        .map(|h| ColumnStats::new(h.to_string()))
        .collect();
    for record in reader.records().take(FILE_ROW_CAP) {
        let record = record?;
        for (i, column) in stats.iter_mut().enumerate() {
            // A short row simply has no cell for the trailing columns.
            column.observe(record.get(i).and_then(csv_cell_type));
        }
    }
    Ok(stats)
}

fn infer_excel(path: &Path) -> IntrospectResult<Vec<ColumnStats>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Vec::new()),
    };
    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(row) => row,
        None => return Ok(Vec::new()),
    };
    let mut stats: Vec<ColumnStats> = headers
        .iter()
        .map(|cell| ColumnStats::new(cell.to_string()))
        .collect();
    for row in rows.take(FILE_ROW_CAP) {
        for (i, column) in stats.iter_mut().enumerate() {
            column.observe(row.get(i).and_then(excel_cell_type));
        }
    }
    Ok(stats)
}

/// Type a CSV cell by trial parse. The empty string is a missing value.
fn csv_cell_type(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        return None;
    }
    if value.parse::<i64>().is_ok() {
        Some("int")
    } else if value.parse::<f64>().is_ok() {
        Some("float")
    } else if value.parse::<bool>().is_ok() {
        Some("bool")
    } else {
        Some("str")
    }
}

/// Type an Excel cell from its native representation. Empty cells and
/// error cells (`#DIV/0!` and friends) both count as missing.
fn excel_cell_type(cell: &Data) -> Option<&'static str> {
    match cell {
        Data::Int(_) => Some("int"),
        Data::Float(_) => Some("float"),
        Data::String(_) => Some("str"),
        Data::Bool(_) => Some("bool"),
        Data::DateTime(_) | Data::DateTimeIso(_) => Some("datetime"),
        Data::DurationIso(_) => Some("str"),
        Data::Empty | Data::Error(_) => None,
    }
}
