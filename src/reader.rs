//! Source discovery and spreadsheet parsing.
//!
//! Every workbook sheet and every CSV file becomes one [`RawUnit`]: a
//! String-typed DataFrame keyed by whatever headers the source carried.
//! A file that fails to parse is logged and skipped as a whole.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::DataType as _;
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use polars::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::MetricsError;

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xls", "xlsx", "xlsm", "xlsb", "ods"];
const CSV_EXTENSION: &str = "csv";

/// One tabular unit from a source file, before normalization.
#[derive(Debug, Clone)]
pub struct RawUnit {
    /// Source identifier; the file stem, shared by all sheets of a workbook.
    pub source_id: String,
    pub sheet: Option<String>,
    pub frame: DataFrame,
}

impl RawUnit {
    pub fn new(source_id: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            source_id: source_id.into(),
            sheet: None,
            frame,
        }
    }
}

/// Reads every supported file directly inside `data_dir`, in file-name order.
pub fn load_directory(data_dir: &Path) -> Vec<RawUnit> {
    let mut units = Vec::new();

    for entry in WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Cannot scan {}: {err}", data_dir.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(kind) = SourceKind::from_path(path) else {
            debug!("Ignoring {}", path.display());
            continue;
        };

        match read_source(path, kind) {
            Ok(mut read) => {
                info!("Read {} unit(s) from {}", read.len(), path.display());
                units.append(&mut read);
            }
            Err(err) => warn!("Error reading {}: {err}", path.display()),
        }
    }

    units
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Workbook,
    Csv,
}

impl SourceKind {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if ext == CSV_EXTENSION {
            Some(Self::Csv)
        } else if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Workbook)
        } else {
            None
        }
    }
}

fn read_source(path: &Path, kind: SourceKind) -> Result<Vec<RawUnit>, MetricsError> {
    let source_id = source_id(path);
    match kind {
        SourceKind::Workbook => read_workbook(path, &source_id),
        SourceKind::Csv => Ok(vec![RawUnit::new(source_id, read_csv_as_strings(path)?)]),
    }
}

fn source_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read a CSV file with all columns as String dtype. Headers are kept verbatim.
pub fn read_csv_as_strings(path: &Path) -> Result<DataFrame, MetricsError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()?;
    Ok(df)
}

/// Read every sheet of a workbook. One bad sheet fails the whole file.
pub fn read_workbook(path: &Path, source_id: &str) -> Result<Vec<RawUnit>, MetricsError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names().to_vec();

    let mut ranges = Vec::with_capacity(sheet_names.len());
    for sheet in sheet_names {
        let range = workbook.worksheet_range(&sheet)?;
        ranges.push((sheet, range));
    }
    sheet_units(source_id, ranges)
}

/// One unit per sheet, all sharing the workbook's source id.
fn sheet_units(
    source_id: &str,
    sheets: Vec<(String, Range<Data>)>,
) -> Result<Vec<RawUnit>, MetricsError> {
    let mut units = Vec::with_capacity(sheets.len());
    for (sheet, range) in sheets {
        let frame = range_to_frame(&range)?;
        debug!(
            "Sheet '{sheet}' of {source_id}: {} rows x {} columns",
            frame.height(),
            frame.width()
        );
        units.push(RawUnit {
            source_id: source_id.to_string(),
            sheet: Some(sheet),
            frame,
        });
    }
    Ok(units)
}

/// First row is the header; fully empty rows are dropped.
fn range_to_frame(range: &Range<Data>) -> Result<DataFrame, MetricsError> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let headers = header_names(header);

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for row in rows {
        let cells: Vec<Option<String>> = row.iter().map(cell_to_string).collect();
        if cells.iter().all(Option::is_none) {
            continue;
        }
        for (i, column) in values.iter_mut().enumerate() {
            column.push(cells.get(i).cloned().flatten());
        }
    }

    let columns = headers
        .iter()
        .zip(values)
        .map(|(name, vals)| Column::new(name.as_str().into(), vals))
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Blank headers become `Unnamed: <i>`, repeats get `.1`, `.2`, ... suffixes.
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let base = cell_to_string(cell).unwrap_or_else(|| format!("Unnamed: {i}"));
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base.clone()
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

/// Integral floats print without a fraction so `101.0` and `101` match.
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
