//! Dataset loading: CSV, spreadsheet workbooks and JSON records into a [`Table`].

use calamine::{DataType, Ods, Range, Reader, Xls, Xlsx};
use chrono::{Duration, NaiveDate};
use serde_json::Value;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::data::{format_datetime, Table};
use crate::error::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    Xlsx,
    Xls,
    Ods,
}

/// Declared format of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Spreadsheet(SpreadsheetKind),
    Json,
}

impl DataFormat {
    /// Select a format from a file extension (case insensitive).
    pub fn from_extension(ext: &str) -> Result<Self, FormatError> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Ok(DataFormat::Csv),
            "xlsx" | "xlsm" => Ok(DataFormat::Spreadsheet(SpreadsheetKind::Xlsx)),
            "xls" => Ok(DataFormat::Spreadsheet(SpreadsheetKind::Xls)),
            "ods" => Ok(DataFormat::Spreadsheet(SpreadsheetKind::Ods)),
            "json" => Ok(DataFormat::Json),
            other => Err(FormatError::UnsupportedExtension(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, FormatError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| FormatError::UnsupportedExtension(String::new()))?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::Csv => f.write_str("csv"),
            DataFormat::Spreadsheet(_) => f.write_str("spreadsheet"),
            DataFormat::Json => f.write_str("json"),
        }
    }
}

/// Read a file from disk, choosing the format by its extension.
pub fn load_path(path: &Path) -> Result<Table, FormatError> {
    let format = DataFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    info!(path = %path.display(), %format, bytes = bytes.len(), "loading dataset");
    load_bytes(bytes, format)
}

/// Parse an in-memory upload into a table.
pub fn load_bytes(bytes: Vec<u8>, format: DataFormat) -> Result<Table, FormatError> {
    let table = match format {
        DataFormat::Csv => read_csv(bytes.as_slice())?,
        DataFormat::Spreadsheet(kind) => read_spreadsheet(bytes, kind)?,
        DataFormat::Json => read_json(&bytes)?,
    };
    info!(
        rows = table.n_rows(),
        columns = table.n_columns(),
        "dataset loaded"
    );
    Ok(table)
}

/// Read comma-separated values; the first record is the header.
pub fn read_csv<R: Read>(reader: R) -> Result<Table, FormatError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() {
        return Err(FormatError::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }

    debug!(columns = headers.len(), rows = rows.len(), "parsed csv");
    Table::from_records(headers, rows)
}

/// Read the first sheet of a workbook; the first row is the header.
pub fn read_spreadsheet(bytes: Vec<u8>, kind: SpreadsheetKind) -> Result<Table, FormatError> {
    let cursor = Cursor::new(bytes);
    let range = match kind {
        SpreadsheetKind::Xlsx => first_sheet::<Xlsx<Upload>>(cursor)?,
        SpreadsheetKind::Xls => first_sheet::<Xls<Upload>>(cursor)?,
        SpreadsheetKind::Ods => first_sheet::<Ods<Upload>>(cursor)?,
    };

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<String>>());
    let headers = rows.next().ok_or(FormatError::MissingHeader)?;
    let rows: Vec<Vec<String>> = rows.collect();

    debug!(columns = headers.len(), rows = rows.len(), "parsed spreadsheet");
    Table::from_records(headers, rows)
}

type Upload = Cursor<Vec<u8>>;

fn first_sheet<W>(upload: Upload) -> Result<Range<DataType>, FormatError>
where
    W: Reader<Upload>,
    W::Error: fmt::Display,
{
    let mut workbook = W::new(upload).map_err(|e| FormatError::Spreadsheet(e.to_string()))?;
    match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => Ok(range),
        Some(Err(e)) => Err(FormatError::Spreadsheet(e.to_string())),
        None => Err(FormatError::Spreadsheet("workbook has no sheets".to_string())),
    }
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(s) => s.clone(),
        DataType::Float(f) => f.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::DateTime(serial) => excel_serial_to_string(*serial),
        other => other.to_string(),
    }
}

/// Convert an Excel serial date (days since 1899-12-30) into an ISO timestamp.
fn excel_serial_to_string(serial: f64) -> String {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0));
    let millis = (serial * 86_400_000.0).round() as i64;
    match epoch.and_then(|e| e.checked_add_signed(Duration::milliseconds(millis))) {
        Some(t) => format_datetime(&t),
        None => serial.to_string(),
    }
}

/// Read a JSON array of records. Keys of the first record, in file order,
/// become the header; keys absent from later records are missing cells.
pub fn read_json(bytes: &[u8]) -> Result<Table, FormatError> {
    let records: Vec<Value> =
        serde_json::from_slice(bytes).map_err(|e| FormatError::Json(e.to_string()))?;
    let records = records
        .iter()
        .map(|record| {
            record
                .as_object()
                .ok_or_else(|| FormatError::Json("expected an array of objects".to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let headers: Vec<String> = records
        .first()
        .ok_or(FormatError::MissingHeader)?
        .keys()
        .cloned()
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|key| json_cell(key, record.get(key)))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(columns = headers.len(), rows = rows.len(), "json records read");
    Table::from_records(headers, rows)
}

fn json_cell(key: &str, value: Option<&Value>) -> Result<String, FormatError> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(FormatError::Json(format!("nested value in field '{}'", key))),
    }
}
