use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::error::FormatError;

/// Cell contents treated as missing before type inference.
const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// Semantic type of a column, inferred once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnTag {
    Categorical,
    Numeric,
    Temporal,
}

impl fmt::Display for ColumnTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnTag::Categorical => "categorical",
            ColumnTag::Numeric => "numeric",
            ColumnTag::Temporal => "temporal",
        };
        f.write_str(name)
    }
}

/// Typed storage for one column. `None` marks a missing cell.
///
/// The variant is the column's tag, so a column can never carry two tags.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Temporal(Vec<Option<NaiveDateTime>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn tag(&self) -> ColumnTag {
        match self {
            ColumnData::Numeric(_) => ColumnTag::Numeric,
            ColumnData::Temporal(_) => ColumnTag::Temporal,
            ColumnData::Categorical(_) => ColumnTag::Categorical,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Temporal(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of a cell on a continuous axis.
    ///
    /// Temporal cells map to seconds since the Unix epoch. Categorical and
    /// missing cells have no position.
    pub fn value_at(&self, row: usize) -> Option<f64> {
        match self {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().filter(|x| x.is_finite()),
            ColumnData::Temporal(v) => v
                .get(row)
                .copied()
                .flatten()
                .map(|t| t.and_utc().timestamp_millis() as f64 / 1000.0),
            ColumnData::Categorical(_) => None,
        }
    }

    /// Label of a categorical cell.
    pub fn category_at(&self, row: usize) -> Option<&str> {
        match self {
            ColumnData::Categorical(v) => v.get(row).and_then(|c| c.as_deref()),
            _ => None,
        }
    }

    /// Display form of a cell for previews.
    pub fn display_at(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(v) => match v.get(row).copied().flatten() {
                Some(x) => x.to_string(),
                None => "NaN".to_string(),
            },
            ColumnData::Temporal(v) => match v.get(row).copied().flatten() {
                Some(t) => format_datetime(&t),
                None => "NaT".to_string(),
            },
            ColumnData::Categorical(v) => match v.get(row).and_then(|c| c.as_deref()) {
                Some(s) => s.to_string(),
                None => "NaN".to_string(),
            },
        }
    }

    /// Infer the tag of a column of raw cells and store it typed.
    ///
    /// Precedence: every present cell is a date/time → Temporal; every present
    /// cell is a number → Numeric; otherwise Categorical. A column with no
    /// present cells is Categorical.
    pub fn infer(raw: &[String]) -> ColumnData {
        let cells: Vec<Option<&str>> = raw
            .iter()
            .map(|s| {
                let trimmed = s.trim();
                if MISSING_TOKENS.contains(&trimmed) {
                    None
                } else {
                    Some(trimmed)
                }
            })
            .collect();

        if cells.iter().all(Option::is_none) {
            return ColumnData::Categorical(vec![None; cells.len()]);
        }
        if let Some(times) = parse_all(&cells, parse_datetime) {
            return ColumnData::Temporal(times);
        }
        if let Some(numbers) = parse_all(&cells, |s| s.parse::<f64>().ok()) {
            return ColumnData::Numeric(numbers);
        }
        ColumnData::Categorical(
            raw.iter()
                .zip(&cells)
                .map(|(original, cell)| cell.map(|_| original.clone()))
                .collect(),
        )
    }
}

fn parse_all<T>(cells: &[Option<&str>], parse: impl Fn(&str) -> Option<T>) -> Option<Vec<Option<T>>> {
    cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => parse(s).map(Some),
        })
        .collect()
}

/// Parse the date/time shapes the loader recognises.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Render a timestamp, dropping the time of day when it is midnight.
pub fn format_datetime(t: &NaiveDateTime) -> String {
    if t.time() == chrono::NaiveTime::MIN {
        t.format("%Y-%m-%d").to_string()
    } else {
        t.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> ColumnTag {
        self.data.tag()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }
}

/// An immutable, column-oriented table.
///
/// Column names are unique and columns keep their insertion order. Every
/// column has the same number of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table from a header row and raw string records, inferring tags.
    pub fn from_records(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, FormatError> {
        if headers.is_empty() {
            return Err(FormatError::MissingHeader);
        }
        let width = headers.len();
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(FormatError::InvalidStructure(format!(
                    "row {} has {} fields, expected {}",
                    idx + 1,
                    row.len(),
                    width
                )));
            }
        }

        let names = unique_headers(headers);
        let mut columns = Vec::with_capacity(width);
        for (col_idx, name) in names.into_iter().enumerate() {
            let raw: Vec<String> = rows.iter().map(|row| row[col_idx].clone()).collect();
            let data = ColumnData::infer(&raw);
            debug!(column = %name, tag = %data.tag(), "inferred column type");
            columns.push(Column::new(name, data));
        }

        Ok(Self {
            columns,
            n_rows: rows.len(),
        })
    }

    /// Build a table from already typed columns.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, FormatError> {
        let n_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        let mut seen = HashSet::new();
        for column in &columns {
            if column.data.len() != n_rows {
                return Err(FormatError::InvalidStructure(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.data.len(),
                    n_rows
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(FormatError::InvalidStructure(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        Ok(Self { columns, n_rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns_tagged(&self, tag: ColumnTag) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(move |c| c.tag() == tag)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// First `n` rows rendered as display strings.
    pub fn head(&self, n: usize) -> Vec<Vec<String>> {
        (0..self.n_rows.min(n))
            .map(|row| self.columns.iter().map(|c| c.data.display_at(row)).collect())
            .collect()
    }
}

/// Name blank headers by position and suffix repeated names with `.1`, `.2`, ...
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(headers.len());
    for (idx, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            header
        };
        let mut name = base.clone();
        let mut suffix = 0;
        while seen.contains(&name) {
            suffix += 1;
            name = format!("{}.{}", base, suffix);
        }
        seen.insert(name.clone());
        names.push(name);
    }
    names
}
