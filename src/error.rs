use thiserror::Error;

use crate::data::ColumnTag;
use crate::kind::{PlotKind, Role};

/// Raised when an uploaded file cannot be read as a table.
///
/// No partial table is ever produced alongside this error.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("invalid JSON data: {0}")]
    Json(String),

    #[error("unsupported file extension '{0}' (expected .csv, .xlsx, .xlsm, .xls, .ods or .json)")]
    UnsupportedExtension(String),

    #[error("no header row found")]
    MissingHeader,

    #[error("malformed table: {0}")]
    InvalidStructure(String),
}

/// Raised when a role binding does not satisfy a plot kind's role signature.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("no plot type selected")]
    NoPlotSelected,

    #[error("{kind} requires a column for '{}' but none is bound", .role.ui_label(*.kind))]
    RoleBindingIncomplete { kind: PlotKind, role: Role },

    #[error("column '{0}' not found")]
    UnknownColumn(String),

    #[error("column '{column}' ({tag}) is not eligible for '{}' in {kind}", .role.ui_label(*.kind))]
    IneligibleColumn {
        kind: PlotKind,
        role: Role,
        column: String,
        tag: ColumnTag,
    },

    #[error("{kind} does not use the '{}' role", .role.ui_label(*.kind))]
    RoleNotUsed { kind: PlotKind, role: Role },
}
