//! Pipeline error taxonomy

use std::fmt;
use thiserror::Error;

/// Which input table an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Student,
    Book,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Student => write!(f, "student"),
            TableKind::Book => write!(f, "book"),
        }
    }
}

/// An input table does not have the shape the pipeline needs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{table} table is missing required columns: {}", missing.join(", "))]
    MissingColumns {
        table: TableKind,
        missing: Vec<String>,
    },

    #[error("no price column located in book table (columns: {})", columns.join(", "))]
    NoPriceColumn { columns: Vec<String> },
}

/// The college keyword matched none of the joined rows
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no college contains '{keyword}'; available colleges include: {}", available.join(", "))]
pub struct NoMatchError {
    pub keyword: String,
    /// Distinct colleges seen before filtering, in first-appearance order
    pub available: Vec<String>,
}

/// A cost total no longer fits in a decimal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverflowError {
    #[error("cost total of student '{student_id}' is out of range")]
    StudentTotal { student_id: String },

    #[error("overall cost total is out of range")]
    RunTotal,
}

/// Fatal pipeline failure. Only the first one encountered is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    NoMatch(#[from] NoMatchError),

    #[error(transparent)]
    Overflow(#[from] OverflowError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
