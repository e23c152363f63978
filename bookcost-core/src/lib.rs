//! bookcost-core: Core library for textbook cost reports
//!
//! Joins a student roster against a book price list, keeps the students of a
//! target college and totals what each of them spends on textbooks.

pub mod aggregate;
pub mod coerce;
pub mod columns;
pub mod config;
pub mod error;
pub mod join;
pub mod normalize;
pub mod pipeline;
pub mod price;
pub mod price_book;
pub mod reader;
pub mod writer;

pub use aggregate::{DetailRow, GroupSummaryRow, RunSummary};
pub use config::ReportConfig;
pub use error::{NoMatchError, OverflowError, PipelineError, SchemaError, TableKind};
pub use join::{CleaningStats, JoinedRecord, StudentRecord};
pub use pipeline::{Pipeline, Report};
pub use price_book::DuplicatePolicy;
pub use reader::{Table, Value, read_table};
pub use writer::{SheetData, report_file_name, write_report, write_workbook};
