//! Report pipeline: normalize, resolve price column, join, aggregate

use chrono::{DateTime, Local};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, info_span};

use crate::aggregate::{self, DetailRow, GroupSummaryRow, RunSummary};
use crate::columns::{ColumnMap, book};
use crate::config::ReportConfig;
use crate::error::{Result, SchemaError, TableKind};
use crate::join::{self, CleaningStats};
use crate::normalize::normalize_columns;
use crate::price::PriceColumnResolver;
use crate::reader::Table;

/// Everything a successful run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub summary: RunSummary,
    pub groups: Vec<GroupSummaryRow>,
    pub details: Vec<DetailRow>,
    /// Roster columns carried through to the detail rows
    pub extra_columns: Vec<String>,
    pub cleaning: CleaningStats,
}

/// Main pipeline interface. Holds only configuration, so one instance can
/// serve any number of concurrent runs.
pub struct Pipeline {
    config: ReportConfig,
    student_columns: ColumnMap,
    book_columns: ColumnMap,
    resolver: PriceColumnResolver,
}

impl Pipeline {
    /// Create a new pipeline with default configuration
    pub fn new() -> Self {
        Self::with_config(ReportConfig::default())
    }

    /// Create a new pipeline with custom configuration
    pub fn with_config(config: ReportConfig) -> Self {
        Self {
            student_columns: config.student_column_map(),
            book_columns: config.book_column_map(),
            resolver: PriceColumnResolver::new(&config.price),
            config,
        }
    }

    /// Run the full pipeline for one college keyword
    pub fn run(&self, students: Table, books: Table, keyword: &str) -> Result<Report> {
        self.run_at(students, books, keyword, Local::now())
    }

    /// Same as [`Pipeline::run`] with a caller-supplied summary timestamp
    pub fn run_at(
        &self,
        students: Table,
        books: Table,
        keyword: &str,
        timestamp: DateTime<Local>,
    ) -> Result<Report> {
        let span = info_span!("report", keyword = %keyword);
        let _enter = span.enter();

        let (students, books) = info_span!("normalize").in_scope(|| -> Result<_> {
            let students = normalize_columns(students, &self.student_columns, TableKind::Student)?;
            let books = normalize_columns(books, &self.book_columns, TableKind::Book)?;
            Ok((students, books))
        })?;

        let price_column = self
            .resolver
            .resolve(&books.columns)
            .map(str::to_string)
            .ok_or_else(|| SchemaError::NoPriceColumn {
                columns: books.columns.clone(),
            })?;
        let books = promote_price_column(books, &price_column);

        let joined = info_span!("join").in_scope(|| {
            join::join_and_clean(&students, &books, self.config.price.duplicate_policy)
        });
        // Inputs are no longer needed once joined
        drop(students);
        drop(books);

        let aggregation = info_span!("aggregate").in_scope(|| {
            aggregate::aggregate(&joined.records, keyword, self.config.filter.sample_limit)
        })?;

        let summary = aggregate::summarize(&aggregation, keyword, &price_column, timestamp);
        info!(
            students = summary.total_students,
            total_cost = %summary.total_cost,
            colleges = %summary.matched_colleges_display(),
            "report ready"
        );

        Ok(Report {
            summary,
            groups: aggregation.groups,
            details: aggregation.details,
            extra_columns: joined.extra_columns,
            cleaning: joined.stats,
        })
    }

    /// Run one independent pipeline per keyword in parallel.
    /// Results are returned in keyword order.
    pub fn run_many(
        &self,
        students: &Table,
        books: &Table,
        keywords: &[String],
    ) -> Vec<(String, Result<Report>)> {
        keywords
            .par_iter()
            .map(|keyword| {
                let report = self.run(students.clone(), books.clone(), keyword);
                (keyword.clone(), report)
            })
            .collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Rename the resolved price column to the canonical price field. A different
/// column already holding the canonical name is moved aside first.
fn promote_price_column(books: Table, label: &str) -> Table {
    if label == book::DISCOUNTED_PRICE {
        return books;
    }

    let mut renames = HashMap::new();
    if books.has_column(book::DISCOUNTED_PRICE) {
        let mut aside = format!("{}.source", book::DISCOUNTED_PRICE);
        while books.has_column(&aside) {
            aside.push_str(".source");
        }
        renames.insert(book::DISCOUNTED_PRICE.to_string(), aside);
    }
    renames.insert(label.to_string(), book::DISCOUNTED_PRICE.to_string());
    books.rename_columns(&renames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Value;

    #[test]
    fn test_promote_price_column() {
        let books = Table::from_rows(
            vec!["isbn", "discounted_price", "折后价"],
            vec![vec!["111".into(), "old".into(), 9.5.into()]],
        );

        let books = promote_price_column(books, "折后价");

        assert_eq!(
            books.columns,
            vec!["isbn", "discounted_price.source", "discounted_price"]
        );
        assert_eq!(books.get(0, "discounted_price"), Some(&Value::Number(9.5)));
        assert_eq!(
            books.get(0, "discounted_price.source"),
            Some(&Value::from("old"))
        );
    }

    #[test]
    fn test_no_price_column_is_schema_error() {
        let students = Table::from_rows(
            vec!["学号", "姓名", "学院", "专业", "行政班", "ISBN"],
            vec![],
        );
        let books = Table::from_rows(vec!["ISBN", "定价"], vec![]);

        let err = Pipeline::new().run(students, books, "计算机").unwrap_err();

        assert!(matches!(
            err,
            crate::error::PipelineError::Schema(SchemaError::NoPriceColumn { .. })
        ));
    }
}
