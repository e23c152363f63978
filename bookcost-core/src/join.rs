//! Join & clean engine: coerces keys and prices, then inner-joins students to book prices

use rust_decimal::Decimal;
use serde::Serialize;

use crate::coerce::parse_price;
use crate::columns::{book, student};
use crate::price_book::{DuplicatePolicy, PriceBook, PriceBookBuilder};
use crate::reader::{Row, Table, Value};

static EMPTY: Value = Value::Empty;

fn cell<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&EMPTY)
}

/// One (student, assigned book) pairing from the roster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub student_id: String,
    pub name: String,
    /// `None` when the roster cell is blank; such rows never match a college filter
    pub college: Option<String>,
    pub major: String,
    pub administrative_class: String,
    pub book_isbn: String,
    /// Non-canonical roster columns, aligned with [`JoinedSet::extra_columns`]
    pub extra: Vec<Value>,
}

impl StudentRecord {
    fn from_row(row: &Row, extra_columns: &[String]) -> Self {
        Self {
            student_id: cell(row, student::STUDENT_ID).to_key_string(),
            name: cell(row, student::NAME).to_key_string(),
            college: cell(row, student::COLLEGE).to_opt_string(),
            major: cell(row, student::MAJOR).to_key_string(),
            administrative_class: cell(row, student::ADMINISTRATIVE_CLASS).to_key_string(),
            book_isbn: cell(row, student::BOOK_ISBN).to_key_string(),
            extra: extra_columns
                .iter()
                .map(|column| cell(row, column).clone())
                .collect(),
        }
    }
}

/// A student row whose ISBN resolved to a positive price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    #[serde(flatten)]
    pub student: StudentRecord,
    pub unit_price: Decimal,
}

/// Rows dropped while cleaning, by reason. Never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    /// Student rows with neither a student number nor an ISBN
    pub student_rows_missing_keys: usize,
    /// Book rows with neither an ISBN nor a price
    pub book_rows_missing_values: usize,
    /// Book rows whose price did not parse as a number
    pub unparseable_prices: usize,
    /// Book rows priced at zero or below
    pub non_positive_prices: usize,
    /// Priced book rows without an ISBN
    pub book_rows_missing_isbn: usize,
    /// Book rows that repeated an ISBN already seen
    pub duplicate_isbns: usize,
    /// Student rows without an ISBN
    pub student_rows_missing_isbn: usize,
    /// Student rows whose ISBN has no price
    pub unmatched_student_rows: usize,
}

impl CleaningStats {
    pub fn dropped_student_rows(&self) -> usize {
        self.student_rows_missing_keys
            + self.student_rows_missing_isbn
            + self.unmatched_student_rows
    }

    pub fn dropped_book_rows(&self) -> usize {
        self.book_rows_missing_values
            + self.unparseable_prices
            + self.non_positive_prices
            + self.book_rows_missing_isbn
    }
}

/// Output of the join stage
#[derive(Debug, Clone, Default)]
pub struct JoinedSet {
    /// Roster columns outside the canonical schema, in source order
    pub extra_columns: Vec<String>,
    pub records: Vec<JoinedRecord>,
    pub stats: CleaningStats,
}

/// Clean both tables and join students to book prices by ISBN.
///
/// `students` must carry canonical student columns and `books` must carry
/// [`book::ISBN`] and [`book::DISCOUNTED_PRICE`]. An empty result is not an
/// error here.
pub fn join_and_clean(students: &Table, books: &Table, policy: DuplicatePolicy) -> JoinedSet {
    let mut stats = CleaningStats::default();

    let extra_columns: Vec<String> = students
        .columns
        .iter()
        .filter(|column| !student::ALL.contains(&column.as_str()))
        .cloned()
        .collect();

    let roster = clean_students(students, &extra_columns, &mut stats);
    let prices = build_price_book(books, policy, &mut stats);
    if prices.is_empty() && !books.is_empty() {
        tracing::warn!(rows = books.len(), "price list has no usable prices");
    }

    let mut records = Vec::with_capacity(roster.len());
    for record in roster {
        if record.book_isbn.is_empty() {
            stats.student_rows_missing_isbn += 1;
            continue;
        }
        match prices.get(&record.book_isbn) {
            Some(unit_price) => records.push(JoinedRecord {
                student: record,
                unit_price,
            }),
            None => stats.unmatched_student_rows += 1,
        }
    }

    if stats.dropped_student_rows() > 0 || stats.dropped_book_rows() > 0 {
        tracing::warn!(
            dropped_students = stats.dropped_student_rows(),
            dropped_books = stats.dropped_book_rows(),
            unparseable_prices = stats.unparseable_prices,
            unmatched = stats.unmatched_student_rows,
            "rows dropped while cleaning"
        );
    }
    if stats.duplicate_isbns > 0 {
        tracing::warn!(
            duplicates = stats.duplicate_isbns,
            ?policy,
            "duplicate ISBNs in price list"
        );
    }
    tracing::debug!(
        priced_isbns = prices.len(),
        joined = records.len(),
        "join complete"
    );

    JoinedSet {
        extra_columns,
        records,
        stats,
    }
}

fn clean_students(
    students: &Table,
    extra_columns: &[String],
    stats: &mut CleaningStats,
) -> Vec<StudentRecord> {
    students
        .rows
        .iter()
        .filter(|row| {
            let keep = !(cell(row, student::STUDENT_ID).is_missing()
                && cell(row, student::BOOK_ISBN).is_missing());
            if !keep {
                stats.student_rows_missing_keys += 1;
            }
            keep
        })
        .map(|row| StudentRecord::from_row(row, extra_columns))
        .collect()
}

fn build_price_book(books: &Table, policy: DuplicatePolicy, stats: &mut CleaningStats) -> PriceBook {
    let mut builder = PriceBookBuilder::new(policy);

    for row in &books.rows {
        let isbn = cell(row, book::ISBN);
        let raw_price = cell(row, book::DISCOUNTED_PRICE);

        if isbn.is_missing() && raw_price.is_missing() {
            stats.book_rows_missing_values += 1;
            continue;
        }

        let Some(price) = parse_price(raw_price) else {
            stats.unparseable_prices += 1;
            continue;
        };

        if price <= Decimal::ZERO {
            stats.non_positive_prices += 1;
            continue;
        }

        let isbn = isbn.to_key_string();
        if isbn.is_empty() {
            stats.book_rows_missing_isbn += 1;
            continue;
        }

        if builder.insert(isbn, price) {
            stats.duplicate_isbns += 1;
        }
    }

    builder.build()
}
