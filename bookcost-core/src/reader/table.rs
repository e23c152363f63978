//! In-memory table data structures

use serde::Serialize;
use std::collections::HashMap;

/// A single row, keyed by column label
pub type Row = HashMap<String, Value>;

/// Represents a fully materialized sheet: header labels plus data rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column labels in source order
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from positional rows; values beyond the header are ignored
    pub fn from_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns.into_iter().map(Into::into).collect());
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Append a positional row. Missing trailing cells are left absent.
    pub fn push_row(&mut self, values: Vec<Value>) {
        let row = self
            .columns
            .iter()
            .cloned()
            .zip(values)
            .collect::<Row>();
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, label: &str) -> bool {
        self.columns.iter().any(|c| c == label)
    }

    /// Get a cell by row index and column label
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Rename columns according to `renames` (old label -> new label).
    /// Labels not present in `renames` are kept as they are.
    pub fn rename_columns(mut self, renames: &HashMap<String, String>) -> Self {
        if renames.is_empty() {
            return self;
        }

        for column in &mut self.columns {
            if let Some(new_label) = renames.get(column) {
                *column = new_label.clone();
            }
        }

        self.rows = self
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(label, value)| match renames.get(&label) {
                        Some(new_label) => (new_label.clone(), value),
                        None => (label, value),
                    })
                    .collect()
            })
            .collect();

        self
    }
}

/// Cell value types
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(String),
}

impl Value {
    /// Empty cells, error cells and blank text all count as missing
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Empty | Value::Error(_) => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(n) => n.is_nan(),
            Value::Boolean(_) => false,
        }
    }

    /// Trimmed string form used for join keys and text fields.
    /// Missing values render as an empty string.
    pub fn to_key_string(&self) -> String {
        match self {
            Value::Empty | Value::Error(_) => String::new(),
            Value::Number(n) if n.is_nan() => String::new(),
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.trim().to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }

    /// Text form for optional fields: `None` when the value is missing
    pub fn to_opt_string(&self) -> Option<String> {
        if self.is_missing() {
            None
        } else {
            Some(self.to_key_string())
        }
    }
}

/// Integral numbers render without a fractional part so that numeric ISBN and
/// student-number cells compare equal to their text form.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
