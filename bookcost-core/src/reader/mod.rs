//! Excel/ODS file reader using calamine

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use std::collections::HashMap;
use std::path::Path;

pub mod table;

pub use table::{Row, Table, Value};

/// Read one sheet of a workbook into a [`Table`].
///
/// The first row of the used range is the header. When `sheet` is `None` the
/// first sheet of the workbook is read.
pub fn read_table<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<Table> {
    let path = path.as_ref();
    let mut excel: Sheets<_> = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => excel
            .sheet_names()
            .first()
            .cloned()
            .with_context(|| format!("Workbook has no sheets: {}", path.display()))?,
    };

    let range = excel
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet '{}' in {}", sheet_name, path.display()))?;

    let table = table_from_range(&range);
    tracing::debug!(
        path = %path.display(),
        sheet = %sheet_name,
        columns = table.columns.len(),
        rows = table.len(),
        "read table"
    );
    Ok(table)
}

/// Convert a calamine range into a table, using its first row as the header
pub fn table_from_range(range: &Range<Data>) -> Table {
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let label = parse_cell_value(cell).to_key_string();
                if label.is_empty() {
                    format!("Unnamed: {}", index)
                } else {
                    label
                }
            })
            .collect(),
        None => return Table::default(),
    };

    let mut table = Table::new(dedupe_headers(headers));

    for data_row in rows {
        let values: Vec<Value> = data_row.iter().map(parse_cell_value).collect();
        // Blank lines between records are common in hand-maintained sheets
        if values.iter().all(Value::is_missing) {
            continue;
        }
        table.push_row(values);
    }

    table
}

/// Repeated header labels get `.1`, `.2`, ... suffixes so every column stays addressable
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(headers.len());

    for header in headers {
        let count = seen.entry(header.clone()).or_insert(0);
        if *count == 0 {
            result.push(header);
        } else {
            result.push(format!("{}.{}", header, count));
        }
        *count += 1;
    }

    result
}

fn parse_cell_value(data: &Data) -> Value {
    match data {
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::String(s) => Value::Text(s.clone()),
        Data::Bool(b) => Value::Boolean(*b),
        Data::Error(e) => Value::Error(format!("{:?}", e)),
        Data::Empty => Value::Empty,
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_from(rows: &[&[Data]]) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                range.set_value((r as u32, c as u32), cell.clone());
            }
        }
        range
    }

    #[test]
    fn test_header_and_rows() {
        let range = range_from(&[
            &[Data::String("ISBN".into()), Data::String("折后价".into())],
            &[Data::Float(9787111.0), Data::Float(35.5)],
            &[Data::Empty, Data::Empty],
            &[Data::String("111".into()), Data::Int(50)],
        ]);

        let table = table_from_range(&range);

        assert_eq!(table.columns, vec!["ISBN", "折后价"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "ISBN").map(Value::to_key_string), Some("9787111".into()));
        assert_eq!(table.get(1, "折后价"), Some(&Value::Number(50.0)));
    }

    #[test]
    fn test_unnamed_and_duplicate_headers() {
        let range = range_from(&[
            &[
                Data::String("ISBN".into()),
                Data::Empty,
                Data::String("ISBN".into()),
            ],
            &[Data::Int(1), Data::Int(2), Data::Int(3)],
        ]);

        let table = table_from_range(&range);

        assert_eq!(table.columns, vec!["ISBN", "Unnamed: 1", "ISBN.1"]);
        assert_eq!(table.get(0, "ISBN.1"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn test_empty_range() {
        let range: Range<Data> = Range::empty();
        let table = table_from_range(&range);
        assert!(table.columns.is_empty());
        assert!(table.is_empty());
    }
}
