//! Schema normalizer: renames aliased source columns onto canonical fields

use std::collections::{HashMap, HashSet};

use crate::columns::ColumnMap;
use crate::error::{SchemaError, TableKind};
use crate::reader::Table;

/// Rename the columns of `table` to the canonical names in `map`.
///
/// Columns that match no alias pass through unchanged. When several source
/// columns map to the same field, a column already carrying the canonical name
/// wins, then the first alias in column order; the rest pass through.
/// Fails with every missing canonical field listed.
pub fn normalize_columns(
    table: Table,
    map: &ColumnMap,
    kind: TableKind,
) -> Result<Table, SchemaError> {
    // Inverse mapping: accepted label -> canonical field
    let mut inverse: HashMap<&str, &str> = HashMap::new();
    for (canonical, aliases) in map.iter() {
        for alias in aliases {
            inverse.entry(alias.as_str()).or_insert(canonical);
        }
    }

    let mut claimed: HashSet<&str> = table
        .columns
        .iter()
        .map(String::as_str)
        .filter(|column| map.contains(column))
        .collect();

    let mut renames: HashMap<String, String> = HashMap::new();
    for column in &table.columns {
        if map.contains(column) {
            continue;
        }
        if let Some(&canonical) = inverse.get(column.as_str()) {
            if claimed.insert(canonical) {
                renames.insert(column.clone(), canonical.to_string());
            }
        }
    }

    let normalized = table.rename_columns(&renames);

    let missing: Vec<String> = map
        .canonical_fields()
        .filter(|field| !normalized.has_column(field))
        .map(str::to_string)
        .collect();

    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns {
            table: kind,
            missing,
        });
    }

    tracing::debug!(table = %kind, renamed = renames.len(), "normalized columns");
    Ok(normalized)
}
