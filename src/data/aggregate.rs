use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use anyhow::{Context, Result};

use super::emit::{write_table, OutputFormat};
use super::loader::load_table;
use super::model::{Column, ColumnType, ScalarValue, Table};

pub const DEFAULT_KEY: &str = "TrackID";
pub const DEFAULT_VALUE: &str = "Predictor";
const PRIMARY_SUFFIX: &str = "_file1";
const FALLBACK_SUFFIX: &str = "_file2";

fn merged_type(a: ColumnType, b: ColumnType) -> ColumnType {
    match (a, b) {
        (a, b) if a == b => a,
        (ColumnType::Int64, ColumnType::Float64) | (ColumnType::Float64, ColumnType::Int64) => {
            ColumnType::Float64
        }
        _ => ColumnType::Utf8,
    }
}

fn cast(value: &ScalarValue, dtype: ColumnType) -> ScalarValue {
    match (dtype, value) {
        (_, ScalarValue::Null) => ScalarValue::Null,
        (ColumnType::Float64, ScalarValue::Integer(i)) => ScalarValue::Real(*i as f64),
        (ColumnType::Utf8, ScalarValue::Text(_)) => value.clone(),
        (ColumnType::Utf8, other) => ScalarValue::Text(other.to_string()),
        _ => value.clone(),
    }
}

/// First row index per key. Null keys and repeated keys are dropped with a warning.
fn index_by_key(
    table: &Table,
    key: &str,
    key_type: ColumnType,
    label: &str,
) -> Result<BTreeMap<ScalarValue, usize>> {
    let column = table
        .column(key)
        .with_context(|| format!("{label} table has no '{key}' column"))?;
    let mut index = BTreeMap::new();
    for (row, value) in column.values.iter().enumerate() {
        if value.is_null() {
            log::warn!("{label} row {row}: empty '{key}', row dropped");
            continue;
        }
        match index.entry(cast(value, key_type)) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(_) => {
                log::warn!("{label} row {row}: duplicate '{key}' {value}, first occurrence kept");
            }
        }
    }
    Ok(index)
}

/// Output column: where its cells come from and what it is called.
struct Source<'a> {
    name: String,
    column: &'a Column,
    from_primary: bool,
}

/// Outer-join `primary` and `fallback` on `key`, then fill empty `value`
/// cells of the primary from the fallback.
///
/// Shared non-key columns are suffixed `_file1` / `_file2`; the fallback's
/// value column is dropped after filling. Rows are ordered by key.
pub fn aggregate_predictions(
    primary: &Table,
    fallback: &Table,
    key: &str,
    value: &str,
) -> Result<Table> {
    for (label, table) in [("primary", primary), ("fallback", fallback)] {
        table
            .column(value)
            .with_context(|| format!("{label} table has no '{value}' column"))?;
    }

    let primary_key = primary
        .column(key)
        .with_context(|| format!("primary table has no '{key}' column"))?;
    let fallback_key = fallback
        .column(key)
        .with_context(|| format!("fallback table has no '{key}' column"))?;
    let key_type = merged_type(primary_key.dtype, fallback_key.dtype);

    let primary_rows = index_by_key(primary, key, key_type, "primary")?;
    let fallback_rows = index_by_key(fallback, key, key_type, "fallback")?;
    let keys: BTreeSet<&ScalarValue> = primary_rows.keys().chain(fallback_rows.keys()).collect();

    let primary_names: HashSet<&str> = primary.column_names().into_iter().collect();
    let fallback_names: HashSet<&str> = fallback.column_names().into_iter().collect();

    let mut sources: Vec<Source<'_>> = Vec::new();
    for column in primary.columns().iter().filter(|c| c.name != key) {
        let name = if fallback_names.contains(column.name.as_str()) {
            format!("{}{PRIMARY_SUFFIX}", column.name)
        } else {
            column.name.clone()
        };
        sources.push(Source { name, column, from_primary: true });
    }
    for column in fallback.columns().iter().filter(|c| c.name != key && c.name != value) {
        let name = if primary_names.contains(column.name.as_str()) {
            format!("{}{FALLBACK_SUFFIX}", column.name)
        } else {
            column.name.clone()
        };
        sources.push(Source { name, column, from_primary: false });
    }

    let fallback_value = fallback.column(value).context("fallback value column")?;
    let mut columns = vec![Column::new(
        key,
        key_type,
        keys.iter().map(|&k| k.clone()).collect(),
    )];

    for source in &sources {
        let is_value = source.from_primary && source.column.name == value;
        let dtype = if is_value {
            merged_type(source.column.dtype, fallback_value.dtype)
        } else {
            source.column.dtype
        };
        let rows = if source.from_primary { &primary_rows } else { &fallback_rows };

        let mut filled = 0usize;
        let values = keys
            .iter()
            .map(|&k| {
                let cell = rows
                    .get(k)
                    .map_or(ScalarValue::Null, |&r| cast(&source.column.values[r], dtype));
                if is_value && cell.is_null() {
                    if let Some(&r) = fallback_rows.get(k) {
                        let backup = cast(&fallback_value.values[r], dtype);
                        if !backup.is_null() {
                            filled += 1;
                        }
                        return backup;
                    }
                }
                cell
            })
            .collect();
        if is_value {
            log::info!("filled {filled} empty '{}' cells from fallback", source.name);
        }
        columns.push(Column::new(source.name.clone(), dtype, values));
    }

    Ok(Table::new(columns)?)
}

/// Read two prediction tables, merge them and write the result as CSV.
pub fn aggregate_files(
    primary: &Path,
    fallback: &Path,
    output: &Path,
    key: &str,
    value: &str,
) -> Result<Table> {
    let merged = aggregate_predictions(&load_table(primary)?, &load_table(fallback)?, key, value)?;
    write_table(&merged, output, OutputFormat::Csv)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(merged)
}
