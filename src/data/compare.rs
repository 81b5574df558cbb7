use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;

use super::loader::load_table;
use super::model::{ScalarValue, Table};

/// Rows of the first table split by whether the second table has an identical row.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub same: Table,
    pub different: Table,
}

/// Integers and reals compare by numeric value, so `1` matches `1.0`.
fn row_key(table: &Table, idx: usize) -> Vec<ScalarValue> {
    table
        .row(idx)
        .into_iter()
        .map(|v| match v {
            ScalarValue::Integer(i) => ScalarValue::Real(*i as f64),
            other => other.clone(),
        })
        .collect()
}

/// Match whole rows positionally; column names are not compared.
pub fn compare_tables(first: &Table, second: &Table) -> Comparison {
    if first.num_columns() != second.num_columns() {
        log::warn!(
            "tables have {} and {} columns; no row can match",
            first.num_columns(),
            second.num_columns()
        );
    }
    let known: HashSet<Vec<ScalarValue>> =
        (0..second.num_rows()).map(|i| row_key(second, i)).collect();

    let (same, different): (Vec<usize>, Vec<usize>) =
        (0..first.num_rows()).partition(|&i| known.contains(&row_key(first, i)));

    log::info!("{} rows shared, {} rows only in first", same.len(), different.len());
    Comparison {
        same: first.select_rows(&same),
        different: first.select_rows(&different),
    }
}

pub fn compare_files(first: &Path, second: &Path) -> Result<Comparison> {
    let first = load_table(first)?;
    let second = load_table(second)?;
    Ok(compare_tables(&first, &second))
}
