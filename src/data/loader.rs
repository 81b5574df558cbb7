use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, ColumnType, ScalarValue, Table};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read a previously emitted table back.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, cells typed per column
/// * `.json`    – `{"columns": [{"name": "AlbumID", "type": "int64"}, ...], "records": [...]}`,
///   or a bare records array written by another tool
/// * `.parquet` – one column per field, Int/Float/Utf8
pub fn load_table(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    };
    table.with_context(|| format!("loading table {}", path.display()))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Header row plus records. Short records are padded with empty (null)
/// cells; records with more fields than the header are skipped with a warning.
pub fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() > headers.len() {
            log::warn!(
                "{}: row {row_no} has {} fields, header has {}; skipped",
                path.display(),
                record.len(),
                headers.len()
            );
            continue;
        }
        let mut row: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    table_from_text_rows(&headers, &rows)
}

/// Build a table from raw text cells, typing each column as Int64 when every
/// non-empty cell is an integer, Float64 when every one is a number, Utf8 otherwise.
pub fn table_from_text_rows(headers: &[String], rows: &[Vec<String>]) -> Result<Table> {
    let columns = headers
        .iter()
        .enumerate()
        .map(|(col_idx, name)| {
            let cells: Vec<&str> = rows.iter().map(|r| r[col_idx].as_str()).collect();
            infer_column(name, &cells)
        })
        .collect();
    Ok(Table::new(columns)?)
}

fn infer_column(name: &str, cells: &[&str]) -> Column {
    let present = || cells.iter().filter(|c| !c.is_empty());
    let dtype = if present().all(|c| c.parse::<i64>().is_ok()) {
        ColumnType::Int64
    } else if present().all(|c| c.parse::<f64>().is_ok()) {
        ColumnType::Float64
    } else {
        ColumnType::Utf8
    };

    let values = cells
        .iter()
        .map(|c| {
            if c.is_empty() {
                return ScalarValue::Null;
            }
            match dtype {
                ColumnType::Int64 => c.parse().map_or(ScalarValue::Null, ScalarValue::Integer),
                ColumnType::Float64 => c.parse().map_or(ScalarValue::Null, ScalarValue::Real),
                ColumnType::Utf8 => ScalarValue::Text(c.to_string()),
            }
        })
        .collect();
    Column::new(name, dtype, values)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
struct JsonColumn {
    name: String,
    #[serde(rename = "type")]
    dtype: ColumnType,
}

#[derive(serde::Deserialize)]
struct JsonTable {
    columns: Vec<JsonColumn>,
    records: Vec<serde_json::Map<String, JsonValue>>,
}

/// Tables written by `emit::write_json` carry their column list, so order,
/// types and zero-row tables survive.  A bare records array is also accepted;
/// its columns are typed by inspection and come back in sorted key order.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    if let JsonValue::Array(records) = &root {
        return load_json_records(records);
    }
    let document: JsonTable = serde_json::from_value(root)
        .context("Expected a {columns, records} object or a records array")?;

    let columns = document
        .columns
        .iter()
        .map(|col| typed_json_column(col, &document.records))
        .collect::<Result<Vec<_>>>()?;
    Ok(Table::new(columns)?)
}

fn typed_json_column(
    col: &JsonColumn,
    records: &[serde_json::Map<String, JsonValue>],
) -> Result<Column> {
    let values = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let cell = rec.get(&col.name).unwrap_or(&JsonValue::Null);
            let value = match (col.dtype, cell) {
                (_, JsonValue::Null) => Some(ScalarValue::Null),
                (ColumnType::Int64, v) => v.as_i64().map(ScalarValue::Integer),
                (ColumnType::Float64, v) => v.as_f64().map(ScalarValue::Real),
                (ColumnType::Utf8, JsonValue::String(s)) => Some(ScalarValue::Text(s.clone())),
                (ColumnType::Utf8, _) => None,
            };
            value.with_context(|| {
                format!("record {i}: {} is not {:?}: {cell}", col.name, col.dtype)
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Column::new(col.name.clone(), col.dtype, values))
}

fn load_json_records(records: &[JsonValue]) -> Result<Table> {
    let mut names: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let columns = names
        .iter()
        .map(|name| {
            let cells: Vec<&JsonValue> = records
                .iter()
                .map(|rec| rec.get(name).unwrap_or(&JsonValue::Null))
                .collect();
            json_column(name, &cells)
        })
        .collect();

    Ok(Table::new(columns)?)
}

fn json_column(name: &str, cells: &[&JsonValue]) -> Column {
    let present = || cells.iter().filter(|v| !v.is_null());
    let dtype = if present().all(|v| v.is_i64()) {
        ColumnType::Int64
    } else if present().all(|v| v.is_number()) {
        ColumnType::Float64
    } else {
        ColumnType::Utf8
    };

    let values = cells
        .iter()
        .map(|v| match (dtype, v) {
            (_, JsonValue::Null) => ScalarValue::Null,
            (ColumnType::Int64, v) => v.as_i64().into(),
            (ColumnType::Float64, v) => v.as_f64().into(),
            (ColumnType::Utf8, JsonValue::String(s)) => ScalarValue::Text(s.clone()),
            (ColumnType::Utf8, other) => ScalarValue::Text(other.to_string()),
        })
        .collect();
    Column::new(name, dtype, values)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Column> = schema
        .fields()
        .iter()
        .map(|f| Column::new(f.name().clone(), column_type(f.data_type()), Vec::new()))
        .collect();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, column) in columns.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            for row in 0..batch.num_rows() {
                column.values.push(extract_value(array, row)?);
            }
        }
    }

    Ok(Table::new(columns)?)
}

fn column_type(data_type: &DataType) -> ColumnType {
    match data_type {
        DataType::Int32 | DataType::Int64 => ColumnType::Int64,
        DataType::Float32 | DataType::Float64 => ColumnType::Float64,
        _ => ColumnType::Utf8,
    }
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Result<ScalarValue> {
    if col.is_null(row) {
        return Ok(ScalarValue::Null);
    }
    let value = match col.data_type() {
        DataType::Int32 => ScalarValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => ScalarValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => ScalarValue::Real(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => ScalarValue::Real(col.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => ScalarValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => ScalarValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Boolean => ScalarValue::Text(col.as_boolean().value(row).to_string()),
        other => bail!("unsupported parquet column type {other:?}"),
    };
    Ok(value)
}
