use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde::Deserialize;

use crate::error::UnifyResult;

use super::model::{ColumnType, ScalarValue, Table};

/// On-disk encoding of an emitted table.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Write `table` to `path` in the given format.
pub fn write_table(table: &Table, path: &Path, format: OutputFormat) -> UnifyResult<()> {
    table.check_row_counts()?;
    match format {
        OutputFormat::Csv => write_csv(table, File::create(path)?)?,
        OutputFormat::Json => write_json(table, BufWriter::new(File::create(path)?))?,
        OutputFormat::Parquet => write_parquet(table, File::create(path)?)?,
    }
    log::info!(
        "wrote {} rows x {} columns to {}",
        table.num_rows(),
        table.num_columns(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// One header row, then one record per row. Null cells are empty.
pub fn write_csv<W: Write>(table: &Table, out: W) -> UnifyResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.column_names())?;
    for idx in 0..table.num_rows() {
        writer.write_record(table.row(idx).iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScalarValue::Integer(i) => serializer.serialize_i64(*i),
            ScalarValue::Real(v) => serializer.serialize_f64(*v),
            ScalarValue::Text(s) => serializer.serialize_str(s),
            ScalarValue::Null => serializer.serialize_none(),
        }
    }
}

/// A row serialized as an object whose keys follow column order.
struct RowRecord<'a> {
    table: &'a Table,
    idx: usize,
}

impl Serialize for RowRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let columns = self.table.columns();
        let mut map = serializer.serialize_map(Some(columns.len()))?;
        for col in columns {
            map.serialize_entry(&col.name, &col.values[self.idx])?;
        }
        map.end()
    }
}

struct Records<'a>(&'a Table);

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.num_rows()))?;
        for idx in 0..self.0.num_rows() {
            seq.serialize_element(&RowRecord { table: self.0, idx })?;
        }
        seq.end()
    }
}

#[derive(serde::Serialize)]
struct ColumnSchema<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    dtype: ColumnType,
}

#[derive(serde::Serialize)]
struct JsonTable<'a> {
    columns: Vec<ColumnSchema<'a>>,
    records: Records<'a>,
}

/// Schema plus records, so a table with no rows still carries its columns:
///
/// ```text
/// {"columns": [{"name": "AlbumID", "type": "int64"}, ...],
///  "records": [{"AlbumID": 10, "ArtistID": 5.0, ...}, ...]}
/// ```
pub fn write_json<W: Write>(table: &Table, mut out: W) -> UnifyResult<()> {
    let document = JsonTable {
        columns: table
            .columns()
            .iter()
            .map(|col| ColumnSchema {
                name: &col.name,
                dtype: col.dtype,
            })
            .collect(),
        records: Records(table),
    };
    serde_json::to_writer_pretty(&mut out, &document)?;
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn arrow_type(dtype: ColumnType) -> DataType {
    match dtype {
        ColumnType::Int64 => DataType::Int64,
        ColumnType::Float64 => DataType::Float64,
        ColumnType::Utf8 => DataType::Utf8,
    }
}

/// Convert a table to a single Arrow record batch; every field is nullable.
pub fn to_record_batch(table: &Table) -> UnifyResult<RecordBatch> {
    let schema = Arc::new(Schema::new(
        table
            .columns()
            .iter()
            .map(|c| Field::new(c.name.clone(), arrow_type(c.dtype), true))
            .collect::<Vec<_>>(),
    ));

    let arrays: Vec<ArrayRef> = table
        .columns()
        .iter()
        .map(|col| -> ArrayRef {
            match col.dtype {
                ColumnType::Int64 => Arc::new(Int64Array::from(
                    col.values.iter().map(|v| v.as_i64()).collect::<Vec<_>>(),
                )),
                ColumnType::Float64 => Arc::new(Float64Array::from(
                    col.values.iter().map(|v| v.as_f64()).collect::<Vec<_>>(),
                )),
                ColumnType::Utf8 => Arc::new(StringArray::from(
                    col.values
                        .iter()
                        .map(|v| match v {
                            ScalarValue::Null => None,
                            other => Some(other.to_string()),
                        })
                        .collect::<Vec<_>>(),
                )),
            }
        })
        .collect();

    Ok(RecordBatch::try_new(schema, arrays)?)
}

pub fn write_parquet<W: Write + Send>(table: &Table, out: W) -> UnifyResult<()> {
    let batch = to_record_batch(table)?;
    let mut writer = ArrowWriter::try_new(out, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
