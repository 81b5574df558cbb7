use std::fmt;

use crate::error::{UnifyError, UnifyResult};

// ---------------------------------------------------------------------------
// ScalarValue – a single cell in an emitted table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Rows are compared and keys sorted downstream, so `ScalarValue` must be `Ord` and `Hash`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Integer(i64),
    Real(f64),
    /// Label cells (`ItemType`) and untyped cells read back from foreign tables.
    Text(String),
    Null,
}

// -- Manual Eq/Ord so we can put ScalarValue in sets and sort by it --

impl Eq for ScalarValue {}

impl PartialOrd for ScalarValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScalarValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use ScalarValue::*;
        fn discriminant(v: &ScalarValue) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Real(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Real(a), Real(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for ScalarValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ScalarValue::Integer(i) => i.hash(state),
            ScalarValue::Real(f) => f.to_bits().hash(state),
            ScalarValue::Text(s) => s.hash(state),
            ScalarValue::Null => {}
        }
    }
}

/// Renders the cell the way it is written to CSV: Null is empty, reals use
/// the shortest round-trip form and keep a trailing `.0` when integral.
impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Integer(i) => write!(f, "{i}"),
            ScalarValue::Real(v) => write!(f, "{v:?}"),
            ScalarValue::Text(s) => write!(f, "{s}"),
            ScalarValue::Null => Ok(()),
        }
    }
}

impl From<Option<i64>> for ScalarValue {
    fn from(v: Option<i64>) -> Self {
        v.map_or(ScalarValue::Null, ScalarValue::Integer)
    }
}

impl From<Option<f64>> for ScalarValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(ScalarValue::Null, ScalarValue::Real)
    }
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Real(v) => Some(*v),
            ScalarValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsed records
// ---------------------------------------------------------------------------

/// One album or track line: typed prefix fields plus the padded genre run.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableWidthRecord {
    pub prefix: Vec<ScalarValue>,
    /// Length equals the dataset's trailing width for every record.
    pub trailing: Vec<ScalarValue>,
}

/// A header (`subject|count`) and the items that followed it.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedBlock<T> {
    pub subject: i64,
    pub declared: usize,
    pub items: Vec<T>,
}

/// Category of a rated item, resolved against the catalog identifier sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Artist,
    Genre,
    Album,
    Track,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Artist => "Artist",
            ItemType::Genre => "Genre",
            ItemType::Album => "Album",
            ItemType::Track => "Track",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single training rating with its item category.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedInteraction {
    pub user_id: i64,
    pub item_id: i64,
    pub item_type: ItemType,
    pub rating: Option<i64>,
}

// ---------------------------------------------------------------------------
// Table – the emitted tabular artifact
// ---------------------------------------------------------------------------

/// Declared storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int64,
    Float64,
    Utf8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
    pub values: Vec<ScalarValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: ColumnType, values: Vec<ScalarValue>) -> Self {
        Column {
            name: name.into(),
            dtype,
            values,
        }
    }
}

/// Named, ordered columns of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, refusing columns whose lengths disagree with the first.
    pub fn new(columns: Vec<Column>) -> UnifyResult<Self> {
        let table = Table { columns };
        table.check_row_counts()?;
        Ok(table)
    }

    pub fn check_row_counts(&self) -> UnifyResult<()> {
        let expected = self.num_rows();
        for col in &self.columns {
            if col.values.len() != expected {
                return Err(UnifyError::RowCountMismatch {
                    column: col.name.clone(),
                    expected,
                    found: col.values.len(),
                });
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Cells of row `idx` in column order.
    pub fn row(&self, idx: usize) -> Vec<&ScalarValue> {
        self.columns.iter().map(|c| &c.values[idx]).collect()
    }

    /// New table with the same columns holding only `rows`, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| {
                    Column::new(
                        c.name.clone(),
                        c.dtype,
                        rows.iter().map(|&r| c.values[r].clone()).collect(),
                    )
                })
                .collect(),
        }
    }
}
