use crate::error::{UnifyError, UnifyResult};

use super::lines::SourcePos;
use super::model::{ColumnType, ScalarValue};

/// Token that stands for "no value" in numeric fields.
pub const NULL_SENTINEL: &str = "None";

fn is_null_token(tok: &str) -> bool {
    tok.is_empty() || tok == NULL_SENTINEL
}

fn format_error(tok: &str, expected: &'static str, pos: SourcePos<'_>) -> UnifyError {
    UnifyError::Format {
        source_name: pos.source_name.to_string(),
        line: pos.line,
        token: tok.to_string(),
        expected,
    }
}

/// Parse an optional integer. Empty tokens and the sentinel are `None`.
pub fn coerce_integer(token: &str, pos: SourcePos<'_>) -> UnifyResult<Option<i64>> {
    let tok = token.trim();
    if is_null_token(tok) {
        return Ok(None);
    }
    tok.parse::<i64>()
        .map(Some)
        .map_err(|_| format_error(tok, "integer", pos))
}

/// Parse an optional real. Empty tokens and the sentinel are `None`.
///
/// Only finite values are accepted: `NaN` and `inf` cannot be carried by
/// every output format.
pub fn coerce_real(token: &str, pos: SourcePos<'_>) -> UnifyResult<Option<f64>> {
    let tok = token.trim();
    if is_null_token(tok) {
        return Ok(None);
    }
    match tok.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(format_error(tok, "real", pos)),
    }
}

/// Parse an integer that must be present (identifiers in list and grouped files).
pub fn require_integer(token: &str, pos: SourcePos<'_>) -> UnifyResult<i64> {
    let tok = token.trim();
    tok.parse::<i64>()
        .map_err(|_| format_error(tok, "integer", pos))
}

/// Coerce a token into the cell type declared for its column.
pub fn coerce_as(token: &str, dtype: ColumnType, pos: SourcePos<'_>) -> UnifyResult<ScalarValue> {
    match dtype {
        ColumnType::Int64 => coerce_integer(token, pos).map(ScalarValue::from),
        ColumnType::Float64 => coerce_real(token, pos).map(ScalarValue::from),
        ColumnType::Utf8 => {
            let tok = token.trim();
            Ok(if is_null_token(tok) {
                ScalarValue::Null
            } else {
                ScalarValue::Text(tok.to_string())
            })
        }
    }
}
