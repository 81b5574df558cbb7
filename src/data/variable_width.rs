use serde::{Deserialize, Serialize};

use crate::error::{UnifyError, UnifyResult};

use super::lines::SourceLines;
use super::model::{Column, ColumnType, ScalarValue, Table, VariableWidthRecord};
use super::scalar::{coerce_as, coerce_real};

/// Field separator for album and track lines.
pub const FIELD_DELIMITER: char = '|';

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

/// Fixed prefix columns followed by a variable run of real-valued columns.
#[derive(Debug, Clone, Copy)]
pub struct RecordLayout {
    pub prefix: &'static [(&'static str, ColumnType)],
    /// Trailing columns are named `{stem}_1`, `{stem}_2`, ...
    pub trailing_stem: &'static str,
}

/// `AlbumID|ArtistID|Genre1|Genre2|...`
pub const ALBUM_LAYOUT: RecordLayout = RecordLayout {
    prefix: &[("AlbumID", ColumnType::Int64), ("ArtistID", ColumnType::Float64)],
    trailing_stem: "Genre",
};

/// `TrackID|AlbumID|ArtistID|Genre1|...`
pub const TRACK_LAYOUT: RecordLayout = RecordLayout {
    prefix: &[
        ("TrackID", ColumnType::Int64),
        ("AlbumID", ColumnType::Float64),
        ("ArtistID", ColumnType::Float64),
    ],
    trailing_stem: "Genre",
};

/// What to do with a non-blank line that has no field delimiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedLinePolicy {
    /// Drop the line from both passes and log it.
    #[default]
    Skip,
    /// Fail the artifact with `StructuralCorruption`.
    Reject,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Result of parsing one variable-width artifact.
#[derive(Debug, Clone)]
pub struct VariableWidthData {
    pub layout: RecordLayout,
    /// Maximum trailing-field count over qualifying lines.
    pub width: usize,
    pub records: Vec<VariableWidthRecord>,
    /// 1-based line numbers dropped for lacking a delimiter.
    pub skipped_lines: Vec<usize>,
}

/// Two-pass parse: infer the trailing width over every qualifying line, then
/// materialize each record padded to that width.
pub fn parse_variable_width(
    src: &SourceLines,
    layout: RecordLayout,
    policy: MalformedLinePolicy,
) -> UnifyResult<VariableWidthData> {
    let prefix_len = layout.prefix.len();

    // Pass 1: classify lines and infer the width.
    let mut qualifying: Vec<usize> = Vec::with_capacity(src.len());
    let mut skipped_lines = Vec::new();
    let mut width: Option<usize> = None;

    for (idx, line) in src.lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.contains(FIELD_DELIMITER) {
            match policy {
                MalformedLinePolicy::Skip => {
                    log::warn!(
                        "{}:{}: no '{}' delimiter, line skipped",
                        src.name,
                        idx + 1,
                        FIELD_DELIMITER
                    );
                    skipped_lines.push(idx + 1);
                    continue;
                }
                MalformedLinePolicy::Reject => {
                    return Err(UnifyError::StructuralCorruption {
                        source_name: src.name.clone(),
                        line: idx + 1,
                        reason: format!("no '{FIELD_DELIMITER}' delimiter in '{line}'"),
                    });
                }
            }
        }
        let trailing = line.split(FIELD_DELIMITER).count().saturating_sub(prefix_len);
        width = Some(width.map_or(trailing, |w| w.max(trailing)));
        qualifying.push(idx);
    }

    let width = width.ok_or_else(|| UnifyError::DegenerateInput {
        source_name: src.name.clone(),
        reason: "no delimited lines to infer the trailing width from".to_string(),
    })?;

    // Pass 2: materialize.
    let mut records = Vec::with_capacity(qualifying.len());
    for idx in qualifying {
        let pos = src.pos(idx);
        let fields: Vec<&str> = src.lines[idx].trim().split(FIELD_DELIMITER).collect();
        if fields.len() < prefix_len {
            return Err(UnifyError::MissingField {
                source_name: src.name.clone(),
                line: pos.line,
                field: layout.prefix[fields.len()].0.to_string(),
            });
        }

        let prefix = layout
            .prefix
            .iter()
            .zip(&fields)
            .map(|(&(_, dtype), tok)| coerce_as(tok, dtype, pos))
            .collect::<UnifyResult<Vec<_>>>()?;

        let mut trailing = fields[prefix_len..]
            .iter()
            .map(|tok| coerce_real(tok, pos).map(ScalarValue::from))
            .collect::<UnifyResult<Vec<_>>>()?;
        trailing.resize(width, ScalarValue::Null);

        records.push(VariableWidthRecord { prefix, trailing });
    }

    log::info!(
        "{}: {} records, trailing width {}, {} lines skipped",
        src.name,
        records.len(),
        width,
        skipped_lines.len()
    );

    Ok(VariableWidthData {
        layout,
        width,
        records,
        skipped_lines,
    })
}

impl VariableWidthData {
    /// Prefix columns in declared order, then `{stem}_1..{stem}_width`.
    pub fn into_table(self) -> UnifyResult<Table> {
        let n = self.records.len();
        let mut prefix_cols: Vec<Vec<ScalarValue>> =
            vec![Vec::with_capacity(n); self.layout.prefix.len()];
        let mut trailing_cols: Vec<Vec<ScalarValue>> = vec![Vec::with_capacity(n); self.width];

        for rec in self.records {
            for (col, value) in prefix_cols.iter_mut().zip(rec.prefix) {
                col.push(value);
            }
            for (col, value) in trailing_cols.iter_mut().zip(rec.trailing) {
                col.push(value);
            }
        }

        let mut columns: Vec<Column> = self
            .layout
            .prefix
            .iter()
            .zip(prefix_cols)
            .map(|(&(name, dtype), values)| Column::new(name, dtype, values))
            .collect();
        columns.extend(trailing_cols.into_iter().enumerate().map(|(i, values)| {
            Column::new(
                format!("{}_{}", self.layout.trailing_stem, i + 1),
                ColumnType::Float64,
                values,
            )
        }));

        Table::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, layout: RecordLayout) -> UnifyResult<VariableWidthData> {
        parse_variable_width(
            &SourceLines::from_text("data.txt", text),
            layout,
            MalformedLinePolicy::Skip,
        )
    }

    #[test]
    fn album_rows_are_padded_to_max_width() {
        let data = parse("10|5|1.0|2.0\n11|6|3.0\n", ALBUM_LAYOUT).unwrap();
        assert_eq!(data.width, 2);
        assert_eq!(data.records.len(), 2);
        assert!(data.records.iter().all(|r| r.trailing.len() == 2));
        assert_eq!(data.records[1].trailing[1], ScalarValue::Null);

        let table = data.into_table().unwrap();
        assert_eq!(
            table.column_names(),
            vec!["AlbumID", "ArtistID", "Genre_1", "Genre_2"]
        );
        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.row(0),
            vec![
                &ScalarValue::Integer(10),
                &ScalarValue::Real(5.0),
                &ScalarValue::Real(1.0),
                &ScalarValue::Real(2.0)
            ]
        );
        assert!(table.column("Genre_2").unwrap().values[1].is_null());
    }

    #[test]
    fn width_is_max_over_all_lines_not_first() {
        let data = parse("1|2|3\n4|5|6|7|8\n9|10\n", ALBUM_LAYOUT).unwrap();
        assert_eq!(data.width, 3);
        let lens: Vec<usize> = data.records.iter().map(|r| r.trailing.len()).collect();
        assert_eq!(lens, vec![3, 3, 3]);
    }

    #[test]
    fn track_prefix_has_three_columns() {
        let data = parse("1|None|7|12\n2|3|None\n", TRACK_LAYOUT).unwrap();
        assert_eq!(data.width, 1);
        assert_eq!(
            data.records[0].prefix,
            vec![ScalarValue::Integer(1), ScalarValue::Null, ScalarValue::Real(7.0)]
        );
        assert_eq!(data.records[1].trailing, vec![ScalarValue::Null]);
        let table = data.into_table().unwrap();
        assert_eq!(
            table.column_names(),
            vec!["TrackID", "AlbumID", "ArtistID", "Genre_1"]
        );
    }

    #[test]
    fn sentinel_in_trailing_run_is_null() {
        let data = parse("1|2|None|4\n", ALBUM_LAYOUT).unwrap();
        assert_eq!(
            data.records[0].trailing,
            vec![ScalarValue::Null, ScalarValue::Real(4.0)]
        );
    }

    #[test]
    fn lines_without_delimiter_are_skipped_and_reported() {
        let data = parse("10|5|1\ngarbage\n\n11|6\n", ALBUM_LAYOUT).unwrap();
        assert_eq!(data.records.len(), 2);
        assert_eq!(data.skipped_lines, vec![2]);
        assert_eq!(data.width, 1);
    }

    #[test]
    fn reject_policy_fails_on_undelimited_line() {
        let err = parse_variable_width(
            &SourceLines::from_text("data.txt", "10|5|1\n42\n"),
            ALBUM_LAYOUT,
            MalformedLinePolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, UnifyError::StructuralCorruption { line: 2, .. }));
    }

    #[test]
    fn empty_input_is_degenerate() {
        assert!(matches!(
            parse("", ALBUM_LAYOUT).unwrap_err(),
            UnifyError::DegenerateInput { .. }
        ));
        assert!(matches!(
            parse("1\n2\n", ALBUM_LAYOUT).unwrap_err(),
            UnifyError::DegenerateInput { .. }
        ));
    }

    #[test]
    fn zero_width_when_no_trailing_fields() {
        let data = parse("1|2\n3|4\n", ALBUM_LAYOUT).unwrap();
        assert_eq!(data.width, 0);
        let table = data.into_table().unwrap();
        assert_eq!(table.column_names(), vec!["AlbumID", "ArtistID"]);
    }

    #[test]
    fn bad_prefix_token_is_format_error() {
        let err = parse("x|5|1.0\n", ALBUM_LAYOUT).unwrap_err();
        assert!(matches!(
            err,
            UnifyError::Format { line: 1, expected: "integer", .. }
        ));
    }

    #[test]
    fn bad_genre_token_is_format_error() {
        let err = parse("1|5|1.0\n2|5|abc\n", ALBUM_LAYOUT).unwrap_err();
        assert!(matches!(err, UnifyError::Format { line: 2, expected: "real", .. }));
    }

    #[test]
    fn short_track_prefix_is_missing_field() {
        let err = parse("1|2\n", TRACK_LAYOUT).unwrap_err();
        match err {
            UnifyError::MissingField { field, line, .. } => {
                assert_eq!(field, "ArtistID");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
