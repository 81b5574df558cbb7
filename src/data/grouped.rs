//! Decoder for `subject|count` headers each followed by `count` item lines.
//!
//! There is no record terminator, so a count that disagrees with the data
//! corrupts everything after it. Any mismatch fails the whole artifact.

use crate::error::{UnifyError, UnifyResult};

use super::lines::{SourceLines, SourcePos};
use super::model::GroupedBlock;
use super::scalar::{coerce_integer, require_integer};

pub const HEADER_DELIMITER: char = '|';
pub const ITEM_DELIMITER: char = '\t';

/// One item line inside a block.
pub trait BlockItem: Sized {
    fn decode(line: &str, pos: SourcePos<'_>) -> UnifyResult<Self>;
}

/// Test data item: a single track id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackItem {
    pub track_id: i64,
}

impl BlockItem for TrackItem {
    fn decode(line: &str, pos: SourcePos<'_>) -> UnifyResult<Self> {
        Ok(TrackItem {
            track_id: require_integer(line, pos)?,
        })
    }
}

/// Training data item: `ItemID<TAB>Rating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatedItem {
    pub item_id: i64,
    pub rating: Option<i64>,
}

impl BlockItem for RatedItem {
    fn decode(line: &str, pos: SourcePos<'_>) -> UnifyResult<Self> {
        let mut fields = line.trim().split(ITEM_DELIMITER);
        let item_id = require_integer(fields.next().unwrap_or(""), pos)?;
        let rating = fields.next().ok_or_else(|| UnifyError::MissingField {
            source_name: pos.source_name.to_string(),
            line: pos.line,
            field: "Rating".to_string(),
        })?;
        Ok(RatedItem {
            item_id,
            rating: coerce_integer(rating, pos)?,
        })
    }
}

fn corruption(src: &SourceLines, idx: usize, reason: String) -> UnifyError {
    UnifyError::StructuralCorruption {
        source_name: src.name.clone(),
        line: idx + 1,
        reason,
    }
}

fn parse_header(src: &SourceLines, idx: usize) -> UnifyResult<(i64, usize)> {
    let line = src.lines[idx].trim();
    let fields: Vec<&str> = line.split(HEADER_DELIMITER).collect();
    let [subject, count] = fields.as_slice() else {
        return Err(corruption(
            src,
            idx,
            format!("expected 'subject{HEADER_DELIMITER}count' header, found '{line}'"),
        ));
    };
    let subject = subject
        .trim()
        .parse::<i64>()
        .map_err(|_| corruption(src, idx, format!("non-numeric subject in header '{line}'")))?;
    let count = count
        .trim()
        .parse::<usize>()
        .map_err(|_| corruption(src, idx, format!("invalid item count in header '{line}'")))?;
    Ok((subject, count))
}

/// Walk the artifact block by block. The cursor only moves forward and must
/// land on a header after each block.
pub fn parse_grouped<T: BlockItem>(src: &SourceLines) -> UnifyResult<Vec<GroupedBlock<T>>> {
    let lines = &src.lines;
    let mut blocks = Vec::new();
    let mut cursor = 0;
    // Trailing blank lines are tolerated but never count as item lines.
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(0, |idx| idx + 1);

    while cursor < end {
        if lines[cursor].trim().is_empty() {
            return Err(corruption(
                src,
                cursor,
                "blank line where a block header was expected".to_string(),
            ));
        }

        let header_idx = cursor;
        let (subject, declared) = parse_header(src, header_idx)?;
        cursor += 1;

        let available = end - cursor;
        if declared > available {
            return Err(corruption(
                src,
                header_idx,
                format!(
                    "header declares {declared} items for subject {subject} but only {available} lines remain"
                ),
            ));
        }

        let items = (cursor..cursor + declared)
            .map(|idx| T::decode(&lines[idx], src.pos(idx)))
            .collect::<UnifyResult<Vec<_>>>()?;
        cursor += declared;

        blocks.push(GroupedBlock {
            subject,
            declared,
            items,
        });
    }

    log::debug!("{}: {} blocks", src.name, blocks.len());
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(text: &str) -> SourceLines {
        SourceLines::from_text("items.txt", text)
    }

    #[test]
    fn header_count_consumes_exactly_that_many_items() {
        let blocks = parse_grouped::<TrackItem>(&src("7|3\n1\n2\n3\n8|1\n4\n")).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].subject, 7);
        assert_eq!(blocks[0].items.len(), 3);
        assert_eq!(blocks[1].subject, 8);
        assert_eq!(blocks[1].items, vec![TrackItem { track_id: 4 }]);
    }

    #[test]
    fn count_beyond_remaining_lines_is_corruption() {
        let err = parse_grouped::<TrackItem>(&src("7|3\n1\n2\n")).unwrap_err();
        assert!(matches!(err, UnifyError::StructuralCorruption { line: 1, .. }));
    }

    #[test]
    fn undercounted_header_misaligns_and_fails() {
        // Header claims one item, so the second track id is read as a header.
        let err = parse_grouped::<TrackItem>(&src("7|1\n1\n2\n")).unwrap_err();
        assert!(matches!(err, UnifyError::StructuralCorruption { line: 3, .. }));
    }

    #[test]
    fn non_numeric_header_is_corruption() {
        let err = parse_grouped::<TrackItem>(&src("abc|2\n1\n2\n")).unwrap_err();
        assert!(matches!(err, UnifyError::StructuralCorruption { line: 1, .. }));
        let err = parse_grouped::<TrackItem>(&src("7|-1\n")).unwrap_err();
        assert!(matches!(err, UnifyError::StructuralCorruption { .. }));
    }

    #[test]
    fn zero_count_block_is_valid() {
        let blocks = parse_grouped::<TrackItem>(&src("5|0\n6|1\n9\n")).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].items.is_empty());
    }

    #[test]
    fn trailing_blank_lines_are_tolerated() {
        let blocks = parse_grouped::<TrackItem>(&src("1|1\n5\n\n\n")).unwrap();
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn trailing_blank_lines_do_not_satisfy_a_count() {
        let err = parse_grouped::<TrackItem>(&src("1|2\n5\n\n")).unwrap_err();
        assert!(
            matches!(err, UnifyError::StructuralCorruption { line: 1, .. }),
            "{err:?}"
        );
    }

    #[test]
    fn blank_line_between_blocks_is_corruption() {
        let err = parse_grouped::<TrackItem>(&src("1|1\n5\n\n2|1\n6\n")).unwrap_err();
        assert!(matches!(err, UnifyError::StructuralCorruption { line: 3, .. }));
    }

    #[test]
    fn rated_items_split_on_tab() {
        let blocks = parse_grouped::<RatedItem>(&src("1|2\n100\t5\n200\tNone\n")).unwrap();
        assert_eq!(
            blocks[0].items,
            vec![
                RatedItem { item_id: 100, rating: Some(5) },
                RatedItem { item_id: 200, rating: None },
            ]
        );
    }

    #[test]
    fn rated_item_without_rating_is_missing_field() {
        let err = parse_grouped::<RatedItem>(&src("1|1\n100\n")).unwrap_err();
        assert!(matches!(err, UnifyError::MissingField { line: 2, .. }));
    }

    #[test]
    fn bad_item_token_is_format_error() {
        let err = parse_grouped::<TrackItem>(&src("1|1\nxyz\n")).unwrap_err();
        assert!(matches!(err, UnifyError::Format { line: 2, .. }));
    }

    #[test]
    fn empty_artifact_yields_no_blocks() {
        assert!(parse_grouped::<TrackItem>(&src("")).unwrap().is_empty());
    }
}
