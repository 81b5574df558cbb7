//! Dataset-specific loaders built on the generic parsers.

use std::path::Path;

use crate::error::UnifyResult;

use super::classify::IdentifierSets;
use super::grouped::{parse_grouped, RatedItem, TrackItem};
use super::lines::SourceLines;
use super::model::{
    ClassifiedInteraction, Column, ColumnType, GroupedBlock, ScalarValue, Table,
};
use super::scalar::require_integer;
use super::variable_width::{
    parse_variable_width, MalformedLinePolicy, VariableWidthData, ALBUM_LAYOUT, TRACK_LAYOUT,
};

// ---------------------------------------------------------------------------
// Identifier lists (artists, genres)
// ---------------------------------------------------------------------------

/// One integer per line; blank lines are ignored.
pub fn parse_id_list(src: &SourceLines) -> UnifyResult<Vec<i64>> {
    src.lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| require_integer(line, src.pos(idx)))
        .collect()
}

pub fn load_id_list(path: &Path) -> UnifyResult<Vec<i64>> {
    let src = SourceLines::read(path)?;
    let ids = parse_id_list(&src)?;
    log::info!("{}: {} identifiers", src.name, ids.len());
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Albums and tracks
// ---------------------------------------------------------------------------

pub fn load_albums(path: &Path, policy: MalformedLinePolicy) -> UnifyResult<VariableWidthData> {
    parse_variable_width(&SourceLines::read(path)?, ALBUM_LAYOUT, policy)
}

pub fn load_tracks(path: &Path, policy: MalformedLinePolicy) -> UnifyResult<VariableWidthData> {
    parse_variable_width(&SourceLines::read(path)?, TRACK_LAYOUT, policy)
}

// ---------------------------------------------------------------------------
// Test listens
// ---------------------------------------------------------------------------

/// `UserID`, `TrackID`; one row per item in block order.
pub fn test_table(blocks: &[GroupedBlock<TrackItem>]) -> UnifyResult<Table> {
    let mut users = Vec::new();
    let mut tracks = Vec::new();
    for block in blocks {
        for item in &block.items {
            users.push(ScalarValue::Integer(block.subject));
            tracks.push(ScalarValue::Integer(item.track_id));
        }
    }
    Table::new(vec![
        Column::new("UserID", ColumnType::Int64, users),
        Column::new("TrackID", ColumnType::Int64, tracks),
    ])
}

pub fn load_test_table(path: &Path) -> UnifyResult<Table> {
    let src = SourceLines::read(path)?;
    let blocks = parse_grouped::<TrackItem>(&src)?;
    let table = test_table(&blocks)?;
    log::info!(
        "{}: {} users, {} test rows",
        src.name,
        blocks.len(),
        table.num_rows()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Training ratings
// ---------------------------------------------------------------------------

pub fn classify_blocks(
    blocks: &[GroupedBlock<RatedItem>],
    sets: &IdentifierSets,
) -> Vec<ClassifiedInteraction> {
    blocks
        .iter()
        .flat_map(|block| {
            block.items.iter().map(move |item| ClassifiedInteraction {
                user_id: block.subject,
                item_id: item.item_id,
                item_type: sets.classify(item.item_id),
                rating: item.rating,
            })
        })
        .collect()
}

/// `UserID`, `ItemID`, `ItemType`, `Rating`.
pub fn training_table(rows: &[ClassifiedInteraction]) -> UnifyResult<Table> {
    Table::new(vec![
        Column::new(
            "UserID",
            ColumnType::Int64,
            rows.iter().map(|r| ScalarValue::Integer(r.user_id)).collect(),
        ),
        Column::new(
            "ItemID",
            ColumnType::Int64,
            rows.iter().map(|r| ScalarValue::Integer(r.item_id)).collect(),
        ),
        Column::new(
            "ItemType",
            ColumnType::Utf8,
            rows.iter()
                .map(|r| ScalarValue::Text(r.item_type.as_str().to_string()))
                .collect(),
        ),
        Column::new(
            "Rating",
            ColumnType::Int64,
            rows.iter().map(|r| ScalarValue::from(r.rating)).collect(),
        ),
    ])
}

pub fn load_training_table(path: &Path, sets: &IdentifierSets) -> UnifyResult<Table> {
    let src = SourceLines::read(path)?;
    let blocks = parse_grouped::<RatedItem>(&src)?;
    let rows = classify_blocks(&blocks, sets);
    log::info!(
        "{}: {} users, {} ratings",
        src.name,
        blocks.len(),
        rows.len()
    );
    training_table(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ItemType;
    use crate::error::UnifyError;

    #[test]
    fn id_list_skips_blank_lines() {
        let src = SourceLines::from_text("artists.txt", "1\n\n 2 \n3\n");
        assert_eq!(parse_id_list(&src).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn id_list_rejects_non_integer() {
        let src = SourceLines::from_text("genres.txt", "1\nrock\n");
        assert!(matches!(
            parse_id_list(&src).unwrap_err(),
            UnifyError::Format { line: 2, .. }
        ));
    }

    #[test]
    fn training_rows_are_classified() {
        let src = SourceLines::from_text("train.txt", "1|2\n100\t5\n200\t3\n");
        let blocks = parse_grouped::<RatedItem>(&src).unwrap();
        let sets = IdentifierSets::new([100], Vec::new(), Vec::new());
        let rows = classify_blocks(&blocks, &sets);
        assert_eq!(
            rows,
            vec![
                ClassifiedInteraction {
                    user_id: 1,
                    item_id: 100,
                    item_type: ItemType::Artist,
                    rating: Some(5),
                },
                ClassifiedInteraction {
                    user_id: 1,
                    item_id: 200,
                    item_type: ItemType::Track,
                    rating: Some(3),
                },
            ]
        );

        let table = training_table(&rows).unwrap();
        assert_eq!(
            table.column_names(),
            vec!["UserID", "ItemID", "ItemType", "Rating"]
        );
        assert_eq!(
            table.row(1),
            vec![
                &ScalarValue::Integer(1),
                &ScalarValue::Integer(200),
                &ScalarValue::Text("Track".into()),
                &ScalarValue::Integer(3),
            ]
        );
    }

    #[test]
    fn test_rows_interleave_per_user_in_block_order() {
        let src = SourceLines::from_text("test.txt", "7|2\n11\n12\n3|1\n13\n");
        let blocks = parse_grouped::<TrackItem>(&src).unwrap();
        let table = test_table(&blocks).unwrap();
        let ints = |name: &str| -> Vec<i64> {
            table.column(name).unwrap().values.iter().filter_map(|v| v.as_i64()).collect()
        };
        assert_eq!(ints("UserID"), vec![7, 7, 3]);
        assert_eq!(ints("TrackID"), vec![11, 12, 13]);
    }
}
