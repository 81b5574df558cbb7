use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::config::{UnifierConfig, ALBUM_TABLE, TESTING_TABLE, TRACK_TABLE, TRAINING_TABLE};
use crate::data::classify::IdentifierSets;
use crate::data::datasets::{
    load_albums, load_id_list, load_test_table, load_tracks, load_training_table,
};
use crate::data::emit::write_table;
use crate::data::model::Table;

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TableOutcome {
    Written {
        path: PathBuf,
        rows: usize,
        columns: usize,
        /// Trailing genre width for variable-width tables.
        width: Option<usize>,
    },
    Failed(String),
    /// Not attempted because an input it depends on failed.
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableReport {
    pub table: &'static str,
    pub outcome: TableOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSummary {
    pub tables: Vec<TableReport>,
}

impl PipelineSummary {
    pub fn all_written(&self) -> bool {
        self.tables
            .iter()
            .all(|t| matches!(t.outcome, TableOutcome::Written { .. }))
    }

    pub fn get(&self, table: &str) -> Option<&TableOutcome> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map(|t| &t.outcome)
    }

    fn push(&mut self, table: &'static str, outcome: TableOutcome) {
        self.tables.push(TableReport { table, outcome });
    }
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.tables {
            match &report.outcome {
                TableOutcome::Written {
                    path,
                    rows,
                    columns,
                    width,
                } => {
                    write!(f, "{:<15} {rows:>9} rows x {columns} cols", report.table)?;
                    if let Some(w) = width {
                        write!(f, " (genre width {w})")?;
                    }
                    writeln!(f, " -> {}", path.display())?;
                }
                TableOutcome::Failed(err) => writeln!(f, "{:<15} FAILED: {err}", report.table)?,
                TableOutcome::Skipped(why) => writeln!(f, "{:<15} skipped: {why}", report.table)?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

fn emit(
    config: &UnifierConfig,
    stem: &'static str,
    table: &Table,
    width: Option<usize>,
) -> Result<TableOutcome> {
    let path = config.output(stem);
    write_table(table, &path, config.format)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(TableOutcome::Written {
        path,
        rows: table.num_rows(),
        columns: table.num_columns(),
        width,
    })
}

/// Log the full error chain and turn it into a report outcome.
fn failed(stem: &str, err: anyhow::Error) -> TableOutcome {
    log::error!("{stem}: {err:#}");
    TableOutcome::Failed(format!("{err:#}"))
}

/// Load every artifact named in `config` and write the four tables.
///
/// A failing artifact does not stop the others. The training table needs
/// the artist, genre and album inputs and is skipped when any of them failed.
pub fn run_pipeline(config: &UnifierConfig) -> Result<PipelineSummary> {
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output directory {}", config.output_dir.display()))?;
    let mut summary = PipelineSummary::default();

    let artists = load_id_list(&config.input(&config.artists)).context("loading artist list");
    let genres = load_id_list(&config.input(&config.genres)).context("loading genre list");

    // Albums
    let albums = load_albums(&config.input(&config.albums), config.malformed_lines)
        .context("loading album data")
        .and_then(|data| {
            let width = data.width;
            Ok((data.into_table()?, width))
        });
    let albums = match albums {
        Ok((table, width)) => {
            let outcome = emit(config, ALBUM_TABLE, &table, Some(width))
                .unwrap_or_else(|err| failed(ALBUM_TABLE, err));
            summary.push(ALBUM_TABLE, outcome);
            // Album ids stay usable for classification even if the write failed.
            Some(table)
        }
        Err(err) => {
            summary.push(ALBUM_TABLE, failed(ALBUM_TABLE, err));
            None
        }
    };

    // Tracks
    let tracks = load_tracks(&config.input(&config.tracks), config.malformed_lines)
        .context("loading track data")
        .and_then(|data| {
            let width = data.width;
            let table = data.into_table()?;
            emit(config, TRACK_TABLE, &table, Some(width))
        });
    summary.push(
        TRACK_TABLE,
        tracks.unwrap_or_else(|err| failed(TRACK_TABLE, err)),
    );

    // Training
    let training = match (&artists, &genres, &albums) {
        (Ok(artists), Ok(genres), Some(albums)) => {
            let sets = IdentifierSets::from_album_table(artists, genres, albums);
            let (a, g, al) = sets.sizes();
            log::info!("identifier sets: {a} artists, {g} genres, {al} albums");
            sets.warn_on_overlap();
            load_training_table(&config.input(&config.train), &sets)
                .context("loading training data")
                .and_then(|table| emit(config, TRAINING_TABLE, &table, None))
                .unwrap_or_else(|err| failed(TRAINING_TABLE, err))
        }
        _ => {
            let mut missing = Vec::new();
            if let Err(err) = &artists {
                log::error!("{err:#}");
                missing.push("artist list");
            }
            if let Err(err) = &genres {
                log::error!("{err:#}");
                missing.push("genre list");
            }
            if albums.is_none() {
                missing.push("album data");
            }
            let why = format!("unavailable input: {}", missing.join(", "));
            log::warn!("{TRAINING_TABLE} skipped, {why}");
            TableOutcome::Skipped(why)
        }
    };
    summary.push(TRAINING_TABLE, training);

    // Test
    let test = load_test_table(&config.input(&config.test))
        .context("loading test data")
        .and_then(|table| emit(config, TESTING_TABLE, &table, None));
    summary.push(
        TESTING_TABLE,
        test.unwrap_or_else(|err| failed(TESTING_TABLE, err)),
    );

    Ok(summary)
}

/// Fail with every table that was not written.
pub fn ensure_complete(summary: &PipelineSummary) -> Result<()> {
    if summary.all_written() {
        return Ok(());
    }
    let broken: Vec<&str> = summary
        .tables
        .iter()
        .filter(|t| !matches!(t.outcome, TableOutcome::Written { .. }))
        .map(|t| t.table)
        .collect();
    Err(anyhow!("tables not written: {}", broken.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_inputs(dir: &std::path::Path) {
        std::fs::write(dir.join("albumData2.txt"), "10|5|1.0|2.0\n11|6|3.0\n").unwrap();
        std::fs::write(dir.join("trackData2.txt"), "1|10|5|1.0\n2|None|6\n").unwrap();
        std::fs::write(dir.join("artistData2.txt"), "5\n100\n").unwrap();
        std::fs::write(dir.join("genreData2.txt"), "1\n2\n").unwrap();
        std::fs::write(dir.join("trainItem2.txt"), "1|3\n100\t5\n10\t4\n200\t3\n").unwrap();
        std::fs::write(dir.join("testItem2.txt"), "1|2\n1\n2\n").unwrap();
    }

    fn config_for(dir: &std::path::Path) -> UnifierConfig {
        UnifierConfig {
            input_dir: dir.to_path_buf(),
            output_dir: dir.join("out"),
            ..Default::default()
        }
    }

    #[test]
    fn writes_all_four_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        let summary = run_pipeline(&config_for(dir.path())).unwrap();
        assert!(summary.all_written(), "{summary}");
        assert!(ensure_complete(&summary).is_ok());

        match summary.get(ALBUM_TABLE) {
            Some(TableOutcome::Written { rows, width, .. }) => {
                assert_eq!(*rows, 2);
                assert_eq!(*width, Some(2));
            }
            other => panic!("unexpected album outcome {other:?}"),
        }

        let training =
            std::fs::read_to_string(dir.path().join("out/training_table.csv")).unwrap();
        assert_eq!(
            training,
            "UserID,ItemID,ItemType,Rating\n1,100,Artist,5\n1,10,Album,4\n1,200,Track,3\n"
        );
    }

    #[test]
    fn failing_artifact_does_not_stop_independent_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        std::fs::write(dir.path().join("testItem2.txt"), "1|5\n1\n").unwrap();
        std::fs::remove_file(dir.path().join("genreData2.txt")).unwrap();

        let summary = run_pipeline(&config_for(dir.path())).unwrap();
        assert!(matches!(summary.get(TESTING_TABLE), Some(TableOutcome::Failed(_))));
        assert!(matches!(summary.get(TRAINING_TABLE), Some(TableOutcome::Skipped(_))));
        assert!(matches!(summary.get(ALBUM_TABLE), Some(TableOutcome::Written { .. })));
        assert!(matches!(summary.get(TRACK_TABLE), Some(TableOutcome::Written { .. })));
        assert!(ensure_complete(&summary).is_err());
    }
}
