use std::path::Path;

use catalog_unifier::data::emit::OutputFormat;
use catalog_unifier::data::loader::load_table;
use catalog_unifier::data::model::ScalarValue;
use catalog_unifier::data::variable_width::MalformedLinePolicy;
use catalog_unifier::{run_pipeline, TableOutcome, UnifierConfig};

fn write_catalog(dir: &Path) {
    let files = [
        ("albumData2.txt", "10|5|1.0|2.0\n11|6|3.0\n"),
        ("trackData2.txt", "1|10|5|1.0|2.0|3.0\r\n2|None|6\r\n3|11|None|None\r\n"),
        ("artistData2.txt", "5\n6\n100\n"),
        ("genreData2.txt", "1\n2\n3\n"),
        ("trainItem2.txt", "1|2\n100\t5\n200\t3\n2|3\n3\t90\n11\t70\n6\t50\n"),
        ("testItem2.txt", "1|3\n1\n2\n3\n2|1\n3\n"),
    ];
    for (name, body) in files {
        std::fs::write(dir.join(name), body).unwrap();
    }
}

fn config(dir: &Path, format: OutputFormat) -> UnifierConfig {
    UnifierConfig {
        input_dir: dir.to_path_buf(),
        output_dir: dir.join("tables"),
        format,
        ..Default::default()
    }
}

#[test]
fn album_table_matches_inferred_width() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    let summary = run_pipeline(&config(dir.path(), OutputFormat::Csv)).unwrap();
    assert!(summary.all_written(), "{summary}");

    let album_csv = std::fs::read_to_string(dir.path().join("tables/album_table.csv")).unwrap();
    assert_eq!(
        album_csv,
        "AlbumID,ArtistID,Genre_1,Genre_2\n10,5.0,1.0,2.0\n11,6.0,3.0,\n"
    );

    let tracks = load_table(&dir.path().join("tables/track_table.csv")).unwrap();
    assert_eq!(
        tracks.column_names(),
        vec!["TrackID", "AlbumID", "ArtistID", "Genre_1", "Genre_2", "Genre_3"]
    );
    assert!(tracks.column("AlbumID").unwrap().values[1].is_null());
    assert!(tracks.column("Genre_1").unwrap().values[2].is_null());
}

#[test]
fn training_rows_follow_classification_precedence() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    run_pipeline(&config(dir.path(), OutputFormat::Csv)).unwrap();

    let training = load_table(&dir.path().join("tables/training_table.csv")).unwrap();
    let types: Vec<String> = training
        .column("ItemType")
        .unwrap()
        .values
        .iter()
        .map(|v| v.to_string())
        .collect();
    assert_eq!(types, vec!["Artist", "Track", "Genre", "Album", "Artist"]);
    assert_eq!(
        training.column("UserID").unwrap().values,
        [1, 1, 2, 2, 2].map(ScalarValue::Integer).to_vec()
    );

    let testing = load_table(&dir.path().join("tables/testing_table.csv")).unwrap();
    assert_eq!(testing.num_rows(), 4);
}

#[test]
fn every_format_round_trips_rows_and_columns() {
    for format in [OutputFormat::Csv, OutputFormat::Json, OutputFormat::Parquet] {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path());
        let summary = run_pipeline(&config(dir.path(), format)).unwrap();

        for report in &summary.tables {
            let TableOutcome::Written { path, rows, columns, .. } = &report.outcome else {
                panic!("{} not written: {:?}", report.table, report.outcome);
            };
            let back = load_table(path).unwrap();
            assert_eq!(back.num_rows(), *rows, "{format:?} {}", report.table);
            assert_eq!(back.num_columns(), *columns, "{format:?} {}", report.table);
        }

        // A test file whose only block is empty yields a zero-row table.
        std::fs::write(dir.path().join("testItem2.txt"), "1|0\n").unwrap();
        let summary = run_pipeline(&config(dir.path(), format)).unwrap();
        let Some(TableOutcome::Written { path, rows: 0, columns: 2, .. }) =
            summary.get("testing_table")
        else {
            panic!("{format:?}: {:?}", summary.get("testing_table"));
        };
        let back = load_table(path).unwrap();
        assert_eq!(back.num_rows(), 0, "{format:?}");
        assert_eq!(back.column_names(), vec!["UserID", "TrackID"], "{format:?}");
    }
}

#[test]
fn csv_output_is_byte_identical_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    let cfg = config(dir.path(), OutputFormat::Csv);

    run_pipeline(&cfg).unwrap();
    let first = std::fs::read(dir.path().join("tables/training_table.csv")).unwrap();
    run_pipeline(&cfg).unwrap();
    let second = std::fs::read(dir.path().join("tables/training_table.csv")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn reject_policy_fails_only_the_malformed_artifact() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    std::fs::write(dir.path().join("trackData2.txt"), "1|10|5|1.0\nbroken\n").unwrap();

    let cfg = UnifierConfig {
        malformed_lines: MalformedLinePolicy::Reject,
        ..config(dir.path(), OutputFormat::Csv)
    };
    let summary = run_pipeline(&cfg).unwrap();
    assert!(matches!(summary.get("track_table"), Some(TableOutcome::Failed(msg)) if msg.contains("structural corruption")));
    assert!(matches!(summary.get("album_table"), Some(TableOutcome::Written { .. })));
    assert!(matches!(summary.get("training_table"), Some(TableOutcome::Written { .. })));

    let skip = run_pipeline(&config(dir.path(), OutputFormat::Csv)).unwrap();
    match skip.get("track_table") {
        Some(TableOutcome::Written { rows, .. }) => assert_eq!(*rows, 1),
        other => panic!("unexpected track outcome {other:?}"),
    }
}
