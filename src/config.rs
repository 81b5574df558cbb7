use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::emit::OutputFormat;
use crate::data::variable_width::MalformedLinePolicy;

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Input artifacts and output settings for one unifier run.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// overrides. Relative input paths are resolved against `input_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifierConfig {
    pub input_dir: PathBuf,
    pub albums: PathBuf,
    pub tracks: PathBuf,
    pub artists: PathBuf,
    pub genres: PathBuf,
    pub train: PathBuf,
    pub test: PathBuf,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub malformed_lines: MalformedLinePolicy,
}

impl Default for UnifierConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            albums: PathBuf::from("albumData2.txt"),
            tracks: PathBuf::from("trackData2.txt"),
            artists: PathBuf::from("artistData2.txt"),
            genres: PathBuf::from("genreData2.txt"),
            train: PathBuf::from("trainItem2.txt"),
            test: PathBuf::from("testItem2.txt"),
            output_dir: PathBuf::from("."),
            format: OutputFormat::Csv,
            malformed_lines: MalformedLinePolicy::Skip,
        }
    }
}

/// Output file stems, one per emitted table.
pub const ALBUM_TABLE: &str = "album_table";
pub const TRACK_TABLE: &str = "track_table";
pub const TRAINING_TABLE: &str = "training_table";
pub const TESTING_TABLE: &str = "testing_table";

impl UnifierConfig {
    /// Load overrides from a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Input path joined onto `input_dir` unless already absolute.
    pub fn input(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.input_dir.join(file)
        }
    }

    pub fn output(&self, stem: &str) -> PathBuf {
        self.output_dir
            .join(format!("{stem}.{}", self.format.extension()))
    }
}
