//! Normalizes the pipe/tab-delimited music catalog dumps (albums, tracks,
//! artists, genres, training ratings, test listens) into uniform tables.

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;

pub use config::UnifierConfig;
pub use error::{UnifyError, UnifyResult};
pub use pipeline::{run_pipeline, PipelineSummary, TableOutcome};
