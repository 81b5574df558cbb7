use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use catalog_unifier::data::aggregate::{aggregate_files, DEFAULT_KEY, DEFAULT_VALUE};
use catalog_unifier::data::compare::compare_files;
use catalog_unifier::data::emit::{to_record_batch, OutputFormat};
use catalog_unifier::data::model::Table;
use catalog_unifier::data::variable_width::MalformedLinePolicy;
use catalog_unifier::pipeline::{ensure_complete, run_pipeline};
use catalog_unifier::UnifierConfig;

#[derive(Parser, Debug)]
#[command(name = "catalog-unifier")]
#[command(about = "Normalize music catalog and rating dumps into uniform tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse every source artifact and write the album, track, training and testing tables
    Unify(UnifyArgs),
    /// Split the rows of FIRST into those also present in SECOND and those that are not
    Compare { first: PathBuf, second: PathBuf },
    /// Outer-join two prediction tables and fill missing predictions from the fallback
    Aggregate {
        primary: PathBuf,
        fallback: PathBuf,
        #[arg(short, long, default_value = "merged_output.csv")]
        output: PathBuf,
        #[arg(long, default_value = DEFAULT_KEY)]
        key: String,
        #[arg(long, default_value = DEFAULT_VALUE)]
        value: String,
    },
}

#[derive(Args, Debug)]
struct UnifyArgs {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory relative input paths are resolved against
    #[arg(long)]
    input_dir: Option<PathBuf>,
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    albums: Option<PathBuf>,
    #[arg(long)]
    tracks: Option<PathBuf>,
    #[arg(long)]
    artists: Option<PathBuf>,
    #[arg(long)]
    genres: Option<PathBuf>,
    #[arg(long)]
    train: Option<PathBuf>,
    #[arg(long)]
    test: Option<PathBuf>,
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
    /// Fail on album/track lines without a '|' instead of skipping them
    #[arg(long)]
    reject_malformed: bool,
}

impl UnifyArgs {
    fn into_config(self) -> Result<UnifierConfig> {
        let mut config = match &self.config {
            Some(path) => UnifierConfig::from_json_file(path)?,
            None => UnifierConfig::default(),
        };
        let overrides = [
            (self.input_dir, &mut config.input_dir),
            (self.output_dir, &mut config.output_dir),
            (self.albums, &mut config.albums),
            (self.tracks, &mut config.tracks),
            (self.artists, &mut config.artists),
            (self.genres, &mut config.genres),
            (self.train, &mut config.train),
            (self.test, &mut config.test),
        ];
        for (flag, slot) in overrides {
            if let Some(path) = flag {
                *slot = path;
            }
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.reject_malformed {
            config.malformed_lines = MalformedLinePolicy::Reject;
        }
        Ok(config)
    }
}

fn print_table(title: &str, table: &Table) -> Result<()> {
    let batch = to_record_batch(table)?;
    let rendered = arrow::util::pretty::pretty_format_batches(&[batch])
        .context("formatting table")?;
    println!("{title}");
    println!("{rendered}");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Unify(args) => {
            let config = args.into_config()?;
            log::debug!("configuration: {config:?}");
            let summary = run_pipeline(&config)?;
            print!("{summary}");
            ensure_complete(&summary)?;
        }
        Command::Compare { first, second } => {
            let comparison = compare_files(&first, &second)?;
            print_table("Same", &comparison.same)?;
            print_table("Difference", &comparison.different)?;
        }
        Command::Aggregate {
            primary,
            fallback,
            output,
            key,
            value,
        } => {
            let merged = aggregate_files(&primary, &fallback, &output, &key, &value)?;
            println!("Wrote {} rows to {}", merged.num_rows(), output.display());
        }
    }
    Ok(())
}
