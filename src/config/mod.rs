pub mod toml_config;

use crate::core::{DiffOptions, DEFAULT_CHUNK_SIZE, DEFAULT_SCHEMA};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};

#[cfg(feature = "cli")]
use crate::utils::error::DiffError;
#[cfg(feature = "cli")]
use crate::utils::retry::{RetryPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_RETRIES};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::time::Duration;
#[cfg(feature = "cli")]
use toml_config::FileConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "pgdatadiff", version)]
#[command(about = "Compare the data and sequences of two PostgreSQL databases")]
pub struct CliArgs {
    /// Connection string of the first database
    #[arg(long, env = "PGDATADIFF_FIRSTDB")]
    pub firstdb: Option<String>,

    /// Connection string of the second database
    #[arg(long, env = "PGDATADIFF_SECONDDB")]
    pub seconddb: Option<String>,

    /// Only compare data, exclude sequences
    #[arg(long, conflicts_with = "only_sequences")]
    pub only_data: bool,

    /// Only compare sequences, exclude data
    #[arg(long)]
    pub only_sequences: bool,

    /// Do a quick test based on counts alone
    #[arg(long)]
    pub count_only: bool,

    /// The chunk size when comparing data [default: 10000]
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Schema to compare [default: public]
    #[arg(long)]
    pub schema: Option<String>,

    /// Tables to leave out of the comparison
    #[arg(long = "exclude-table", value_delimiter = ',')]
    pub exclude_tables: Vec<String>,

    /// Retries for operational database errors [default: 3]
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Base backoff delay in milliseconds, doubled per attempt [default: 1000]
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Write a JSON report to this path
    #[arg(long)]
    pub report: Option<String>,

    /// Read settings from a TOML file
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffConfig {
    pub firstdb: String,
    pub seconddb: String,
    pub options: DiffOptions,
    pub report: Option<String>,
}

impl DiffConfig {
    pub fn new(firstdb: impl Into<String>, seconddb: impl Into<String>) -> Self {
        Self {
            firstdb: firstdb.into(),
            seconddb: seconddb.into(),
            options: DiffOptions::default(),
            report: None,
        }
    }

    /// Merges the command line over the `--config` file, if one was given.
    #[cfg(feature = "cli")]
    pub fn resolve(cli: &CliArgs) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path);
                FileConfig::from_file(path)?
            }
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    #[cfg(feature = "cli")]
    pub fn merge(cli: &CliArgs, file: FileConfig) -> Result<Self> {
        let firstdb = cli.firstdb.clone().or(file.firstdb);
        let seconddb = cli.seconddb.clone().or(file.seconddb);
        let firstdb = validation::validate_required_field("firstdb", &firstdb)?.clone();
        let seconddb = validation::validate_required_field("seconddb", &seconddb)?.clone();

        let only_data = cli.only_data || file.only_data.unwrap_or(false);
        let only_sequences = cli.only_sequences || file.only_sequences.unwrap_or(false);
        if only_data && only_sequences {
            return Err(DiffError::InvalidConfigValueError {
                field: "only_data".to_string(),
                value: "true".to_string(),
                reason: "only_data and only_sequences cannot both be set".to_string(),
            });
        }

        let file_retry = file.retry.unwrap_or_default();
        let max_retries = cli
            .max_retries
            .or(file_retry.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let base_delay_ms = cli
            .retry_delay_ms
            .or(file_retry.base_delay_ms)
            .unwrap_or(DEFAULT_BASE_DELAY_MS);

        let exclude_tables = if cli.exclude_tables.is_empty() {
            file.exclude_tables.unwrap_or_default()
        } else {
            cli.exclude_tables.clone()
        };

        Ok(Self {
            firstdb,
            seconddb,
            options: DiffOptions {
                schema: cli
                    .schema
                    .clone()
                    .or(file.schema)
                    .unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
                chunk_size: cli.chunk_size.or(file.chunk_size).unwrap_or(DEFAULT_CHUNK_SIZE),
                count_only: cli.count_only || file.count_only.unwrap_or(false),
                only_data,
                only_sequences,
                exclude_tables,
                retry: RetryPolicy::new(max_retries, Duration::from_millis(base_delay_ms)),
            },
            report: cli.report.clone().or(file.report),
        })
    }

    pub fn redacted_first(&self) -> String {
        validation::redact_password(&self.firstdb)
    }

    pub fn redacted_second(&self) -> String {
        validation::redact_password(&self.seconddb)
    }
}

impl Validate for DiffConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_connection_string("firstdb", &self.firstdb)?;
        validation::validate_connection_string("seconddb", &self.seconddb)?;
        validation::validate_positive_number("chunk_size", self.options.chunk_size, 1)?;
        validation::validate_non_empty_string("schema", &self.options.schema)?;
        if let Some(report) = &self.report {
            validation::validate_path("report", report)?;
        }
        Ok(())
    }
}
