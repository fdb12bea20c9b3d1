use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use crate::data::catalog::DEPARTMENT;
use crate::data::loader::{LocalFileSource, RecordSource, RemoteSource};

pub const DEFAULT_BASE_URL: &str = "https://files.data.gouv.fr/geo-dvf/latest/csv";

/// Command-line arguments for dvf-dashboard
#[derive(Parser, Debug, Clone)]
#[command(name = "dvf-dashboard")]
#[command(about = "Real-estate transaction dashboard for the Creuse municipalities")]
#[command(version)]
pub struct Args {
    /// Local transaction file (.csv, .json or .parquet)
    #[arg(short = 'f', long, default_value = "dvf_2024.csv", env = "DVF_DATA_FILE")]
    pub data_file: PathBuf,

    /// Fetch one file per municipality from the remote endpoint instead
    #[arg(long)]
    pub remote: bool,

    /// Root of the per-municipality file tree
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "DVF_BASE_URL")]
    pub base_url: String,

    /// Transaction year
    #[arg(long, default_value_t = 2024, env = "DVF_YEAR")]
    pub year: u16,

    /// Department code used in remote paths
    #[arg(long, default_value = DEPARTMENT)]
    pub department: String,

    /// Remote request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Args {
    /// The record source the store starts with.
    pub fn record_source(&self) -> Result<Box<dyn RecordSource>> {
        if self.remote {
            let source = RemoteSource::new(
                &self.base_url,
                self.year,
                &self.department,
                Duration::from_secs(self.timeout_secs),
            )
            .context("building HTTP client")?;
            Ok(Box::new(source))
        } else {
            Ok(Box::new(LocalFileSource::new(self.data_file.clone())))
        }
    }
}
