use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use polars::prelude::{DataFrame, ParquetCompression, ParquetWriter};
use std::{collections::BTreeMap, fs::File, path::Path, path::PathBuf};
use tidycensus::{AcsVersion, Census, CensusConfig, Geography, VariableSpec};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Tidy tables from the Census Bureau data API")]
struct Cli {
    /// API key; defaults to $CENSUS_API_KEY
    #[arg(long, global = true)]
    api_key: Option<String>,
    /// Response cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    /// Skip the response cache entirely
    #[arg(long, global = true)]
    no_cache: bool,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Last year of the default ACS range
    #[arg(long, global = true)]
    most_recent_year: Option<u16>,
    /// Write the table as Parquet instead of printing it
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Any dataset, long format
    Variables {
        #[arg(long)]
        dataset: String,
        #[arg(long, value_delimiter = ',', required = true)]
        years: Vec<u16>,
        /// Names or group(PREFIX) wildcards
        #[arg(long, value_delimiter = ',', required = true)]
        variables: Vec<String>,
        #[arg(long, default_value = "us")]
        geography: Geography,
        #[arg(long)]
        no_metadata: bool,
    },
    /// ACS estimates with standard errors
    Acs {
        #[arg(long, value_delimiter = ',', required = true)]
        variables: Vec<String>,
        /// acs1, acs3 or acs5
        #[arg(long = "survey", default_value = "acs5")]
        version: AcsVersion,
        #[arg(long, default_value = "us")]
        geography: Geography,
        #[arg(long, value_delimiter = ',')]
        years: Vec<u16>,
        #[arg(long)]
        no_se: bool,
        #[arg(long)]
        no_metadata: bool,
    },
    /// Variable catalog
    Metadata {
        #[arg(long)]
        dataset: String,
        #[arg(long, value_delimiter = ',', required = true)]
        years: Vec<u16>,
    },
}

impl Cli {
    fn config(&self) -> CensusConfig {
        let mut config = CensusConfig {
            api_key: self.api_key.clone(),
            timeout_secs: self.timeout_secs,
            ..CensusConfig::default()
        };
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if self.no_cache {
            config.cache_dir = None;
        }
        if let Some(year) = self.most_recent_year {
            config.most_recent_acs_year = year;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tidycensus=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let census = Census::new(cli.config()).context("building Census client")?;

    let mut table = match &cli.command {
        Command::Variables {
            dataset,
            years,
            variables,
            geography,
            no_metadata,
        } => {
            let specs: Vec<VariableSpec> = variables.iter().map(|v| v.as_str().into()).collect();
            census
                .get_variables(
                    dataset,
                    years,
                    &specs,
                    *geography,
                    &BTreeMap::new(),
                    !no_metadata,
                )
                .await
                .with_context(|| format!("fetching {dataset} variables"))?
        }
        Command::Acs {
            variables,
            version,
            geography,
            years,
            no_se,
            no_metadata,
        } => census
            .acs(
                variables.as_slice(),
                *version,
                *geography,
                Some(years.as_slice()),
                !no_se,
                !no_metadata,
            )
            .await
            .with_context(|| format!("fetching {version} estimates"))?,
        Command::Metadata { dataset, years } => census
            .get_metadata(dataset, years)
            .await
            .with_context(|| format!("fetching {dataset} metadata"))?,
    };

    match &cli.output {
        Some(path) => {
            write_parquet(&mut table, path)?;
            info!(rows = table.height(), path = %path.display(), "wrote table");
        }
        None => println!("{table}"),
    }

    Ok(())
}

fn write_parquet(table: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    ParquetWriter::new(&mut file)
        .with_compression(ParquetCompression::Snappy)
        .finish(table)
        .context("writing Parquet")?;
    Ok(())
}
