//! Command line surface of the `spotlens` binary.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use crate::config::AppConfig;
use crate::domain::period::DateRange;
use crate::repository::Repository;
use crate::services::error_handling::ExplorerError;
use crate::services::validation::InputValidator;
use crate::services::{
    ArtistService, DashboardService, ExportFormat, ExportService, ForensicsService,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "spotlens")]
#[command(about = "Explore the listening history in a Spotify data export", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to <config dir>/spotlens/config.toml)
    #[arg(long, global = true, env = "SPOTLENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Length of the top artist / track lists
    #[arg(long, global = true)]
    pub top: Option<usize>,

    /// Plays shorter than this many milliseconds count as skipped
    #[arg(long, global = true)]
    pub skip_threshold_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct RangeArgs {
    /// First day to analyze (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Last day to analyze (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: ExportFormat,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dashboard: quick stats, top lists, trends, platforms and skips
    Summary {
        /// Data export ZIP (or unpacked folder)
        export: PathBuf,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Artist deep dive; lists the top artists when no name is given
    Artist {
        /// Data export ZIP (or unpacked folder)
        export: PathBuf,

        /// Artist name
        name: Option<String>,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Tracks with repeated plays, ready for forensics
    Tracks {
        /// Data export ZIP (or unpacked folder)
        export: PathBuf,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Play history forensics for one track
    Track {
        /// Data export ZIP (or unpacked folder)
        export: PathBuf,

        /// Track name
        track: String,

        /// Album artist of the track
        #[arg(short, long)]
        artist: String,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Write the history as one combined CSV and one CSV per year
    Export {
        /// Data export ZIP (or unpacked folder)
        export: PathBuf,

        /// Combined CSV file
        #[arg(long, default_value = "spotify_history_all_years.csv")]
        combined: PathBuf,

        /// Directory for the yearly CSV files
        #[arg(long, default_value = "outputByYear")]
        by_year: PathBuf,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

/// Execute one parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let Cli {
        config: config_file,
        top,
        skip_threshold_ms,
        command,
        ..
    } = cli;
    // `config init` must work before the file exists
    let settings = || load_config(config_file.as_deref(), top, skip_threshold_ms);

    match command {
        Commands::Summary { export, range, output } => {
            let config = settings()?;
            let repository = open(&export, &config).await?;
            let range = resolve_range(&range, &repository)?;
            let report = DashboardService::new(repository, config).build(range)?;
            emit(&ExportService::render_dashboard(&report, output.format)?, &output)
        }
        Commands::Artist { export, name, range, output } => {
            let config = settings()?;
            let repository = open(&export, &config).await?;
            let range = resolve_range(&range, &repository)?;
            let service = ArtistService::new(repository, config);

            match name {
                Some(name) => {
                    let name = InputValidator::validate_name("artist", &name)?;
                    let profile = service.profile(&name, range)?;
                    emit(&ExportService::render_artist(&profile, output.format)?, &output)
                }
                None => {
                    let options = service.artist_options(range);
                    let rendered = match output.format {
                        ExportFormat::Json => serde_json::to_string_pretty(&options)?,
                        _ => options.iter().map(|a| format!("{}\n", a)).collect(),
                    };
                    emit(&rendered, &output)
                }
            }
        }
        Commands::Tracks { export, range, output } => {
            let config = settings()?;
            let repository = open(&export, &config).await?;
            let range = resolve_range(&range, &repository)?;
            let candidates = ForensicsService::new(repository, config).candidates(range);
            emit(&ExportService::render_candidates(&candidates, output.format)?, &output)
        }
        Commands::Track { export, track, artist, range, output } => {
            let track = InputValidator::validate_name("track", &track)?;
            let artist = InputValidator::validate_name("artist", &artist)?;
            let config = settings()?;
            let repository = open(&export, &config).await?;
            let range = resolve_range(&range, &repository)?;
            let forensics = ForensicsService::new(repository, config).analyze(&track, &artist, range)?;
            emit(&ExportService::render_forensics(&forensics, output.format)?, &output)
        }
        Commands::Export { export, combined, by_year } => {
            let config = settings()?;
            let repository = open(&export, &config).await?;
            let records = repository.streams.all();

            let rows = ExportService::export_combined_csv(records, &combined)?;
            println!("{} rows to {}", rows, combined.display());

            for year in ExportService::export_by_year(records, &by_year)? {
                println!("{} rows to {} in {}", year.rows, year.year, year.path.display());
            }
            Ok(())
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            let path = match config_file.as_deref() {
                Some(path) => path.to_path_buf(),
                None => AppConfig::config_path().context("could not determine config directory")?,
            };
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            AppConfig::default().save(&path)?;
            println!("Configuration saved to: {}", path.display());
            Ok(())
        }
        Commands::Config(ConfigCommands::Show) => {
            print!("{}", toml::to_string_pretty(&settings()?)?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>, top: Option<usize>, skip_threshold_ms: Option<u64>) -> Result<AppConfig> {
    let mut config = AppConfig::load(path).context("loading configuration")?;

    if let Some(top) = top {
        config.top_n = InputValidator::validate_top_n(top)?;
    }
    if let Some(threshold) = skip_threshold_ms {
        config.skip_threshold_ms = threshold;
    }
    Ok(config)
}

async fn open(export: &Path, config: &AppConfig) -> Result<Arc<Repository>> {
    let repository = Repository::open(export, config)
        .await
        .with_context(|| format!("importing {}", export.display()))?;

    info!(
        streams = repository.streams.len(),
        skipped = repository.import_report.skipped(),
        "Processed streams"
    );
    Ok(Arc::new(repository))
}

fn resolve_range(args: &RangeArgs, repository: &Repository) -> Result<Option<DateRange>> {
    if args.from.is_none() && args.to.is_none() {
        return Ok(None);
    }

    let available = repository
        .streams
        .date_bounds()
        .ok_or(ExplorerError::NoValidRecords)?;
    let range = InputValidator::resolve_range(args.from.as_deref(), args.to.as_deref(), available)?;
    Ok(Some(range))
}

fn emit(content: &str, output: &OutputArgs) -> Result<()> {
    match &output.output {
        Some(path) => {
            ExportService::export_to_file(content, path)?;
            info!(path = %path.display(), "Wrote report");
        }
        None => print!("{}", content),
    }
    Ok(())
}
