//! CLI interface for interview-insights

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::ExternalAnalyzer;
use crate::config::{self, Config};
use crate::pipeline::{self, IngestionService};
use crate::store::RecordStore;
use crate::types::{ExperienceRecord, Submission};

#[derive(Parser)]
#[command(name = "interview-insights")]
#[command(about = "Interview experience ingestion and NLP enrichment service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(short, long, global = true, env = "INTERVIEW_INSIGHTS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default when no command given)
    Serve(ServeArgs),
    /// Print store statistics as JSON
    Stats {
        /// Store file to read instead of the configured one
        #[arg(long, env = "INTERVIEW_INSIGHTS_STORE")]
        store: Option<PathBuf>,
    },
    /// Enrich one experience without storing it and print the record
    Analyze {
        /// Company name
        #[arg(long)]
        company: String,
        /// Role applied for
        #[arg(long)]
        role: String,
        /// Experience narrative
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        /// Read the narrative from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Append the records of a JSON array file to the store
    Import {
        /// JSON file holding an array of experience records
        file: PathBuf,
        /// Store file to write instead of the configured one
        #[arg(long, env = "INTERVIEW_INSIGHTS_STORE")]
        store: Option<PathBuf>,
    },
    /// Inspect or reset the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Host to bind to
    #[arg(long, env = "INTERVIEW_INSIGHTS_HOST")]
    host: Option<String>,
    /// Port to listen on
    #[arg(short, long, env = "INTERVIEW_INSIGHTS_PORT")]
    port: Option<u16>,
    /// Store file
    #[arg(long, env = "INTERVIEW_INSIGHTS_STORE")]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Overwrite the configuration file with defaults
    Reset,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_file = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => {
            let mut config = Config::load(config_file)?;
            apply_serve_overrides(&mut config, args);
            crate::server::start(config).await?;
        }
        Commands::Stats { store } => {
            let config = Config::load(config_file)?;
            let store = RecordStore::new(store.unwrap_or(config.storage.store_path));
            let stats = store.stats().await.context("Failed to read store")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Analyze {
            company,
            role,
            text,
            file,
        } => {
            let config = Config::load(config_file)?;
            let narrative = match (text, file) {
                (Some(text), _) => text,
                (None, Some(file)) => tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", file.display()))?,
                (None, None) => bail!("Either --text or --file is required"),
            };
            let submission = Submission::new(company, role).with_experience(narrative);
            let record = analyze(&config, submission).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Import { file, store } => {
            let config = Config::load(config_file)?;
            let store = RecordStore::new(store.unwrap_or(config.storage.store_path));
            let records = read_import_file(&file).await?;
            let report = store.import(records).await.context("Failed to import experiences")?;

            println!(
                "Imported {} experience(s) into {}",
                report.imported,
                store.path().display()
            );
            if !report.skipped.is_empty() {
                println!("Skipped {}: {}", report.skipped.len(), report.skipped.join(", "));
            }
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let config = Config::load(config_file)?;
                let contents =
                    toml::to_string_pretty(&config).context("Failed to serialize config")?;
                print!("{}", contents);
            }
            ConfigCommands::Path => {
                println!("{}", resolve_config_path(config_file)?.display());
            }
            ConfigCommands::Reset => {
                let path = resolve_config_path(config_file)?;
                Config::default().save_to(&path)?;
                println!("Configuration reset: {}", path.display());
            }
        },
    }

    Ok(())
}

fn apply_serve_overrides(config: &mut Config, args: ServeArgs) {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(store) = args.store {
        config.storage.store_path = store;
    }
}

fn resolve_config_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => config::config_path(),
    }
}

/// Validate and enrich a submission without touching the store
async fn analyze(config: &Config, submission: Submission) -> Result<ExperienceRecord> {
    let submission = pipeline::stamp(pipeline::validate(submission)?);
    let store = Arc::new(RecordStore::new(config.storage.store_path.clone()));
    let service = IngestionService::new(store, Arc::new(ExternalAnalyzer::from_config(config)));
    Ok(service.enrich(submission).await)
}

async fn read_import_file(file: &Path) -> Result<Vec<ExperienceRecord>> {
    let raw = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not a JSON array of experiences", file.display()))
}
