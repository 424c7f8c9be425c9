use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use instagram_client::InstagramClient;
use reach_common::{ApiCredentials, DiscoveryConfig};
use reach_scout::infra::{ExportFormat, FileCheckpointWriter};
use reach_scout::scheduling::CancellationController;
use reach_scout::traits::InstagramSource;
use reach_scout::{Collaborators, DiscoveryEngine, Termination};

#[derive(Parser)]
#[command(
    name = "reach-scout",
    about = "Find Instagram accounts above a follower threshold, starting from a hashtag or given accounts"
)]
struct Cli {
    /// Hashtag to seed from (with or without #)
    #[arg(short = 't', long, required_unless_present = "seed")]
    topic: Option<String>,

    /// Starting accounts, expanded through similar accounts (repeatable)
    #[arg(short = 's', long = "seed", value_name = "USERNAME", num_args = 1..)]
    seed: Vec<String>,

    /// Number of qualifying profiles to collect
    #[arg(short = 'n', long)]
    profiles: Option<usize>,

    /// Minimum follower count
    #[arg(short = 'f', long)]
    min_followers: Option<u64>,

    /// Final export path (defaults to a generated name in --output-dir)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    format: ExportFormat,

    /// Directory for checkpoints and generated export names
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Path to config TOML file
    #[arg(long, env = "REACH_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("reach=info".parse()?)
        .add_directive("instagram_client=info".parse()?);
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let mut config = match &cli.config {
        Some(path) => {
            info!(config = %path.display(), "Loading config");
            DiscoveryConfig::load(path)?
        }
        None => DiscoveryConfig::default(),
    };
    if let Some(profiles) = cli.profiles {
        config.target = profiles;
    }
    if let Some(min_followers) = cli.min_followers {
        config.min_followers = min_followers;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    config.validate()?;

    let credentials = ApiCredentials::from_env()?;
    info!(credentials = ?credentials, "Credentials loaded");
    let client = match credentials.api_host {
        Some(host) => InstagramClient::with_host(credentials.api_key, host)?,
        None => InstagramClient::new(credentials.api_key)?,
    };
    let source = InstagramSource::new(client, &config.validator);
    let writer =
        FileCheckpointWriter::new(&cli.output_dir, cli.format).with_final_output(cli.output);

    let cancel = CancellationController::new();
    let _shutdown = cancel.listen_for_shutdown();

    let collaborators = Collaborators {
        resolver: &source,
        neighbors: &source,
        seeds: &source,
        checkpoints: &writer,
    };
    let engine = match cli.topic {
        Some(topic) => DiscoveryEngine::new(config, topic, collaborators, cancel)
            .with_seed_accounts(cli.seed),
        None => DiscoveryEngine::from_accounts(config, cli.seed, collaborators, cancel),
    };
    let report = engine.run().await;
    info!("Discovery run complete. {report}");

    if let Termination::Failed(reason) = &report.termination {
        bail!("discovery failed: {reason}");
    }
    Ok(())
}
