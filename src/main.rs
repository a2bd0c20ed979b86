use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use assets_updater::config::DEFAULT_MAX_CONCURRENT_TASKS;
use assets_updater::verify::sha256_verifier;
use assets_updater::{
    AssetsManager, EventCode, HttpTransport, UpdateEvent, UpdateState, UpdaterConfig, env,
};
use clap::{Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use tokio::sync::mpsc;

const PB_STYLE: &str = "{spinner:.blue} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos:>3}% {wide_msg}";

#[derive(Parser, Debug)]
#[command(
    name = "assets-updater",
    author,
    version,
    about = "Incremental asset updater driven by versioned manifests"
)]
struct Cli {
    /// Bundled manifest shipped with the application.
    #[arg(long, default_value = "project.manifest")]
    manifest: PathBuf,

    /// Storage root for downloaded assets.
    #[arg(long)]
    storage: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_TASKS)]
    max_concurrent: usize,

    /// Connection timeout in seconds.
    #[arg(long, default_value_t = 45)]
    timeout_secs: u64,

    /// Check downloaded assets against their SHA-256 checksum.
    #[arg(long)]
    verify_sha256: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether a newer version is available.
    Check,
    /// Download and promote the newest version.
    Update {
        /// Extra attempts for assets that failed.
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Print where an asset lives after promotion.
    Resolve { key: String },
    /// Remove every downloaded asset and the cached manifest.
    Discard,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let storage = cli.storage.unwrap_or_else(env::default_storage_root);
    let mut config = UpdaterConfig::new(&cli.manifest, storage)
        .with_max_concurrent_tasks(cli.max_concurrent)
        .with_connection_timeout(Duration::from_secs(cli.timeout_secs));
    if cli.verify_sha256 {
        config.verifier = Some(sha256_verifier());
    }
    info!("assets-updater: {config:?}");

    let (tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::new(HttpTransport::new(config.connection_timeout));
    let mut manager = AssetsManager::new(config, transport, tx);

    match cli.command {
        Command::Resolve { key } => match manager.resolve_local_path(&key) {
            Some(path) => {
                println!("{}", path.display());
                ExitCode::SUCCESS
            }
            None => {
                error!("resolve: {key} is not listed in the local manifest");
                ExitCode::FAILURE
            }
        },
        Command::Discard => match manager.discard_local_state() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!("discard: {err}");
                ExitCode::FAILURE
            }
        },
        Command::Check => {
            let renderer = tokio::spawn(render(rx, None));
            manager.check_update();
            manager.run_until_settled().await;
            drop(manager);
            exit_for(renderer.await.ok().flatten())
        }
        Command::Update { retries } => {
            let renderer = tokio::spawn(render(rx, Some(progress_bar())));
            manager.update();
            manager.run_until_settled().await;
            let mut attempt = 0;
            while manager.state() == UpdateState::FailToUpdate
                && !manager.failed_assets().is_empty()
                && attempt < retries
            {
                attempt += 1;
                warn!(
                    "update: retrying {} failed assets (attempt {attempt}/{retries})",
                    manager.failed_assets().len()
                );
                manager.retry_failed();
                manager.run_until_settled().await;
            }
            drop(manager);
            exit_for(renderer.await.ok().flatten())
        }
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    match ProgressStyle::with_template(PB_STYLE) {
        Ok(style) => pb.with_style(style),
        Err(_) => pb,
    }
}

/// Print the event stream; returns the last verdict seen.
async fn render(
    mut events: mpsc::UnboundedReceiver<UpdateEvent>,
    bar: Option<ProgressBar>,
) -> Option<EventCode> {
    let mut verdict = None;
    while let Some(event) = events.recv().await {
        match event.code {
            EventCode::UpdateProgression => {
                if let Some(bar) = &bar {
                    bar.set_position(event.percent_by_file as u64);
                    if !event.message.is_empty() {
                        bar.set_message(event.message.clone());
                    }
                }
            }
            EventCode::AssetUpdated => {
                if let Some(bar) = &bar {
                    bar.set_message(event.asset_id.clone());
                }
            }
            code if code.is_error() => {
                let line = format!("{code}: {} {}", event.asset_id, event.message);
                match &bar {
                    Some(bar) => bar.println(line),
                    None => eprintln!("{line}"),
                }
            }
            code => info!("{code}"),
        }
        if event.code.ends_session() || event.code == EventCode::NewVersionFound {
            verdict = Some(event.code);
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    verdict
}

fn exit_for(verdict: Option<EventCode>) -> ExitCode {
    match verdict {
        Some(code) if !code.is_error() => {
            println!("{code}");
            ExitCode::SUCCESS
        }
        Some(code) => {
            eprintln!("{code}");
            ExitCode::FAILURE
        }
        None => ExitCode::FAILURE,
    }
}
