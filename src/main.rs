use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod controller;
mod models;
mod report;
mod state;

use api::AnalyticsClient;
use controller::Dashboard;
use state::RenderMode;

#[derive(Parser)]
#[command(name = "lms-dashboard")]
#[command(about = "Learning management analytics dashboard", long_about = None)]
struct Cli {
    /// Base URL of the analytics backend (without the /api suffix)
    #[arg(long, env = "LMS_BACKEND_URL", global = true)]
    backend_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "LMS_TIMEOUT_SECS", default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all dashboard data and render it
    Show {
        #[arg(long, default_value_t = 10)]
        top: usize,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Seed sample data on the backend, then render the dashboard
    Initialize {
        /// Seed even when data is already available
        #[arg(long)]
        force: bool,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Refresh the dashboard on an interval until interrupted
    Watch {
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Write course analytics to a CSV file
    Export {
        #[arg(long, default_value = "course-analytics.csv")]
        out: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lms_dashboard={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn settle(task: JoinHandle<()>) -> anyhow::Result<()> {
    task.await.context("dashboard task panicked")
}

async fn wait_pending(pending: &mut Option<JoinHandle<()>>) -> Result<(), JoinError> {
    match pending {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

/// Re-renders after every settled refresh until `shutdown` resolves.
async fn watch<S: Future>(
    dashboard: &Dashboard,
    initial: JoinHandle<()>,
    interval: Duration,
    top: usize,
    shutdown: S,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately and the initial fetch covers it.
    ticker.tick().await;
    let mut pending = Some(initial);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("stopping watch");
                return Ok(());
            }
            joined = wait_pending(&mut pending), if pending.is_some() => {
                pending = None;
                joined.context("dashboard task panicked")?;
                writeln!(out, "{}", report::render(&dashboard.state(), top))?;
            }
            _ = ticker.tick() => {
                if pending.is_some() {
                    warn!("previous refresh still pending; superseding it");
                }
                pending = Some(dashboard.fetch_all_data());
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let backend_url = cli
        .backend_url
        .context("LMS_BACKEND_URL must be set to the analytics backend base URL")?;
    let client = AnalyticsClient::new(&backend_url, Duration::from_secs(cli.timeout_secs))
        .context("failed to build HTTP client")?;
    info!(backend_url = %backend_url, "mounting dashboard");

    let (dashboard, initial) = Dashboard::mount(Arc::new(client));

    match cli.command {
        Commands::Show { top, out } => {
            settle(initial).await?;
            let view = report::render(&dashboard.state(), top);
            match out {
                Some(path) => {
                    std::fs::write(&path, view)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Dashboard written to {}.", path.display());
                }
                None => print!("{view}"),
            }
        }
        Commands::Initialize { force, top } => {
            settle(initial).await?;
            if force || dashboard.render_mode() == RenderMode::Onboarding {
                settle(dashboard.initialize_data()).await?;
                info!(
                    initialized = dashboard.state().data_initialized(),
                    "initialize finished"
                );
            } else {
                info!("dashboard data already available; pass --force to seed again");
            }
            print!("{}", report::render(&dashboard.state(), top));
        }
        Commands::Watch { interval_secs, top } => {
            let interval = Duration::from_secs(interval_secs.max(1));
            watch(
                &dashboard,
                initial,
                interval,
                top,
                tokio::signal::ctrl_c(),
                &mut std::io::stdout(),
            )
            .await?;
        }
        Commands::Export { out } => {
            settle(initial).await?;
            let state = dashboard.state();
            let Some(snapshot) = state.snapshot() else {
                let reason = state
                    .error()
                    .map(|err| err.to_string())
                    .unwrap_or_else(|| "no data".to_string());
                anyhow::bail!("nothing to export: {reason}");
            };
            let written = report::export_course_csv(&snapshot.course_analytics, &out)?;
            println!("Exported {written} courses to {}.", out.display());
        }
    }

    dashboard.unmount();
    Ok(())
}
