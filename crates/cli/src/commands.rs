//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use colored::Colorize;
use gb_core::backend::{Backend, HttpBackend, MockBackend};
use gb_core::config::{load_config, AppConfig};
use gb_core::engine::{PipelineEngine, ProgressRecorder, EVENT_BUFFER};
use gb_core::state::{restore_progress, wait_until_idle, RestoredProgress, RunManager};
use gb_core::store::{
    FileProgressStore, FileWorkspaceStore, ProgressStore, StoreError, WorkspaceStore,
};
use gb_protocol::ipc::Event;
use gb_protocol::pipeline_models::{PipelineOutcome, StepDurations, StepName};
use gb_protocol::workspace_models::{NewWorkspace, PageType, Workspace};
use tokio::sync::mpsc;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// graphbuild: run the knowledge-graph build pipeline for a workspace.
#[derive(Parser)]
#[command(name = "graphbuild", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Project root containing `.graphbuild/`.
    #[arg(long, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Backend base URL, overriding `backend.base-url`.
    #[arg(long, env = "GRAPHBUILD_BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build a workspace: crawl, structure, clean, index and update.
    Run {
        workspace_id: String,

        /// Run against a simulated backend instead of the configured one.
        #[arg(long)]
        dry_run: bool,

        /// Print the final outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the stored progress and the backend's processing status.
    Status {
        workspace_id: String,

        /// Poll until the backend reports the workspace idle.
        #[arg(long)]
        wait: bool,
    },

    /// Manage the local workspace registry.
    Workspace {
        #[command(subcommand)]
        action: WorkspaceAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum WorkspaceAction {
    /// List registered workspaces.
    List,

    /// Register a new workspace.
    Create {
        name: String,

        #[arg(long, default_value = "")]
        domain: String,

        #[arg(long, default_value = "")]
        system_name: String,
    },

    Rename { id: String, name: String },

    /// Change a workspace's type (`main` or `normal`).
    SetType { id: String, page_type: PageType },

    Delete { id: String },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "gb_core=warn,graphbuild=info",
        1 => "gb_core=info,graphbuild=debug",
        _ => "gb_core=debug,graphbuild=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli.root).await?;
    if let Some(url) = cli.backend_url {
        config = config.with_backend_url(url);
    }

    match cli.command {
        Command::Run {
            workspace_id,
            dry_run,
            json,
        } => cmd_run(&config, &workspace_id, dry_run, json).await,
        Command::Status { workspace_id, wait } => cmd_status(&config, &workspace_id, wait).await,
        Command::Workspace { action } => {
            let store = FileWorkspaceStore::new(config.workspaces_path());
            cmd_workspace(&store, action).await
        }
    }
}

fn http_backend(config: &AppConfig) -> Result<Arc<dyn Backend>> {
    let backend = HttpBackend::new(&config.global.backend)?;
    Ok(Arc::new(backend))
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(
    config: &AppConfig,
    workspace_id: &str,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let backend: Arc<dyn Backend> = if dry_run {
        Arc::new(MockBackend::simulated())
    } else {
        http_backend(config)?
    };

    let registry = FileWorkspaceStore::new(config.workspaces_path());
    match registry.get(workspace_id).await {
        Ok(workspace) => info!(workspace_id, name = %workspace.name, "building workspace"),
        Err(StoreError::WorkspaceNotFound(_)) => {
            warn!(workspace_id, "workspace is not in the local registry")
        }
        Err(e) => warn!(error = %e, "could not read the workspace registry"),
    }

    let progress = Arc::new(FileProgressStore::new(config.progress_dir()));
    if !dry_run {
        progress.clear(workspace_id).await?;
    }

    let mut engine = PipelineEngine::new(backend);
    if !dry_run {
        engine = engine.with_observer(Arc::new(ProgressRecorder::new(progress)));
    }

    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let manager = RunManager::new(Arc::new(engine), tx);
    let handle = manager
        .start_pipeline(workspace_id)
        .await
        .map_err(|e| eyre!(e))?;

    while let Some(event) = rx.recv().await {
        if !json {
            print_event(&event);
        }
        if event.is_terminal() {
            break;
        }
    }

    let outcome = handle.wait().await.map_err(|e| eyre!(e))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }

    match outcome {
        PipelineOutcome::Completed(_) => Ok(()),
        PipelineOutcome::Failed(failure) => Err(eyre!(
            "pipeline failed at {}: {}",
            failure.failed_stage,
            failure.message
        )),
    }
}

fn print_event(event: &Event) {
    match event {
        Event::StepStarted { step, .. } => {
            println!("{} {}", "▶".cyan(), step.label());
        }
        Event::StepCompleted {
            step,
            duration_secs,
            ..
        } => {
            println!(
                "{} {} {}",
                "✓".green(),
                step.label(),
                format!("({duration_secs:.1}s)").dimmed()
            );
        }
        Event::StepSkipped { step, .. } => {
            println!("{} {} {}", "-".dimmed(), step.label(), "(skipped)".dimmed());
        }
        Event::PipelineFailed {
            failed_stage,
            error,
            ..
        } => {
            println!("{} {failed_stage}: {error}", "✗".red());
        }
        _ => {}
    }
}

fn print_summary(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::Completed(report) => {
            println!(
                "\n{} workspace {} built in {:.1}s",
                "Done:".green().bold(),
                report.workspace_id,
                report.total_secs
            );
        }
        PipelineOutcome::Failed(failure) => {
            println!(
                "\n{} workspace {} stopped at {}",
                "Failed:".red().bold(),
                failure.workspace_id,
                failure.failed_stage
            );
        }
    }
    print_durations(outcome.durations());
}

fn print_durations(durations: &StepDurations) {
    for step in StepName::ALL {
        let value = match durations.get(step) {
            Some(secs) => format!("{secs:.1}s"),
            None => "-".dimmed().to_string(),
        };
        println!("  {:<22} {value}", step.label());
    }
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

async fn cmd_status(config: &AppConfig, workspace_id: &str, wait: bool) -> Result<()> {
    let backend = http_backend(config)?;
    let progress = FileProgressStore::new(config.progress_dir());

    let mut restored = restore_progress(backend.as_ref(), &progress, workspace_id).await?;
    print_restored(workspace_id, &restored);

    if wait && restored.processing {
        let interval = Duration::from_secs(config.global.status.poll_interval_secs);
        let polls = wait_until_idle(
            backend.as_ref(),
            workspace_id,
            interval,
            config.global.status.max_polls,
        )
        .await?;
        info!(workspace_id, polls, "backend reports idle");

        restored = restore_progress(backend.as_ref(), &progress, workspace_id).await?;
        println!();
        print_restored(workspace_id, &restored);
    }
    Ok(())
}

fn print_restored(workspace_id: &str, restored: &RestoredProgress) {
    let state = if restored.processing {
        "processing".yellow()
    } else {
        "idle".green()
    };
    println!("{} {workspace_id}: {state}", "Workspace".bold());
    if let Some(step) = restored.next_step {
        println!("  in progress: {}", step.label());
    }
    print_durations(&restored.durations);
}

// ---------------------------------------------------------------------------
// workspace
// ---------------------------------------------------------------------------

async fn cmd_workspace(store: &dyn WorkspaceStore, action: WorkspaceAction) -> Result<()> {
    match action {
        WorkspaceAction::List => {
            let workspaces = store.list().await?;
            if workspaces.is_empty() {
                println!("No workspaces registered.");
            }
            for workspace in &workspaces {
                print_workspace(workspace);
            }
        }
        WorkspaceAction::Create {
            name,
            domain,
            system_name,
        } => {
            let workspace = store
                .create(NewWorkspace {
                    name,
                    domain_name: domain,
                    system_name,
                })
                .await?;
            print_workspace(&workspace);
        }
        WorkspaceAction::Rename { id, name } => {
            print_workspace(&store.rename(&id, &name).await?);
        }
        WorkspaceAction::SetType { id, page_type } => {
            store.set_type(&id, page_type).await?;
            for workspace in store.list().await? {
                print_workspace(&workspace);
            }
        }
        WorkspaceAction::Delete { id } => {
            let removed = store.delete(&id).await?;
            println!("Deleted {} ({})", removed.id, removed.name);
            if let Some(main) = store.main().await? {
                println!("Main workspace: {} ({})", main.id, main.name);
            }
        }
    }
    Ok(())
}

fn print_workspace(workspace: &Workspace) {
    let marker = if workspace.is_main() {
        "main".green().bold()
    } else {
        "normal".dimmed()
    };
    println!(
        "{:<20} {:<6} {} {}",
        workspace.id,
        marker,
        workspace.name,
        workspace.domain_name.dimmed()
    );
}
