//! Export TypeScript bindings of the `gb-protocol` types.
//!
//! The web admin UI imports these to type the progress events and outcomes
//! it receives from the core.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use gb_protocol::{Event, GlobalConfig, PipelineOutcome, PipelineRun, StepRequest, Workspace};
use gb_protocol::{NewWorkspace, ProcessingStatus, StepResponse};
use std::path::PathBuf;
use ts_rs::TS;

/// Generate TypeScript definitions for the graphbuild protocol.
#[derive(Parser)]
#[command(name = "gb-protocol-ts", version)]
struct Args {
    /// Directory the `.ts` files are written to.
    #[arg(short, long, default_value = "bindings")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    std::fs::create_dir_all(&args.out_dir)
        .wrap_err_with(|| format!("creating {}", args.out_dir.display()))?;

    // `export_all_to` also writes every type these depend on.
    Event::export_all_to(&args.out_dir)?;
    PipelineOutcome::export_all_to(&args.out_dir)?;
    PipelineRun::export_all_to(&args.out_dir)?;
    Workspace::export_all_to(&args.out_dir)?;
    NewWorkspace::export_all_to(&args.out_dir)?;
    StepRequest::export_all_to(&args.out_dir)?;
    StepResponse::export_all_to(&args.out_dir)?;
    ProcessingStatus::export_all_to(&args.out_dir)?;
    GlobalConfig::export_all_to(&args.out_dir)?;

    println!("TypeScript bindings written to {}", args.out_dir.display());
    Ok(())
}
