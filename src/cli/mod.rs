// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `fuse`        — run the fusion core, print a JSON report
//   2. `init-config` — write a FuseConfig file to edit and replay
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{BackendArg, Commands, FuseArgs, InitConfigArgs};

use crate::application::fuse_use_case::{FuseConfig, FuseUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "bidaf-fusion",
    version,
    about = "Fuse encoded document and query features with highway gates and bidirectional attention."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its handler. Only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Fuse(args)       => run_fuse(args),
            Commands::InitConfig(args) => run_init_config(args),
        }
    }
}

fn run_fuse(args: FuseArgs) -> Result<()> {
    let backend     = args.backend;
    let output      = args.output.clone();
    let save_config = args.save_config.clone();

    let base = match &args.config {
        Some(path) => FuseConfig::load(path)?,
        None       => FuseConfig::default(),
    };
    let config = args.resolve(base);

    if let Some(path) = &save_config {
        config.save(path)?;
    }

    let use_case = FuseUseCase::new(config);
    let report = match backend {
        BackendArg::Cpu => use_case.execute::<burn::backend::NdArray<f32>>(
            Default::default(),
            backend.name(),
        )?,
        BackendArg::Wgpu => use_case.execute::<burn::backend::Wgpu>(
            burn::backend::wgpu::WgpuDevice::default(),
            backend.name(),
        )?,
    };

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write report to '{path}'"))?;
            tracing::info!("Report written to '{}'", path);
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_init_config(args: InitConfigArgs) -> Result<()> {
    let path = args.path.clone();
    FuseConfig::from(args).save(&path)?;
    println!("Config written to {path}");
    Ok(())
}
