//! The command-line surface of `p2v-firstboot`.

use anyhow::{Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use fn_error_context::context;

use crate::config::{self, FirstbootConfig};
use crate::fsops::HostFs;
use crate::guard;
use crate::pipeline::Pipeline;
use crate::verify;

/// p2v-firstboot
#[derive(Debug, Parser)]
#[clap(name = "p2v-firstboot", version)]
pub struct App {
    /// The mounted target root; defaults to $TARGET.
    #[clap(long)]
    target: Option<Utf8PathBuf>,

    /// Active hypervisor mode (e.g. xen); defaults to $P2V_HYPERVISOR.
    #[clap(long)]
    hypervisor: Option<String>,

    /// Size cap for RAM-backed volumes, plain bytes or with a K/M/G/T
    /// suffix; defaults to $P2V_TMPFS_SIZE.
    #[clap(long)]
    tmpfs_size: Option<String>,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the target, then apply the first-boot fixup pipeline.
    Run {
        /// Load the mutation sequence from a TOML file instead of the
        /// built-in P2V set.
        #[clap(long)]
        pipeline: Option<Utf8PathBuf>,
    },
    /// Validate the target without applying any mutations.
    Check {
        /// Require modules for this kernel release inside the target.
        #[clap(long)]
        kernel_release: Option<String>,
        /// Require modules for the currently running kernel instead.
        #[clap(long, conflicts_with = "kernel_release")]
        running_kernel: bool,
    },
}

fn merged_config(app: &App) -> Result<FirstbootConfig> {
    apply_flags(FirstbootConfig::from_env()?, app)
}

// Flags win over whatever the environment provided
fn apply_flags(mut config: FirstbootConfig, app: &App) -> Result<FirstbootConfig> {
    if let Some(target) = &app.target {
        config.target = target.clone();
    }
    if let Some(hypervisor) = &app.hypervisor {
        config.hypervisor_mode = Some(hypervisor.clone());
    }
    if let Some(size) = &app.tmpfs_size {
        config.size_limit_bytes = Some(config::parse_size(size)?);
    }
    Ok(config)
}

#[context("Loading pipeline from {path}")]
fn load_pipeline(mut config: FirstbootConfig, path: &Utf8Path) -> Result<Pipeline> {
    let content = std::fs::read_to_string(path)?;
    let file = config::parse_pipeline_file(&content)?;
    // Environment and flags win over the pipeline file
    if config.hypervisor_mode.is_none() {
        config.hypervisor_mode = file.hypervisor_mode;
    }
    if config.size_limit_bytes.is_none() {
        if let Some(size) = &file.size_limit {
            config.size_limit_bytes = Some(config::parse_size(size)?);
        }
    }
    Ok(Pipeline::new(config, file.mutations))
}

/// Parse the process arguments and execute the selected command.
pub fn run() -> Result<()> {
    let app = App::parse();
    let config = merged_config(&app)?;
    let fs = HostFs;
    match &app.cmd {
        Command::Run { pipeline } => {
            let pipeline = match pipeline {
                Some(path) => load_pipeline(config, path)?,
                None => Pipeline::default_p2v(config),
            };
            pipeline.run(&fs)?;
            Ok(())
        }
        Command::Check {
            kernel_release,
            running_kernel,
        } => {
            guard::validate(&fs, &config.target)?;
            let uname = rustix::system::uname();
            let release = if *running_kernel {
                Some(uname.release().to_str().context("Reading kernel release")?)
            } else {
                kernel_release.as_deref()
            };
            verify::verify_target(&fs, &config.target, release)?;
            println!("{} OK", config.target);
            Ok(())
        }
    }
}
