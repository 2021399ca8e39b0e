//! omni-template - Work with Omni cluster templates offline

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;
mod util;

use error::Result;

#[derive(Parser)]
#[command(name = "omni-template")]
#[command(version)]
#[command(about = "Compose, split, validate and diff Omni cluster templates", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose template fragments into one cluster template
    Compose {
        /// Cluster document
        #[arg(long)]
        cluster: PathBuf,

        /// ControlPlane document
        #[arg(long)]
        control_plane: PathBuf,

        /// Workers documents, in order
        #[arg(long)]
        workers: Vec<PathBuf>,

        /// Machine documents, in order
        #[arg(long)]
        machines: Vec<PathBuf>,

        /// Output file (if not set, outputs to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Split a cluster template into fragments
    Split {
        /// Template file, or `-` for stdin
        file: PathBuf,

        /// Write one file per fragment into this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Fail on documents without a recognized kind
        #[arg(long)]
        strict: bool,
    },

    /// Check a cluster template for structural problems
    Validate {
        /// Template file, or `-` for stdin
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two cluster templates
    Diff {
        old: PathBuf,
        new: PathBuf,
    },
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let code = match run(cli.command) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

/// `RUST_LOG` wins over `--debug`
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Compose {
            cluster,
            control_plane,
            workers,
            machines,
            output,
        } => commands::compose::run(
            &cluster,
            &control_plane,
            &workers,
            &machines,
            output.as_deref(),
        ),

        Commands::Split {
            file,
            output_dir,
            strict,
        } => commands::split::run(&file, output_dir.as_deref(), strict),

        Commands::Validate { file, json } => commands::validate::run(&file, json),

        Commands::Diff { old, new } => commands::diff::run(&old, &new),
    }
}
