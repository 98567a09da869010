//! Steward keeps an organization's repositories in line with the YAML
//! desired state checked into a watched repository.
//!
//! # Usage
//!
//! ```text
//! steward run --watching-repo <org/repo/branch> --repo-file-path <path> \
//!     --sig-file-path <path> --sig-dir <dir> [--interval <minutes>] \
//!     [--concurrent-size <n>] [--wait-for-worker] [--token-path <file>]
//! steward check <same flags as run>
//! steward inspect (--watching-repo <org/repo/branch> | --local-tree <dir>) \
//!     --repo-file-path <path> --sig-file-path <path> --sig-dir <dir> [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{inspect::InspectArgs, run::RunArgs};
use steward_daemon::Mode;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "steward",
    version,
    about = "Reconcile hosted repositories against YAML desired state",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the desired state and reconcile until interrupted.
    Run(RunArgs),

    /// Run a single reconciliation cycle and exit once it has drained.
    Check(RunArgs),

    /// Print the SIGs, ownership and claim diagnostics of the desired state.
    Inspect(InspectArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(Mode::Watch),
        Commands::Check(args) => args.run(Mode::Once),
        Commands::Inspect(args) => args.run(),
    }
}
