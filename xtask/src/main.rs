// Desktop/tooling crate — unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]
#![allow(missing_docs)]

mod check;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "PCM bring-up development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the workspace on the host and for the Raspberry Pi target
    Check {
        /// Cross-compilation target for the platform and bringup crates
        #[arg(long, default_value = check::DEFAULT_CROSS_TARGET)]
        target: String,
        /// Skip the cross-target check (no target toolchain installed)
        #[arg(long)]
        host_only: bool,
    },
    /// Run all tests (unit, integration and doc)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { target, host_only } => {
            check::run((!host_only).then_some(target.as_str()))
        }
        Commands::Test { unit, integration } => test::run(unit, integration),
    }
}
