// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accel-rt
//!
//! Command-line interface for the accelerator inference runtime.
//!
//! ## Usage
//! ```bash
//! # Write a demo engine with the classifier contract
//! accel-rt demo-engine --out resnet50.plan --kind resnet
//!
//! # Print its tensor table
//! accel-rt inspect --engine resnet50.plan
//!
//! # Run it with seeded inputs and a bounded barrier
//! accel-rt run --engine resnet50.plan --fill seeded --seed 7 --timeout-ms 5000
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "accel-rt",
    about = "Load, run and tear down serialized accelerator engines",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file; command-line flags override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one or more inference passes on an engine.
    Run(commands::run::RunArgs),

    /// Print an engine's I/O tensor table and byte sizes.
    Inspect {
        /// Path to the serialized engine (defaults to the config's engine_path).
        #[arg(short, long)]
        engine: Option<PathBuf>,
    },

    /// Write a serialized demo engine for the simulated device.
    DemoEngine {
        /// Output path.
        #[arg(short, long)]
        out: PathBuf,

        /// Engine kind: identity, relu, resnet.
        #[arg(short, long, default_value = "identity")]
        kind: String,

        /// Element type for identity and relu engines.
        #[arg(long, default_value = "float32")]
        dtype: String,

        /// Comma-separated shape for identity and relu engines.
        #[arg(long, default_value = "1,3,224,224")]
        shape: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => commands::run::execute(cli.config, args).await,
        Commands::Inspect { engine } => commands::inspect::execute(cli.config, engine).await,
        Commands::DemoEngine {
            out,
            kind,
            dtype,
            shape,
        } => commands::demo_engine::execute(out, kind, dtype, shape).await,
    }
}
