// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-rt run` command: execute inference passes on an engine.
//!
//! Walks the full type-state lifecycle:
//! ```text
//! InferenceSession<Unloaded> → load_file → <Loaded> → prepare → <Ready>
//!     → bind → <Bound> → execute → <Executed> → drain → <Drained> → close
//! ```
//! Extra passes rearm the drained session instead of reallocating.

use super::{banner, load_config};
use anyhow::{bail, Context};
use clap::Args;
use device::SimDevice;
use runtime::producer::RawBytes;
use runtime::{InferenceMetrics, InferenceSession, InputSet, OutputTensor, RuntimeConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to the serialized engine (defaults to the config's engine_path).
    #[arg(short, long)]
    pub engine: Option<PathBuf>,

    /// Host staging memory budget (e.g., "512M").
    #[arg(short, long)]
    pub budget: Option<String>,

    /// Simulated device memory capacity (e.g., "1G").
    #[arg(long)]
    pub device_memory: Option<String>,

    /// Input fill for tensors without --input: zeros, constant:<v>, seeded.
    #[arg(short, long)]
    pub fill: Option<String>,

    /// Seed for seeded fill.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Raw input bytes for one tensor, as NAME=PATH (repeatable).
    #[arg(short, long = "input", value_name = "NAME=PATH")]
    pub inputs: Vec<String>,

    /// Bound on stream barriers in milliseconds; 0 waits indefinitely.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Output values printed per tensor.
    #[arg(long)]
    pub preview: Option<usize>,

    /// Number of inference passes.
    #[arg(short = 'n', long, default_value_t = 1)]
    pub passes: usize,

    /// Directory to write each output's raw bytes into (`<name>.bin`).
    #[arg(long)]
    pub dump_dir: Option<PathBuf>,

    /// Print the final metrics as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(config: Option<PathBuf>, args: RunArgs) -> anyhow::Result<()> {
    let config = apply_overrides(load_config(config.as_deref())?, &args);
    if args.passes == 0 {
        bail!("--passes must be at least 1");
    }

    banner("accel-rt · Inference Runner");
    println!("  Config:");
    println!("   Engine:   {}", config.engine_path.display());
    println!("   Host:     {}", config.host_memory_budget);
    println!("   Device:   {}", config.device_memory);
    println!("   Fill:     {}", config.input_fill);
    match config.sync_timeout() {
        Some(t) => println!("   Timeout:  {t:?}"),
        None => println!("   Timeout:  none"),
    }
    println!("   Passes:   {}", args.passes);
    println!();

    let inputs = build_inputs(&config, &args.inputs)?;
    let passes = args.passes;
    let preview = config.preview_count;

    // The session blocks on stream barriers; keep it off the async workers.
    let (outputs, metrics) =
        tokio::task::spawn_blocking(move || run_passes(&config, &inputs, passes))
            .await
            .context("inference task panicked")??;

    print_outputs(&outputs, preview);
    if let Some(dir) = &args.dump_dir {
        dump_outputs(dir, &outputs)?;
    }

    println!("  Metrics:");
    println!("   {}", metrics.summary());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    }
    println!();
    Ok(())
}

fn apply_overrides(mut config: RuntimeConfig, args: &RunArgs) -> RuntimeConfig {
    if let Some(engine) = &args.engine {
        config.engine_path = engine.clone();
    }
    if let Some(budget) = &args.budget {
        config.host_memory_budget = budget.clone();
    }
    if let Some(mem) = &args.device_memory {
        config.device_memory = mem.clone();
    }
    if let Some(fill) = &args.fill {
        config.input_fill = fill.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(ms) = args.timeout_ms {
        config.sync_timeout_ms = ms;
    }
    if let Some(n) = args.preview {
        config.preview_count = n;
    }
    config
}

fn build_inputs(config: &RuntimeConfig, args: &[String]) -> anyhow::Result<InputSet> {
    let mut inputs = InputSet::with_default(config.create_producer()?);
    for arg in args {
        let (name, path) = arg
            .split_once('=')
            .with_context(|| format!("--input '{arg}' is not NAME=PATH"))?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading input '{name}' from '{path}'"))?;
        tracing::debug!(tensor = name, bytes = bytes.len(), "raw input loaded");
        inputs.insert(name, RawBytes(bytes));
    }
    Ok(inputs)
}

fn run_passes(
    config: &RuntimeConfig,
    inputs: &InputSet,
    passes: usize,
) -> anyhow::Result<(Vec<OutputTensor>, InferenceMetrics)> {
    let device = Arc::new(SimDevice::new(config.parse_device_memory()?));
    let options = config.session_options()?;

    println!("  [1/3] Loading engine...");
    let loaded = InferenceSession::new(device, options).load_file(&config.engine_path)?;

    println!("  [2/3] Resolving contract and allocating buffers...");
    let mut ready = loaded.prepare()?;
    for line in ready.contract().summary() {
        println!("        {line}");
    }

    println!("  [3/3] Running {passes} pass(es)...");
    let mut pass = 1;
    loop {
        let drained = ready.bind()?.execute(inputs)?.drain()?;
        tracing::info!(pass, "pass drained");
        if pass == passes {
            let outputs = drained.outputs();
            let metrics = drained.metrics().clone();
            let report = drained.close();
            println!("        {}", report.summary());
            println!();
            if !report.is_clean() {
                bail!("teardown reported errors: {}", report.errors.join("; "));
            }
            return Ok((outputs, metrics));
        }
        ready = drained.rearm();
        pass += 1;
    }
}

fn print_outputs(outputs: &[OutputTensor], preview: usize) {
    println!("  Outputs:");
    for line in output_lines(outputs, preview) {
        println!("   {line}");
    }
    println!();
}

/// One line per output: name, dtype, shape and the first `preview` values.
fn output_lines(outputs: &[OutputTensor], preview: usize) -> Vec<String> {
    outputs
        .iter()
        .map(|out| {
            let values = match out.preview(preview) {
                Ok(v) => format!("{v:?}"),
                Err(e) => format!("<{e}>"),
            };
            let more = if out.shape.num_elements() > preview { " ..." } else { "" };
            format!("{} {} {}: {values}{more}", out.name, out.dtype, out.shape)
        })
        .collect()
}

fn dump_outputs(dir: &Path, outputs: &[OutputTensor]) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating dump directory '{}'", dir.display()))?;
    for out in outputs {
        let path = dir.join(format!("{}.bin", out.name));
        std::fs::write(&path, &out.bytes)
            .with_context(|| format!("writing '{}'", path.display()))?;
        println!("  Wrote {} ({} bytes)", path.display(), out.bytes.len());
    }
    Ok(())
}
