// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-rt inspect` command: display an engine's I/O tensor table.
//!
//! Prints what the engine itself reports for every tensor index, then the
//! resolved contract with exact byte sizes, or the reason it cannot be
//! resolved.

use super::{banner, load_config, truncate};
use anyhow::Context;
use device::{Device, EngineInfo, SimDevice};
use runtime::{SerializedArtifact, TensorContract};
use std::path::PathBuf;
use tensor_core::DType;

pub async fn execute(config: Option<PathBuf>, engine: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config.as_deref())?;
    let path = engine.unwrap_or_else(|| config.engine_path.clone());

    banner("accel-rt · Engine Inspector");

    let artifact = SerializedArtifact::read(&path)?;
    let device = SimDevice::new(config.parse_device_memory()?);
    let engine = device
        .deserialize_engine(artifact.as_bytes())
        .with_context(|| format!("deserializing '{}'", path.display()))?;

    // ── Summary ────────────────────────────────────────────────
    println!("  Engine:   {}", engine.name());
    println!("  File:     {} ({} bytes)", path.display(), artifact.len());
    println!("  Tensors:  {}", engine.num_io_tensors());
    println!("  Kernels:  {}", engine.plan().kernels.len());
    for (k, v) in &engine.plan().metadata {
        println!("  {k}: {v}");
    }
    println!();

    // ── Raw tensor table ───────────────────────────────────────
    println!(
        "  {:<4} {:<24} {:<7} {:<9} {:<22}",
        "Idx", "Name", "Mode", "DType", "Shape"
    );
    println!("  {}", "-".repeat(70));
    for index in 0..engine.num_io_tensors().max(0) {
        let Some(name) = engine.io_tensor_name(index) else {
            println!("  {index:<4} <unnamed>");
            continue;
        };
        let mode = engine
            .tensor_io_mode(name)
            .map_or_else(|| "?".to_string(), |m| m.to_string());
        let dtype = match engine.tensor_dtype_code(name) {
            Some(code) => DType::from_code(code)
                .map_or_else(|| format!("code {code}"), |d| d.to_string()),
            None => "?".to_string(),
        };
        let shape = engine
            .tensor_shape(name)
            .map_or_else(|| "?".to_string(), |s| format!("{s:?}"));
        println!(
            "  {:<4} {:<24} {:<7} {:<9} {:<22}",
            index,
            truncate(name, 24),
            mode,
            dtype,
            shape
        );
    }
    println!();

    // ── Resolved contract ──────────────────────────────────────
    match TensorContract::resolve(&engine) {
        Ok(contract) => {
            for line in contract.summary() {
                println!("  {line}");
            }
            println!(
                "  Total: {} bytes ({:.2} MB) of host and of device memory",
                contract.total_bytes(),
                contract.total_bytes() as f64 / (1024.0 * 1024.0),
            );
        }
        Err(e) => {
            tracing::warn!("contract resolution failed: {e}");
            println!("  Contract: unresolvable ({e})");
        }
    }
    println!();
    Ok(())
}
