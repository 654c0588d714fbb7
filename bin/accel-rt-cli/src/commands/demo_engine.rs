// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-rt demo-engine` command: write a serialized engine for the
//! simulated device.

use anyhow::{bail, Context};
use plan_format::{Kernel, PlanBuilder};
use std::path::PathBuf;

pub async fn execute(out: PathBuf, kind: String, dtype: String, shape: String) -> anyhow::Result<()> {
    let dims = parse_shape(&shape)?;
    let builder = build(&kind, &dtype, &dims)?;
    let plan = builder.build().context("building demo engine")?;
    let bytes = plan.to_bytes().context("serializing demo engine")?;

    std::fs::write(&out, &bytes)
        .with_context(|| format!("writing engine to '{}'", out.display()))?;
    tracing::info!(path = %out.display(), bytes = bytes.len(), "demo engine written");

    println!("  {}", plan.summary());
    println!("  Wrote {} bytes to {}", bytes.len(), out.display());
    Ok(())
}

fn build(kind: &str, dtype: &str, dims: &[i64]) -> anyhow::Result<PlanBuilder> {
    Ok(match kind.to_lowercase().as_str() {
        "identity" => PlanBuilder::identity("identity", dtype, dims),
        "relu" => PlanBuilder::new("relu")
            .input("x", dtype, dims)
            .output("y", dtype, dims)
            .kernel(Kernel::Relu {
                input: "x".into(),
                output: "y".into(),
            }),
        "resnet" | "resnet50" => PlanBuilder::new("resnet50")
            .input("input", "float32", &[1, 3, 224, 224])
            .output("logits", "float32", &[1, 1000])
            .output("top4", "int32", &[1, 4])
            .metadata("source", "accel-rt demo-engine"),
        other => bail!("unknown engine kind '{other}'; expected 'identity', 'relu' or 'resnet'"),
    })
}

/// Parses `"1,3,224,224"` into dimensions.
fn parse_shape(s: &str) -> anyhow::Result<Vec<i64>> {
    s.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            d.parse::<i64>()
                .with_context(|| format!("invalid dimension '{d}' in shape '{s}'"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shape() {
        assert_eq!(parse_shape("1, 3,224,224").unwrap(), vec![1, 3, 224, 224]);
        assert_eq!(parse_shape("").unwrap(), Vec::<i64>::new());
        assert!(parse_shape("1,x").is_err());
    }

    #[test]
    fn test_resnet_kind_sizes() {
        let plan = build("resnet", "float32", &[]).unwrap().build().unwrap();
        let sizes: Vec<_> = plan.tensors.iter().map(|t| t.byte_size().unwrap()).collect();
        assert_eq!(sizes, vec![602_112, 4000, 16]);
    }

    #[test]
    fn test_unknown_kind() {
        assert!(build("transformer", "float32", &[1]).is_err());
    }

    #[tokio::test]
    async fn test_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("echo.plan");
        execute(out.clone(), "identity".into(), "uint8".into(), "4".into())
            .await
            .unwrap();
        let bytes = std::fs::read(&out).unwrap();
        let plan = plan_format::EnginePlan::from_bytes(&bytes).unwrap();
        assert_eq!(plan.num_tensors(), 2);
    }
}
