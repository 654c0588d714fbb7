// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fluent construction of engine plans.

use crate::{EnginePlan, IoMode, Kernel, PlanError, TensorDecl};
use std::collections::BTreeMap;

/// Builds an [`EnginePlan`] tensor by tensor.
///
/// # Examples
/// ```
/// use plan_format::{Kernel, PlanBuilder};
///
/// let plan = PlanBuilder::new("scores")
///     .input("image", "float32", &[1, 3, 224, 224])
///     .output("logits", "float32", &[1, 1000])
///     .kernel(Kernel::Fill { output: "logits".into(), byte: 0 })
///     .build()
///     .unwrap();
/// assert_eq!(plan.num_tensors(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    plan: EnginePlan,
}

impl PlanBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            plan: EnginePlan {
                name: name.into(),
                tensors: Vec::new(),
                kernels: Vec::new(),
                metadata: BTreeMap::new(),
            },
        }
    }

    /// Single input `x` copied to single output `y`.
    pub fn identity(name: impl Into<String>, dtype: &str, shape: &[i64]) -> Self {
        Self::new(name)
            .input("x", dtype, shape)
            .output("y", dtype, shape)
            .kernel(Kernel::Identity {
                input: "x".into(),
                output: "y".into(),
            })
    }

    pub fn input(self, name: impl Into<String>, dtype: &str, shape: &[i64]) -> Self {
        self.tensor(name, IoMode::Input, dtype, shape)
    }

    pub fn output(self, name: impl Into<String>, dtype: &str, shape: &[i64]) -> Self {
        self.tensor(name, IoMode::Output, dtype, shape)
    }

    fn tensor(mut self, name: impl Into<String>, io: IoMode, dtype: &str, shape: &[i64]) -> Self {
        self.plan.tensors.push(TensorDecl {
            name: name.into(),
            io,
            dtype: dtype.to_string(),
            shape: shape.to_vec(),
        });
        self
    }

    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.plan.kernels.push(kernel);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.plan.metadata.insert(key.into(), value.into());
        self
    }

    /// Validates and returns the plan.
    pub fn build(self) -> Result<EnginePlan, PlanError> {
        self.plan.validate()?;
        Ok(self.plan)
    }

    /// Validates and serializes the plan into artifact bytes.
    pub fn to_bytes(self) -> Result<Vec<u8>, PlanError> {
        self.plan.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_shape() {
        let plan = PlanBuilder::identity("echo", "int32", &[2, 2]).build().unwrap();
        assert_eq!(plan.tensor("x").unwrap().io, IoMode::Input);
        assert_eq!(plan.tensor("y").unwrap().byte_size(), Some(16));
        assert_eq!(plan.kernels.len(), 1);
    }

    #[test]
    fn test_metadata_preserved() {
        let bytes = PlanBuilder::identity("echo", "uint8", &[4])
            .metadata("producer", "unit-test")
            .to_bytes()
            .unwrap();
        let plan = EnginePlan::from_bytes(&bytes).unwrap();
        assert_eq!(plan.metadata.get("producer").map(String::as_str), Some("unit-test"));
    }

    #[test]
    fn test_build_rejects_dangling_kernel() {
        let err = PlanBuilder::new("broken")
            .output("y", "float32", &[1])
            .kernel(Kernel::Identity {
                input: "missing".into(),
                output: "y".into(),
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_dynamic_dims_are_representable() {
        let plan = PlanBuilder::new("dynamic")
            .input("x", "float32", &[-1, 3])
            .build()
            .unwrap();
        assert_eq!(plan.tensor("x").unwrap().shape, vec![-1, 3]);
    }
}
