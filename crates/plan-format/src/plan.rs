// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The engine plan: tensor table and kernel list.
//!
//! # Header format
//! ```json
//! {
//!   "name": "resnet-shaped",
//!   "tensors": [
//!     { "name": "input",  "io": "input",  "dtype": "float32", "shape": [1, 3, 224, 224] },
//!     { "name": "logits", "io": "output", "dtype": "float32", "shape": [1, 1000] }
//!   ],
//!   "kernels": [
//!     { "op": "fill", "output": "logits", "byte": 0 }
//!   ]
//! }
//! ```
//!
//! Declarations are deliberately permissive: dynamic (negative) dimensions
//! and unknown dtype names are representable, because rejecting them is
//! the tensor-contract resolver's job. Tensors touched by a kernel must be
//! fully resolvable.

use crate::PlanError;
use std::collections::{BTreeMap, HashMap};
use tensor_core::{DType, Shape};

/// Direction of an I/O tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoMode {
    Input,
    Output,
}

/// One I/O tensor of the plan, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TensorDecl {
    pub name: String,
    pub io: IoMode,
    /// Element type name, e.g. `"float32"`.
    pub dtype: String,
    /// Dimensions; `-1` marks an unresolved dynamic dimension.
    pub shape: Vec<i64>,
}

impl TensorDecl {
    /// Parsed element type, if the name is recognised.
    pub fn dtype(&self) -> Option<DType> {
        DType::parse(&self.dtype)
    }

    /// Runtime element-type code; `-1` for unrecognised names.
    pub fn dtype_code(&self) -> i32 {
        self.dtype().map_or(-1, DType::code)
    }

    /// Byte size, when dtype and every dimension are resolvable.
    pub fn byte_size(&self) -> Option<usize> {
        let dtype = self.dtype()?;
        let shape = Shape::from_signed(&self.shape).ok()?;
        shape.checked_size_bytes(dtype).ok()
    }
}

/// A compute step executed by the simulated accelerator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Kernel {
    /// Byte-for-byte copy; both tensors have the same byte size.
    Identity { input: String, output: String },
    /// Sets every byte of `output` to `byte`.
    Fill { output: String, byte: u8 },
    /// Elementwise `max(x, 0)` over float32 tensors of equal shape.
    Relu { input: String, output: String },
}

impl Kernel {
    /// Tensor written by this kernel.
    pub fn output(&self) -> &str {
        match self {
            Kernel::Identity { output, .. }
            | Kernel::Fill { output, .. }
            | Kernel::Relu { output, .. } => output,
        }
    }

    /// Tensor read by this kernel, if any.
    pub fn input(&self) -> Option<&str> {
        match self {
            Kernel::Identity { input, .. } | Kernel::Relu { input, .. } => Some(input),
            Kernel::Fill { .. } => None,
        }
    }

    /// Short operation name.
    pub fn op_name(&self) -> &'static str {
        match self {
            Kernel::Identity { .. } => "identity",
            Kernel::Fill { .. } => "fill",
            Kernel::Relu { .. } => "relu",
        }
    }
}

/// A decoded engine plan.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EnginePlan {
    pub name: String,
    pub tensors: Vec<TensorDecl>,
    #[serde(default)]
    pub kernels: Vec<Kernel>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl EnginePlan {
    /// Looks up a tensor declaration by name.
    pub fn tensor(&self, name: &str) -> Option<&TensorDecl> {
        self.tensors.iter().find(|t| t.name == name)
    }

    /// Number of declared I/O tensors.
    pub fn num_tensors(&self) -> usize {
        self.tensors.len()
    }

    /// Checks internal consistency.
    ///
    /// - Tensor names are non-empty and unique.
    /// - Kernels reference declared tensors and write only outputs.
    /// - Kernel-touched tensors have a known dtype and static shape.
    /// - `identity` copies between equal byte sizes; `relu` between
    ///   float32 tensors of equal shape.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut by_name: HashMap<&str, &TensorDecl> = HashMap::new();
        for t in &self.tensors {
            if t.name.is_empty() {
                return Err(PlanError::InvalidTensor {
                    tensor: t.name.clone(),
                    detail: "empty tensor name".into(),
                });
            }
            if by_name.insert(t.name.as_str(), t).is_some() {
                return Err(PlanError::InvalidTensor {
                    tensor: t.name.clone(),
                    detail: "duplicate tensor name".into(),
                });
            }
        }

        for (index, kernel) in self.kernels.iter().enumerate() {
            let invalid = |detail: String| PlanError::InvalidKernel { index, detail };
            let resolve = |name: &str| -> Result<(&TensorDecl, usize), PlanError> {
                let decl = by_name
                    .get(name)
                    .copied()
                    .ok_or_else(|| invalid(format!("unknown tensor '{name}'")))?;
                let size = decl.byte_size().ok_or_else(|| {
                    invalid(format!(
                        "tensor '{name}' needs a known dtype and static shape"
                    ))
                })?;
                Ok((decl, size))
            };

            let (out, out_size) = resolve(kernel.output())?;
            if out.io != IoMode::Output {
                return Err(invalid(format!(
                    "{} writes '{}', which is not an output",
                    kernel.op_name(),
                    out.name
                )));
            }

            match kernel {
                Kernel::Identity { input, .. } => {
                    let (_, in_size) = resolve(input)?;
                    if in_size != out_size {
                        return Err(invalid(format!(
                            "identity size mismatch: '{input}' is {in_size} bytes, '{}' is {out_size}",
                            out.name
                        )));
                    }
                }
                Kernel::Relu { input, .. } => {
                    let (inp, _) = resolve(input)?;
                    if inp.dtype() != Some(DType::F32) || out.dtype() != Some(DType::F32) {
                        return Err(invalid("relu requires float32 tensors".into()));
                    }
                    if inp.shape != out.shape {
                        return Err(invalid(format!(
                            "relu shape mismatch: {:?} vs {:?}",
                            inp.shape, out.shape
                        )));
                    }
                }
                Kernel::Fill { .. } => {}
            }
        }

        Ok(())
    }

    /// Returns a one-line summary.
    pub fn summary(&self) -> String {
        let inputs = self.tensors.iter().filter(|t| t.io == IoMode::Input).count();
        format!(
            "plan '{}': {} tensors ({} inputs, {} outputs), {} kernels",
            self.name,
            self.tensors.len(),
            inputs,
            self.tensors.len() - inputs,
            self.kernels.len(),
        )
    }
}
