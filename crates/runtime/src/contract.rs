// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor contract resolution.
//!
//! A [`TensorContract`] is the engine's I/O tensor table turned into
//! validated [`TensorSlot`]s: every slot has a known element type, a static
//! non-negative shape and an exact byte size. Resolution only reads the
//! engine; it has no side effects.

use crate::InferenceError;
use device::{EngineInfo, TensorIoMode};
use std::collections::HashSet;
use std::fmt;
use tensor_core::{DType, Shape};

/// Whether the host writes or reads a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl From<TensorIoMode> for Direction {
    fn from(mode: TensorIoMode) -> Self {
        match mode {
            TensorIoMode::Input => Direction::Input,
            TensorIoMode::Output => Direction::Output,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Input => "input",
            Direction::Output => "output",
        })
    }
}

/// One resolved I/O tensor.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TensorSlot {
    pub name: String,
    pub direction: Direction,
    pub dtype: DType,
    pub shape: Shape,
    /// `product(shape) × element size`.
    pub size_bytes: usize,
}

impl TensorSlot {
    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == Direction::Output
    }
}

impl fmt::Display for TensorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<6} '{}' {} {} = {} bytes",
            self.direction.to_string(),
            self.name,
            self.dtype,
            self.shape,
            self.size_bytes
        )
    }
}

/// The ordered, validated I/O tensor table of an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorContract {
    engine_name: String,
    slots: Vec<TensorSlot>,
}

impl TensorContract {
    /// Walks the engine's tensors in index order and validates each one.
    ///
    /// Fails on a non-positive tensor count, a missing name, direction,
    /// element type or shape, an unrecognised element type, a negative
    /// dimension, a duplicate name, or a byte size that overflows.
    pub fn resolve<E: EngineInfo + ?Sized>(engine: &E) -> Result<Self, InferenceError> {
        let engine_name = engine.name().to_string();
        let count = engine.num_io_tensors();
        if count <= 0 {
            return Err(InferenceError::Contract(format!(
                "engine '{engine_name}' reports {count} I/O tensors"
            )));
        }

        let mut seen = HashSet::new();
        let mut slots = Vec::with_capacity(count as usize);
        for index in 0..count {
            let name = engine
                .io_tensor_name(index)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    InferenceError::Contract(format!("tensor #{index} has no name"))
                })?
                .to_string();
            if !seen.insert(name.clone()) {
                return Err(InferenceError::Contract(format!(
                    "tensor name '{name}' appears more than once"
                )));
            }

            let missing = |what: &str| {
                InferenceError::Contract(format!("engine reports no {what} for tensor '{name}'"))
            };
            let direction: Direction = engine
                .tensor_io_mode(&name)
                .ok_or_else(|| missing("direction"))?
                .into();
            let code = engine
                .tensor_dtype_code(&name)
                .ok_or_else(|| missing("element type"))?;
            let dims = engine.tensor_shape(&name).ok_or_else(|| missing("shape"))?;

            let dtype = DType::from_code(code).ok_or_else(|| {
                InferenceError::Contract(format!(
                    "tensor '{name}' has unrecognised element type code {code}"
                ))
            })?;
            let shape = Shape::from_signed(&dims)
                .map_err(|e| InferenceError::Contract(format!("tensor '{name}': {e}")))?;
            let size_bytes = shape
                .checked_size_bytes(dtype)
                .map_err(|e| InferenceError::Contract(format!("tensor '{name}': {e}")))?;

            slots.push(TensorSlot {
                name,
                direction,
                dtype,
                shape,
                size_bytes,
            });
        }

        Ok(Self { engine_name, slots })
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All slots in engine order. Can be walked any number of times.
    pub fn iter(&self) -> std::slice::Iter<'_, TensorSlot> {
        self.slots.iter()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &TensorSlot> {
        self.slots.iter().filter(|s| s.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &TensorSlot> {
        self.slots.iter().filter(|s| s.is_output())
    }

    pub fn slot(&self, name: &str) -> Option<&TensorSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Sum of all slot sizes.
    pub fn total_bytes(&self) -> usize {
        self.slots.iter().map(|s| s.size_bytes).sum()
    }

    /// One line per slot, headed by the engine name and tensor count.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.slots.len() + 1);
        lines.push(format!(
            "engine '{}': {} I/O tensors, {} bytes",
            self.engine_name,
            self.slots.len(),
            self.total_bytes()
        ));
        lines.extend(self.slots.iter().map(|s| format!("  {s}")));
        lines
    }
}

impl<'a> IntoIterator for &'a TensorContract {
    type Item = &'a TensorSlot;
    type IntoIter = std::slice::Iter<'a, TensorSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A hand-built tensor table with holes the real backends never have.
    #[derive(Default)]
    struct FakeEngine {
        count: Option<i32>,
        tensors: Vec<(Option<&'static str>, Option<TensorIoMode>, Option<i32>, Option<Vec<i64>>)>,
    }

    impl FakeEngine {
        fn with(mut self, name: &'static str, mode: TensorIoMode, code: i32, shape: &[i64]) -> Self {
            self.tensors
                .push((Some(name), Some(mode), Some(code), Some(shape.to_vec())));
            self
        }

        fn find(&self, name: &str) -> Option<usize> {
            self.tensors.iter().position(|t| t.0 == Some(name))
        }
    }

    impl EngineInfo for FakeEngine {
        fn name(&self) -> &str {
            "fake"
        }
        fn num_io_tensors(&self) -> i32 {
            self.count.unwrap_or(self.tensors.len() as i32)
        }
        fn io_tensor_name(&self, index: i32) -> Option<&str> {
            self.tensors.get(index as usize).and_then(|t| t.0)
        }
        fn tensor_io_mode(&self, name: &str) -> Option<TensorIoMode> {
            self.find(name).and_then(|i| self.tensors[i].1)
        }
        fn tensor_dtype_code(&self, name: &str) -> Option<i32> {
            self.find(name).and_then(|i| self.tensors[i].2)
        }
        fn tensor_shape(&self, name: &str) -> Option<Vec<i64>> {
            self.find(name).and_then(|i| self.tensors[i].3.clone())
        }
    }

    fn resnet_like() -> FakeEngine {
        FakeEngine::default()
            .with("input", TensorIoMode::Input, 0, &[1, 3, 224, 224])
            .with("logits", TensorIoMode::Output, 0, &[1, 1000])
            .with("top4", TensorIoMode::Output, 3, &[1, 4])
    }

    #[test]
    fn test_resolve_sizes() {
        let c = TensorContract::resolve(&resnet_like()).unwrap();
        let sizes: Vec<usize> = c.iter().map(|s| s.size_bytes).collect();
        assert_eq!(sizes, vec![602_112, 4000, 16]);
        assert_eq!(c.inputs().count(), 1);
        assert_eq!(c.outputs().count(), 2);
        assert_eq!(c.slot("top4").unwrap().dtype, DType::I32);
    }

    #[test]
    fn test_sequence_is_restartable() {
        let c = TensorContract::resolve(&resnet_like()).unwrap();
        let first: Vec<&str> = c.iter().map(|s| s.name.as_str()).collect();
        let second: Vec<&str> = (&c).into_iter().map(|s| s.name.as_str()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_dim_is_valid_empty_slot() {
        let e = FakeEngine::default().with("x", TensorIoMode::Input, 0, &[0, 3]);
        let c = TensorContract::resolve(&e).unwrap();
        assert_eq!(c.slot("x").unwrap().size_bytes, 0);
    }

    #[test]
    fn test_scalar_has_one_element() {
        let e = FakeEngine::default().with("x", TensorIoMode::Input, 3, &[]);
        let c = TensorContract::resolve(&e).unwrap();
        assert_eq!(c.slot("x").unwrap().size_bytes, 4);
    }

    #[test]
    fn test_non_positive_count() {
        let e = FakeEngine::default();
        assert!(matches!(TensorContract::resolve(&e), Err(InferenceError::Contract(_))));

        let e = FakeEngine {
            count: Some(-2),
            ..FakeEngine::default()
        };
        assert!(TensorContract::resolve(&e).is_err());
    }

    #[test]
    fn test_count_beyond_table_is_missing_name() {
        let e = FakeEngine {
            count: Some(2),
            ..FakeEngine::default()
        }
        .with("x", TensorIoMode::Input, 0, &[1]);
        let err = TensorContract::resolve(&e).unwrap_err();
        assert!(err.to_string().contains("#1 has no name"));
    }

    #[test]
    fn test_missing_fields() {
        let mut e = FakeEngine::default().with("x", TensorIoMode::Input, 0, &[1]);
        e.tensors[0].1 = None;
        assert!(TensorContract::resolve(&e).unwrap_err().to_string().contains("direction"));

        let mut e = FakeEngine::default().with("x", TensorIoMode::Input, 0, &[1]);
        e.tensors[0].3 = None;
        assert!(TensorContract::resolve(&e).unwrap_err().to_string().contains("shape"));
    }

    #[test]
    fn test_dynamic_dimension_rejected() {
        let e = FakeEngine::default().with("x", TensorIoMode::Input, 0, &[-1, 3, 224, 224]);
        let err = TensorContract::resolve(&e).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_unknown_dtype_rejected() {
        let e = FakeEngine::default().with("x", TensorIoMode::Input, 42, &[1]);
        assert!(TensorContract::resolve(&e).unwrap_err().to_string().contains("42"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let e = FakeEngine::default()
            .with("x", TensorIoMode::Input, 0, &[1])
            .with("x", TensorIoMode::Output, 0, &[1]);
        assert!(TensorContract::resolve(&e)
            .unwrap_err()
            .to_string()
            .contains("more than once"));
    }

    #[test]
    fn test_summary_lines() {
        let c = TensorContract::resolve(&resnet_like()).unwrap();
        let lines = c.summary();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("3 I/O tensors"));
        assert!(lines[1].contains("'input'"));
        assert!(lines[1].contains("602112 bytes"));
    }
}
