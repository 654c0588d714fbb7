// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Engine handle produced by the simulated device.

use crate::{EngineInfo, TensorIoMode};
use plan_format::{EnginePlan, IoMode};

/// A deserialized plan, ready to be enqueued on a [`SimDevice`](super::SimDevice).
#[derive(Debug, Clone)]
pub struct SimEngine {
    plan: EnginePlan,
}

impl SimEngine {
    pub(crate) fn new(plan: EnginePlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &EnginePlan {
        &self.plan
    }
}

impl EngineInfo for SimEngine {
    fn name(&self) -> &str {
        &self.plan.name
    }

    fn num_io_tensors(&self) -> i32 {
        i32::try_from(self.plan.tensors.len()).unwrap_or(i32::MAX)
    }

    fn io_tensor_name(&self, index: i32) -> Option<&str> {
        let index = usize::try_from(index).ok()?;
        self.plan.tensors.get(index).map(|t| t.name.as_str())
    }

    fn tensor_io_mode(&self, name: &str) -> Option<TensorIoMode> {
        self.plan.tensor(name).map(|t| match t.io {
            IoMode::Input => TensorIoMode::Input,
            IoMode::Output => TensorIoMode::Output,
        })
    }

    fn tensor_dtype_code(&self, name: &str) -> Option<i32> {
        self.plan.tensor(name).map(|t| t.dtype_code())
    }

    fn tensor_shape(&self, name: &str) -> Option<Vec<i64>> {
        self.plan.tensor(name).map(|t| t.shape.clone())
    }
}
