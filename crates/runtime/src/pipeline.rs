// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! One-shot inference: load, prepare, bind, execute, drain, close.

use crate::session::{InferenceSession, OutputTensor, SessionOptions, TeardownReport};
use crate::{InferenceError, InferenceMetrics, InputSet, SerializedArtifact};
use device::Device;
use std::sync::Arc;

/// The result of a single inference run.
#[derive(Debug)]
pub struct InferenceOutput {
    /// Drained output tensors, in contract order.
    pub outputs: Vec<OutputTensor>,
    pub metrics: InferenceMetrics,
    pub teardown: TeardownReport,
}

impl InferenceOutput {
    pub fn output(&self, name: &str) -> Option<&OutputTensor> {
        self.outputs.iter().find(|o| o.name == name)
    }
}

/// Runs `artifact` once on `device` and closes the session.
pub fn run_inference<D: Device>(
    device: Arc<D>,
    artifact: &SerializedArtifact,
    inputs: &InputSet,
    options: SessionOptions,
) -> Result<InferenceOutput, InferenceError> {
    let drained = InferenceSession::new(device, options)
        .load(artifact)?
        .prepare()?
        .bind()?
        .execute(inputs)?
        .drain()?;
    let outputs = drained.outputs();
    let metrics = drained.metrics().clone();
    let teardown = drained.close();
    Ok(InferenceOutput {
        outputs,
        metrics,
        teardown,
    })
}
