// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor bindings and compute enqueue.

use crate::{InferenceError, TensorContract};
use device::{Device, DevicePtr, StreamId};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Tensor name → device address table for one compute pass.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Every tensor the engine declares, in contract order.
    expected: Vec<String>,
    bindings: HashMap<String, DevicePtr>,
}

impl ExecutionContext {
    pub fn new(contract: &TensorContract) -> Self {
        Self {
            expected: contract.iter().map(|s| s.name.clone()).collect(),
            bindings: HashMap::with_capacity(contract.len()),
        }
    }

    /// Drops every binding.
    pub fn reset(&mut self) {
        self.bindings.clear();
    }

    /// Records the device address of tensor `name`.
    pub fn bind(&mut self, name: &str, ptr: DevicePtr) -> Result<(), InferenceError> {
        if !self.expected.iter().any(|n| n == name) {
            return Err(InferenceError::Binding {
                tensor: name.to_string(),
            });
        }
        self.bindings.insert(name.to_string(), ptr);
        Ok(())
    }

    pub fn address(&self, name: &str) -> Option<DevicePtr> {
        self.bindings.get(name).copied()
    }

    /// Declared tensors without a binding, in contract order.
    pub fn missing(&self) -> Vec<String> {
        self.expected
            .iter()
            .filter(|n| !self.bindings.contains_key(n.as_str()))
            .cloned()
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.bindings.len() == self.expected.len()
    }

    pub fn bindings(&self) -> &HashMap<String, DevicePtr> {
        &self.bindings
    }
}

/// Enqueues compute passes on one stream.
pub struct ExecutionDriver<'a, D: Device> {
    device: &'a D,
    stream: StreamId,
}

impl<'a, D: Device> ExecutionDriver<'a, D> {
    pub fn new(device: &'a D, stream: StreamId) -> Self {
        Self { device, stream }
    }

    /// Enqueues one compute pass and returns without waiting for it.
    ///
    /// Refused with a binding error, before anything reaches the stream,
    /// when any tensor is unbound.
    pub fn execute(
        &self,
        engine: &D::Engine,
        context: &ExecutionContext,
    ) -> Result<(), InferenceError> {
        let missing = context.missing();
        if !missing.is_empty() {
            return Err(InferenceError::Unbound { missing });
        }
        self.device
            .enqueue(engine, context.bindings(), self.stream)
            .map_err(InferenceError::Execution)?;
        debug!(stream = %self.stream, "compute pass enqueued");
        Ok(())
    }

    /// Explicit stream barrier.
    pub fn synchronize(&self, timeout: Option<Duration>) -> Result<(), InferenceError> {
        self.device
            .synchronize(self.stream, timeout)
            .map_err(InferenceError::Execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::{SimDevice, SimFaults};
    use plan_format::PlanBuilder;

    fn setup() -> (SimDevice, device::SimEngine, TensorContract, StreamId) {
        let dev = SimDevice::new(1 << 20);
        let bytes = PlanBuilder::identity("echo", "float32", &[2]).to_bytes().unwrap();
        let engine = dev.deserialize_engine(&bytes).unwrap();
        let contract = TensorContract::resolve(&engine).unwrap();
        let stream = dev.create_stream().unwrap();
        (dev, engine, contract, stream)
    }

    #[test]
    fn test_unknown_tensor_binding() {
        let (_, _, contract, _) = setup();
        let mut ctx = ExecutionContext::new(&contract);
        assert!(matches!(
            ctx.bind("nope", DevicePtr(0x10)),
            Err(InferenceError::Binding { ref tensor }) if tensor == "nope"
        ));
    }

    #[test]
    fn test_missing_binding_enqueues_nothing() {
        let (dev, engine, contract, stream) = setup();
        let mut ctx = ExecutionContext::new(&contract);
        ctx.bind("x", dev.malloc(8).unwrap()).unwrap();

        let driver = ExecutionDriver::new(&dev, stream);
        let err = driver.execute(&engine, &ctx).unwrap_err();
        assert!(matches!(err, InferenceError::Unbound { ref missing } if missing == &["y"]));
        assert_eq!(dev.pending_ops(stream), 0);
        assert_eq!(dev.stats().computes, 0);
    }

    #[test]
    fn test_reset_clears_bindings() {
        let (dev, _, contract, _) = setup();
        let mut ctx = ExecutionContext::new(&contract);
        ctx.bind("x", dev.malloc(8).unwrap()).unwrap();
        ctx.bind("y", dev.malloc(8).unwrap()).unwrap();
        assert!(ctx.is_complete());
        ctx.reset();
        assert_eq!(ctx.missing(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_execute_is_fire_and_forget() {
        let (dev, engine, contract, stream) = setup();
        let mut ctx = ExecutionContext::new(&contract);
        ctx.bind("x", dev.malloc(8).unwrap()).unwrap();
        ctx.bind("y", dev.malloc(8).unwrap()).unwrap();

        let driver = ExecutionDriver::new(&dev, stream);
        driver.execute(&engine, &ctx).unwrap();
        assert_eq!(dev.pending_ops(stream), 1);
        driver.synchronize(None).unwrap();
        assert_eq!(dev.pending_ops(stream), 0);
    }

    #[test]
    fn test_rejected_enqueue_is_execution_error() {
        let (dev, engine, contract, stream) = setup();
        let mut ctx = ExecutionContext::new(&contract);
        ctx.bind("x", dev.malloc(8).unwrap()).unwrap();
        ctx.bind("y", dev.malloc(8).unwrap()).unwrap();
        dev.inject(SimFaults {
            reject_enqueue: true,
            ..SimFaults::default()
        });
        let driver = ExecutionDriver::new(&dev, stream);
        assert!(matches!(
            driver.execute(&engine, &ctx),
            Err(InferenceError::Execution(_))
        ));
        assert_eq!(dev.pending_ops(stream), 0);
    }
}
