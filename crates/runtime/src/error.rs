// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the inference pipeline.

use device::DeviceError;
use std::fmt;

/// Which side of a buffer pair an allocation failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySpace {
    Host,
    Device,
}

impl fmt::Display for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemorySpace::Host => "host",
            MemorySpace::Device => "device",
        })
    }
}

/// Errors surfaced by an inference session.
///
/// Exactly one of these reaches the caller per failed session; every
/// resource acquired before the failure has already been released.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The artifact could not be read or the engine could not be created.
    #[error("load error: {0}")]
    Load(String),

    /// The engine's tensor table cannot be turned into a contract.
    #[error("contract error: {0}")]
    Contract(String),

    /// Host or device memory for a tensor could not be obtained.
    #[error("cannot allocate {bytes} bytes of {space} memory for tensor '{tensor}': {detail}")]
    Allocation {
        tensor: String,
        bytes: usize,
        space: MemorySpace,
        detail: String,
    },

    /// A binding named a tensor the engine does not have.
    #[error("binding error: engine has no tensor '{tensor}'")]
    Binding { tensor: String },

    /// An input producer was supplied for a name that is not an input
    /// tensor of the engine.
    #[error("binding error: engine has no input tensor '{tensor}' to feed")]
    NotAnInput { tensor: String },

    /// The compute pass was requested with tensors left unbound.
    #[error("binding error: unbound tensors {missing:?}")]
    Unbound { missing: Vec<String> },

    /// The runtime refused the compute pass; nothing ran.
    #[error("execution error: {0}")]
    Execution(#[source] DeviceError),

    /// A copy between host and device failed or came back short.
    #[error("transfer error on tensor '{tensor}' ({bytes} bytes): {detail}")]
    Transfer {
        tensor: String,
        bytes: usize,
        detail: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl InferenceError {
    /// Lifecycle stage the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            InferenceError::Load(_) => "load",
            InferenceError::Contract(_) => "contract",
            InferenceError::Allocation { .. } => "allocation",
            InferenceError::Binding { .. }
            | InferenceError::NotAnInput { .. }
            | InferenceError::Unbound { .. } => "binding",
            InferenceError::Execution(_) => "execution",
            InferenceError::Transfer { .. } => "transfer",
            InferenceError::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_message_names_tensor_and_space() {
        let e = InferenceError::Allocation {
            tensor: "logits".into(),
            bytes: 4000,
            space: MemorySpace::Device,
            detail: "out of memory".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("'logits'"));
        assert!(msg.contains("4000 bytes of device memory"));
        assert_eq!(e.stage(), "allocation");
    }

    #[test]
    fn test_execution_keeps_source() {
        use std::error::Error;
        let e = InferenceError::Execution(DeviceError::EnqueueRejected("busy".into()));
        assert!(e.source().is_some());
        assert_eq!(e.stage(), "execution");
    }
}
