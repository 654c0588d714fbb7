// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Drives a serialized accelerator engine through one or more inference
//! passes and tears every resource down deterministically.
//!
//! The runtime takes:
//! - A serialized engine artifact, deserialized by a [`device::Device`].
//! - A [`memory_manager::HostPool`] for host staging buffers.
//! - An [`InputSet`] describing how each input tensor is filled.
//!
//! And runs the strict sequence
//! `allocate → bind → upload → compute → download → synchronize → free`
//! on a single stream, reporting failures to a [`DiagnosticSink`].
//!
//! # Type-State Pipeline
//! ```text
//! InferenceSession<Unloaded> → <Loaded> → <Ready> → <Bound> → <Executed> → <Drained>
//!                                            ▲                                 │
//!                                            └──────────── rearm ──────────────┘
//! ```
//! Transitions are compile-time checked. Any failing transition releases
//! what the session holds, newest first, and returns one [`InferenceError`].
//!
//! # Components
//! - [`TensorContract`]: the engine's I/O tensors with exact byte sizes.
//! - [`BufferAllocator`]: one host + device [`BufferPair`] per slot, with
//!   rollback on partial failure.
//! - [`TransferCoordinator`]: uploads and barrier-guarded downloads.
//! - [`ExecutionContext`] / [`ExecutionDriver`]: bindings and compute enqueue.

mod artifact;
mod buffers;
mod config;
mod contract;
mod diagnostics;
mod error;
mod execution;
mod metrics;
mod pipeline;
pub mod preprocess;
pub mod producer;
mod session;
mod transfer;

pub use artifact::SerializedArtifact;
pub use buffers::{BufferAllocator, BufferPair, BufferSet};
pub use config::RuntimeConfig;
pub use contract::{Direction, TensorContract, TensorSlot};
pub use diagnostics::{DiagnosticSink, RecordingSink, Severity, TracingSink};
pub use error::{InferenceError, MemorySpace};
pub use execution::{ExecutionContext, ExecutionDriver};
pub use metrics::InferenceMetrics;
pub use pipeline::{run_inference, InferenceOutput};
pub use producer::{InputProducer, InputSet};
pub use session::{
    preview_values, Bound, Drained, Executed, InferenceSession, Loaded, OutputTensor, Ready,
    SessionOptions, SessionState, Stage, TeardownReport, Unloaded, DEFAULT_SYNC_TIMEOUT,
};
pub use transfer::{TransferCoordinator, TransferRecord};
