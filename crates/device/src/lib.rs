// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # device
//!
//! Accelerator runtime abstraction for the inference pipeline.
//!
//! This crate provides:
//! - [`Device`] and [`EngineInfo`]: the operations the pipeline needs from
//!   a vendor runtime (engines, global memory, streams, async copies,
//!   compute enqueue, stream barrier).
//! - [`DeviceAllocation`] and [`Stream`]: scoped handles that free their
//!   resource exactly once.
//! - [`SimDevice`]: a deterministic in-process backend with deferred
//!   stream execution, an event trace, counters and fault switches.

mod backend;
mod error;
mod handle;
mod scoped;
pub mod sim;

pub use backend::{Device, EngineInfo};
pub use error::DeviceError;
pub use handle::{CopyTicket, DevicePtr, StreamId, TensorIoMode};
pub use scoped::{DeviceAllocation, Stream};
pub use sim::{SimDevice, SimEngine, SimFaults, SimStats};
