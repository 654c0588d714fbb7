// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # plan-format
//!
//! The serialized engine plan understood by the simulated accelerator.
//!
//! A plan is an ordered table of I/O tensors plus a short list of kernels
//! that the device runs when a compute pass is enqueued. Plans are wrapped
//! in a small binary container (see [`container`]) so that arbitrary files
//! are rejected before any JSON parsing happens.

pub mod container;
mod builder;
mod error;
mod plan;

pub use builder::PlanBuilder;
pub use container::{FORMAT_VERSION, MAGIC};
pub use error::PlanError;
pub use plan::{EnginePlan, IoMode, Kernel, TensorDecl};
