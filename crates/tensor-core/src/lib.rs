// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor descriptors shared by every layer of the inference pipeline.
//!
//! This crate provides:
//! - [`DType`]: the element types an accelerator engine can report, with
//!   the fixed element-size table and runtime type codes.
//! - [`Shape`]: dimension lists with overflow-checked byte-size math.
//! - [`codec`]: little-endian element writers/readers for flat host buffers.
//!
//! # Design Goals
//! - Byte sizes are always `product(shape) × element size`; a zero
//!   dimension is a valid empty tensor.
//! - Untrusted (runtime-reported) shapes go through checked conversions.
//! - Clean error types via `thiserror`.

pub mod codec;
mod dtype;
mod error;
mod shape;

pub use dtype::{element_size, DType};
pub use error::TensorError;
pub use shape::Shape;
