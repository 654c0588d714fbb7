// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for host memory management.

/// Errors that can occur while acquiring or using host buffers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// The requested allocation would exceed the host memory budget.
    #[error("host out of memory: requested {requested_bytes} bytes, {available_bytes} available (budget: {budget_bytes})")]
    OutOfMemory {
        requested_bytes: usize,
        available_bytes: usize,
        budget_bytes: usize,
    },

    /// Zero-byte host buffers are never handed out.
    #[error("cannot allocate zero-sized host buffer")]
    ZeroSizedAllocation,

    /// Data copied into a buffer does not match its size exactly.
    #[error("length mismatch: buffer holds {buffer_bytes} bytes, source has {source_bytes}")]
    LengthMismatch {
        buffer_bytes: usize,
        source_bytes: usize,
    },

    /// A budget string could not be parsed.
    #[error("invalid memory budget '{0}': expected a positive number with an optional K/M/G suffix")]
    InvalidBudget(String),
}
