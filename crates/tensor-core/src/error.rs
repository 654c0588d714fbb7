// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for shape and element handling.

use crate::DType;

/// Errors that can occur while describing or decoding tensors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TensorError {
    /// A dimension reported by the runtime is negative (dynamic or invalid).
    #[error("dimension {index} is negative ({value})")]
    NegativeDimension { index: usize, value: i64 },

    /// The element count or byte size does not fit in `usize`.
    #[error("tensor size overflows for shape {dims:?}")]
    SizeOverflow { dims: Vec<usize> },

    /// The element type code is not in the element-size table.
    #[error("unrecognised element type code {0}")]
    UnknownDType(i32),

    /// A buffer does not have the byte length the shape and dtype require.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// The element type cannot be used for the requested conversion.
    #[error("unsupported dtype {dtype} for {op}")]
    UnsupportedDType { op: &'static str, dtype: DType },
}
