// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for plan decoding and validation.

/// Errors raised while decoding, validating or encoding an engine plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The artifact is shorter than the fixed preamble.
    #[error("artifact too short: {len} bytes, preamble needs {needed}")]
    TooShort { len: usize, needed: usize },

    /// The artifact does not start with the plan magic.
    #[error("bad magic: not an engine plan")]
    BadMagic,

    /// The container version is not supported by this decoder.
    #[error("unsupported plan version {0}")]
    UnsupportedVersion(u32),

    /// The declared header length disagrees with the artifact length.
    #[error("header length {declared} does not match the {available} bytes that follow the preamble")]
    HeaderLength { declared: u64, available: usize },

    /// The JSON header is malformed.
    #[error("malformed plan header: {0}")]
    Header(#[from] serde_json::Error),

    /// A tensor declaration is inconsistent.
    #[error("invalid tensor '{tensor}': {detail}")]
    InvalidTensor { tensor: String, detail: String },

    /// A kernel references missing tensors or mismatched sizes.
    #[error("invalid kernel #{index}: {detail}")]
    InvalidKernel { index: usize, detail: String },
}
