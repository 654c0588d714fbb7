// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor element types and the fixed element-size table.
//!
//! Accelerator runtimes report element types as small integer codes. The
//! mapping used here follows the conventional runtime numbering:
//!
//! | code | type      | bytes |
//! |------|-----------|-------|
//! | 0    | `float32` | 4     |
//! | 1    | `float16` | 2     |
//! | 2    | `int8`    | 1     |
//! | 3    | `int32`   | 4     |
//! | 4    | `bool`    | 1     |
//! | 5    | `uint8`   | 1     |
//! | 6    | `fp8`     | 1     |
//!
//! Any other code is unrecognised and has an element size of 0.

use std::fmt;

/// Element type of a tensor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit IEEE 754 floating point.
    F32,
    /// 16-bit IEEE 754 floating point.
    F16,
    /// 8-bit signed integer.
    I8,
    /// 32-bit signed integer.
    I32,
    /// Boolean, one byte per element.
    Bool,
    /// 8-bit unsigned integer.
    U8,
    /// 8-bit floating point (E4M3).
    Fp8,
}

impl DType {
    /// All recognised element types, in code order.
    pub const ALL: [DType; 7] = [
        DType::F32,
        DType::F16,
        DType::I8,
        DType::I32,
        DType::Bool,
        DType::U8,
        DType::Fp8,
    ];

    /// Maps a runtime element-type code to a `DType`.
    ///
    /// Returns `None` for unrecognised codes.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DType::F32),
            1 => Some(DType::F16),
            2 => Some(DType::I8),
            3 => Some(DType::I32),
            4 => Some(DType::Bool),
            5 => Some(DType::U8),
            6 => Some(DType::Fp8),
            _ => None,
        }
    }

    /// Returns the runtime element-type code.
    pub fn code(self) -> i32 {
        match self {
            DType::F32 => 0,
            DType::F16 => 1,
            DType::I8 => 2,
            DType::I32 => 3,
            DType::Bool => 4,
            DType::U8 => 5,
            DType::Fp8 => 6,
        }
    }

    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::F16 => 2,
            DType::I8 | DType::Bool | DType::U8 | DType::Fp8 => 1,
        }
    }

    /// Returns the canonical lowercase name (`"float32"`, `"int8"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "float32",
            DType::F16 => "float16",
            DType::I8 => "int8",
            DType::I32 => "int32",
            DType::Bool => "bool",
            DType::U8 => "uint8",
            DType::Fp8 => "fp8",
        }
    }

    /// Parses a type name. Accepts canonical names and short aliases
    /// (`"f32"`, `"half"`, `"i32"`, `"u8"`, ...). Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float32" | "f32" | "float" => Some(DType::F32),
            "float16" | "f16" | "half" => Some(DType::F16),
            "int8" | "i8" => Some(DType::I8),
            "int32" | "i32" => Some(DType::I32),
            "bool" => Some(DType::Bool),
            "uint8" | "u8" => Some(DType::U8),
            "fp8" | "float8" => Some(DType::Fp8),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element size for a raw runtime type code; 0 when the code is unrecognised.
pub fn element_size(code: i32) -> usize {
    DType::from_code(code).map_or(0, DType::size_bytes)
}
