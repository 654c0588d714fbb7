// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory budgets with human-readable parsing.
//!
//! A [`MemoryBudget`] caps how many bytes a pool (host staging memory, or
//! the simulated device's global memory) may hand out at once.

use crate::MemoryError;
use std::fmt;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

/// Recognised suffixes, longest first so `"MB"` wins over `"B"`.
const SUFFIXES: [(&str, usize); 7] = [
    ("GB", GIB),
    ("MB", MIB),
    ("KB", KIB),
    ("G", GIB),
    ("M", MIB),
    ("K", KIB),
    ("B", 1),
];

/// A hard memory ceiling in bytes.
///
/// # Examples
/// ```
/// use memory_manager::MemoryBudget;
///
/// let b = MemoryBudget::parse("1G").unwrap();
/// assert_eq!(b.as_mb(), 1024);
/// assert_eq!(MemoryBudget::from_mb(512).to_string(), "512 MB");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct MemoryBudget {
    bytes: usize,
}

impl MemoryBudget {
    /// Creates a budget from a byte count.
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a budget from mebibytes.
    pub fn from_mb(mb: usize) -> Self {
        Self { bytes: mb * MIB }
    }

    /// Creates a budget from gibibytes.
    pub fn from_gb(gb: usize) -> Self {
        Self { bytes: gb * GIB }
    }

    /// Returns the budget in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Returns the budget in mebibytes (truncated).
    pub fn as_mb(&self) -> usize {
        self.bytes / MIB
    }

    /// Parses `"512M"`, `"512MB"`, `"1G"`, `"64K"`, `"100B"` or a plain
    /// byte count. Case-insensitive; surrounding whitespace is ignored.
    /// Zero budgets are rejected.
    pub fn parse(s: &str) -> Result<Self, MemoryError> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();

        let (digits, multiplier) = SUFFIXES
            .iter()
            .find_map(|(suffix, mult)| {
                upper
                    .strip_suffix(suffix)
                    .map(|rest| (rest.trim_end().to_string(), *mult))
            })
            .unwrap_or((upper.clone(), 1));

        let bytes = digits
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_mul(multiplier))
            .filter(|&b| b > 0)
            .ok_or_else(|| MemoryError::InvalidBudget(trimmed.to_string()))?;

        Ok(Self { bytes })
    }
}

impl fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.bytes;
        if b >= GIB && b % GIB == 0 {
            write!(f, "{} GB", b / GIB)
        } else if b >= MIB && b % MIB == 0 {
            write!(f, "{} MB", b / MIB)
        } else if b >= KIB && b % KIB == 0 {
            write!(f, "{} KB", b / KIB)
        } else {
            write!(f, "{b} B")
        }
    }
}
