// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Binary container around the JSON plan header.
//!
//! ```text
//! offset  size  field
//! 0       8     magic  b"ACCPLAN\0"
//! 8       4     version (u32 LE), currently 1
//! 12      8     header length N (u64 LE)
//! 20      N     UTF-8 JSON header
//! ```
//!
//! The header length must account for every remaining byte.

use crate::{EnginePlan, PlanError};
use tracing::debug;

/// Leading bytes of every serialized plan.
pub const MAGIC: [u8; 8] = *b"ACCPLAN\0";

/// Container version written by [`EnginePlan::to_bytes`].
pub const FORMAT_VERSION: u32 = 1;

/// Size of the fixed preamble before the JSON header.
pub const PREAMBLE_LEN: usize = 8 + 4 + 8;

impl EnginePlan {
    /// Decodes and validates a serialized plan.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PlanError> {
        if bytes.len() < PREAMBLE_LEN {
            return Err(PlanError::TooShort {
                len: bytes.len(),
                needed: PREAMBLE_LEN,
            });
        }
        let (magic, rest) = bytes.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err(PlanError::BadMagic);
        }

        let (version, rest) = rest.split_at(4);
        let version = u32::from_le_bytes([version[0], version[1], version[2], version[3]]);
        if version != FORMAT_VERSION {
            return Err(PlanError::UnsupportedVersion(version));
        }

        let (len_bytes, header) = rest.split_at(8);
        let mut raw = [0u8; 8];
        raw.copy_from_slice(len_bytes);
        let declared = u64::from_le_bytes(raw);
        if declared != header.len() as u64 {
            return Err(PlanError::HeaderLength {
                declared,
                available: header.len(),
            });
        }

        let plan: EnginePlan = serde_json::from_slice(header)?;
        plan.validate()?;
        debug!(
            name = %plan.name,
            tensors = plan.tensors.len(),
            kernels = plan.kernels.len(),
            "Decoded engine plan"
        );
        Ok(plan)
    }

    /// Validates and encodes the plan into its container form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PlanError> {
        self.validate()?;
        let header = serde_json::to_vec(self)?;
        let mut out = Vec::with_capacity(PREAMBLE_LEN + header.len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(header.len() as u64).to_le_bytes());
        out.extend_from_slice(&header);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlanBuilder;

    fn sample() -> EnginePlan {
        PlanBuilder::identity("echo", "float32", &[1, 8]).build().unwrap()
    }

    #[test]
    fn test_encode_decode() {
        let plan = sample();
        let bytes = plan.to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"ACCPLAN\0");
        assert_eq!(EnginePlan::from_bytes(&bytes).unwrap(), plan);
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            EnginePlan::from_bytes(b"ACC"),
            Err(PlanError::TooShort { len: 3, .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(matches!(EnginePlan::from_bytes(&bytes), Err(PlanError::BadMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[8..12].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            EnginePlan::from_bytes(&bytes),
            Err(PlanError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes.push(0);
        assert!(matches!(
            EnginePlan::from_bytes(&bytes),
            Err(PlanError::HeaderLength { .. })
        ));
    }

    #[test]
    fn test_truncated_header_rejected() {
        let bytes = sample().to_bytes().unwrap();
        let cut = &bytes[..bytes.len() - 4];
        assert!(matches!(
            EnginePlan::from_bytes(cut),
            Err(PlanError::HeaderLength { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        let body = b"{not json";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u64).to_le_bytes());
        bytes.extend_from_slice(body);
        assert!(matches!(EnginePlan::from_bytes(&bytes), Err(PlanError::Header(_))));
    }
}
