// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Serialized engine artifacts read from storage.

use crate::InferenceError;
use std::io::ErrorKind;
use std::path::Path;

/// The raw bytes of a serialized engine, read fully into memory.
///
/// An artifact is never empty.
#[derive(Clone)]
pub struct SerializedArtifact {
    bytes: Vec<u8>,
    origin: String,
}

impl SerializedArtifact {
    /// Reads the whole file at `path`.
    ///
    /// A missing, unreadable or zero-length file is a load error.
    pub fn read(path: &Path) -> Result<Self, InferenceError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                InferenceError::Load(format!("engine file '{}' not found", path.display()))
            }
            _ => InferenceError::Load(format!("cannot read engine file '{}': {e}", path.display())),
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "engine file read");
        Self::from_bytes(bytes, path.display().to_string())
    }

    /// Wraps in-memory bytes; `origin` is used in diagnostics.
    pub fn from_bytes(bytes: Vec<u8>, origin: impl Into<String>) -> Result<Self, InferenceError> {
        let origin = origin.into();
        if bytes.is_empty() {
            return Err(InferenceError::Load(format!("engine file '{origin}' is empty")));
        }
        Ok(Self { bytes, origin })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; empty artifacts are rejected on construction.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Where the bytes came from.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl std::fmt::Debug for SerializedArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializedArtifact")
            .field("origin", &self.origin)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SerializedArtifact::read(&dir.path().join("absent.engine")).unwrap_err();
        assert!(matches!(err, InferenceError::Load(ref m) if m.contains("not found")));
    }

    #[test]
    fn test_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = SerializedArtifact::read(file.path()).unwrap_err();
        assert!(matches!(err, InferenceError::Load(ref m) if m.contains("empty")));
    }

    #[test]
    fn test_reads_whole_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 300]).unwrap();
        let a = SerializedArtifact::read(file.path()).unwrap();
        assert_eq!(a.len(), 300);
        assert!(a.as_bytes().iter().all(|&b| b == 7));
    }
}
