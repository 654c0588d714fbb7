// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII host buffer that returns its memory to the pool on drop.
//!
//! A [`HostBuffer`] is the host half of a tensor's buffer pair. Dropping it
//! (or calling [`HostBuffer::release`]) hands the bytes back to the
//! [`HostPool`](crate::HostPool) exactly once; the borrow checker rules out
//! use after release.

use crate::pool::PoolInner;
use crate::MemoryError;
use std::sync::Arc;

/// An exclusively owned host byte region.
pub struct HostBuffer {
    /// `None` only while being returned in `drop`.
    data: Option<Vec<u8>>,
    pool: Arc<PoolInner>,
    size_bytes: usize,
}

impl HostBuffer {
    pub(crate) fn new(data: Vec<u8>, pool: Arc<PoolInner>, size_bytes: usize) -> Self {
        Self {
            data: Some(data),
            pool,
            size_bytes,
        }
    }

    /// Size of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.size_bytes
    }

    /// `false` for every pool-issued buffer; zero-byte requests are refused.
    pub fn is_empty(&self) -> bool {
        self.size_bytes == 0
    }

    /// Read access to the bytes.
    pub fn as_slice(&self) -> &[u8] {
        match &self.data {
            Some(d) => &d[..self.size_bytes],
            None => &[],
        }
    }

    /// Write access to the bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let size = self.size_bytes;
        match &mut self.data {
            Some(d) => &mut d[..size],
            None => &mut [],
        }
    }

    /// Overwrites the whole buffer with `src`.
    ///
    /// The copy is all-or-nothing: `src` must be exactly [`len`](Self::len)
    /// bytes long.
    pub fn copy_from(&mut self, src: &[u8]) -> Result<(), MemoryError> {
        if src.len() != self.size_bytes {
            return Err(MemoryError::LengthMismatch {
                buffer_bytes: self.size_bytes,
                source_bytes: src.len(),
            });
        }
        self.as_mut_slice().copy_from_slice(src);
        Ok(())
    }

    /// Returns the buffer to its pool now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        if let Some(data) = self.data.take() {
            self.pool.return_buffer(data, self.size_bytes);
        }
    }
}

impl std::fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBuffer")
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}
