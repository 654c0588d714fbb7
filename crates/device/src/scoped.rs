// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scoped device resources.
//!
//! [`DeviceAllocation`] and [`Stream`] pair every acquisition with exactly
//! one release: explicitly through `release`/`destroy` (which report
//! errors) or implicitly on drop (which logs them).

use crate::{Device, DeviceError, DevicePtr, StreamId};
use std::sync::Arc;
use std::time::Duration;

/// A device memory region freed when dropped.
pub struct DeviceAllocation<D: Device> {
    device: Arc<D>,
    ptr: DevicePtr,
    size_bytes: usize,
    live: bool,
}

impl<D: Device> DeviceAllocation<D> {
    /// Allocates `size_bytes` of device memory.
    pub fn new(device: &Arc<D>, size_bytes: usize) -> Result<Self, DeviceError> {
        let ptr = device.malloc(size_bytes)?;
        tracing::trace!(%ptr, size_bytes, "device allocation");
        Ok(Self {
            device: Arc::clone(device),
            ptr,
            size_bytes,
            live: true,
        })
    }

    pub fn ptr(&self) -> DevicePtr {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.size_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.size_bytes == 0
    }

    /// Frees the region now, reporting backend errors.
    pub fn release(mut self) -> Result<(), DeviceError> {
        self.live = false;
        self.device.free(self.ptr)
    }
}

impl<D: Device> Drop for DeviceAllocation<D> {
    fn drop(&mut self) {
        if self.live {
            if let Err(e) = self.device.free(self.ptr) {
                tracing::warn!(ptr = %self.ptr, "failed to free device memory: {e}");
            }
        }
    }
}

impl<D: Device> std::fmt::Debug for DeviceAllocation<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAllocation")
            .field("ptr", &self.ptr)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

/// A device stream destroyed when dropped.
pub struct Stream<D: Device> {
    device: Arc<D>,
    id: StreamId,
    live: bool,
}

impl<D: Device> Stream<D> {
    pub fn new(device: &Arc<D>) -> Result<Self, DeviceError> {
        let id = device.create_stream()?;
        Ok(Self {
            device: Arc::clone(device),
            id,
            live: true,
        })
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Waits for every queued operation, bounded by `timeout` if given.
    pub fn synchronize(&self, timeout: Option<Duration>) -> Result<(), DeviceError> {
        self.device.synchronize(self.id, timeout)
    }

    /// `false` once the stream has been destroyed.
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Destroys the stream now, reporting backend errors. Calling it again
    /// is a no-op.
    pub fn destroy(&mut self) -> Result<(), DeviceError> {
        if !self.live {
            return Ok(());
        }
        self.live = false;
        self.device.destroy_stream(self.id)
    }
}

impl<D: Device> Drop for Stream<D> {
    fn drop(&mut self) {
        if self.live {
            if let Err(e) = self.device.destroy_stream(self.id) {
                tracing::warn!(stream = %self.id, "failed to destroy stream: {e}");
            }
        }
    }
}

impl<D: Device> std::fmt::Debug for Stream<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimDevice;

    #[test]
    fn test_allocation_freed_on_drop() {
        let dev = Arc::new(SimDevice::new(1024));
        {
            let a = DeviceAllocation::new(&dev, 512).unwrap();
            assert_eq!(a.len(), 512);
            assert_eq!(dev.stats().live_bytes, 512);
        }
        let stats = dev.stats();
        assert_eq!(stats.live_bytes, 0);
        assert_eq!(stats.mallocs, stats.frees);
    }

    #[test]
    fn test_explicit_release_frees_once() {
        let dev = Arc::new(SimDevice::new(1024));
        let a = DeviceAllocation::new(&dev, 16).unwrap();
        a.release().unwrap();
        assert_eq!(dev.stats().frees, 1);
    }

    #[test]
    fn test_stream_destroyed_on_drop() {
        let dev = Arc::new(SimDevice::new(1024));
        {
            let s = Stream::new(&dev).unwrap();
            s.synchronize(None).unwrap();
        }
        let stats = dev.stats();
        assert_eq!(stats.streams_created, 1);
        assert_eq!(stats.streams_destroyed, 1);
    }

    #[test]
    fn test_explicit_destroy_is_idempotent() {
        let dev = Arc::new(SimDevice::new(1024));
        let mut s = Stream::new(&dev).unwrap();
        s.destroy().unwrap();
        s.destroy().unwrap();
        assert!(!s.is_live());
        drop(s);
        assert_eq!(dev.stats().streams_destroyed, 1);
    }
}
