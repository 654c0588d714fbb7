// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host/device buffer pairs for every tensor slot.
//!
//! Each [`BufferPair`] owns one device allocation and, for non-empty slots,
//! one host staging buffer of the same size. Both halves are scoped
//! handles, so a pair that is dropped on an error path releases itself;
//! [`BufferPair::release`] does the same eagerly and reports failures.

use crate::{InferenceError, MemorySpace, TensorContract, TensorSlot};
use device::{Device, DeviceAllocation, DeviceError, DevicePtr};
use memory_manager::{HostBuffer, HostPool};
use std::sync::Arc;
use tracing::{debug, warn};

/// The host and device memory backing one tensor slot.
pub struct BufferPair<D: Device> {
    name: String,
    size_bytes: usize,
    host: Option<HostBuffer>,
    device: Option<DeviceAllocation<D>>,
}

impl<D: Device> BufferPair<D> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Device address, or `None` once released.
    pub fn device_ptr(&self) -> Option<DevicePtr> {
        self.device.as_ref().map(DeviceAllocation::ptr)
    }

    /// Host bytes. Zero-byte slots (and released pairs) have none.
    pub fn host(&self) -> &[u8] {
        match &self.host {
            Some(buf) => buf.as_slice(),
            None => &[],
        }
    }

    pub fn host_mut(&mut self) -> &mut [u8] {
        match &mut self.host {
            Some(buf) => buf.as_mut_slice(),
            None => &mut [],
        }
    }

    pub(crate) fn host_buffer_mut(&mut self) -> Option<&mut HostBuffer> {
        self.host.as_mut()
    }

    /// `true` once both halves have been given back.
    pub fn is_released(&self) -> bool {
        self.host.is_none() && self.device.is_none()
    }

    /// Releases both halves. Calling it again is a no-op.
    pub fn release(&mut self) -> Result<(), DeviceError> {
        if let Some(host) = self.host.take() {
            host.release();
        }
        match self.device.take() {
            Some(dev) => dev.release(),
            None => Ok(()),
        }
    }
}

impl<D: Device> std::fmt::Debug for BufferPair<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPair")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes)
            .field("device_ptr", &self.device_ptr())
            .field("has_host", &self.host.is_some())
            .finish()
    }
}

/// Buffer pairs for a whole contract, in contract order.
pub struct BufferSet<D: Device> {
    pairs: Vec<BufferPair<D>>,
}

impl<D: Device> std::fmt::Debug for BufferSet<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferSet").field("pairs", &self.pairs).finish()
    }
}

impl<D: Device> BufferSet<D> {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&BufferPair<D>> {
        self.pairs.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut BufferPair<D>> {
        self.pairs.iter_mut().find(|p| p.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BufferPair<D>> {
        self.pairs.iter()
    }

    /// Releases every pair, last acquired first. Returns the number of
    /// pairs released and the failures encountered along the way.
    pub fn release_all(&mut self) -> (usize, Vec<String>) {
        let mut released = 0;
        let mut failures = Vec::new();
        for pair in self.pairs.iter_mut().rev() {
            if pair.is_released() {
                continue;
            }
            match pair.release() {
                Ok(()) => released += 1,
                Err(e) => failures.push(format!("release '{}': {e}", pair.name)),
            }
        }
        (released, failures)
    }
}

/// Acquires buffer pairs from a device and a host pool.
pub struct BufferAllocator<D: Device> {
    device: Arc<D>,
    host: HostPool,
}

impl<D: Device> BufferAllocator<D> {
    pub fn new(device: Arc<D>, host: HostPool) -> Self {
        Self { device, host }
    }

    /// Allocates the device half, then the host half.
    ///
    /// If the host half fails, the device half is released before the
    /// error is returned.
    pub fn allocate(&self, slot: &TensorSlot) -> Result<BufferPair<D>, InferenceError> {
        let size = slot.size_bytes;
        let device = DeviceAllocation::new(&self.device, size).map_err(|e| {
            InferenceError::Allocation {
                tensor: slot.name.clone(),
                bytes: size,
                space: MemorySpace::Device,
                detail: e.to_string(),
            }
        })?;

        let host = if size > 0 {
            let buf = self.host.allocate(size).map_err(|e| InferenceError::Allocation {
                tensor: slot.name.clone(),
                bytes: size,
                space: MemorySpace::Host,
                detail: e.to_string(),
            })?;
            Some(buf)
        } else {
            None
        };

        debug!(tensor = %slot.name, bytes = size, ptr = %device.ptr(), "buffer pair allocated");
        Ok(BufferPair {
            name: slot.name.clone(),
            size_bytes: size,
            host,
            device: Some(device),
        })
    }

    /// Releases both halves of `pair`; idempotent.
    pub fn release(&self, pair: &mut BufferPair<D>) -> Result<(), InferenceError> {
        pair.release().map_err(|e| InferenceError::Allocation {
            tensor: pair.name.clone(),
            bytes: pair.size_bytes,
            space: MemorySpace::Device,
            detail: format!("release failed: {e}"),
        })
    }

    /// Allocates a pair for every slot in order.
    ///
    /// When slot N fails, the N−1 pairs already acquired are released
    /// (newest first) before the error is returned.
    pub fn allocate_all(&self, contract: &TensorContract) -> Result<BufferSet<D>, InferenceError> {
        let mut pairs: Vec<BufferPair<D>> = Vec::with_capacity(contract.len());
        for slot in contract {
            match self.allocate(slot) {
                Ok(pair) => pairs.push(pair),
                Err(e) => {
                    let acquired = pairs.len();
                    let mut rollback = BufferSet { pairs };
                    let (_, failures) = rollback.release_all();
                    for f in &failures {
                        warn!("rollback: {f}");
                    }
                    debug!(acquired, tensor = %slot.name, "allocation failed, earlier pairs released");
                    return Err(e);
                }
            }
        }
        Ok(BufferSet { pairs })
    }

    pub fn host_pool(&self) -> &HostPool {
        &self.host
    }
}
