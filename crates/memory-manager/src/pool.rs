// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Budget-enforced pool of host staging buffers.
//!
//! The [`HostPool`] hands out [`HostBuffer`]s for the host half of every
//! tensor buffer pair. It:
//!
//! 1. Refuses allocations that would push live bytes past the budget.
//! 2. Keeps returned buffers in a free list binned by power-of-two size
//!    class, so repeated sessions over the same engine reuse memory.
//! 3. Counts allocations and releases so callers can assert no leaks.
//!
//! # Thread Safety
//! `HostPool` is `Send + Sync`; buffers carry an `Arc` back to the pool
//! state so they can be released from any thread.

use crate::{AllocationStats, HostBuffer, MemoryBudget, MemoryError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Smallest size class; smaller requests share the 4 KB bin.
const MIN_SIZE_CLASS: usize = 4096;

/// Pool state shared between the pool handle and outstanding buffers.
pub struct PoolInner {
    budget: MemoryBudget,
    live_bytes: AtomicUsize,
    free_list: Mutex<HashMap<usize, Vec<Vec<u8>>>>,
    free_list_bytes: AtomicUsize,
    stats: Mutex<AllocationStats>,
}

impl PoolInner {
    /// Called by `HostBuffer::drop`.
    pub(crate) fn return_buffer(&self, buffer: Vec<u8>, size_bytes: usize) {
        self.live_bytes.fetch_sub(size_bytes, Ordering::AcqRel);
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_release();
        }

        let class = size_class_for(size_bytes);
        self.free_list_bytes
            .fetch_add(buffer.capacity(), Ordering::AcqRel);
        if let Ok(mut free) = self.free_list.lock() {
            free.entry(class).or_default().push(buffer);
        }
        tracing::trace!(size_bytes, class, "host buffer returned to pool");
    }

    fn take_cached(&self, size_bytes: usize) -> Option<Vec<u8>> {
        let class = size_class_for(size_bytes);
        let mut free = self.free_list.lock().ok()?;
        let mut buf = free.get_mut(&class)?.pop()?;
        self.free_list_bytes
            .fetch_sub(buf.capacity(), Ordering::AcqRel);
        buf.clear();
        buf.resize(size_bytes, 0);
        Some(buf)
    }
}

/// Allocator for host-side tensor buffers.
///
/// # Example
/// ```
/// use memory_manager::{HostPool, MemoryBudget};
///
/// let pool = HostPool::new(MemoryBudget::from_mb(4));
/// let buf = pool.allocate(4000).unwrap();
/// assert_eq!(pool.live_bytes(), 4000);
/// drop(buf);
/// assert_eq!(pool.live_bytes(), 0);
/// assert_eq!(pool.stats().outstanding(), 0);
/// ```
#[derive(Clone)]
pub struct HostPool {
    inner: Arc<PoolInner>,
}

impl HostPool {
    /// Creates an empty pool capped at `budget`.
    pub fn new(budget: MemoryBudget) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                budget,
                live_bytes: AtomicUsize::new(0),
                free_list: Mutex::new(HashMap::new()),
                free_list_bytes: AtomicUsize::new(0),
                stats: Mutex::new(AllocationStats::default()),
            }),
        }
    }

    /// Allocates a zeroed buffer of exactly `size_bytes`.
    ///
    /// Fails with [`MemoryError::ZeroSizedAllocation`] for empty requests
    /// and [`MemoryError::OutOfMemory`] when the budget would be exceeded.
    pub fn allocate(&self, size_bytes: usize) -> Result<HostBuffer, MemoryError> {
        if size_bytes == 0 {
            return Err(MemoryError::ZeroSizedAllocation);
        }

        let budget = self.inner.budget.as_bytes();
        let reserved = self
            .inner
            .live_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                live.checked_add(size_bytes).filter(|&next| next <= budget)
            });
        let live_before = match reserved {
            Ok(prev) => prev,
            Err(live) => {
                if let Ok(mut stats) = self.inner.stats.lock() {
                    stats.record_failure();
                }
                return Err(MemoryError::OutOfMemory {
                    requested_bytes: size_bytes,
                    available_bytes: budget.saturating_sub(live),
                    budget_bytes: budget,
                });
            }
        };

        let cached = self.inner.take_cached(size_bytes);
        let from_free_list = cached.is_some();
        let data = cached.unwrap_or_else(|| vec![0u8; size_bytes]);

        if let Ok(mut stats) = self.inner.stats.lock() {
            stats.record_allocation(size_bytes, from_free_list, live_before + size_bytes);
        }

        Ok(HostBuffer::new(data, Arc::clone(&self.inner), size_bytes))
    }

    /// Bytes currently held by outstanding buffers.
    pub fn live_bytes(&self) -> usize {
        self.inner.live_bytes.load(Ordering::Acquire)
    }

    /// Bytes that can still be allocated before hitting the budget.
    pub fn available_bytes(&self) -> usize {
        self.inner.budget.as_bytes().saturating_sub(self.live_bytes())
    }

    /// The pool's budget.
    pub fn budget(&self) -> MemoryBudget {
        self.inner.budget
    }

    /// Bytes parked in the free list.
    pub fn free_list_bytes(&self) -> usize {
        self.inner.free_list_bytes.load(Ordering::Acquire)
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> AllocationStats {
        self.inner
            .stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Drops every cached free buffer.
    pub fn shrink(&self) {
        if let Ok(mut free) = self.inner.free_list.lock() {
            free.clear();
            self.inner.free_list_bytes.store(0, Ordering::Release);
        }
    }
}

fn size_class_for(size: usize) -> usize {
    size.max(MIN_SIZE_CLASS).next_power_of_two()
}

impl std::fmt::Debug for HostPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostPool")
            .field("budget", &self.inner.budget)
            .field("live_bytes", &self.live_bytes())
            .field("free_list_bytes", &self.free_list_bytes())
            .finish()
    }
}
