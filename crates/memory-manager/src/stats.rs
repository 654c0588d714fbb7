// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host pool accounting.
//!
//! [`AllocationStats`] is how callers prove that every acquired host buffer
//! was released: after a session, `outstanding()` must be zero.

/// Cumulative counters for a [`HostPool`](crate::HostPool).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AllocationStats {
    /// Successful allocations.
    pub total_allocations: u64,
    /// Allocations served from the free list.
    pub cache_hits: u64,
    /// Allocations that required fresh memory.
    pub cache_misses: u64,
    /// Requests refused because of the budget.
    pub failed_allocations: u64,
    /// Buffers returned to the pool.
    pub total_releases: u64,
    /// High-water mark of live bytes.
    pub peak_live_bytes: usize,
    /// Bytes handed out over the pool's lifetime.
    pub cumulative_bytes: u64,
}

impl AllocationStats {
    /// Buffers allocated but not yet released.
    pub fn outstanding(&self) -> u64 {
        self.total_allocations.saturating_sub(self.total_releases)
    }

    /// Fraction of allocations served from the free list, in `[0.0, 1.0]`.
    pub fn cache_hit_ratio(&self) -> f64 {
        if self.total_allocations == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / self.total_allocations as f64
    }

    pub(crate) fn record_allocation(&mut self, size: usize, from_free_list: bool, live_bytes: usize) {
        self.total_allocations += 1;
        if from_free_list {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
        self.cumulative_bytes += size as u64;
        self.peak_live_bytes = self.peak_live_bytes.max(live_bytes);
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed_allocations += 1;
    }

    pub(crate) fn record_release(&mut self) {
        self.total_releases += 1;
    }

    /// Returns a one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "host buffers: {} allocated ({} reused), {} released, {} outstanding, \
             {} refused, peak {:.2} MB",
            self.total_allocations,
            self.cache_hits,
            self.total_releases,
            self.outstanding(),
            self.failed_allocations,
            self.peak_live_bytes as f64 / (1024.0 * 1024.0),
        )
    }
}
