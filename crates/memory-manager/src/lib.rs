// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! Host-side memory for tensor buffer pairs.
//!
//! # Key Components
//!
//! - [`MemoryBudget`]: a hard ceiling with human-readable parsing
//!   (`"512M"`, `"1G"`, ...).
//! - [`HostPool`]: the allocator: enforces the budget, reuses returned
//!   buffers by size class, and counts allocations/releases.
//! - [`HostBuffer`]: RAII ownership of one host byte region. Dropping it
//!   returns the bytes to the pool, so every error path releases what it
//!   acquired without extra cleanup code.
//! - [`AllocationStats`]: counters used to prove sessions do not leak.
//!
//! # Ownership Model
//!
//! ```text
//! HostPool::allocate(size)
//!       │
//!       ▼
//!   HostBuffer  ◄─── owns Vec<u8>, holds Arc<PoolInner>
//!       │
//!       │  drop() / release()
//!       ▼
//!   PoolInner::return_buffer()  ──► free list, stats.total_releases += 1
//! ```

mod budget;
mod buffer;
mod error;
pub mod pool;
mod stats;

pub use budget::MemoryBudget;
pub use buffer::HostBuffer;
pub use error::MemoryError;
pub use pool::HostPool;
pub use stats::AllocationStats;
