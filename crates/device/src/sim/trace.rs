// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Observable record of what the simulated device did, and in which order.

use crate::StreamId;

/// Class of a queued stream operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Upload { bytes: usize },
    Compute,
    Download { bytes: usize },
}

/// One entry of the device trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    /// The operation was accepted onto the stream.
    Enqueued { stream: StreamId, op: OpKind },
    /// The operation ran (during a synchronize).
    Completed { stream: StreamId, op: OpKind },
    /// A synchronize returned successfully.
    Synchronized { stream: StreamId },
}

impl StreamEvent {
    pub fn stream(&self) -> StreamId {
        match self {
            StreamEvent::Enqueued { stream, .. }
            | StreamEvent::Completed { stream, .. }
            | StreamEvent::Synchronized { stream } => *stream,
        }
    }
}

/// Counters for leak and ordering checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Every `malloc` call, including refused ones.
    pub malloc_calls: u64,
    pub mallocs: u64,
    pub frees: u64,
    pub live_allocations: usize,
    pub live_bytes: usize,
    pub peak_bytes: usize,
    pub streams_created: u64,
    pub streams_destroyed: u64,
    pub engines_deserialized: u64,
    pub uploads: u64,
    /// Compute passes that ran on a synchronized stream.
    pub computes: u64,
    pub downloads: u64,
    pub synchronizations: u64,
}

impl SimStats {
    /// Allocations not yet freed.
    pub fn outstanding_allocations(&self) -> u64 {
        self.mallocs.saturating_sub(self.frees)
    }

    /// Streams not yet destroyed.
    pub fn open_streams(&self) -> u64 {
        self.streams_created.saturating_sub(self.streams_destroyed)
    }
}

/// Runtime fault switches.
///
/// Injected with [`SimDevice::inject`](super::SimDevice::inject); they stay
/// armed until replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimFaults {
    /// Fail the Nth `malloc` after injection (1-based) with out-of-memory.
    pub fail_malloc_on_call: Option<u64>,
    /// Refuse every host-to-device copy.
    pub fail_htod: bool,
    /// Refuse every device-to-host copy.
    pub fail_dtoh: bool,
    /// Complete downloads with only half of the requested bytes.
    pub truncate_downloads: bool,
    /// Refuse every compute enqueue.
    pub reject_enqueue: bool,
    /// Streams with queued work never drain.
    pub stall_streams: bool,
}

impl SimFaults {
    pub fn fail_malloc_on(call: u64) -> Self {
        Self {
            fail_malloc_on_call: Some(call),
            ..Self::default()
        }
    }
}
