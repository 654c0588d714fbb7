// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types reported by accelerator backends.

use crate::{CopyTicket, DevicePtr, StreamId};
use std::time::Duration;

/// Errors raised by a [`Device`](crate::Device) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// Device memory is exhausted.
    #[error("device out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },

    /// The address does not name a live allocation.
    #[error("invalid device pointer {0}")]
    InvalidPointer(DevicePtr),

    /// The stream handle is unknown or already destroyed.
    #[error("invalid {0}")]
    InvalidStream(StreamId),

    /// A copy would read or write past the end of an allocation.
    #[error("copy of {len} bytes out of bounds for {ptr} ({size} bytes)")]
    CopyOutOfBounds {
        ptr: DevicePtr,
        len: usize,
        size: usize,
    },

    /// The runtime refused to deserialize the artifact.
    #[error("engine rejected: {0}")]
    EngineRejected(String),

    /// The runtime refused to enqueue the compute pass.
    #[error("enqueue rejected: {0}")]
    EnqueueRejected(String),

    /// A bounded synchronize expired before the stream drained.
    #[error("{stream} did not drain within {timeout:?}")]
    Timeout { stream: StreamId, timeout: Duration },

    /// An unbounded synchronize found a stream that can never drain.
    #[error("{0} is stalled")]
    Stalled(StreamId),

    /// The download has not completed; synchronize the stream first.
    #[error("{0} has not completed")]
    CopyNotReady(CopyTicket),

    /// The ticket was never issued, was already taken, or its stream was
    /// destroyed before the copy ran.
    #[error("{0} is unknown")]
    UnknownTicket(CopyTicket),

    /// A fault switch forced this call to fail.
    #[error("injected failure in {0}")]
    Injected(&'static str),

    /// A queued kernel could not run.
    #[error("kernel fault: {0}")]
    KernelFault(String),
}
