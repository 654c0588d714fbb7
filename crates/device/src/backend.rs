// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The accelerator runtime seam.
//!
//! [`Device`] mirrors the small slice of a vendor runtime the inference
//! pipeline needs: engine deserialization, global memory, streams,
//! asynchronous copies, compute enqueue and a stream barrier. Everything
//! above this trait is backend-agnostic.

use crate::{CopyTicket, DeviceError, DevicePtr, StreamId, TensorIoMode};
use std::collections::HashMap;
use std::time::Duration;

/// Read-only introspection of a deserialized engine.
///
/// Tensors are addressed by index in `[0, num_io_tensors())` to obtain
/// their names, then by name for everything else. Lookups return `None`
/// when the engine has nothing to report.
pub trait EngineInfo: Send + Sync {
    fn name(&self) -> &str;

    /// Number of I/O tensors. Backends report what the artifact says, so
    /// callers must treat a non-positive value as an error.
    fn num_io_tensors(&self) -> i32;

    fn io_tensor_name(&self, index: i32) -> Option<&str>;

    fn tensor_io_mode(&self, name: &str) -> Option<TensorIoMode>;

    /// Element type code (0 float32, 1 float16, 2 int8, 3 int32, 4 bool,
    /// 5 uint8, 6 fp8). Unknown types are reported as-is.
    fn tensor_dtype_code(&self, name: &str) -> Option<i32>;

    /// Dimensions; negative entries are unresolved dynamic dimensions.
    fn tensor_shape(&self, name: &str) -> Option<Vec<i64>>;
}

/// An accelerator runtime.
///
/// All work enqueued on one stream executes in FIFO order. Host memory
/// passed to [`memcpy_htod_async`](Device::memcpy_htod_async) may be
/// reused as soon as the call returns; downloaded bytes are only
/// available after [`synchronize`](Device::synchronize).
pub trait Device: Send + Sync + 'static {
    type Engine: EngineInfo;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;

    fn deserialize_engine(&self, artifact: &[u8]) -> Result<Self::Engine, DeviceError>;

    fn create_stream(&self) -> Result<StreamId, DeviceError>;

    /// Destroys a stream; work still queued on it is discarded.
    fn destroy_stream(&self, stream: StreamId) -> Result<(), DeviceError>;

    /// Allocates `size` bytes of device memory. Zero-byte requests return
    /// a distinct, freeable address.
    fn malloc(&self, size: usize) -> Result<DevicePtr, DeviceError>;

    fn free(&self, ptr: DevicePtr) -> Result<(), DeviceError>;

    fn memcpy_htod_async(
        &self,
        dst: DevicePtr,
        src: &[u8],
        stream: StreamId,
    ) -> Result<(), DeviceError>;

    fn memcpy_dtoh_async(
        &self,
        src: DevicePtr,
        len: usize,
        stream: StreamId,
    ) -> Result<CopyTicket, DeviceError>;

    /// Collects the bytes of a completed download.
    fn take_download(&self, ticket: CopyTicket) -> Result<Vec<u8>, DeviceError>;

    /// Enqueues one compute pass with the given tensor bindings. Success
    /// means the work was accepted, not that it ran.
    fn enqueue(
        &self,
        engine: &Self::Engine,
        bindings: &HashMap<String, DevicePtr>,
        stream: StreamId,
    ) -> Result<(), DeviceError>;

    /// Blocks until every operation queued on `stream` has completed, or
    /// until `timeout` expires.
    fn synchronize(&self, stream: StreamId, timeout: Option<Duration>) -> Result<(), DeviceError>;
}
