// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A deterministic, in-process accelerator.
//!
//! [`SimDevice`] implements [`Device`] over plain host memory:
//!
//! - Global memory is a map of address → bytes with a hard capacity.
//! - Every stream is a FIFO queue. Enqueued work does **not** run until the
//!   stream is synchronized, so a caller that reads results without a
//!   barrier observes nothing.
//! - Engines are [`plan_format`] artifacts; the compute pass runs the
//!   plan's kernels against the bound addresses.
//! - A trace of [`StreamEvent`]s and a set of [`SimStats`] counters make
//!   ordering and leak checks possible, and [`SimFaults`] switches make any
//!   call fail on demand.

mod engine;
mod kernels;
mod trace;

pub use engine::SimEngine;
pub use trace::{OpKind, SimFaults, SimStats, StreamEvent};

use crate::{CopyTicket, Device, DeviceError, DevicePtr, StreamId};
use kernels::{BoundKernel, Operand};
use plan_format::EnginePlan;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

/// First address handed out; keeps the null address unused.
const BASE_ADDR: u64 = 0x1000_0000;
/// Allocation alignment.
const ALIGN: u64 = 256;

#[derive(Debug)]
enum PendingOp {
    Upload { dst: DevicePtr, data: Vec<u8> },
    Compute { kernels: Vec<BoundKernel> },
    Download { src: DevicePtr, len: usize, ticket: u64 },
}

impl PendingOp {
    fn kind(&self) -> OpKind {
        match self {
            PendingOp::Upload { data, .. } => OpKind::Upload { bytes: data.len() },
            PendingOp::Compute { .. } => OpKind::Compute,
            PendingOp::Download { len, .. } => OpKind::Download { bytes: *len },
        }
    }
}

#[derive(Debug)]
struct SimState {
    capacity: usize,
    next_addr: u64,
    memory: HashMap<u64, Vec<u8>>,
    next_stream: u64,
    streams: HashMap<u64, VecDeque<PendingOp>>,
    next_ticket: u64,
    pending_downloads: HashSet<u64>,
    completed_downloads: HashMap<u64, Vec<u8>>,
    trace: Vec<StreamEvent>,
    stats: SimStats,
    faults: SimFaults,
    mallocs_since_inject: u64,
}

impl SimState {
    fn queue(&mut self, stream: StreamId) -> Result<&mut VecDeque<PendingOp>, DeviceError> {
        self.streams
            .get_mut(&stream.0)
            .ok_or(DeviceError::InvalidStream(stream))
    }

    fn region_len(&self, ptr: DevicePtr) -> Result<usize, DeviceError> {
        self.memory
            .get(&ptr.addr())
            .map(Vec::len)
            .ok_or(DeviceError::InvalidPointer(ptr))
    }

    fn push(&mut self, stream: StreamId, op: PendingOp) -> Result<(), DeviceError> {
        let kind = op.kind();
        self.queue(stream)?.push_back(op);
        self.trace.push(StreamEvent::Enqueued { stream, op: kind });
        Ok(())
    }

    fn run(&mut self, op: PendingOp) -> Result<(), DeviceError> {
        match op {
            PendingOp::Upload { dst, data } => {
                let region = self
                    .memory
                    .get_mut(&dst.addr())
                    .and_then(|r| r.get_mut(..data.len()))
                    .ok_or_else(|| {
                        DeviceError::KernelFault(format!("upload target {dst} was freed"))
                    })?;
                region.copy_from_slice(&data);
            }
            PendingOp::Compute { kernels: pass } => {
                for k in &pass {
                    kernels::run(k, &mut self.memory)?;
                }
                self.stats.computes += 1;
            }
            PendingOp::Download { src, len, ticket } => {
                let mut bytes = self
                    .memory
                    .get(&src.addr())
                    .and_then(|r| r.get(..len))
                    .ok_or_else(|| {
                        DeviceError::KernelFault(format!("download source {src} was freed"))
                    })?
                    .to_vec();
                if self.faults.truncate_downloads {
                    bytes.truncate(len / 2);
                }
                self.pending_downloads.remove(&ticket);
                self.completed_downloads.insert(ticket, bytes);
            }
        }
        Ok(())
    }
}

/// The simulated accelerator.
///
/// # Example
/// ```
/// use device::{Device, SimDevice};
///
/// let dev = SimDevice::new(1 << 20);
/// let stream = dev.create_stream().unwrap();
/// let ptr = dev.malloc(4).unwrap();
/// dev.memcpy_htod_async(ptr, &[1, 2, 3, 4], stream).unwrap();
/// let ticket = dev.memcpy_dtoh_async(ptr, 4, stream).unwrap();
/// dev.synchronize(stream, None).unwrap();
/// assert_eq!(dev.take_download(ticket).unwrap(), vec![1, 2, 3, 4]);
/// ```
#[derive(Debug)]
pub struct SimDevice {
    state: Mutex<SimState>,
}

impl SimDevice {
    /// Creates a device with `capacity` bytes of global memory.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(SimState {
                capacity,
                next_addr: BASE_ADDR,
                memory: HashMap::new(),
                next_stream: 1,
                streams: HashMap::new(),
                next_ticket: 1,
                pending_downloads: HashSet::new(),
                completed_downloads: HashMap::new(),
                trace: Vec::new(),
                stats: SimStats::default(),
                faults: SimFaults::default(),
                mallocs_since_inject: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arms a new set of fault switches, replacing the previous set.
    pub fn inject(&self, faults: SimFaults) {
        let mut s = self.state();
        debug!(?faults, "fault switches armed");
        s.faults = faults;
        s.mallocs_since_inject = 0;
    }

    pub fn clear_faults(&self) {
        self.inject(SimFaults::default());
    }

    pub fn stats(&self) -> SimStats {
        self.state().stats.clone()
    }

    /// Snapshot of the event trace.
    pub fn trace(&self) -> Vec<StreamEvent> {
        self.state().trace.clone()
    }

    pub fn clear_trace(&self) {
        self.state().trace.clear();
    }

    /// Global memory capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.state().capacity
    }

    /// Operations waiting on `stream`.
    pub fn pending_ops(&self, stream: StreamId) -> usize {
        self.state().streams.get(&stream.0).map_or(0, VecDeque::len)
    }

    /// Reads a live region directly. Test and debugging aid only; pipeline
    /// code moves data with the asynchronous copies.
    pub fn peek(&self, ptr: DevicePtr) -> Option<Vec<u8>> {
        self.state().memory.get(&ptr.addr()).cloned()
    }
}

impl Default for SimDevice {
    /// 1 GiB of global memory.
    fn default() -> Self {
        Self::new(1 << 30)
    }
}

impl Device for SimDevice {
    type Engine = SimEngine;

    fn name(&self) -> &str {
        "sim"
    }

    fn deserialize_engine(&self, artifact: &[u8]) -> Result<SimEngine, DeviceError> {
        let plan = EnginePlan::from_bytes(artifact)
            .map_err(|e| DeviceError::EngineRejected(e.to_string()))?;
        self.state().stats.engines_deserialized += 1;
        debug!(name = %plan.name, "engine deserialized");
        Ok(SimEngine::new(plan))
    }

    fn create_stream(&self) -> Result<StreamId, DeviceError> {
        let mut s = self.state();
        let id = StreamId(s.next_stream);
        s.next_stream += 1;
        s.streams.insert(id.0, VecDeque::new());
        s.stats.streams_created += 1;
        trace!(stream = %id, "stream created");
        Ok(id)
    }

    fn destroy_stream(&self, stream: StreamId) -> Result<(), DeviceError> {
        let mut s = self.state();
        let queue = s
            .streams
            .remove(&stream.0)
            .ok_or(DeviceError::InvalidStream(stream))?;
        for op in &queue {
            if let PendingOp::Download { ticket, .. } = op {
                s.pending_downloads.remove(ticket);
            }
        }
        if !queue.is_empty() {
            debug!(stream = %stream, discarded = queue.len(), "stream destroyed with queued work");
        }
        s.stats.streams_destroyed += 1;
        Ok(())
    }

    fn malloc(&self, size: usize) -> Result<DevicePtr, DeviceError> {
        let mut s = self.state();
        s.stats.malloc_calls += 1;
        s.mallocs_since_inject += 1;

        let available = s.capacity.saturating_sub(s.stats.live_bytes);
        let injected = s.faults.fail_malloc_on_call == Some(s.mallocs_since_inject);
        if injected || size > available {
            debug!(size, available, injected, "device malloc refused");
            return Err(DeviceError::OutOfMemory {
                requested: size,
                available,
            });
        }

        let addr = s.next_addr;
        let span = (size.max(1) as u64).div_ceil(ALIGN) * ALIGN;
        s.next_addr += span;
        s.memory.insert(addr, vec![0u8; size]);

        s.stats.mallocs += 1;
        s.stats.live_allocations += 1;
        s.stats.live_bytes += size;
        s.stats.peak_bytes = s.stats.peak_bytes.max(s.stats.live_bytes);
        Ok(DevicePtr(addr))
    }

    fn free(&self, ptr: DevicePtr) -> Result<(), DeviceError> {
        let mut s = self.state();
        let region = s
            .memory
            .remove(&ptr.addr())
            .ok_or(DeviceError::InvalidPointer(ptr))?;
        s.stats.frees += 1;
        s.stats.live_allocations -= 1;
        s.stats.live_bytes -= region.len();
        Ok(())
    }

    fn memcpy_htod_async(
        &self,
        dst: DevicePtr,
        src: &[u8],
        stream: StreamId,
    ) -> Result<(), DeviceError> {
        let mut s = self.state();
        if s.faults.fail_htod {
            return Err(DeviceError::Injected("memcpy_htod_async"));
        }
        s.queue(stream)?;
        let size = s.region_len(dst)?;
        if src.len() > size {
            return Err(DeviceError::CopyOutOfBounds {
                ptr: dst,
                len: src.len(),
                size,
            });
        }
        s.push(
            stream,
            PendingOp::Upload {
                dst,
                data: src.to_vec(),
            },
        )?;
        s.stats.uploads += 1;
        Ok(())
    }

    fn memcpy_dtoh_async(
        &self,
        src: DevicePtr,
        len: usize,
        stream: StreamId,
    ) -> Result<CopyTicket, DeviceError> {
        let mut s = self.state();
        if s.faults.fail_dtoh {
            return Err(DeviceError::Injected("memcpy_dtoh_async"));
        }
        s.queue(stream)?;
        let size = s.region_len(src)?;
        if len > size {
            return Err(DeviceError::CopyOutOfBounds { ptr: src, len, size });
        }
        let ticket = s.next_ticket;
        s.next_ticket += 1;
        s.push(stream, PendingOp::Download { src, len, ticket })?;
        s.pending_downloads.insert(ticket);
        s.stats.downloads += 1;
        Ok(CopyTicket(ticket))
    }

    fn take_download(&self, ticket: CopyTicket) -> Result<Vec<u8>, DeviceError> {
        let mut s = self.state();
        if let Some(bytes) = s.completed_downloads.remove(&ticket.0) {
            return Ok(bytes);
        }
        if s.pending_downloads.contains(&ticket.0) {
            Err(DeviceError::CopyNotReady(ticket))
        } else {
            Err(DeviceError::UnknownTicket(ticket))
        }
    }

    fn enqueue(
        &self,
        engine: &SimEngine,
        bindings: &HashMap<String, DevicePtr>,
        stream: StreamId,
    ) -> Result<(), DeviceError> {
        let mut s = self.state();
        if s.faults.reject_enqueue {
            return Err(DeviceError::EnqueueRejected("injected rejection".into()));
        }
        s.queue(stream)?;

        let plan = engine.plan();
        let mut operands = HashMap::with_capacity(plan.tensors.len());
        for decl in &plan.tensors {
            let ptr = *bindings.get(&decl.name).ok_or_else(|| {
                DeviceError::EnqueueRejected(format!("tensor '{}' is not bound", decl.name))
            })?;
            let size = s.region_len(ptr)?;
            let needed = decl.byte_size().unwrap_or(0);
            if size < needed {
                return Err(DeviceError::EnqueueRejected(format!(
                    "binding for '{}' holds {size} bytes, needs {needed}",
                    decl.name
                )));
            }
            operands.insert(decl.name.as_str(), Operand { ptr, len: needed });
        }

        let lookup = |name: &str| {
            operands.get(name).copied().ok_or_else(|| {
                DeviceError::EnqueueRejected(format!("kernel references unknown tensor '{name}'"))
            })
        };
        let kernels = plan
            .kernels
            .iter()
            .map(|k| {
                Ok(BoundKernel {
                    kernel: k.clone(),
                    input: k.input().map(&lookup).transpose()?,
                    output: lookup(k.output())?,
                })
            })
            .collect::<Result<Vec<_>, DeviceError>>()?;

        s.push(stream, PendingOp::Compute { kernels })?;
        trace!(engine = %plan.name, stream = %stream, "compute enqueued");
        Ok(())
    }

    fn synchronize(&self, stream: StreamId, timeout: Option<Duration>) -> Result<(), DeviceError> {
        let mut s = self.state();
        let queued = s.queue(stream)?.len();
        if queued > 0 && s.faults.stall_streams {
            return Err(match timeout {
                Some(timeout) => DeviceError::Timeout { stream, timeout },
                None => DeviceError::Stalled(stream),
            });
        }

        while let Some(op) = s.queue(stream)?.pop_front() {
            let kind = op.kind();
            if let Err(e) = s.run(op) {
                // A faulted stream loses the rest of its work.
                let dropped: Vec<PendingOp> = s.queue(stream)?.drain(..).collect();
                for op in dropped {
                    if let PendingOp::Download { ticket, .. } = op {
                        s.pending_downloads.remove(&ticket);
                    }
                }
                return Err(e);
            }
            s.trace.push(StreamEvent::Completed { stream, op: kind });
        }

        s.trace.push(StreamEvent::Synchronized { stream });
        s.stats.synchronizations += 1;
        trace!(stream = %stream, ops = queued, "stream synchronized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineInfo;
    use plan_format::{Kernel, PlanBuilder};

    fn identity_engine(dev: &SimDevice) -> SimEngine {
        let bytes = PlanBuilder::identity("echo", "uint8", &[8]).to_bytes().unwrap();
        dev.deserialize_engine(&bytes).unwrap()
    }

    #[test]
    fn test_malloc_respects_capacity() {
        let dev = SimDevice::new(100);
        let a = dev.malloc(60).unwrap();
        assert!(matches!(
            dev.malloc(60),
            Err(DeviceError::OutOfMemory { requested: 60, available: 40 })
        ));
        dev.free(a).unwrap();
        dev.malloc(60).unwrap();
        assert_eq!(dev.stats().peak_bytes, 60);
    }

    #[test]
    fn test_zero_byte_allocations_are_distinct() {
        let dev = SimDevice::new(0);
        let a = dev.malloc(0).unwrap();
        let b = dev.malloc(0).unwrap();
        assert_ne!(a, b);
        assert!(!a.is_null());
        dev.free(a).unwrap();
        dev.free(b).unwrap();
        assert_eq!(dev.stats().outstanding_allocations(), 0);
    }

    #[test]
    fn test_double_free_rejected() {
        let dev = SimDevice::new(64);
        let a = dev.malloc(8).unwrap();
        dev.free(a).unwrap();
        assert_eq!(dev.free(a), Err(DeviceError::InvalidPointer(a)));
    }

    #[test]
    fn test_work_runs_only_on_synchronize() {
        let dev = SimDevice::new(64);
        let stream = dev.create_stream().unwrap();
        let ptr = dev.malloc(4).unwrap();
        dev.memcpy_htod_async(ptr, &[9, 9, 9, 9], stream).unwrap();
        let ticket = dev.memcpy_dtoh_async(ptr, 4, stream).unwrap();

        assert_eq!(dev.peek(ptr), Some(vec![0, 0, 0, 0]));
        assert_eq!(dev.take_download(ticket), Err(DeviceError::CopyNotReady(ticket)));
        assert_eq!(dev.pending_ops(stream), 2);

        dev.synchronize(stream, None).unwrap();
        assert_eq!(dev.take_download(ticket).unwrap(), vec![9, 9, 9, 9]);
        assert_eq!(dev.pending_ops(stream), 0);
    }

    #[test]
    fn test_taken_or_discarded_tickets_are_unknown() {
        let dev = SimDevice::new(64);
        let stream = dev.create_stream().unwrap();
        let ptr = dev.malloc(4).unwrap();
        let taken = dev.memcpy_dtoh_async(ptr, 4, stream).unwrap();
        dev.synchronize(stream, None).unwrap();
        dev.take_download(taken).unwrap();
        assert_eq!(dev.take_download(taken), Err(DeviceError::UnknownTicket(taken)));

        let discarded = dev.memcpy_dtoh_async(ptr, 4, stream).unwrap();
        assert_eq!(dev.take_download(discarded), Err(DeviceError::CopyNotReady(discarded)));
        dev.destroy_stream(stream).unwrap();
        assert_eq!(
            dev.take_download(discarded),
            Err(DeviceError::UnknownTicket(discarded))
        );
    }

    #[test]
    fn test_compute_counted_when_it_runs() {
        let dev = SimDevice::new(1024);
        let engine = identity_engine(&dev);
        let stream = dev.create_stream().unwrap();
        let x = dev.malloc(8).unwrap();
        let y = dev.malloc(8).unwrap();
        let bindings = HashMap::from([("x".to_string(), x), ("y".to_string(), y)]);

        dev.enqueue(&engine, &bindings, stream).unwrap();
        assert_eq!(dev.stats().computes, 0);
        dev.synchronize(stream, None).unwrap();
        assert_eq!(dev.stats().computes, 1);
    }

    #[test]
    fn test_trace_order() {
        let dev = SimDevice::new(1024);
        let engine = identity_engine(&dev);
        let stream = dev.create_stream().unwrap();
        let x = dev.malloc(8).unwrap();
        let y = dev.malloc(8).unwrap();
        let bindings = HashMap::from([("x".to_string(), x), ("y".to_string(), y)]);

        dev.memcpy_htod_async(x, &[1; 8], stream).unwrap();
        dev.enqueue(&engine, &bindings, stream).unwrap();
        let t = dev.memcpy_dtoh_async(y, 8, stream).unwrap();
        dev.synchronize(stream, None).unwrap();
        assert_eq!(dev.take_download(t).unwrap(), vec![1; 8]);

        let upload = OpKind::Upload { bytes: 8 };
        let download = OpKind::Download { bytes: 8 };
        assert_eq!(
            dev.trace(),
            vec![
                StreamEvent::Enqueued { stream, op: upload },
                StreamEvent::Enqueued { stream, op: OpKind::Compute },
                StreamEvent::Enqueued { stream, op: download },
                StreamEvent::Completed { stream, op: upload },
                StreamEvent::Completed { stream, op: OpKind::Compute },
                StreamEvent::Completed { stream, op: download },
                StreamEvent::Synchronized { stream },
            ]
        );
    }

    #[test]
    fn test_enqueue_requires_every_binding() {
        let dev = SimDevice::new(1024);
        let engine = identity_engine(&dev);
        let stream = dev.create_stream().unwrap();
        let x = dev.malloc(8).unwrap();
        let bindings = HashMap::from([("x".to_string(), x)]);
        assert!(matches!(
            dev.enqueue(&engine, &bindings, stream),
            Err(DeviceError::EnqueueRejected(_))
        ));
        assert_eq!(dev.pending_ops(stream), 0);
    }

    #[test]
    fn test_enqueue_rejects_undersized_binding() {
        let dev = SimDevice::new(1024);
        let engine = identity_engine(&dev);
        let stream = dev.create_stream().unwrap();
        let x = dev.malloc(8).unwrap();
        let y = dev.malloc(4).unwrap();
        let bindings = HashMap::from([("x".to_string(), x), ("y".to_string(), y)]);
        assert!(dev.enqueue(&engine, &bindings, stream).is_err());
    }

    #[test]
    fn test_copy_bounds() {
        let dev = SimDevice::new(64);
        let stream = dev.create_stream().unwrap();
        let p = dev.malloc(4).unwrap();
        assert!(matches!(
            dev.memcpy_htod_async(p, &[0; 5], stream),
            Err(DeviceError::CopyOutOfBounds { len: 5, size: 4, .. })
        ));
        assert!(matches!(
            dev.memcpy_dtoh_async(p, 8, stream),
            Err(DeviceError::CopyOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_fail_nth_malloc() {
        let dev = SimDevice::new(1024);
        dev.inject(SimFaults::fail_malloc_on(3));
        dev.malloc(1).unwrap();
        dev.malloc(1).unwrap();
        assert!(matches!(dev.malloc(1), Err(DeviceError::OutOfMemory { .. })));
        dev.malloc(1).unwrap();
        assert_eq!(dev.stats().malloc_calls, 4);
        assert_eq!(dev.stats().mallocs, 3);
    }

    #[test]
    fn test_copy_faults() {
        let dev = SimDevice::new(64);
        let stream = dev.create_stream().unwrap();
        let p = dev.malloc(4).unwrap();
        dev.inject(SimFaults {
            fail_htod: true,
            fail_dtoh: true,
            ..SimFaults::default()
        });
        assert_eq!(
            dev.memcpy_htod_async(p, &[0; 4], stream),
            Err(DeviceError::Injected("memcpy_htod_async"))
        );
        assert!(dev.memcpy_dtoh_async(p, 4, stream).is_err());
        dev.clear_faults();
        dev.memcpy_htod_async(p, &[0; 4], stream).unwrap();
    }

    #[test]
    fn test_truncated_download() {
        let dev = SimDevice::new(64);
        let stream = dev.create_stream().unwrap();
        let p = dev.malloc(8).unwrap();
        dev.inject(SimFaults {
            truncate_downloads: true,
            ..SimFaults::default()
        });
        let t = dev.memcpy_dtoh_async(p, 8, stream).unwrap();
        dev.synchronize(stream, None).unwrap();
        assert_eq!(dev.take_download(t).unwrap().len(), 4);
    }

    #[test]
    fn test_stalled_stream() {
        let dev = SimDevice::new(64);
        let stream = dev.create_stream().unwrap();
        let p = dev.malloc(8).unwrap();
        dev.inject(SimFaults {
            stall_streams: true,
            ..SimFaults::default()
        });
        dev.synchronize(stream, None).unwrap();

        dev.memcpy_dtoh_async(p, 8, stream).unwrap();
        let timeout = Duration::from_millis(5);
        assert_eq!(
            dev.synchronize(stream, Some(timeout)),
            Err(DeviceError::Timeout { stream, timeout })
        );
        assert_eq!(dev.synchronize(stream, None), Err(DeviceError::Stalled(stream)));
        dev.destroy_stream(stream).unwrap();
        assert_eq!(dev.stats().open_streams(), 0);
    }

    #[test]
    fn test_freed_target_faults_stream() {
        let dev = SimDevice::new(64);
        let stream = dev.create_stream().unwrap();
        let p = dev.malloc(4).unwrap();
        dev.memcpy_htod_async(p, &[1; 4], stream).unwrap();
        dev.free(p).unwrap();
        assert!(matches!(
            dev.synchronize(stream, None),
            Err(DeviceError::KernelFault(_))
        ));
        assert_eq!(dev.pending_ops(stream), 0);
    }

    #[test]
    fn test_reject_bad_artifact() {
        let dev = SimDevice::default();
        assert!(matches!(
            dev.deserialize_engine(b"not an engine"),
            Err(DeviceError::EngineRejected(_))
        ));
    }

    #[test]
    fn test_fill_kernel_engine() {
        let dev = SimDevice::new(1024);
        let bytes = PlanBuilder::new("constant")
            .output("out", "uint8", &[3])
            .kernel(Kernel::Fill {
                output: "out".into(),
                byte: 7,
            })
            .to_bytes()
            .unwrap();
        let engine = dev.deserialize_engine(&bytes).unwrap();
        assert_eq!(engine.name(), "constant");

        let stream = dev.create_stream().unwrap();
        let out = dev.malloc(3).unwrap();
        let bindings = HashMap::from([("out".to_string(), out)]);
        dev.enqueue(&engine, &bindings, stream).unwrap();
        dev.synchronize(stream, None).unwrap();
        assert_eq!(dev.peek(out), Some(vec![7, 7, 7]));
    }
}
