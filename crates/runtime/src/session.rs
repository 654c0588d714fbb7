// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The inference session with type-state–enforced lifecycle.
//!
//! ```text
//! InferenceSession<Unloaded>
//!     │  .load() / .load_file() / .with_engine()
//!     ▼
//! InferenceSession<Loaded>      engine + stream
//!     │  .prepare()
//!     ▼
//! InferenceSession<Ready>  ◄──────────┐   contract + buffer pairs
//!     │  .bind()                      │
//!     ▼                               │
//! InferenceSession<Bound>             │
//!     │  .execute(inputs)             │ .rearm()
//!     ▼                               │
//! InferenceSession<Executed>          │
//!     │  .drain()                     │
//!     ▼                               │
//! InferenceSession<Drained>  ─────────┘
//!     │  .close()
//!     ▼
//!   TeardownReport
//! ```
//!
//! Each transition consumes the session. A failing transition tears down
//! everything acquired so far (stream synchronized first, then buffer
//! pairs newest first, then the stream, then the engine) and returns the
//! single error that caused it. Dropping a session in any stage performs
//! the same teardown.

use crate::diagnostics::{DiagnosticSink, Severity, TracingSink};
use crate::execution::{ExecutionContext, ExecutionDriver};
use crate::transfer::TransferCoordinator;
use crate::{
    BufferAllocator, BufferSet, InferenceError, InferenceMetrics, InputSet, SerializedArtifact,
    TensorContract,
};
use device::{Device, EngineInfo, Stream, StreamId};
use memory_manager::{HostPool, MemoryBudget};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tensor_core::{codec, DType, Shape, TensorError};
use tracing::{debug, info, warn};

/// Bounded wait applied to stream barriers unless configured otherwise.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(30);

// ── Options ────────────────────────────────────────────────────

/// Per-session settings.
#[derive(Clone)]
pub struct SessionOptions {
    /// Pool the host halves of buffer pairs are drawn from.
    pub host_pool: HostPool,
    /// Bound on every stream barrier; `None` waits indefinitely.
    pub sync_timeout: Option<Duration>,
    pub sink: Arc<dyn DiagnosticSink>,
}

impl SessionOptions {
    pub fn with_host_pool(mut self, pool: HostPool) -> Self {
        self.host_pool = pool;
        self
    }

    pub fn with_sync_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.sync_timeout = timeout;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            host_pool: HostPool::new(MemoryBudget::from_mb(512)),
            sync_timeout: Some(DEFAULT_SYNC_TIMEOUT),
            sink: Arc::new(TracingSink::default()),
        }
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("host_budget", &self.host_pool.budget())
            .field("sync_timeout", &self.sync_timeout)
            .finish_non_exhaustive()
    }
}

// ── States ─────────────────────────────────────────────────────

/// Runtime view of a session's lifecycle position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unloaded,
    Loaded,
    Ready,
    Bound,
    Executed,
    Drained,
    Closed,
    Failed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Unloaded => "unloaded",
            SessionState::Loaded => "loaded",
            SessionState::Ready => "ready",
            SessionState::Bound => "bound",
            SessionState::Executed => "executed",
            SessionState::Drained => "drained",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// No engine yet.
#[derive(Debug)]
pub struct Unloaded;

/// Engine deserialized and stream created.
#[derive(Debug)]
pub struct Loaded;

/// Contract resolved and every buffer pair allocated.
#[derive(Debug)]
pub struct Ready;

/// Every tensor bound in the execution context.
#[derive(Debug)]
pub struct Bound;

/// Inputs uploaded and compute enqueued.
#[derive(Debug)]
pub struct Executed;

/// Outputs copied back to host memory.
#[derive(Debug)]
pub struct Drained;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Unloaded {}
    impl Sealed for super::Loaded {}
    impl Sealed for super::Ready {}
    impl Sealed for super::Bound {}
    impl Sealed for super::Executed {}
    impl Sealed for super::Drained {}
}

/// Sealed trait for session stages.
///
/// `Held` is what a session owns while in the stage.
pub trait Stage<D: Device>: sealed::Sealed + fmt::Debug {
    const STATE: SessionState;
    type Held: Release;
}

impl<D: Device> Stage<D> for Unloaded {
    const STATE: SessionState = SessionState::Unloaded;
    type Held = ();
}

impl<D: Device> Stage<D> for Loaded {
    const STATE: SessionState = SessionState::Loaded;
    type Held = Attached<D>;
}

impl<D: Device> Stage<D> for Ready {
    const STATE: SessionState = SessionState::Ready;
    type Held = Armed<D>;
}

impl<D: Device> Stage<D> for Bound {
    const STATE: SessionState = SessionState::Bound;
    type Held = Armed<D>;
}

impl<D: Device> Stage<D> for Executed {
    const STATE: SessionState = SessionState::Executed;
    type Held = Armed<D>;
}

impl<D: Device> Stage<D> for Drained {
    const STATE: SessionState = SessionState::Drained;
    type Held = Armed<D>;
}

// ── Held resources ─────────────────────────────────────────────

/// Explicit teardown of a stage's resources.
pub trait Release {
    fn release(&mut self, timeout: Option<Duration>, report: &mut TeardownReport);
}

impl Release for () {
    fn release(&mut self, _: Option<Duration>, _: &mut TeardownReport) {}
}

/// Held resources that include an engine and a stream.
pub trait Attachment<D: Device> {
    fn attached(&self) -> &Attached<D>;
}

/// Engine and stream. Fields drop in declaration order, so the stream
/// goes before the engine.
pub struct Attached<D: Device> {
    stream: Stream<D>,
    engine: Arc<D::Engine>,
}

impl<D: Device> Attached<D> {
    fn synchronize(&self, timeout: Option<Duration>, report: &mut TeardownReport) {
        match self.stream.synchronize(timeout) {
            Ok(()) => report.synchronized = true,
            Err(e) => report.errors.push(format!("synchronize: {e}")),
        }
    }

    fn destroy_stream(&mut self, report: &mut TeardownReport) {
        if !self.stream.is_live() {
            return;
        }
        match self.stream.destroy() {
            Ok(()) => report.stream_destroyed = true,
            Err(e) => report.errors.push(format!("destroy {}: {e}", self.stream.id())),
        }
        report.engine_holders = Arc::strong_count(&self.engine).saturating_sub(1);
    }
}

impl<D: Device> Attachment<D> for Attached<D> {
    fn attached(&self) -> &Attached<D> {
        self
    }
}

impl<D: Device> Release for Attached<D> {
    fn release(&mut self, timeout: Option<Duration>, report: &mut TeardownReport) {
        if self.stream.is_live() {
            self.synchronize(timeout, report);
        }
        self.destroy_stream(report);
    }
}

/// Everything a session owns from `prepare` on.
pub struct Armed<D: Device> {
    contract: TensorContract,
    buffers: BufferSet<D>,
    context: ExecutionContext,
    attached: Attached<D>,
    timeout: Option<Duration>,
    pass_started: Instant,
    stage: SessionState,
    released: bool,
}

impl<D: Device> Release for Armed<D> {
    fn release(&mut self, timeout: Option<Duration>, report: &mut TeardownReport) {
        if self.released {
            return;
        }
        self.released = true;
        // Queued work may still touch the buffers.
        self.attached.synchronize(timeout, report);
        self.context.reset();
        let (released, failures) = self.buffers.release_all();
        report.pairs_released += released;
        report.errors.extend(failures);
        self.attached.destroy_stream(report);
    }
}

impl<D: Device> Attachment<D> for Armed<D> {
    fn attached(&self) -> &Attached<D> {
        &self.attached
    }
}

impl<D: Device> Drop for Armed<D> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let mut report = TeardownReport::new(self.stage, SessionState::Closed);
        self.release(self.timeout, &mut report);
        if report.is_clean() {
            debug!("{}", report.summary());
        } else {
            warn!("session dropped without close: {}", report.summary());
        }
    }
}

// ── Teardown report ────────────────────────────────────────────

/// What teardown released and what went wrong while doing so.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TeardownReport {
    /// Stage the session was torn down from.
    pub from: SessionState,
    /// `Closed` after `close()` or a drop, `Failed` after a failed transition.
    pub to: SessionState,
    pub synchronized: bool,
    pub pairs_released: usize,
    pub stream_destroyed: bool,
    pub engine_released: bool,
    /// Other sessions still holding the engine.
    pub engine_holders: usize,
    pub errors: Vec<String>,
}

impl TeardownReport {
    fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            synchronized: false,
            pairs_released: 0,
            stream_destroyed: false,
            engine_released: false,
            engine_holders: 0,
            errors: Vec::new(),
        }
    }

    /// `true` when every release step succeeded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut s = format!(
            "teardown {} -> {}: {} buffer pairs released, stream {}, engine {}",
            self.from,
            self.to,
            self.pairs_released,
            if self.stream_destroyed { "destroyed" } else { "not destroyed" },
            if self.engine_released { "released" } else { "not held" },
        );
        if self.engine_holders > 0 {
            s.push_str(&format!(" ({} other holders)", self.engine_holders));
        }
        if !self.errors.is_empty() {
            s.push_str(&format!("; {} errors: {}", self.errors.len(), self.errors.join("; ")));
        }
        s
    }
}

// ── Outputs ────────────────────────────────────────────────────

/// A drained output tensor copied out of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
    pub bytes: Vec<u8>,
}

impl OutputTensor {
    /// First `n` elements decoded by element type.
    pub fn preview(&self, n: usize) -> Result<Vec<f64>, TensorError> {
        preview_values(self.dtype, &self.bytes, n)
    }

    pub fn as_f32(&self) -> Result<Vec<f32>, TensorError> {
        if self.dtype != DType::F32 {
            return Err(TensorError::UnsupportedDType {
                op: "as_f32",
                dtype: self.dtype,
            });
        }
        codec::decode_f32(&self.bytes)
    }
}

/// Decodes at most `n` leading elements of `bytes`.
pub fn preview_values(dtype: DType, bytes: &[u8], n: usize) -> Result<Vec<f64>, TensorError> {
    codec::decode_prefix(dtype, bytes, n)
}

// ── Session ────────────────────────────────────────────────────

/// A single-stream inference session over device `D`.
///
/// `S` is a type-state marker; calling `.execute()` on a `Ready`
/// session or `.bind()` on a `Loaded` one does not compile.
///
/// # Example
/// ```no_run
/// use device::SimDevice;
/// use runtime::{InferenceSession, InputSet, SessionOptions};
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), runtime::InferenceError> {
/// let device = Arc::new(SimDevice::default());
/// let drained = InferenceSession::new(device, SessionOptions::default())
///     .load_file("model.plan".as_ref())?
///     .prepare()?
///     .bind()?
///     .execute(&InputSet::new())?
///     .drain()?;
/// for out in drained.outputs() {
///     println!("{}: {} bytes", out.name, out.bytes.len());
/// }
/// drained.close();
/// # Ok(())
/// # }
/// ```
pub struct InferenceSession<S: Stage<D>, D: Device> {
    // Dropped first: buffers, stream, engine.
    held: S::Held,
    device: Arc<D>,
    options: SessionOptions,
    metrics: InferenceMetrics,
    _stage: PhantomData<S>,
}

impl<S: Stage<D>, D: Device> InferenceSession<S, D> {
    pub fn state(&self) -> SessionState {
        S::STATE
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn metrics(&self) -> &InferenceMetrics {
        &self.metrics
    }

    /// Releases everything the session holds and reports on it.
    pub fn close(self) -> TeardownReport {
        let sink = Arc::clone(&self.options.sink);
        let report = self.teardown(SessionState::Closed);
        sink.log(
            if report.is_clean() { Severity::Info } else { Severity::Warning },
            &report.summary(),
        );
        report
    }

    fn teardown(mut self, to: SessionState) -> TeardownReport {
        let mut report = TeardownReport::new(S::STATE, to);
        self.held.release(self.options.sync_timeout, &mut report);
        let had_engine = !matches!(S::STATE, SessionState::Unloaded);
        drop(self);
        report.engine_released = had_engine;
        report
    }

    /// Reports `err`, tears the session down and hands the error back.
    fn fail(self, err: InferenceError) -> InferenceError {
        let sink = Arc::clone(&self.options.sink);
        let state = S::STATE;
        debug!(stage = err.stage(), %state, "transition failed");
        sink.log(Severity::Error, &format!("{} failed in {state} state: {err}", err.stage()));

        let report = self.teardown(SessionState::Failed);
        let severity = if report.is_clean() { Severity::Info } else { Severity::Warning };
        sink.log(severity, &report.summary());
        err
    }

    fn advance<T: Stage<D>>(
        held: T::Held,
        device: Arc<D>,
        options: SessionOptions,
        metrics: InferenceMetrics,
    ) -> InferenceSession<T, D> {
        debug!(state = %T::STATE, "session transition");
        InferenceSession {
            held,
            device,
            options,
            metrics,
            _stage: PhantomData,
        }
    }
}

// ── Unloaded → Loaded ──────────────────────────────────────────

impl<D: Device> InferenceSession<Unloaded, D> {
    pub fn new(device: Arc<D>, options: SessionOptions) -> Self {
        debug!(device = device.name(), ?options, "session created");
        Self {
            held: (),
            device,
            options,
            metrics: InferenceMetrics::new(),
            _stage: PhantomData,
        }
    }

    /// Reads the artifact at `path`, then loads it.
    pub fn load_file(self, path: &Path) -> Result<InferenceSession<Loaded, D>, InferenceError> {
        match SerializedArtifact::read(path) {
            Ok(artifact) => self.load(&artifact),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Deserializes the engine and creates the session stream.
    pub fn load(
        self,
        artifact: &SerializedArtifact,
    ) -> Result<InferenceSession<Loaded, D>, InferenceError> {
        let start = Instant::now();
        let engine = match self.device.deserialize_engine(artifact.as_bytes()) {
            Ok(engine) => engine,
            Err(e) => {
                let err = InferenceError::Load(format!(
                    "cannot deserialize engine from '{}': {e}",
                    artifact.origin()
                ));
                return Err(self.fail(err));
            }
        };
        self.attach(Arc::new(engine), start)
    }

    /// Uses an engine that is already loaded, possibly shared with other
    /// sessions.
    pub fn with_engine(
        self,
        engine: Arc<D::Engine>,
    ) -> Result<InferenceSession<Loaded, D>, InferenceError> {
        self.attach(engine, Instant::now())
    }

    fn attach(
        self,
        engine: Arc<D::Engine>,
        start: Instant,
    ) -> Result<InferenceSession<Loaded, D>, InferenceError> {
        let stream = match Stream::new(&self.device) {
            Ok(stream) => stream,
            Err(e) => {
                let err = InferenceError::Load(format!("cannot create stream: {e}"));
                return Err(self.fail(err));
            }
        };

        let Self {
            device,
            options,
            mut metrics,
            ..
        } = self;
        metrics.record_load(start.elapsed());
        debug!(
            engine = engine.name(),
            stream = %stream.id(),
            device = device.name(),
            "engine loaded"
        );
        options
            .sink
            .log(Severity::Info, &format!("loaded engine '{}'", engine.name()));
        Ok(Self::advance::<Loaded>(
            Attached { stream, engine },
            device,
            options,
            metrics,
        ))
    }
}

// ── Loaded → Ready ─────────────────────────────────────────────

impl<D: Device> InferenceSession<Loaded, D> {
    /// Resolves the contract and allocates a buffer pair for every slot.
    pub fn prepare(self) -> Result<InferenceSession<Ready, D>, InferenceError> {
        let start = Instant::now();
        let contract = match TensorContract::resolve(&*self.held.engine) {
            Ok(c) => c,
            Err(e) => return Err(self.fail(e)),
        };
        for line in contract.summary() {
            self.options.sink.log(Severity::Info, &line);
        }

        let allocator =
            BufferAllocator::new(Arc::clone(&self.device), self.options.host_pool.clone());
        let buffers = match allocator.allocate_all(&contract) {
            Ok(b) => b,
            Err(e) => return Err(self.fail(e)),
        };
        let context = ExecutionContext::new(&contract);

        let Self {
            held,
            device,
            options,
            mut metrics,
            ..
        } = self;
        metrics.record_prepare(start.elapsed(), contract.total_bytes());
        info!(
            tensors = contract.len(),
            bytes = contract.total_bytes(),
            "buffers allocated"
        );
        let armed = Armed {
            contract,
            buffers,
            context,
            attached: held,
            timeout: options.sync_timeout,
            pass_started: Instant::now(),
            stage: SessionState::Ready,
            released: false,
        };
        Ok(Self::advance::<Ready>(armed, device, options, metrics))
    }
}

// ── Stages holding an engine ───────────────────────────────────

impl<S, D> InferenceSession<S, D>
where
    S: Stage<D>,
    S::Held: Attachment<D>,
    D: Device,
{
    /// The engine, shareable with other sessions through
    /// [`with_engine`](InferenceSession::with_engine).
    pub fn engine(&self) -> &Arc<D::Engine> {
        &self.held.attached().engine
    }

    pub fn stream_id(&self) -> StreamId {
        self.held.attached().stream.id()
    }
}

// ── Stages holding buffers ─────────────────────────────────────

impl<S, D> InferenceSession<S, D>
where
    S: Stage<D, Held = Armed<D>>,
    D: Device,
{
    pub fn contract(&self) -> &TensorContract {
        &self.held.contract
    }

    pub fn buffers(&self) -> &BufferSet<D> {
        &self.held.buffers
    }

    fn rebrand<T: Stage<D, Held = Armed<D>>>(self) -> InferenceSession<T, D> {
        let Self {
            mut held,
            device,
            options,
            metrics,
            ..
        } = self;
        held.stage = T::STATE;
        Self::advance::<T>(held, device, options, metrics)
    }
}

// ── Ready → Bound ──────────────────────────────────────────────

impl<D: Device> InferenceSession<Ready, D> {
    /// Binds every buffer pair's device address in a freshly reset
    /// execution context.
    pub fn bind(mut self) -> Result<InferenceSession<Bound, D>, InferenceError> {
        if let Err(e) = bind_all(&mut self.held) {
            return Err(self.fail(e));
        }
        let bound = self.held.context.bindings().len();
        debug!(bound, "tensors bound");
        self.options
            .sink
            .log(Severity::Verbose, &format!("bound {bound} tensors"));
        Ok(self.rebrand::<Bound>())
    }
}

fn bind_all<D: Device>(armed: &mut Armed<D>) -> Result<(), InferenceError> {
    armed.context.reset();
    for pair in armed.buffers.iter() {
        let ptr = pair.device_ptr().ok_or_else(|| InferenceError::Binding {
            tensor: pair.name().to_string(),
        })?;
        armed.context.bind(pair.name(), ptr)?;
        debug!(tensor = pair.name(), %ptr, "bound");
    }
    Ok(())
}

// ── Bound → Executed ───────────────────────────────────────────

impl<D: Device> InferenceSession<Bound, D> {
    /// Fills and uploads every input, then enqueues the compute pass.
    ///
    /// Returns as soon as the work is queued.
    pub fn execute(mut self, inputs: &InputSet) -> Result<InferenceSession<Executed, D>, InferenceError> {
        self.metrics.begin_pass();
        self.held.pass_started = Instant::now();
        if let Err(e) = self.upload_and_enqueue(inputs) {
            return Err(self.fail(e));
        }
        Ok(self.rebrand::<Executed>())
    }

    fn upload_and_enqueue(&mut self, inputs: &InputSet) -> Result<(), InferenceError> {
        let armed = &mut self.held;
        let stray = inputs
            .names()
            .filter(|name| !armed.contract.slot(name).is_some_and(|s| s.is_input()))
            .min();
        if let Some(name) = stray {
            return Err(InferenceError::NotAnInput {
                tensor: name.to_string(),
            });
        }

        let stream = armed.attached.stream.id();
        let coordinator =
            TransferCoordinator::new(self.device.as_ref(), stream, self.options.sync_timeout);

        for slot in armed.contract.inputs() {
            let pair = armed
                .buffers
                .get_mut(&slot.name)
                .ok_or_else(|| InferenceError::Binding {
                    tensor: slot.name.clone(),
                })?;
            let record = coordinator.fill_input(slot, pair, inputs.producer_for(&slot.name))?;
            self.metrics.record_transfer(record);
        }

        let start = Instant::now();
        ExecutionDriver::new(self.device.as_ref(), stream)
            .execute(&*armed.attached.engine, &armed.context)?;
        self.metrics.record_enqueue(start.elapsed());
        Ok(())
    }
}

// ── Executed → Drained ─────────────────────────────────────────

impl<D: Device> InferenceSession<Executed, D> {
    /// Copies every output back to host memory, blocking on the stream.
    pub fn drain(mut self) -> Result<InferenceSession<Drained, D>, InferenceError> {
        if let Err(e) = self.drain_outputs() {
            return Err(self.fail(e));
        }
        self.metrics.finish_pass(self.held.pass_started.elapsed());
        info!(
            pass = self.metrics.passes,
            micros = self.metrics.pass_duration.as_micros() as u64,
            "inference pass complete"
        );
        self.options
            .sink
            .log(Severity::Verbose, &self.metrics.summary());
        Ok(self.rebrand::<Drained>())
    }

    fn drain_outputs(&mut self) -> Result<(), InferenceError> {
        let armed = &mut self.held;
        let stream = armed.attached.stream.id();
        let coordinator =
            TransferCoordinator::new(self.device.as_ref(), stream, self.options.sync_timeout);

        let mut drained = 0;
        for slot in armed.contract.outputs() {
            let pair = armed
                .buffers
                .get_mut(&slot.name)
                .ok_or_else(|| InferenceError::Binding {
                    tensor: slot.name.clone(),
                })?;
            let record = coordinator.drain_output(slot, pair)?;
            self.metrics.record_transfer(record);
            drained += 1;
        }
        if drained == 0 {
            coordinator
                .synchronize()
                .map_err(InferenceError::Execution)?;
        }
        Ok(())
    }
}

// ── Drained ────────────────────────────────────────────────────

impl<D: Device> InferenceSession<Drained, D> {
    /// Host bytes of tensor `name`.
    pub fn output(&self, name: &str) -> Option<&[u8]> {
        let slot = self.held.contract.slot(name)?;
        if !slot.is_output() {
            return None;
        }
        self.held.buffers.get(name).map(|p| p.host())
    }

    /// Copies of every output, in contract order.
    pub fn outputs(&self) -> Vec<OutputTensor> {
        self.held
            .contract
            .outputs()
            .map(|slot| OutputTensor {
                name: slot.name.clone(),
                dtype: slot.dtype,
                shape: slot.shape.clone(),
                bytes: self
                    .held
                    .buffers
                    .get(&slot.name)
                    .map(|p| p.host().to_vec())
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Keeps the buffers, drops the bindings; the next pass binds again.
    pub fn rearm(mut self) -> InferenceSession<Ready, D> {
        self.held.context.reset();
        debug!(passes = self.metrics.passes, "session rearmed");
        self.rebrand::<Ready>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use crate::producer::{F32Values, RawBytes};
    use device::{SimDevice, SimFaults};
    use plan_format::PlanBuilder;

    fn identity_artifact(dtype: &str, shape: &[i64]) -> SerializedArtifact {
        let bytes = PlanBuilder::identity("echo", dtype, shape).to_bytes().unwrap();
        SerializedArtifact::from_bytes(bytes, "echo.plan").unwrap()
    }

    fn options(sink: &Arc<RecordingSink>) -> SessionOptions {
        SessionOptions::default()
            .with_host_pool(HostPool::new(MemoryBudget::from_mb(4)))
            .with_sink(Arc::clone(sink) as Arc<dyn DiagnosticSink>)
    }

    #[test]
    fn test_full_lifecycle() {
        let dev = Arc::new(SimDevice::new(1 << 20));
        let sink = Arc::new(RecordingSink::default());
        let session = InferenceSession::new(Arc::clone(&dev), options(&sink));
        assert_eq!(session.state(), SessionState::Unloaded);

        let loaded = session.load(&identity_artifact("uint8", &[4])).unwrap();
        assert_eq!(loaded.state(), SessionState::Loaded);
        let ready = loaded.prepare().unwrap();
        assert_eq!(ready.contract().len(), 2);
        let drained = ready
            .bind()
            .unwrap()
            .execute(&InputSet::new().with("x", RawBytes(vec![9, 8, 7, 6])))
            .unwrap()
            .drain()
            .unwrap();

        assert_eq!(drained.state(), SessionState::Drained);
        assert_eq!(drained.output("y"), Some(&[9u8, 8, 7, 6][..]));
        assert_eq!(drained.output("x"), None);
        assert_eq!(drained.metrics().passes, 1);

        let report = drained.close();
        assert!(report.is_clean(), "{}", report.summary());
        assert_eq!(report.pairs_released, 2);
        assert!(report.stream_destroyed);
        assert!(report.engine_released);

        let stats = dev.stats();
        assert_eq!(stats.mallocs, stats.frees);
        assert_eq!(stats.open_streams(), 0);
        assert!(sink.contains(Severity::Info, "engine 'echo'"));
    }

    #[test]
    fn test_rearm_runs_again() {
        let dev = Arc::new(SimDevice::new(1 << 20));
        let sink = Arc::new(RecordingSink::default());
        let mut ready = InferenceSession::new(Arc::clone(&dev), options(&sink))
            .load(&identity_artifact("float32", &[2]))
            .unwrap()
            .prepare()
            .unwrap();

        for i in 0..3 {
            let v = i as f32;
            let drained = ready
                .bind()
                .unwrap()
                .execute(&InputSet::new().with("x", F32Values(vec![v, -v])))
                .unwrap()
                .drain()
                .unwrap();
            let out = drained.outputs().remove(0);
            assert_eq!(out.as_f32().unwrap(), vec![v, -v]);
            ready = drained.rearm();
        }
        assert_eq!(ready.metrics().passes, 3);
        assert_eq!(dev.stats().mallocs, 2);
        ready.close();
        assert_eq!(dev.stats().live_allocations, 0);
    }

    #[test]
    fn test_load_failure_is_reported() {
        let dev = Arc::new(SimDevice::new(1 << 20));
        let sink = Arc::new(RecordingSink::default());
        let artifact = SerializedArtifact::from_bytes(b"garbage".to_vec(), "bad.plan").unwrap();
        let err = InferenceSession::new(Arc::clone(&dev), options(&sink))
            .load(&artifact)
            .err()
            .unwrap();
        assert!(matches!(err, InferenceError::Load(_)));
        assert!(sink.contains(Severity::Error, "bad.plan"));
        assert_eq!(dev.stats().streams_created, 0);
    }

    #[test]
    fn test_prepare_failure_releases_stream() {
        let dev = Arc::new(SimDevice::new(8));
        let sink = Arc::new(RecordingSink::default());
        let err = InferenceSession::new(Arc::clone(&dev), options(&sink))
            .load(&identity_artifact("float32", &[4]))
            .unwrap()
            .prepare()
            .err()
            .unwrap();
        assert!(matches!(err, InferenceError::Allocation { .. }));
        let stats = dev.stats();
        assert_eq!(stats.live_allocations, 0);
        assert_eq!(stats.open_streams(), 0);
        assert!(sink.contains(Severity::Error, "allocation failed in loaded state"));
    }

    #[test]
    fn test_enqueue_rejection_tears_down() {
        let dev = Arc::new(SimDevice::new(1 << 20));
        let sink = Arc::new(RecordingSink::default());
        let bound = InferenceSession::new(Arc::clone(&dev), options(&sink))
            .load(&identity_artifact("uint8", &[4]))
            .unwrap()
            .prepare()
            .unwrap()
            .bind()
            .unwrap();
        dev.inject(SimFaults {
            reject_enqueue: true,
            ..SimFaults::default()
        });
        let err = bound.execute(&InputSet::new()).err().unwrap();
        assert_eq!(err.stage(), "execution");
        let stats = dev.stats();
        assert_eq!(stats.live_allocations, 0);
        assert_eq!(stats.open_streams(), 0);
    }

    #[test]
    fn test_producer_for_unknown_tensor_rejected() {
        let dev = Arc::new(SimDevice::new(1 << 20));
        let sink = Arc::new(RecordingSink::default());
        let bound = InferenceSession::new(Arc::clone(&dev), options(&sink))
            .load(&identity_artifact("uint8", &[3]))
            .unwrap()
            .prepare()
            .unwrap()
            .bind()
            .unwrap();
        let inputs = InputSet::new().with("typo", RawBytes(vec![4, 5, 6]));
        let err = bound.execute(&inputs).err().unwrap();
        assert!(matches!(err, InferenceError::NotAnInput { ref tensor } if tensor == "typo"));
        assert_eq!(err.stage(), "binding");

        let stats = dev.stats();
        assert_eq!(stats.uploads, 0);
        assert!(!dev
            .trace()
            .iter()
            .any(|e| matches!(e, device::sim::StreamEvent::Enqueued { .. })));
        assert_eq!(stats.live_allocations, 0);
        assert!(sink.contains(Severity::Error, "'typo'"));
    }

    #[test]
    fn test_producer_for_output_tensor_rejected() {
        let dev = Arc::new(SimDevice::new(1 << 20));
        let inputs = InputSet::new().with("y", RawBytes(vec![1, 2, 3]));
        let err = InferenceSession::new(Arc::clone(&dev), SessionOptions::default())
            .load(&identity_artifact("uint8", &[3]))
            .unwrap()
            .prepare()
            .unwrap()
            .bind()
            .unwrap()
            .execute(&inputs)
            .err()
            .unwrap();
        assert!(matches!(err, InferenceError::NotAnInput { ref tensor } if tensor == "y"));
    }

    #[test]
    fn test_teardown_report_endpoints() {
        let dev = Arc::new(SimDevice::new(1 << 20));
        let sink = Arc::new(RecordingSink::default());
        let report = InferenceSession::new(Arc::clone(&dev), options(&sink))
            .load(&identity_artifact("uint8", &[4]))
            .unwrap()
            .prepare()
            .unwrap()
            .bind()
            .unwrap()
            .close();
        assert_eq!(report.from, SessionState::Bound);
        assert_eq!(report.to, SessionState::Closed);
        assert!(report.summary().starts_with("teardown bound -> closed"));

        let capped = Arc::new(SimDevice::new(8));
        let _ = InferenceSession::new(Arc::clone(&capped), options(&sink))
            .load(&identity_artifact("float32", &[4]))
            .unwrap()
            .prepare();
        assert!(sink.contains(Severity::Info, "teardown loaded -> failed"));
    }

    #[test]
    fn test_contract_summary_goes_through_sink_once() {
        let dev = Arc::new(SimDevice::new(1 << 20));
        let sink = Arc::new(RecordingSink::default());
        let ready = InferenceSession::new(Arc::clone(&dev), options(&sink))
            .load(&identity_artifact("uint8", &[4]))
            .unwrap()
            .prepare()
            .unwrap();
        let lines = ready.contract().summary();
        let records = sink.records();
        for line in &lines {
            assert_eq!(records.iter().filter(|(_, m)| m == line).count(), 1);
        }
        ready.close();
    }

    #[test]
    fn test_drop_tears_down() {
        let dev = Arc::new(SimDevice::new(1 << 20));
        {
            let _executed = InferenceSession::new(Arc::clone(&dev), SessionOptions::default())
                .load(&identity_artifact("uint8", &[16]))
                .unwrap()
                .prepare()
                .unwrap()
                .bind()
                .unwrap()
                .execute(&InputSet::new())
                .unwrap();
            assert_eq!(dev.stats().live_allocations, 2);
        }
        let stats = dev.stats();
        assert_eq!(stats.live_allocations, 0);
        assert_eq!(stats.open_streams(), 0);
        // Queued work was synchronized before the buffers went away.
        assert_eq!(stats.computes, 1);
    }

    #[test]
    fn test_shared_engine_holders() {
        let dev = Arc::new(SimDevice::new(1 << 20));
        let first = InferenceSession::new(Arc::clone(&dev), SessionOptions::default())
            .load(&identity_artifact("uint8", &[4]))
            .unwrap();
        let engine = Arc::clone(first.engine());
        let second = InferenceSession::new(Arc::clone(&dev), SessionOptions::default())
            .with_engine(Arc::clone(&engine))
            .unwrap();
        assert_ne!(first.stream_id(), second.stream_id());
        assert_eq!(dev.stats().engines_deserialized, 1);

        let report = first.close();
        assert_eq!(report.engine_holders, 2);
        second.close();
        assert_eq!(Arc::strong_count(&engine), 1);
    }

    #[test]
    fn test_preview_values() {
        let out = OutputTensor {
            name: "y".into(),
            dtype: DType::I32,
            shape: Shape::new(vec![3]),
            bytes: [1i32, -2, 3].iter().flat_map(|v| v.to_le_bytes()).collect(),
        };
        assert_eq!(out.preview(2).unwrap(), vec![1.0, -2.0]);
        assert!(out.as_f32().is_err());
    }
}
