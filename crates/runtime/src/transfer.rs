// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host ↔ device data movement on the session stream.
//!
//! Uploads are fire-and-forget. Downloads block on the stream barrier, so
//! an output's host bytes are valid only after [`drain_output`] returns.
//! Copies are all-or-nothing: anything short of the full slot size is a
//! transfer error.
//!
//! [`drain_output`]: TransferCoordinator::drain_output

use crate::producer::InputProducer;
use crate::{BufferPair, Direction, InferenceError, TensorSlot};
use device::{Device, DeviceError, StreamId};
use std::time::{Duration, Instant};
use tracing::debug;

/// One completed host ↔ device transfer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransferRecord {
    pub tensor: String,
    pub direction: Direction,
    pub bytes: usize,
    pub duration: Duration,
}

/// Issues the copies for one session stream.
pub struct TransferCoordinator<'a, D: Device> {
    device: &'a D,
    stream: StreamId,
    timeout: Option<Duration>,
}

impl<'a, D: Device> TransferCoordinator<'a, D> {
    pub fn new(device: &'a D, stream: StreamId, timeout: Option<Duration>) -> Self {
        Self {
            device,
            stream,
            timeout,
        }
    }

    /// Runs `producer` over the host buffer, then enqueues the upload.
    ///
    /// Zero-byte slots are skipped.
    pub fn fill_input(
        &self,
        slot: &TensorSlot,
        pair: &mut BufferPair<D>,
        producer: &dyn InputProducer,
    ) -> Result<TransferRecord, InferenceError> {
        let start = Instant::now();
        let bytes = pair.size_bytes();
        let transfer_err = |detail: String| InferenceError::Transfer {
            tensor: slot.name.clone(),
            bytes,
            detail,
        };

        if bytes > 0 {
            producer
                .fill(slot, pair.host_mut())
                .map_err(|e| transfer_err(format!("{} producer: {e}", producer.describe())))?;
            let dst = pair
                .device_ptr()
                .ok_or_else(|| transfer_err("buffer pair already released".into()))?;
            self.device
                .memcpy_htod_async(dst, pair.host(), self.stream)
                .map_err(|e| transfer_err(format!("host-to-device copy: {e}")))?;
        }

        debug!(tensor = %slot.name, bytes, producer = %producer.describe(), "input uploaded");
        Ok(TransferRecord {
            tensor: slot.name.clone(),
            direction: Direction::Input,
            bytes,
            duration: start.elapsed(),
        })
    }

    /// Enqueues the download, waits on the stream barrier, then copies
    /// the completed bytes into the host buffer.
    pub fn drain_output(
        &self,
        slot: &TensorSlot,
        pair: &mut BufferPair<D>,
    ) -> Result<TransferRecord, InferenceError> {
        let start = Instant::now();
        let bytes = pair.size_bytes();
        let transfer_err = |detail: String| InferenceError::Transfer {
            tensor: slot.name.clone(),
            bytes,
            detail,
        };

        let ticket = if bytes > 0 {
            let src = pair
                .device_ptr()
                .ok_or_else(|| transfer_err("buffer pair already released".into()))?;
            let ticket = self
                .device
                .memcpy_dtoh_async(src, bytes, self.stream)
                .map_err(|e| transfer_err(format!("device-to-host copy: {e}")))?;
            Some(ticket)
        } else {
            None
        };

        self.synchronize()
            .map_err(|e| transfer_err(format!("stream barrier: {e}")))?;

        if let Some(ticket) = ticket {
            let data = self
                .device
                .take_download(ticket)
                .map_err(|e| transfer_err(e.to_string()))?;
            if data.len() != bytes {
                return Err(transfer_err(format!(
                    "short copy: received {} of {bytes} bytes",
                    data.len()
                )));
            }
            let host = pair
                .host_buffer_mut()
                .ok_or_else(|| transfer_err("no host buffer".into()))?;
            host.copy_from(&data)
                .map_err(|e| transfer_err(e.to_string()))?;
        }

        debug!(tensor = %slot.name, bytes, "output drained");
        Ok(TransferRecord {
            tensor: slot.name.clone(),
            direction: Direction::Output,
            bytes,
            duration: start.elapsed(),
        })
    }

    /// Stream barrier bounded by the configured timeout.
    pub fn synchronize(&self) -> Result<(), DeviceError> {
        self.device.synchronize(self.stream, self.timeout)
    }
}
