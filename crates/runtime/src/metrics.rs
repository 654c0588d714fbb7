// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference timing and transfer metrics.
//!
//! [`InferenceMetrics`] records how long each lifecycle stage took and how
//! many bytes crossed the host/device boundary. Session-level figures
//! (load, prepare) are kept once; pass-level figures describe the most
//! recent inference pass.

use crate::transfer::TransferRecord;
use crate::Direction;
use std::time::Duration;

/// Aggregate metrics for a session.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InferenceMetrics {
    /// Artifact deserialization and stream creation.
    pub load_duration: Duration,
    /// Contract resolution and buffer allocation.
    pub prepare_duration: Duration,
    /// Bytes of device memory held by the session's buffers.
    pub device_bytes: usize,
    /// Completed inference passes.
    pub passes: u64,
    /// Input fill and upload enqueue of the last pass.
    pub upload_duration: Duration,
    /// Compute enqueue of the last pass.
    pub enqueue_duration: Duration,
    /// Output downloads, including the stream barrier, of the last pass.
    pub drain_duration: Duration,
    /// Wall time of the last pass, from first upload to last download.
    pub pass_duration: Duration,
    pub bytes_uploaded: u64,
    pub bytes_downloaded: u64,
    /// Per-tensor transfers of the last pass.
    pub transfers: Vec<TransferRecord>,
}

impl InferenceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_load(&mut self, d: Duration) {
        self.load_duration = d;
    }

    pub fn record_prepare(&mut self, d: Duration, device_bytes: usize) {
        self.prepare_duration = d;
        self.device_bytes = device_bytes;
    }

    /// Clears the pass-level figures before a new pass.
    pub fn begin_pass(&mut self) {
        self.upload_duration = Duration::ZERO;
        self.enqueue_duration = Duration::ZERO;
        self.drain_duration = Duration::ZERO;
        self.pass_duration = Duration::ZERO;
        self.bytes_uploaded = 0;
        self.bytes_downloaded = 0;
        self.transfers.clear();
    }

    pub fn record_transfer(&mut self, record: TransferRecord) {
        match record.direction {
            Direction::Input => {
                self.bytes_uploaded += record.bytes as u64;
                self.upload_duration += record.duration;
            }
            Direction::Output => {
                self.bytes_downloaded += record.bytes as u64;
                self.drain_duration += record.duration;
            }
        }
        self.transfers.push(record);
    }

    pub fn record_enqueue(&mut self, d: Duration) {
        self.enqueue_duration = d;
    }

    pub fn finish_pass(&mut self, wall: Duration) {
        self.pass_duration = wall;
        self.passes += 1;
    }

    /// Load + prepare + the last pass.
    pub fn total_duration(&self) -> Duration {
        self.load_duration + self.prepare_duration + self.pass_duration
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        format!(
            "Inference: {:.3}ms pass ({:.3}ms upload, {:.3}ms enqueue, {:.3}ms drain), \
             {} B in / {} B out, load {:.3}ms, prepare {:.3}ms, {:.2} MB device, {} passes",
            ms(self.pass_duration),
            ms(self.upload_duration),
            ms(self.enqueue_duration),
            ms(self.drain_duration),
            self.bytes_uploaded,
            self.bytes_downloaded,
            ms(self.load_duration),
            ms(self.prepare_duration),
            self.device_bytes as f64 / (1024.0 * 1024.0),
            self.passes,
        )
    }
}
