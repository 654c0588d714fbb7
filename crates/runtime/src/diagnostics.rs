// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Diagnostic sinks.
//!
//! The pipeline reports load, allocation, binding, enqueue and transfer
//! failures, plus the resolved tensor contract, as `(severity, message)`
//! pairs. Filtering by severity is the sink's job.

use std::fmt;
use std::sync::Mutex;

/// Message severity, most severe first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    InternalError,
    Error,
    Warning,
    Info,
    Verbose,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::InternalError => "internal_error",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Verbose => "verbose",
        }
    }

    /// Parses a severity name; `warn` is accepted for `warning`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "internal_error" | "internal-error" => Some(Severity::InternalError),
            "error" => Some(Severity::Error),
            "warning" | "warn" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            "verbose" => Some(Severity::Verbose),
            _ => None,
        }
    }

    /// Whether a message of this severity passes `threshold`.
    pub fn passes(self, threshold: Severity) -> bool {
        self <= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver for pipeline diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str);
}

/// Forwards diagnostics to `tracing`, dropping anything less severe than
/// the threshold.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    threshold: Severity,
}

impl TracingSink {
    pub fn new(threshold: Severity) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(Severity::Warning)
    }
}

impl DiagnosticSink for TracingSink {
    fn log(&self, severity: Severity, message: &str) {
        if !severity.passes(self.threshold) {
            return;
        }
        match severity {
            Severity::InternalError | Severity::Error => tracing::error!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Info => tracing::info!("{message}"),
            Severity::Verbose => tracing::debug!("{message}"),
        }
    }
}

/// Keeps every accepted message in memory.
#[derive(Debug)]
pub struct RecordingSink {
    threshold: Severity,
    records: Mutex<Vec<(Severity, String)>>,
}

impl RecordingSink {
    pub fn new(threshold: Severity) -> Self {
        Self {
            threshold,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<(Severity, String)> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Whether any recorded message at `severity` contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|(s, m)| *s == severity && m.contains(needle))
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new(Severity::Verbose)
    }
}

impl DiagnosticSink for RecordingSink {
    fn log(&self, severity: Severity, message: &str) {
        if !severity.passes(self.threshold) {
            return;
        }
        if let Ok(mut records) = self.records.lock() {
            records.push((severity, message.to_string()));
        }
    }
}
