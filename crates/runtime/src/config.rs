// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! engine_path = "./engines/resnet50.plan"
//! host_memory_budget = "512M"
//! device_memory = "1G"
//! sync_timeout_ms = 30000
//! log_threshold = "warning"
//! input_fill = "seeded"
//! seed = 42
//! preview_count = 10
//! ```

use crate::diagnostics::{Severity, TracingSink};
use crate::producer::{ConstantFill, InputProducer, SeededFill, Zeros};
use crate::session::SessionOptions;
use crate::InferenceError;
use memory_manager::{HostPool, MemoryBudget};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for an inference run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Path to the serialized engine.
    pub engine_path: PathBuf,
    /// Host staging memory budget (human-readable, e.g., `"512M"`).
    pub host_memory_budget: String,
    /// Device memory capacity (human-readable).
    pub device_memory: String,
    /// Bound on stream barriers in milliseconds; `0` waits indefinitely.
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,
    /// Least severe diagnostic that is emitted: `internal_error`, `error`,
    /// `warning`, `info` or `verbose`.
    #[serde(default = "default_log_threshold")]
    pub log_threshold: String,
    /// Input fill: `"zeros"`, `"constant:<value>"` or `"seeded"`.
    #[serde(default = "default_input_fill")]
    pub input_fill: String,
    /// Seed for `"seeded"` fill.
    #[serde(default)]
    pub seed: u64,
    /// Output values shown per tensor.
    #[serde(default = "default_preview_count")]
    pub preview_count: usize,
}

fn default_sync_timeout_ms() -> u64 {
    30_000
}

fn default_log_threshold() -> String {
    "warning".to_string()
}

fn default_input_fill() -> String {
    "seeded".to_string()
}

fn default_preview_count() -> usize {
    10
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, InferenceError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, InferenceError> {
        toml::from_str(toml_str)
            .map_err(|e| InferenceError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, InferenceError> {
        toml::to_string_pretty(self)
            .map_err(|e| InferenceError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses the host memory budget.
    pub fn parse_budget(&self) -> Result<MemoryBudget, InferenceError> {
        MemoryBudget::parse(&self.host_memory_budget)
            .map_err(|e| InferenceError::Config(format!("invalid host budget: {e}")))
    }

    /// Parses the device memory capacity into bytes.
    pub fn parse_device_memory(&self) -> Result<usize, InferenceError> {
        MemoryBudget::parse(&self.device_memory)
            .map(|b| b.as_bytes())
            .map_err(|e| InferenceError::Config(format!("invalid device memory: {e}")))
    }

    pub fn sync_timeout(&self) -> Option<Duration> {
        match self.sync_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn log_threshold(&self) -> Result<Severity, InferenceError> {
        Severity::parse(&self.log_threshold).ok_or_else(|| {
            InferenceError::Config(format!(
                "unknown log threshold '{}'; expected 'internal_error', 'error', 'warning', 'info' or 'verbose'",
                self.log_threshold
            ))
        })
    }

    /// Creates the default input producer named by `input_fill`.
    pub fn create_producer(&self) -> Result<Box<dyn InputProducer>, InferenceError> {
        let fill = self.input_fill.trim().to_lowercase();
        match fill.as_str() {
            "zeros" | "zero" => Ok(Box::new(Zeros)),
            "seeded" | "random" => Ok(Box::new(SeededFill::new(self.seed))),
            other => match other.strip_prefix("constant:") {
                Some(v) => {
                    let value: f64 = v.trim().parse().map_err(|_| {
                        InferenceError::Config(format!("invalid constant fill value '{v}'"))
                    })?;
                    Ok(Box::new(ConstantFill(value)))
                }
                None => Err(InferenceError::Config(format!(
                    "unknown input fill '{other}'; expected 'zeros', 'constant:<value>' or 'seeded'"
                ))),
            },
        }
    }

    /// Session options built from this configuration.
    pub fn session_options(&self) -> Result<SessionOptions, InferenceError> {
        Ok(SessionOptions {
            host_pool: HostPool::new(self.parse_budget()?),
            sync_timeout: self.sync_timeout(),
            sink: Arc::new(TracingSink::new(self.log_threshold()?)),
        })
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine_path: PathBuf::from("./model.plan"),
            host_memory_budget: "512M".to_string(),
            device_memory: "1G".to_string(),
            sync_timeout_ms: default_sync_timeout_ms(),
            log_threshold: default_log_threshold(),
            input_fill: default_input_fill(),
            seed: 0,
            preview_count: default_preview_count(),
        }
    }
}
