// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Plain handle types passed across the backend boundary.
//!
//! None of these are dereferenced by host code; they are opaque tokens the
//! backend hands out and later accepts back.

use std::fmt;

/// An address in device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePtr(pub u64);

impl DevicePtr {
    pub const NULL: DevicePtr = DevicePtr(0);

    pub fn addr(self) -> u64 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:012x}", self.0)
    }
}

/// An ordered queue of asynchronous device work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream #{}", self.0)
    }
}

/// Claim on the bytes of an asynchronous device-to-host copy.
///
/// The bytes become available through
/// [`Device::take_download`](crate::Device::take_download) once the stream
/// the copy was enqueued on has been synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CopyTicket(pub u64);

impl fmt::Display for CopyTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "download #{}", self.0)
    }
}

/// Whether the engine reads or writes a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorIoMode {
    Input,
    Output,
}

impl fmt::Display for TensorIoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TensorIoMode::Input => "input",
            TensorIoMode::Output => "output",
        })
    }
}
