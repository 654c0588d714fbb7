// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host-side execution of plan kernels against simulated device memory.

use crate::{DeviceError, DevicePtr};
use plan_format::Kernel;
use std::collections::HashMap;
use tensor_core::codec;

/// A tensor operand resolved to an address and byte length.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Operand {
    pub ptr: DevicePtr,
    pub len: usize,
}

/// A kernel whose tensor names were resolved at enqueue time.
#[derive(Debug, Clone)]
pub(crate) struct BoundKernel {
    pub kernel: Kernel,
    pub input: Option<Operand>,
    pub output: Operand,
}

fn read(memory: &HashMap<u64, Vec<u8>>, op: Operand) -> Result<&[u8], DeviceError> {
    memory
        .get(&op.ptr.addr())
        .and_then(|region| region.get(..op.len))
        .ok_or_else(|| DeviceError::KernelFault(format!("operand {} is no longer readable", op.ptr)))
}

fn write<'a>(
    memory: &'a mut HashMap<u64, Vec<u8>>,
    op: Operand,
) -> Result<&'a mut [u8], DeviceError> {
    memory
        .get_mut(&op.ptr.addr())
        .and_then(|region| region.get_mut(..op.len))
        .ok_or_else(|| DeviceError::KernelFault(format!("operand {} is no longer writable", op.ptr)))
}

pub(crate) fn run(bound: &BoundKernel, memory: &mut HashMap<u64, Vec<u8>>) -> Result<(), DeviceError> {
    match &bound.kernel {
        Kernel::Fill { byte, .. } => {
            write(memory, bound.output)?.fill(*byte);
        }
        Kernel::Identity { .. } => {
            let input = bound
                .input
                .ok_or_else(|| DeviceError::KernelFault("identity without input".into()))?;
            let src = read(memory, input)?.to_vec();
            let dst = write(memory, bound.output)?;
            if src.len() != dst.len() {
                return Err(DeviceError::KernelFault(format!(
                    "identity size mismatch: {} vs {} bytes",
                    src.len(),
                    dst.len()
                )));
            }
            dst.copy_from_slice(&src);
        }
        Kernel::Relu { .. } => {
            let input = bound
                .input
                .ok_or_else(|| DeviceError::KernelFault("relu without input".into()))?;
            let values = codec::decode_f32(read(memory, input)?)
                .map_err(|e| DeviceError::KernelFault(e.to_string()))?;
            let rectified: Vec<f32> = values.into_iter().map(|v| v.max(0.0)).collect();
            let bytes = codec::encode_f32(&rectified);
            let dst = write(memory, bound.output)?;
            if bytes.len() != dst.len() {
                return Err(DeviceError::KernelFault(format!(
                    "relu size mismatch: {} vs {} bytes",
                    bytes.len(),
                    dst.len()
                )));
            }
            dst.copy_from_slice(&bytes);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> HashMap<u64, Vec<u8>> {
        let mut m = HashMap::new();
        m.insert(0x100, codec::encode_f32(&[-1.5, 2.0, 0.0, -0.25]));
        m.insert(0x200, vec![0u8; 16]);
        m
    }

    fn operand(addr: u64) -> Operand {
        Operand {
            ptr: DevicePtr(addr),
            len: 16,
        }
    }

    #[test]
    fn test_relu() {
        let mut mem = memory();
        let k = BoundKernel {
            kernel: Kernel::Relu {
                input: "x".into(),
                output: "y".into(),
            },
            input: Some(operand(0x100)),
            output: operand(0x200),
        };
        run(&k, &mut mem).unwrap();
        assert_eq!(codec::decode_f32(&mem[&0x200]).unwrap(), vec![0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_identity_and_fill() {
        let mut mem = memory();
        let copy = BoundKernel {
            kernel: Kernel::Identity {
                input: "x".into(),
                output: "y".into(),
            },
            input: Some(operand(0x100)),
            output: operand(0x200),
        };
        run(&copy, &mut mem).unwrap();
        assert_eq!(mem[&0x100], mem[&0x200]);

        let fill = BoundKernel {
            kernel: Kernel::Fill {
                output: "y".into(),
                byte: 0xAB,
            },
            input: None,
            output: operand(0x200),
        };
        run(&fill, &mut mem).unwrap();
        assert!(mem[&0x200].iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_freed_operand_faults() {
        let mut mem = memory();
        mem.remove(&0x200);
        let fill = BoundKernel {
            kernel: Kernel::Fill {
                output: "y".into(),
                byte: 1,
            },
            input: None,
            output: operand(0x200),
        };
        assert!(matches!(run(&fill, &mut mem), Err(DeviceError::KernelFault(_))));
    }
}
