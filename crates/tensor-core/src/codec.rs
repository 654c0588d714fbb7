// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Little-endian element encoding for flat tensor buffers.
//!
//! Host buffers are plain byte regions. These helpers write and read
//! elements of a given [`DType`] without reinterpreting pointers, so they
//! work on any alignment.

use crate::{DType, TensorError};

/// Writes one element per slot of `dest`, taking values from `value_at(i)`.
///
/// Values are converted to the target type with saturating casts; `Bool`
/// stores `1` for any non-zero value. `fp8` is E4M3, saturating at ±448.
pub fn fill_elements(
    dtype: DType,
    dest: &mut [u8],
    mut value_at: impl FnMut(usize) -> f64,
) -> Result<(), TensorError> {
    let width = dtype.size_bytes();
    if dest.len() % width != 0 {
        return Err(TensorError::BufferSizeMismatch {
            expected: dest.len() - dest.len() % width,
            actual: dest.len(),
        });
    }

    for (i, chunk) in dest.chunks_exact_mut(width).enumerate() {
        let v = value_at(i);
        match dtype {
            DType::F32 => chunk.copy_from_slice(&(v as f32).to_le_bytes()),
            DType::F16 => chunk.copy_from_slice(&half::f16::from_f64(v).to_le_bytes()),
            DType::I32 => chunk.copy_from_slice(&(v as i32).to_le_bytes()),
            DType::I8 => chunk[0] = (v as i8) as u8,
            DType::U8 => chunk[0] = v as u8,
            DType::Bool => chunk[0] = u8::from(v != 0.0),
            DType::Fp8 => chunk[0] = f64_to_e4m3(v),
        }
    }
    Ok(())
}

/// Decodes every element of `bytes` as `f64`.
pub fn decode_elements(dtype: DType, bytes: &[u8]) -> Result<Vec<f64>, TensorError> {
    decode_prefix(dtype, bytes, usize::MAX)
}

/// Decodes at most `limit` leading elements of `bytes` as `f64`.
pub fn decode_prefix(dtype: DType, bytes: &[u8], limit: usize) -> Result<Vec<f64>, TensorError> {
    let width = dtype.size_bytes();
    if bytes.len() % width != 0 {
        return Err(TensorError::BufferSizeMismatch {
            expected: bytes.len() - bytes.len() % width,
            actual: bytes.len(),
        });
    }

    bytes
        .chunks_exact(width)
        .take(limit)
        .map(|chunk| match dtype {
            DType::F32 => Ok(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64),
            DType::F16 => Ok(half::f16::from_le_bytes([chunk[0], chunk[1]]).to_f64()),
            DType::I32 => Ok(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64),
            DType::I8 => Ok(chunk[0] as i8 as f64),
            DType::U8 | DType::Bool => Ok(chunk[0] as f64),
            DType::Fp8 => Ok(e4m3_to_f64(chunk[0])),
        })
        .collect()
}

const E4M3_MAX: f64 = 448.0;
const E4M3_MIN_NORMAL: f64 = 1.0 / 64.0;
const E4M3_SUBNORMAL_STEP: f64 = 1.0 / 512.0;

/// Encodes `v` as an fp8 E4M3 byte (1 sign, 4 exponent bits with bias 7,
/// 3 mantissa bits, no infinities). Rounds to nearest even and saturates
/// to the largest finite value; NaN maps to `0x7F`.
pub fn f64_to_e4m3(v: f64) -> u8 {
    if v.is_nan() {
        return 0x7F;
    }
    let sign = if v.is_sign_negative() { 0x80 } else { 0x00 };
    let a = v.abs();
    if a >= E4M3_MAX {
        return sign | 0x7E;
    }
    if a < E4M3_MIN_NORMAL {
        // A step count of 8 is exactly the smallest normal, 0x08.
        return sign | round_half_even(a / E4M3_SUBNORMAL_STEP) as u8;
    }

    let mut exp = a.log2().floor() as i32;
    let mut scaled = a / 2f64.powi(exp);
    if scaled >= 2.0 {
        exp += 1;
        scaled /= 2.0;
    } else if scaled < 1.0 {
        exp -= 1;
        scaled *= 2.0;
    }
    let mut mantissa = round_half_even((scaled - 1.0) * 8.0) as u8;
    if mantissa == 8 {
        mantissa = 0;
        exp += 1;
    }
    let biased = exp + 7;
    if biased > 15 || (biased == 15 && mantissa == 7) {
        return sign | 0x7E;
    }
    sign | ((biased as u8) << 3) | mantissa
}

/// Decodes an fp8 E4M3 byte.
pub fn e4m3_to_f64(b: u8) -> f64 {
    let sign = if b & 0x80 != 0 { -1.0 } else { 1.0 };
    let exp = i32::from((b >> 3) & 0x0F);
    let mantissa = f64::from(b & 0x07);
    match exp {
        15 if mantissa == 7.0 => f64::NAN,
        0 => sign * mantissa * E4M3_SUBNORMAL_STEP,
        _ => sign * (1.0 + mantissa / 8.0) * 2f64.powi(exp - 7),
    }
}

fn round_half_even(x: f64) -> f64 {
    let floor = x.floor();
    let frac = x - floor;
    if frac > 0.5 || (frac == 0.5 && floor % 2.0 != 0.0) {
        floor + 1.0
    } else {
        floor
    }
}

/// Encodes a slice of `f32` into little-endian bytes.
pub fn encode_f32(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decodes little-endian bytes into `f32` values.
pub fn decode_f32(bytes: &[u8]) -> Result<Vec<f32>, TensorError> {
    if bytes.len() % 4 != 0 {
        return Err(TensorError::BufferSizeMismatch {
            expected: bytes.len() - bytes.len() % 4,
            actual: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
