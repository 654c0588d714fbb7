// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Image preprocessing for vision engines.
//!
//! Pure functions over already-decoded pixels: interleaved 8-bit BGR rows
//! in, planar `f32` RGB out. Decoding image files is left to the caller.

/// Per-channel mean used by ImageNet-trained models (RGB order).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel standard deviation used by ImageNet-trained models.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Errors from pixel layout conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreprocessError {
    #[error("expected {expected} values for a {height}x{width} 3-channel image, got {actual}")]
    Dimensions {
        height: usize,
        width: usize,
        expected: usize,
        actual: usize,
    },
}

fn check_len(len: usize, height: usize, width: usize) -> Result<usize, PreprocessError> {
    let plane = height * width;
    if len != plane * 3 {
        return Err(PreprocessError::Dimensions {
            height,
            width,
            expected: plane * 3,
            actual: len,
        });
    }
    Ok(plane)
}

/// Converts interleaved BGR (`H × W × 3`) into planar RGB (`3 × H × W`).
///
/// Values keep their 0–255 range.
pub fn bgr_hwc_to_rgb_chw(
    bgr: &[u8],
    height: usize,
    width: usize,
) -> Result<Vec<f32>, PreprocessError> {
    let plane = check_len(bgr.len(), height, width)?;
    let mut chw = vec![0.0f32; plane * 3];
    for (i, px) in bgr.chunks_exact(3).enumerate() {
        chw[i] = px[2] as f32;
        chw[plane + i] = px[1] as f32;
        chw[2 * plane + i] = px[0] as f32;
    }
    Ok(chw)
}

/// Scales 0–255 values into `[0, 1]`.
pub fn normalize_unit(values: &mut [f32]) {
    for v in values {
        *v /= 255.0;
    }
}

/// Applies ImageNet mean/std normalisation to a planar RGB image already
/// scaled to `[0, 1]`.
pub fn imagenet_normalize(
    chw: &mut [f32],
    height: usize,
    width: usize,
) -> Result<(), PreprocessError> {
    let plane = check_len(chw.len(), height, width)?;
    if plane == 0 {
        return Ok(());
    }
    for (c, channel) in chw.chunks_exact_mut(plane).enumerate() {
        for v in channel {
            *v = (*v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    Ok(())
}
