// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Input producers: what gets written into each input's host buffer.
//!
//! The pipeline only checks sizes; the bytes themselves come from an
//! [`InputProducer`]. An [`InputSet`] picks a producer per input tensor,
//! falling back to a default.

use crate::preprocess::{self, PreprocessError};
use crate::TensorSlot;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::HashMap;
use std::fmt;
use tensor_core::{codec, DType, TensorError};

/// Why a producer could not fill a buffer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProduceError {
    #[error("producer supplies {actual} bytes, tensor needs {expected}")]
    Size { expected: usize, actual: usize },

    #[error("producer needs {expected} elements, tensor is {actual}")]
    DType { expected: DType, actual: DType },

    #[error(transparent)]
    Encoding(#[from] TensorError),

    #[error(transparent)]
    Image(#[from] PreprocessError),
}

/// Writes the contents of one input tensor.
pub trait InputProducer: Send + Sync {
    /// Short label for diagnostics.
    fn describe(&self) -> String;

    /// Fills `dest`, which is exactly `slot.size_bytes` long.
    fn fill(&self, slot: &TensorSlot, dest: &mut [u8]) -> Result<(), ProduceError>;
}

impl<P: InputProducer + ?Sized> InputProducer for Box<P> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn fill(&self, slot: &TensorSlot, dest: &mut [u8]) -> Result<(), ProduceError> {
        (**self).fill(slot, dest)
    }
}

/// All-zero bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zeros;

impl InputProducer for Zeros {
    fn describe(&self) -> String {
        "zeros".into()
    }

    fn fill(&self, _slot: &TensorSlot, dest: &mut [u8]) -> Result<(), ProduceError> {
        dest.fill(0);
        Ok(())
    }
}

/// Every element set to one value, converted to the slot's element type.
#[derive(Debug, Clone, Copy)]
pub struct ConstantFill(pub f64);

impl InputProducer for ConstantFill {
    fn describe(&self) -> String {
        format!("constant:{}", self.0)
    }

    fn fill(&self, slot: &TensorSlot, dest: &mut [u8]) -> Result<(), ProduceError> {
        codec::fill_elements(slot.dtype, dest, |_| self.0)?;
        Ok(())
    }
}

/// Deterministic pseudo-random data.
///
/// Floating-point tensors get values in `[0, 1)`, booleans get `0`/`1`,
/// and every other type gets uniformly random bytes. The stream for each
/// tensor is derived from the seed and the tensor name, so inputs differ
/// from one another but repeat exactly across runs.
#[derive(Debug, Clone, Copy)]
pub struct SeededFill {
    pub seed: u64,
}

impl SeededFill {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, name: &str) -> StdRng {
        // FNV-1a over the name, mixed into the seed.
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for b in name.bytes() {
            h ^= u64::from(b);
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        StdRng::seed_from_u64(self.seed ^ h)
    }
}

impl InputProducer for SeededFill {
    fn describe(&self) -> String {
        format!("seeded:{}", self.seed)
    }

    fn fill(&self, slot: &TensorSlot, dest: &mut [u8]) -> Result<(), ProduceError> {
        let mut rng = self.rng_for(&slot.name);
        match slot.dtype {
            DType::F32 | DType::F16 | DType::Fp8 => {
                codec::fill_elements(slot.dtype, dest, |_| rng.gen::<f64>())?;
            }
            DType::Bool => {
                for b in dest.iter_mut() {
                    *b = u8::from(rng.gen::<bool>());
                }
            }
            _ => rng.fill_bytes(dest),
        }
        Ok(())
    }
}

/// Caller-supplied bytes, which must match the tensor size exactly.
#[derive(Clone)]
pub struct RawBytes(pub Vec<u8>);

impl InputProducer for RawBytes {
    fn describe(&self) -> String {
        format!("raw:{} bytes", self.0.len())
    }

    fn fill(&self, _slot: &TensorSlot, dest: &mut [u8]) -> Result<(), ProduceError> {
        if self.0.len() != dest.len() {
            return Err(ProduceError::Size {
                expected: dest.len(),
                actual: self.0.len(),
            });
        }
        dest.copy_from_slice(&self.0);
        Ok(())
    }
}

impl fmt::Debug for RawBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawBytes").field(&self.0.len()).finish()
    }
}

/// `float32` values for a `float32` tensor.
#[derive(Debug, Clone)]
pub struct F32Values(pub Vec<f32>);

impl InputProducer for F32Values {
    fn describe(&self) -> String {
        format!("f32:{} values", self.0.len())
    }

    fn fill(&self, slot: &TensorSlot, dest: &mut [u8]) -> Result<(), ProduceError> {
        if slot.dtype != DType::F32 {
            return Err(ProduceError::DType {
                expected: DType::F32,
                actual: slot.dtype,
            });
        }
        RawBytes(codec::encode_f32(&self.0)).fill(slot, dest)
    }
}

/// How an [`ImageTensor`] scales its pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageNormalization {
    /// Divide by 255.
    Unit,
    /// Divide by 255, then apply ImageNet mean/std.
    #[default]
    ImageNet,
}

/// A decoded BGR image laid out for a `float32` `1×3×H×W` input.
#[derive(Clone)]
pub struct ImageTensor {
    pub bgr: Vec<u8>,
    pub height: usize,
    pub width: usize,
    pub normalization: ImageNormalization,
}

impl ImageTensor {
    pub fn new(bgr: Vec<u8>, height: usize, width: usize) -> Self {
        Self {
            bgr,
            height,
            width,
            normalization: ImageNormalization::default(),
        }
    }

    /// The planar, normalised values this producer writes.
    pub fn to_chw(&self) -> Result<Vec<f32>, PreprocessError> {
        let mut chw = preprocess::bgr_hwc_to_rgb_chw(&self.bgr, self.height, self.width)?;
        preprocess::normalize_unit(&mut chw);
        if self.normalization == ImageNormalization::ImageNet {
            preprocess::imagenet_normalize(&mut chw, self.height, self.width)?;
        }
        Ok(chw)
    }
}

impl InputProducer for ImageTensor {
    fn describe(&self) -> String {
        format!("image:{}x{}", self.height, self.width)
    }

    fn fill(&self, slot: &TensorSlot, dest: &mut [u8]) -> Result<(), ProduceError> {
        F32Values(self.to_chw()?).fill(slot, dest)
    }
}

impl fmt::Debug for ImageTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageTensor")
            .field("height", &self.height)
            .field("width", &self.width)
            .field("normalization", &self.normalization)
            .finish()
    }
}

/// Producers keyed by input tensor name, with a fallback.
pub struct InputSet {
    by_name: HashMap<String, Box<dyn InputProducer>>,
    default: Box<dyn InputProducer>,
}

impl InputSet {
    /// Every input is zero-filled unless overridden.
    pub fn new() -> Self {
        Self::with_default(Zeros)
    }

    pub fn with_default(default: impl InputProducer + 'static) -> Self {
        Self {
            by_name: HashMap::new(),
            default: Box::new(default),
        }
    }

    /// Uses `producer` for the tensor called `name`.
    pub fn with(mut self, name: impl Into<String>, producer: impl InputProducer + 'static) -> Self {
        self.insert(name, producer);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, producer: impl InputProducer + 'static) {
        self.by_name.insert(name.into(), Box::new(producer));
    }

    pub fn producer_for(&self, name: &str) -> &dyn InputProducer {
        self.by_name
            .get(name)
            .map_or(self.default.as_ref(), |p| p.as_ref())
    }

    /// Names with an explicit producer.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }
}

impl Default for InputSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InputSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("InputSet")
            .field("overrides", &names)
            .field("default", &self.default.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;
    use tensor_core::Shape;

    fn slot(name: &str, dtype: DType, dims: Vec<usize>) -> TensorSlot {
        let shape = Shape::new(dims);
        TensorSlot {
            name: name.into(),
            direction: Direction::Input,
            dtype,
            size_bytes: shape.size_bytes(dtype),
            shape,
        }
    }

    fn produce(p: &dyn InputProducer, s: &TensorSlot) -> Result<Vec<u8>, ProduceError> {
        let mut buf = vec![0xFFu8; s.size_bytes];
        p.fill(s, &mut buf)?;
        Ok(buf)
    }

    #[test]
    fn test_zeros() {
        let s = slot("x", DType::I32, vec![3]);
        assert_eq!(produce(&Zeros, &s).unwrap(), vec![0; 12]);
    }

    #[test]
    fn test_constant_converts_to_dtype() {
        let s = slot("x", DType::F32, vec![2]);
        let bytes = produce(&ConstantFill(1.5), &s).unwrap();
        assert_eq!(codec::decode_f32(&bytes).unwrap(), vec![1.5, 1.5]);

        let s = slot("x", DType::I32, vec![1]);
        assert_eq!(produce(&ConstantFill(7.0), &s).unwrap(), 7i32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_fp8_constant_and_seeded() {
        let s = slot("x", DType::Fp8, vec![4]);
        assert_eq!(produce(&ConstantFill(0.0), &s).unwrap(), vec![0x00; 4]);
        assert_eq!(produce(&ConstantFill(1.0), &s).unwrap(), vec![0x38; 4]);

        let bytes = produce(&SeededFill::new(3), &s).unwrap();
        let values = codec::decode_elements(DType::Fp8, &bytes).unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_seeded_is_deterministic_and_in_range() {
        let s = slot("input", DType::F32, vec![64]);
        let a = produce(&SeededFill::new(42), &s).unwrap();
        let b = produce(&SeededFill::new(42), &s).unwrap();
        assert_eq!(a, b);
        assert!(codec::decode_f32(&a)
            .unwrap()
            .iter()
            .all(|v| (0.0..=1.0).contains(v)));

        let c = produce(&SeededFill::new(43), &s).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_seeded_differs_per_tensor() {
        let a = produce(&SeededFill::new(1), &slot("a", DType::U8, vec![32])).unwrap();
        let b = produce(&SeededFill::new(1), &slot("b", DType::U8, vec![32])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_seeded_bool_is_zero_or_one() {
        let bytes = produce(&SeededFill::new(9), &slot("m", DType::Bool, vec![50])).unwrap();
        assert!(bytes.iter().all(|&b| b <= 1));
    }

    #[test]
    fn test_raw_bytes_size_checked() {
        let s = slot("x", DType::U8, vec![4]);
        assert_eq!(produce(&RawBytes(vec![1, 2, 3, 4]), &s).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(
            produce(&RawBytes(vec![1, 2, 3]), &s),
            Err(ProduceError::Size {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_f32_values_require_f32_slot() {
        let s = slot("x", DType::F16, vec![2]);
        assert!(matches!(
            produce(&F32Values(vec![1.0, 2.0]), &s),
            Err(ProduceError::DType { .. })
        ));
    }

    #[test]
    fn test_image_tensor() {
        let s = slot("image", DType::F32, vec![1, 3, 2, 2]);
        let img = ImageTensor {
            bgr: vec![0; 12],
            height: 2,
            width: 2,
            normalization: ImageNormalization::Unit,
        };
        let bytes = produce(&img, &s).unwrap();
        assert_eq!(codec::decode_f32(&bytes).unwrap(), vec![0.0; 12]);

        let wrong = slot("image", DType::F32, vec![1, 3, 4, 4]);
        assert!(matches!(produce(&img, &wrong), Err(ProduceError::Size { .. })));
    }

    #[test]
    fn test_input_set_fallback() {
        let set = InputSet::with_default(ConstantFill(2.0)).with("mask", Zeros);
        assert_eq!(set.producer_for("mask").describe(), "zeros");
        assert_eq!(set.producer_for("other").describe(), "constant:2");
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["mask"]);
    }
}
