// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and byte-size computation.

use crate::{DType, TensorError};
use std::fmt;

/// Dimensions of a tensor slot, outermost first.
///
/// Dimensions are unsigned, so the non-negativity invariant holds by
/// construction; runtime-reported signed dimensions go through
/// [`Shape::from_signed`]. A zero-sized dimension is legal and yields an
/// empty tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{DType, Shape};
    /// let s = Shape::new(vec![1, 3, 224, 224]);
    /// assert_eq!(s.rank(), 4);
    /// assert_eq!(s.size_bytes(DType::F32), 602_112);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0, one element).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Converts runtime-reported signed dimensions.
    ///
    /// Negative values (dynamic dimensions left unresolved) are rejected.
    pub fn from_signed(dims: &[i64]) -> Result<Self, TensorError> {
        let dims = dims
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                usize::try_from(value).map_err(|_| TensorError::NegativeDimension { index, value })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { dims })
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns `true` if any dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.dims.contains(&0)
    }

    /// Returns the total number of elements (1 for a scalar).
    ///
    /// # Panics
    /// Panics on overflow; use [`Shape::checked_num_elements`] for
    /// untrusted shapes.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the element count, or `None` if it overflows.
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Computes the byte footprint for `dtype`: `product(dims) × element size`.
    pub fn size_bytes(&self, dtype: DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Overflow-checked variant of [`Shape::size_bytes`].
    pub fn checked_size_bytes(&self, dtype: DType) -> Result<usize, TensorError> {
        self.checked_num_elements()
            .and_then(|n| n.checked_mul(dtype.size_bytes()))
            .ok_or_else(|| TensorError::SizeOverflow {
                dims: self.dims.clone(),
            })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.num_elements(), 1);
        assert_eq!(s.size_bytes(DType::I32), 4);
    }

    #[test]
    fn test_classifier_contract_sizes() {
        assert_eq!(Shape::new(vec![1, 3, 224, 224]).size_bytes(DType::F32), 602_112);
        assert_eq!(Shape::new(vec![1, 1000]).size_bytes(DType::F32), 4000);
        assert_eq!(Shape::new(vec![1, 4]).size_bytes(DType::I32), 16);
    }

    #[test]
    fn test_zero_dimension_is_empty() {
        let s = Shape::new(vec![4, 0, 8]);
        assert!(s.is_empty());
        assert_eq!(s.size_bytes(DType::F32), 0);
    }

    #[test]
    fn test_from_signed_rejects_dynamic_dims() {
        let err = Shape::from_signed(&[1, -1, 224]).unwrap_err();
        assert_eq!(err, TensorError::NegativeDimension { index: 1, value: -1 });

        let ok = Shape::from_signed(&[2, 3]).unwrap();
        assert_eq!(ok.dims(), &[2, 3]);
    }

    #[test]
    fn test_checked_size_overflow() {
        let s = Shape::new(vec![usize::MAX, 2]);
        assert!(matches!(
            s.checked_size_bytes(DType::U8),
            Err(TensorError::SizeOverflow { .. })
        ));
    }

    #[test]
    fn test_display() {
        let s = Shape::new(vec![1, 3, 224, 224]);
        assert_eq!(format!("{s}"), "(1, 3, 224, 224)");
        assert_eq!(format!("{}", Shape::scalar()), "()");
    }

    proptest! {
        #[test]
        fn prop_size_is_product_times_element_size(
            dims in proptest::collection::vec(0usize..64, 0..5),
            code in 0i32..7,
        ) {
            let dtype = DType::from_code(code).unwrap();
            let shape = Shape::new(dims.clone());
            let expected = dims.iter().product::<usize>() * dtype.size_bytes();
            prop_assert_eq!(shape.size_bytes(dtype), expected);
            prop_assert_eq!(shape.checked_size_bytes(dtype).unwrap(), expected);
            if dims.contains(&0) {
                prop_assert_eq!(shape.size_bytes(dtype), 0);
            }
        }
    }
}
