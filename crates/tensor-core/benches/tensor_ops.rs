// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for element encoding on input-sized buffers.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tensor_core::{codec, DType, Shape};

fn bench_fill_f32(c: &mut Criterion) {
    let size = Shape::new(vec![1, 3, 224, 224]).size_bytes(DType::F32);
    let mut buf = vec![0u8; size];
    c.bench_function("fill_f32_1x3x224x224", |b| {
        b.iter(|| codec::fill_elements(DType::F32, black_box(&mut buf), |i| i as f64 * 0.5))
    });
}

fn bench_decode_f32(c: &mut Criterion) {
    let values: Vec<f32> = (0..1000).map(|i| i as f32).collect();
    let bytes = codec::encode_f32(&values);
    c.bench_function("decode_f32_1000", |b| {
        b.iter(|| codec::decode_f32(black_box(&bytes)))
    });
}

criterion_group!(benches, bench_fill_f32, bench_decode_f32);
criterion_main!(benches);
