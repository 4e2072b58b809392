use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use stable_container::{
    decode, encode, hash_tree_root, Element, ElementType, FieldDescriptor, FieldProof,
    FieldValue, Sha256Hasher, StableSchema, StableValue,
};

/// A schema of `fields` alternating uint64 and byte-list fields, capacity 256.
fn wide_schema(fields: usize) -> StableSchema {
    StableSchema::new(
        "Wide",
        256,
        (0..fields)
            .map(|i| {
                if i % 2 == 0 {
                    FieldDescriptor::optional(format!("n{}", i), ElementType::Uint64)
                } else {
                    FieldDescriptor::optional(format!("b{}", i), ElementType::ByteList(256))
                }
            })
            .collect(),
    )
    .unwrap()
}

/// Every third field absent.
fn wide_value(fields: usize) -> StableValue {
    StableValue::new(
        (0..fields)
            .map(|i| match i {
                i if i % 3 == 2 => FieldValue::Absent,
                i if i % 2 == 0 => Element::Uint64(i as u64).into(),
                i => Element::ByteList(vec![i as u8; 64]).into(),
            })
            .collect(),
    )
}

pub fn encode_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    for fields in [8, 64, 256] {
        let schema = wide_schema(fields);
        let value = wide_value(fields);
        let bytes = encode(&schema, &value).unwrap();
        group.bench_with_input(BenchmarkId::new("encode", fields), &value, |b, value| {
            b.iter(|| encode(&schema, black_box(value)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("decode", fields), &bytes, |b, bytes| {
            b.iter(|| decode(black_box(bytes), &schema).unwrap())
        });
    }
    group.finish();
}

pub fn root(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_tree_root");
    for fields in [8, 64, 256] {
        let schema = wide_schema(fields);
        let value = wide_value(fields);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &value, |b, value| {
            b.iter(|| hash_tree_root(&schema, black_box(value)).unwrap())
        });
    }
    group.finish();
}

pub fn proofs(c: &mut Criterion) {
    let schema = wide_schema(64);
    let value = wide_value(64);
    let root = hash_tree_root(&schema, &value).unwrap();
    let proof = FieldProof::generate::<Sha256Hasher>(&schema, &value, 7).unwrap();

    c.bench_function("field proof generation", |b| {
        b.iter(|| FieldProof::generate::<Sha256Hasher>(&schema, black_box(&value), 7).unwrap())
    });
    c.bench_function("field proof verification", |b| {
        b.iter(|| black_box(&proof).verify::<Sha256Hasher>(&root).unwrap())
    });
}

criterion_group!(benches, encode_decode, root, proofs);
criterion_main!(benches);
