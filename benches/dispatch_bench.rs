// benches/dispatch_bench.rs

//! Dispatch pipeline benchmarks.
//!
//! Measures the pure-computation stages a dispatch runs through: argument
//! encoding, key extraction, slot hashing, and routing. No transport is
//! involved, so these numbers are the per-command overhead this crate adds
//! on top of the wire round trip.

use bytes::Bytes;
use criterion::{Criterion, criterion_group, criterion_main};
use slotcast::config::DispatchConfig;
use slotcast::core::cluster::{ShardInfo, SlotTable, key_slot, route};
use slotcast::core::commands::key_extractor::extract_keys;
use slotcast::core::commands::{ArgValue, CommandArgs, CommandTable, encode};
use std::hint::black_box;

fn bench_table() -> SlotTable {
    SlotTable::new(vec![
        ShardInfo {
            primary: "10.0.0.1:7000".into(),
            replicas: vec!["10.0.0.1:7100".into()],
            slots: vec![(0, 5460)],
        },
        ShardInfo {
            primary: "10.0.0.2:7000".into(),
            replicas: vec!["10.0.0.2:7100".into()],
            slots: vec![(5461, 10922)],
        },
        ShardInfo {
            primary: "10.0.0.3:7000".into(),
            replicas: vec![],
            slots: vec![(10923, 16383)],
        },
    ])
    .unwrap()
}

fn bench_encode(c: &mut Criterion) {
    let table = CommandTable::builtin();

    let get = table.get("GET").unwrap();
    let get_args = CommandArgs::new().with("key", "user:1000:profile");
    c.bench_function("encode/get", |b| {
        b.iter(|| encode(black_box(&get), black_box(&get_args)).unwrap())
    });

    let set = table.get("SET").unwrap();
    let set_args = CommandArgs::new()
        .with("key", "user:1000:profile")
        .with("value", "payload")
        .with("condition", ArgValue::token("NX"))
        .with("expiration", ArgValue::choice("seconds", 60i64));
    c.bench_function("encode/set_with_options", |b| {
        b.iter(|| encode(black_box(&set), black_box(&set_args)).unwrap())
    });

    let mset = table.get("MSET").unwrap();
    let mset_args = CommandArgs::new().with(
        "data",
        ArgValue::many(
            (0..32)
                .map(|i| {
                    ArgValue::group(vec![
                        format!("{{tag}}:key:{i}").into(),
                        format!("value-{i}").into(),
                    ])
                })
                .collect(),
        ),
    );
    c.bench_function("encode/mset_32_pairs", |b| {
        b.iter(|| encode(black_box(&mset), black_box(&mset_args)).unwrap())
    });
}

fn bench_key_extraction(c: &mut Criterion) {
    let table = CommandTable::builtin();
    let mset = table.get("MSET").unwrap();
    let args = CommandArgs::new().with(
        "data",
        ArgValue::many(
            (0..32)
                .map(|i| {
                    ArgValue::group(vec![format!("key:{i}").into(), "v".into()])
                })
                .collect(),
        ),
    );
    let encoded = encode(&mset, &args).unwrap();
    let key_spec = mset.key_spec.as_ref().unwrap();
    c.bench_function("extract_keys/mset_32_pairs", |b| {
        b.iter(|| extract_keys(black_box(key_spec), black_box(&encoded)).unwrap())
    });
}

fn bench_slot_hash(c: &mut Criterion) {
    c.bench_function("key_slot/plain", |b| {
        b.iter(|| key_slot(black_box(b"user:1000:profile")))
    });
    c.bench_function("key_slot/hashtag", |b| {
        b.iter(|| key_slot(black_box(b"user:{1000}:profile")))
    });
}

fn bench_route(c: &mut Criterion) {
    let table = bench_table();
    let config = DispatchConfig::default();
    let builtin = CommandTable::builtin();

    let get = builtin.get("GET").unwrap();
    let keys = [Bytes::from_static(b"user:1000:profile")];
    c.bench_function("route/single_key", |b| {
        b.iter(|| {
            route(
                black_box(&get),
                black_box(&keys),
                black_box(&table),
                black_box(&config),
            )
            .unwrap()
        })
    });

    let dbsize = builtin.get("DBSIZE").unwrap();
    c.bench_function("route/all_shards", |b| {
        b.iter(|| route(black_box(&dbsize), &[], black_box(&table), black_box(&config)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_key_extraction,
    bench_slot_hash,
    bench_route
);
criterion_main!(benches);
