//! # Honor-Chain Pipeline Benchmarks
//!
//! | Group | What is measured |
//! |-------|------------------|
//! | codec | marshal and unmarshal of a signed block |
//! | engine | check, play and commit of a received block |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use hc_03_block_codec::{marshal, unmarshal};
use hc_05_block_engine::BLOCK_VERSION;
use hc_tests::fixtures::{block_on, founder, genesis_node, key_id, slot_time, tip, transfer};
use shared_types::BlockHeader;
use std::time::Duration;

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.measurement_time(Duration::from_secs(5));
    let key = founder();
    let prev = BlockHeader {
        block_id: 1,
        ..Default::default()
    };
    let header = BlockHeader {
        block_id: 2,
        time: slot_time(1),
        ecosystem_id: 1,
        key_id: key_id(&key),
        version: BLOCK_VERSION,
        ..Default::default()
    };

    for size in [1usize, 10, 100] {
        let txs: Vec<Vec<u8>> = (0..size)
            .map(|i| transfer(slot_time(1) - 1, 10 + i as i64, 1).data)
            .collect();
        let (bytes, _) = marshal(&header, &txs, &prev, &key).unwrap();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("marshal", size), &txs, |b, txs| {
            b.iter(|| black_box(marshal(&header, txs, &prev, &key).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("unmarshal", size), &bytes, |b, bytes| {
            b.iter(|| black_box(unmarshal(bytes).unwrap()))
        });
    }
    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    group.measurement_time(Duration::from_secs(10));

    for size in [1usize, 10, 50] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(BenchmarkId::new("insert_received_block", size), |b| {
            b.iter_batched(
                || {
                    let ctx = genesis_node();
                    let txs: Vec<_> = (0..size)
                        .map(|i| transfer(slot_time(1) - 1, 10 + i as i64, 1))
                        .collect();
                    let block = block_on(&tip(&ctx), &txs);
                    (ctx, block)
                },
                |(ctx, block)| black_box(ctx.engine.insert_block_wo_forks(&block, false, false).unwrap()),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codec, bench_engine);
criterion_main!(benches);
