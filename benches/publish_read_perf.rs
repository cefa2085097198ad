//! Publish/read throughput benchmarks for the frame ring buffer.

use criterion::{Criterion, criterion_group, criterion_main};
use frame_ring_shm::{FrameRecord, Handle};
use rand::RngCore;
use std::hint::black_box;
use tempfile::tempdir;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const DEPTH: u32 = 3;

fn bench_publish(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let handle = Handle::create_in(dir.path(), "bench_publish", WIDTH, HEIGHT, DEPTH).unwrap();
    let mut pixels = vec![0u8; (WIDTH * HEIGHT * DEPTH) as usize];
    rand::thread_rng().fill_bytes(&mut pixels);

    c.bench_function("publish_single_frame", |b| {
        b.iter(|| {
            handle
                .publish(WIDTH, HEIGHT, DEPTH, 0, black_box(&pixels))
                .unwrap();
        });
    });

    handle.destroy().unwrap();
}

fn bench_publish_then_read(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let handle = Handle::create_in(dir.path(), "bench_roundtrip", WIDTH, HEIGHT, DEPTH).unwrap();
    let mut pixels = vec![0u8; (WIDTH * HEIGHT * DEPTH) as usize];
    rand::thread_rng().fill_bytes(&mut pixels);
    let mut record = FrameRecord::new();

    c.bench_function("publish_then_blocking_read", |b| {
        b.iter(|| {
            handle.publish(WIDTH, HEIGHT, DEPTH, 0, black_box(&pixels)).unwrap();
            handle.read(&mut record, true).unwrap();
            black_box(record.frame_uid());
        });
    });

    handle.destroy().unwrap();
}

criterion_group!(benches, bench_publish, bench_publish_then_read);
criterion_main!(benches);
