//! Multi-reader contention benchmarks using an `Arc<Barrier>`-synchronized
//! start so all reader threads begin polling at the same instant.

use criterion::{Criterion, criterion_group, criterion_main};
use frame_ring_shm::{FrameRecord, Handle};
use std::hint::black_box;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const DEPTH: u32 = 3;
const READS_PER_THREAD: usize = 100;

fn bench_concurrent_readers(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let dir_path = dir.path().to_path_buf();
    let handle = Handle::create_in(&dir_path, "bench_concurrent", WIDTH, HEIGHT, DEPTH).unwrap();
    let pixels = vec![0xABu8; (WIDTH * HEIGHT * DEPTH) as usize];
    handle.publish(WIDTH, HEIGHT, DEPTH, 0, &pixels).unwrap();

    c.bench_function("concurrent_10_readers", |b| {
        b.iter(|| {
            let barrier = Arc::new(Barrier::new(11));
            let mut handles = Vec::new();

            for _ in 0..10 {
                let dir_path = dir_path.clone();
                let barrier = barrier.clone();
                handles.push(thread::spawn(move || {
                    let reader = Handle::open_in(&dir_path, "bench_concurrent").unwrap();
                    let mut record = FrameRecord::new();
                    barrier.wait();

                    for _ in 0..READS_PER_THREAD {
                        let _ = reader.read(&mut record, false);
                        black_box(record.frame_uid());
                    }
                    reader.close().map_err(|(_, e)| e).unwrap();
                }));
            }

            barrier.wait();
            for h in handles {
                h.join().unwrap();
            }
        });
    });

    handle.destroy().unwrap();
}

/// Reader throughput while the writer continuously publishes, contending
/// for the same slot locks.
fn bench_reader_under_write_pressure(c: &mut Criterion) {
    c.bench_function("reader_under_write_pressure", |b| {
        b.iter(|| {
            let dir = tempdir().unwrap();
            let dir_path = dir.path().to_path_buf();
            let owner = Handle::create_in(&dir_path, "bench_pressure", WIDTH, HEIGHT, DEPTH).unwrap();
            let frame_bytes = (WIDTH * HEIGHT * DEPTH) as usize;

            let barrier = Arc::new(Barrier::new(2));
            let writer_barrier = barrier.clone();
            let writer = thread::spawn(move || {
                writer_barrier.wait();
                // Each publish's pixels are a single byte equal to its own
                // frame_uid (mod 256), so a reader can check for torn frames
                // without any side channel back to the writer.
                for i in 1u64..=50 {
                    let pixels = vec![(i % 256) as u8; frame_bytes];
                    owner.publish(WIDTH, HEIGHT, DEPTH, 0, &pixels).unwrap();
                    thread::yield_now();
                }
                owner
            });

            let reader_dir = dir_path.clone();
            let reader_barrier = barrier.clone();
            let reader = thread::spawn(move || {
                let handle = Handle::open_in(&reader_dir, "bench_pressure").unwrap();
                let mut record = FrameRecord::new();
                reader_barrier.wait();
                for _ in 0..100 {
                    if handle.read(&mut record, false).is_ok() {
                        let expected = (record.frame_uid() % 256) as u8;
                        assert!(
                            record.pixels().iter().all(|&b| b == expected),
                            "torn frame: frame_uid={} pixels not uniform",
                            record.frame_uid()
                        );
                        black_box(record.frame_uid());
                    }
                    thread::yield_now();
                }
                handle
            });

            let owner = writer.join().unwrap();
            let reader_handle = reader.join().unwrap();
            reader_handle.close().map_err(|(_, e)| e).unwrap();
            owner.destroy().unwrap();
        });
    });
}

criterion_group!(benches, bench_concurrent_readers, bench_reader_under_write_pressure);
criterion_main!(benches);
