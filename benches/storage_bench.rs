//! Benchmarks for BLF session operations

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::TempDir;

use blf::{Config, Session, SyncStrategy};

fn bench_config() -> Config {
    Config::builder().sync_strategy(SyncStrategy::Flush).build()
}

/// Session pre-filled with `count` entries
fn filled_session(dir: &TempDir, count: usize, index: bool) -> Session {
    let config = Config::builder()
        .sync_strategy(SyncStrategy::Flush)
        .index_keys(index)
        .build();
    let mut session = Session::create_with_config(dir.path().join("bench.blf"), config).unwrap();
    for i in 0..count {
        let key = format!("key{:05}", i);
        session.put(key.as_bytes(), b"value-0000").unwrap();
    }
    session
}

fn storage_benchmarks(c: &mut Criterion) {
    // Same-length overwrite (in place)
    c.bench_function("put_in_place", |b| {
        let dir = TempDir::new().unwrap();
        let mut session = filled_session(&dir, 100, false);
        b.iter(|| session.put(black_box(b"key00050"), b"value-1111").unwrap());
    });

    // Linear scan vs. in-memory index
    for index in [false, true] {
        let name = if index { "get_indexed" } else { "get_scan" };
        c.bench_function(name, |b| {
            let dir = TempDir::new().unwrap();
            let mut session = filled_session(&dir, 1000, index);
            let mut buf = [0u8; 16];
            b.iter(|| session.get(black_box(b"key00999"), &mut buf).unwrap());
        });
    }

    // Append on a fresh file
    c.bench_function("put_append_100", |b| {
        b.iter_batched(
            || TempDir::new().unwrap(),
            |dir| {
                let mut session =
                    Session::create_with_config(dir.path().join("bench.blf"), bench_config())
                        .unwrap();
                for i in 0..100 {
                    let key = format!("key{:05}", i);
                    session.put(key.as_bytes(), b"value").unwrap();
                }
            },
            BatchSize::PerIteration,
        );
    });

    // Delete rewrite
    c.bench_function("delete_rewrite_1000", |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().unwrap();
                let session = filled_session(&dir, 1000, false);
                (dir, session)
            },
            |(_dir, mut session)| session.delete(b"key00500").unwrap(),
            BatchSize::PerIteration,
        );
    });

    // Raw blob write
    let blob = vec![0xABu8; 1024 * 1024];
    c.bench_function("write_raw_1mb", |b| {
        let dir = TempDir::new().unwrap();
        let mut session =
            Session::create_with_config(dir.path().join("bench.blf"), bench_config()).unwrap();
        b.iter(|| session.write_raw(black_box(&blob)).unwrap());
    });
}

criterion_group!(benches, storage_benchmarks);
criterion_main!(benches);
