//! Benchmarks for the SceneSync codec

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use scenesync_core::{Color, MapSnapshot, MarkerRecord, Pose};
use scenesync_wire::{decode, decode_any, encode};

fn marker() -> MarkerRecord {
    MarkerRecord::new(Pose::from_translation(0.1, 0.2, -0.3), Color::RED, 0.05).unwrap()
}

fn bench_marker_encode(c: &mut Criterion) {
    let m = marker();
    c.bench_function("marker_encode", |b| b.iter(|| encode(black_box(&m)).unwrap()));
}

fn bench_marker_decode_any(c: &mut Criterion) {
    // Markers are tried second, so this pays for one rejected guess
    let bytes = encode(&marker()).unwrap();
    c.bench_function("marker_decode_any", |b| {
        b.iter(|| decode_any(black_box(&bytes)).unwrap())
    });
}

fn bench_snapshot_roundtrip(c: &mut Criterion) {
    let snapshot = MapSnapshot::new(1, vec![0x5Au8; 256 * 1024]);
    let bytes = encode(&snapshot).unwrap();

    c.bench_function("snapshot_encode_256k", |b| {
        b.iter(|| encode(black_box(&snapshot)).unwrap())
    });
    c.bench_function("snapshot_decode_256k", |b| {
        b.iter(|| {
            let parsed: MapSnapshot = decode(black_box(&bytes)).unwrap();
            black_box(parsed)
        })
    });
}

criterion_group!(
    benches,
    bench_marker_encode,
    bench_marker_decode_any,
    bench_snapshot_roundtrip
);
criterion_main!(benches);
