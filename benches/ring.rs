// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Ring round-trip throughput, replacing the teacher's allocator-strategy
// benchmark (`benches/alloc.rs`) with a measurement relevant to this
// crate's actual hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use bridge_ipc::ring::{Ring, RingHeader};

fn make_ring(size: u32) -> (Vec<u8>, Ring) {
    let total = RingHeader::byte_size() + size as usize;
    let mut buf = vec![0u8; total];
    let header = buf.as_mut_ptr() as *mut RingHeader;
    let ring = unsafe { Ring::init(header, size) };
    (buf, ring)
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_round_trip");

    for &record_size in &[16usize, 64, 256, 1024] {
        group.throughput(Throughput::Bytes(record_size as u64));
        group.bench_function(format!("record_{record_size}"), |b| {
            let (_buf, ring) = make_ring(0x7FFF);
            let src = vec![0xABu8; record_size];
            let mut dst = vec![0u8; record_size];

            b.iter(|| {
                ring.write(black_box(&src));
                ring.commit();
                ring.read(black_box(&mut dst));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_round_trip);
criterion_main!(benches);
