use criterion::{black_box, criterion_group, criterion_main, Criterion};
use softuart_rs::serial::{EdgeEvent, HoldPlanner, RxDecoder};
use softuart_rs::util::ByteRing;

const BIT_CYCLES: u32 = 80_000_000 / 115_200;

/// Edges a receiver would capture for `data`, starting at `t0`
fn edges_for(data: &[u8], t0: u32) -> Vec<EdgeEvent> {
    let mut t = t0;
    HoldPlanner::new(data, BIT_CYCLES, false)
        .map(|hold| {
            let edge = EdgeEvent::capture(t, hold.high);
            t = t.wrapping_add(hold.cycles);
            edge
        })
        .collect()
}

fn benchmark_decode(c: &mut Criterion) {
    let data: Vec<u8> = (0..=255u8).collect();
    let edges = edges_for(&data, 1_000_000);

    c.bench_function("decode_256_bytes", |b| {
        b.iter(|| {
            let mut decoder = RxDecoder::new(BIT_CYCLES, false);
            decoder.reset(0);
            let mut bytes = ByteRing::try_with_capacity(512).unwrap();
            for edge in &edges {
                black_box(decoder.decode(black_box(*edge), &mut bytes));
            }
            black_box(bytes.len())
        })
    });
}

fn benchmark_plan(c: &mut Criterion) {
    let data = b"The quick brown fox jumps over the lazy dog".repeat(4);

    c.bench_function("plan_holds", |b| {
        b.iter(|| {
            let cycles: u32 = HoldPlanner::new(black_box(&data), BIT_CYCLES, false)
                .map(|hold| hold.cycles)
                .sum();
            black_box(cycles)
        })
    });
}

criterion_group!(benches, benchmark_decode, benchmark_plan);
criterion_main!(benches);
