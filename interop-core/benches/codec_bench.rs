#[macro_use]
extern crate criterion;

use criterion::Criterion;

use interop_core::codec::{StreamLayout, TaggedStreamEncoder, TaggedStreamVerifier};

fn bench_tagged_stream_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("tagged_stream_throughput");

    for segment_len in [16 * 1024, 256 * 1024, 1_000_000] {
        let layout = StreamLayout {
            segment_len,
            segments_per_group: 16,
        };
        group.throughput(criterion::Throughput::Bytes(layout.group_len())); // Bytes per second
        group.bench_function(format!("segment_{}", segment_len), |b| {
            b.iter(|| {
                let mut encoder = TaggedStreamEncoder::new(layout, 1);
                let mut verifier = TaggedStreamVerifier::new(layout, 1);
                while let Some(segment) = encoder.next_segment() {
                    verifier.check(segment.bytes).unwrap();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tagged_stream_round_trip);
criterion_main!(benches);
