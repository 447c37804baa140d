use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use tally_metrics::{Collector, CollectorConfig, Sample};

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_counter_line", |b| {
        b.iter(|| Sample::parse(black_box("endpoint.hits:21|c|@0.5")).unwrap())
    });
}

fn bench_handle(c: &mut Criterion) {
    let collector = Collector::new(CollectorConfig::default());
    let packet: &[u8] =
        b"endpoint.hits:1|c\nendpoint.response_time:57|ms\nendpoint.users:alice|s\nqueue.depth:42|g";

    c.bench_function("handle_packet", |b| {
        b.iter(|| collector.handle(black_box(packet)))
    });
}

fn bench_flush(c: &mut Criterion) {
    let collector = Collector::new(CollectorConfig::default());

    c.bench_function("flush_thousand_timer_samples", |b| {
        b.iter(|| {
            for value in 0..1000 {
                collector.add_to_timer("endpoint.response_time", value, 1.0);
            }
            black_box(collector.flush())
        })
    });
}

criterion_group!(benches, bench_parse, bench_handle, bench_flush);
criterion_main!(benches);
