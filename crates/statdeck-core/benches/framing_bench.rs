//! Criterion benchmarks for the StatDeck line decoder.
//!
//! Telemetry arrives roughly once per second per host, but a layout push can
//! be several megabytes of base64 icons in a single line.  These benchmarks
//! cover both shapes.
//!
//! Run with:
//! ```bash
//! cargo bench --package statdeck-core --bench framing_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use statdeck_core::protocol::{encode_message, LineDecoder, Message, Payload};
use statdeck_core::{ActionType, LayoutDocument};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn stats_line() -> Vec<u8> {
    let data = Payload::from_json(
        r#"{"cpu":{"usage":37.5,"temp":61.0,"per_core":[12,40,33,71,5,9,18,22]},
            "gpu":{"usage":88.0,"temp":70.0,"vram_used":6144},
            "ram":{"used":17.2,"total":32.0},"net":{"up":1200,"down":54000}}"#,
    )
    .unwrap();
    encode_message(&Message::stats(data, 1_700_000_000_000)).unwrap()
}

fn layout_line(icon_bytes: usize) -> Vec<u8> {
    let icon = "A".repeat(icon_bytes);
    let tiles: Vec<String> = (0..12)
        .map(|i| format!(r#"{{"id":"tile-{i}","type":"button","icon":"{icon}"}}"#))
        .collect();
    let layout = LayoutDocument::from_json(format!(
        r#"{{"pages":[{{"grid":{{"cols":4,"rows":3}},"tiles":[{}]}}]}}"#,
        tiles.join(",")
    ))
    .unwrap();
    encode_message(&Message::config(layout)).unwrap()
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Decodes a stream of 100 stats lines fed in fixed-size chunks.
fn bench_stats_stream(c: &mut Criterion) {
    let line = stats_line();
    let stream: Vec<u8> = line.iter().copied().cycle().take(line.len() * 100).collect();

    let mut group = c.benchmark_group("stats_stream");
    group.throughput(Throughput::Bytes(stream.len() as u64));
    for chunk in [64usize, 512, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut decoder = LineDecoder::default();
                let mut count = 0;
                for piece in stream.chunks(chunk) {
                    count += decoder.feed(black_box(piece)).len();
                }
                assert_eq!(count, 100);
            });
        });
    }
    group.finish();
}

/// Decodes one large config line.
fn bench_layout_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_push");
    for icon_bytes in [1_024usize, 64 * 1_024] {
        let line = layout_line(icon_bytes);
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(icon_bytes), &line, |b, line| {
            b.iter(|| {
                let mut decoder = LineDecoder::default();
                let out = decoder.feed(black_box(line));
                assert_eq!(out.len(), 1);
            });
        });
    }
    group.finish();
}

fn bench_encode_action(c: &mut Criterion) {
    let msg = Message::action("tile-3", ActionType::Tap, 1_700_000_000_000);
    c.bench_function("encode_action", |b| {
        b.iter(|| encode_message(black_box(&msg)).unwrap())
    });
}

criterion_group!(benches, bench_stats_stream, bench_layout_push, bench_encode_action);
criterion_main!(benches);
