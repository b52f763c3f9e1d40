//! Wire parser benchmark suite.
//!
//! Measures line classification and parsing for each event kind, plus a
//! mixed stream resembling a busy controller's `STATUS ALL` traffic.
//!
//! Run with: cargo bench --bench wire_parser
//! Results saved to: target/criterion/

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use vantage_control::protocol::parser::{classify, parse_status_line};
use vantage_control::protocol::{decode_line, encode_line};
use vantage_control::{Command, Vid};

// ============================================================================
// Sample Lines
// ============================================================================

const LINES: &[(&str, &str)] = &[
    ("load", "S:LOAD 219 75.000"),
    ("load_reply", "R:GETLOAD 219 75.000"),
    ("led", "S:LED 1591 1 255 128 0 0 0 0 SLOW"),
    ("task", "S:TASK 40 3"),
    ("button", "S:BTN 88 PRESS"),
    ("temperature", "R:GETTHERMTEMP 9 INDOOR 70.5"),
    ("unclassified", "R:VERSION 3.2.1"),
    ("malformed", "S:LOAD 219"),
];

fn mixed_stream() -> Vec<String> {
    (0..1_000)
        .map(|i| match i % 5 {
            0 => format!("S:LOAD {} {}.000", i, i % 101),
            1 => format!("S:BTN {} PRESS", i),
            2 => format!("S:LED {} 1 255 0 0 0 0 0 OFF", i),
            3 => format!("S:TASK {} {}", i, i % 4),
            _ => format!("R:ECHO {}", i),
        })
        .collect()
}

// ============================================================================
// Benchmark: Per-Kind Parsing
// ============================================================================

fn bench_parse_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_line");

    for &(name, line) in LINES {
        group.bench_with_input(BenchmarkId::new("status", name), line, |b, line| {
            b.iter(|| parse_status_line(black_box(line)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Mixed Stream
// ============================================================================

fn bench_mixed_stream(c: &mut Criterion) {
    let stream = mixed_stream();

    let mut group = c.benchmark_group("mixed_stream");
    group.throughput(Throughput::Elements(stream.len() as u64));

    group.bench_function("classify", |b| {
        b.iter(|| stream.iter().filter(|l| classify(black_box(l)).is_some()).count());
    });

    group.bench_function("parse", |b| {
        b.iter(|| {
            stream
                .iter()
                .filter_map(|l| parse_status_line(black_box(l)))
                .filter(Result::is_ok)
                .count()
        });
    });

    group.finish();
}

// ============================================================================
// Benchmark: Line Codec
// ============================================================================

fn bench_codec(c: &mut Criterion) {
    let command = Command::Load {
        vid: Vid::new(219),
        percent: 75.0,
    };
    let raw = b"S:LED 1591 1 255 128 0 0 0 0 SLOW\r\n";

    let mut group = c.benchmark_group("codec");
    group.bench_function("encode_command", |b| {
        b.iter(|| encode_line(&black_box(&command).to_string()));
    });
    group.bench_function("decode_line", |b| {
        b.iter(|| decode_line(black_box(raw)));
    });
    group.finish();
}

criterion_group!(benches, bench_parse_line, bench_mixed_stream, bench_codec);
criterion_main!(benches);
