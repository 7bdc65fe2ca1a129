//! Codec benchmark suite.
//!
//! Benchmarks the hot paths of every inbound and outbound event:
//! - Transport payload encode/decode at different batch sizes
//! - Text and binary packet encode/decode
//!
//! Run with: cargo bench --bench codec
//! Results saved to: target/criterion/

use std::hint::black_box;

use btlejuice::Arg;
use btlejuice::protocol::{
    Frame, FrameType, decode_binary, decode_message, decode_payload, encode_event, encode_payload,
};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BATCH_SIZES: &[usize] = &[1, 16, 128];

const TEXT_EVENT: &str = r#"2/ble,["proxy_write","180f","2a19",{"_placeholder":true,"num":0},0,false]"#;

const BINARY_EVENT: &str = r#"1-/ble,["proxy_write","180f","2a19",{"_placeholder":true,"num":0},0,false]"#;

// ============================================================================
// Benchmark: Transport Payload
// ============================================================================

fn bench_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload");

    for &size in BATCH_SIZES {
        let frames: Vec<Frame> = (0..size)
            .map(|i| Frame::new(FrameType::Message, format!("42/ble,[\"data\",{i}]")))
            .collect();
        let encoded = encode_payload(&frames);

        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &frames, |b, frames| {
            b.iter(|| encode_payload(black_box(frames)));
        });

        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, encoded| {
            b.iter(|| decode_payload(black_box(encoded)).count());
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Packets
// ============================================================================

fn bench_packets(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet");

    group.bench_function("decode_text", |b| {
        b.iter(|| decode_message(black_box(TEXT_EVENT)));
    });

    group.bench_function("decode_binary", |b| {
        b.iter(|| {
            let packet = decode_binary(black_box(BINARY_EVENT));
            packet.into_args(&[vec![0x64]])
        });
    });

    group.bench_function("encode_text", |b| {
        b.iter(|| {
            encode_event(
                "/ble",
                None,
                vec![
                    Arg::from("ble_notify"),
                    Arg::from("180f"),
                    Arg::from("2a19"),
                    Arg::from(true),
                ],
            )
        });
    });

    group.bench_function("encode_binary", |b| {
        b.iter(|| {
            encode_event(
                "/ble",
                None,
                vec![
                    Arg::from("proxy_read_resp"),
                    Arg::from("180f"),
                    Arg::from("2a19"),
                    Arg::from(black_box(vec![0x64u8; 20])),
                ],
            )
        });
    });

    group.finish();
}

criterion_group!(benches, bench_payload, bench_packets);
criterion_main!(benches);
