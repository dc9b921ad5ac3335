use std::{hint::black_box, sync::Arc};

use criterion::{Criterion, criterion_group, criterion_main};
use esp_codec::{
    Packet,
    codec::manager::CodecManager,
    events::{DecoderEvent, EventSink},
    runtime::conf::{DecodersConf, EspConf, TerminalConf},
};
use hex_literal::hex;

const ESP_TCP: [u8; 44] = hex!(
    "00001001 00000001"
    "c35001bb 00000001 00000000 50022000 91e40000"
    "0102 02 06"
    "0123456789abcdef01234567"
);

const ESP_ENCRYPTED: [u8; 40] = hex!(
    "00002002 0000000a"
    "9f1c22d4 07b3e8aa 51c06d7e 3b92f0a1 4c88"
    "e7 3c"
    "fedcba9876543210fedcba98"
);

/// Drops events so the benchmark measures decoding only.
struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DecoderEvent, _packet: &Packet<'_>) {}
}

fn criterion_benchmark(c: &mut Criterion) {
    let decoders = DecodersConf {
        esp: EspConf { enabled: true },
        terminal: TerminalConf::default(),
    };
    let manager = Arc::new(CodecManager::from_conf(&decoders, 8).expect("codec table"));
    let worker = manager.instantiate();

    let mut group = c.benchmark_group("esp_decode");

    group.bench_function("decodable_tcp", |b| {
        b.iter(|| {
            let mut packet = Packet::new(black_box(&ESP_TCP)).unwrap();
            black_box(worker.decode_packet(&mut packet, 50, &NullSink))
        })
    });

    group.bench_function("opaque", |b| {
        b.iter(|| {
            let mut packet = Packet::new(black_box(&ESP_ENCRYPTED)).unwrap();
            black_box(worker.decode_packet(&mut packet, 50, &NullSink))
        })
    });

    group.bench_function("truncated", |b| {
        b.iter(|| {
            let mut packet = Packet::new(black_box(&ESP_TCP[..16])).unwrap();
            black_box(worker.decode_packet(&mut packet, 50, &NullSink))
        })
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
