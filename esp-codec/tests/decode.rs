use std::{
    sync::{Arc, Mutex},
    thread,
};

use esp_codec::{
    DecodeOutcome, LayerDecode, Packet, PacketFlags,
    codec::manager::{CodecManager, StopReason},
    events::{DecoderEvent, EventSink},
    runtime::conf::{DecodersConf, EspConf, TerminalConf},
};
use hex_literal::hex;

/// ESP (SPI 0x1001, seq 1) carrying a bare 20-byte TCP SYN, 2 bytes of
/// padding, next header TCP, HMAC-96 ICV.
const ESP_TCP: [u8; 44] = hex!(
    "00001001 00000001"
    "c35001bb 00000001 00000000 50022000 91e40000"
    "0102 02 06"
    "0123456789abcdef01234567"
);
const TCP_SYN: [u8; 20] = hex!("c35001bb 00000001 00000000 50022000 91e40000");

/// ESP whose trailer bytes are ciphertext: the pad length byte reads 0xe7.
const ESP_ENCRYPTED: [u8; 40] = hex!(
    "00002002 0000000a"
    "9f1c22d4 07b3e8aa 51c06d7e 3b92f0a1 4c88"
    "e7 3c"
    "fedcba9876543210fedcba98"
);

/// Plausible padding, but next header 253 (reserved for experimentation).
const ESP_EXPERIMENTAL: [u8; 30] = hex!(
    "00003003 00000002"
    "0011223344556677"
    "00 fd"
    "000000000000000000000000"
);

#[derive(Default)]
struct CollectingSink(Mutex<Vec<(DecoderEvent, usize)>>);

impl EventSink for CollectingSink {
    fn emit(&self, event: DecoderEvent, packet: &Packet<'_>) {
        self.0.lock().unwrap().push((event, packet.raw().len()));
    }
}

fn manager(esp_enabled: bool) -> Arc<CodecManager> {
    let decoders = DecodersConf {
        esp: EspConf {
            enabled: esp_enabled,
        },
        terminal: TerminalConf::default(),
    };
    Arc::new(CodecManager::from_conf(&decoders, 8).expect("default codec table"))
}

fn pegs(manager: &CodecManager, codec: &str) -> (u64, u64) {
    let stats = manager.stats();
    let entry = stats
        .iter()
        .find(|s| s.codec == codec)
        .expect("codec is registered");
    (entry.pegs["processed"], entry.pegs["discards"])
}

#[test]
fn esp_carrying_tcp_exposes_the_segment() {
    let manager = manager(true);
    let worker = manager.instantiate();
    let mut packet = Packet::new(&ESP_TCP).unwrap();

    let trace = worker.decode_packet(&mut packet, 50, &CollectingSink::default());

    assert_eq!(
        trace.layers[0].outcome,
        DecodeOutcome::Decodable {
            consumed: 24,
            next: 6
        }
    );
    assert_eq!(trace.layers[1].codec, "raw");
    assert_eq!(trace.stop, StopReason::Finished);
    assert_eq!(packet.data().as_bytes(), &TCP_SYN);
    assert_eq!(packet.flags(), PacketFlags::TRUST);
}

#[test]
fn encrypted_trailer_makes_the_payload_opaque() {
    let manager = manager(true);
    let worker = manager.instantiate();
    let mut packet = Packet::new(&ESP_ENCRYPTED).unwrap();

    let trace = worker.decode_packet(&mut packet, 50, &CollectingSink::default());

    let outcome = trace.last_outcome().unwrap();
    assert_eq!(outcome, DecodeOutcome::Opaque { consumed: 22 });
    assert_eq!(
        outcome.layer(),
        Some(LayerDecode {
            lyr_len: 22,
            next_prot_id: LayerDecode::NO_NEXT_PROTOCOL
        })
    );
    assert_eq!(packet.data().offset(), 8);
    assert_eq!(packet.dsize(), ESP_ENCRYPTED.len() - 22);
    assert!(packet.flags().contains(PacketFlags::TRUST));
}

#[test]
fn unclaimed_inner_protocol_is_ambiguous() {
    let manager = manager(true);
    let worker = manager.instantiate();
    let mut packet = Packet::new(&ESP_EXPERIMENTAL).unwrap();

    let trace = worker.decode_packet(&mut packet, 50, &CollectingSink::default());

    assert_eq!(trace.layers.len(), 1);
    let layer = trace.layers[0].outcome.layer().unwrap();
    assert_eq!(layer.lyr_len, 22);
    assert_eq!(layer.next_prot_id, 253);
    assert_eq!(packet.flags(), PacketFlags::UNSURE_ENCAP);
    assert_eq!(packet.dsize(), ESP_EXPERIMENTAL.len());
}

#[test]
fn truncated_esp_raises_one_event() {
    let manager = manager(true);
    let worker = manager.instantiate();
    let sink = CollectingSink::default();
    let mut packet = Packet::new(&ESP_TCP[..21]).unwrap();

    let trace = worker.decode_packet(&mut packet, 50, &sink);
    drop(worker);

    assert_eq!(trace.last_outcome(), Some(DecodeOutcome::Rejected));
    assert_eq!(
        *sink.0.lock().unwrap(),
        vec![(DecoderEvent::EspHeaderTruncated, 21)]
    );
    assert_eq!(packet.dsize(), 21);
    assert_eq!(pegs(&manager, "esp"), (0, 1));
}

#[test]
fn disabled_decoder_rejects_without_counting() {
    let manager = manager(false);
    let worker = manager.instantiate();
    let sink = CollectingSink::default();

    for buf in [&ESP_TCP[..], &ESP_ENCRYPTED[..], &ESP_TCP[..10]] {
        let mut packet = Packet::new(buf).unwrap();
        let trace = worker.decode_packet(&mut packet, 50, &sink);
        assert_eq!(trace.last_outcome(), Some(DecodeOutcome::Rejected));
        assert!(packet.flags().is_empty());
    }
    drop(worker);

    assert!(sink.0.lock().unwrap().is_empty());
    assert_eq!(pegs(&manager, "esp"), (0, 0));
}

#[test]
fn worker_lanes_add_up_across_threads() {
    const WORKERS: usize = 4;
    const ROUNDS: usize = 500;

    let manager = manager(true);
    thread::scope(|scope| {
        for _ in 0..WORKERS {
            let worker = manager.instantiate();
            scope.spawn(move || {
                let sink = CollectingSink::default();
                for round in 0..ROUNDS {
                    let buf: &[u8] = if round % 5 == 0 {
                        &ESP_TCP[..12]
                    } else {
                        &ESP_TCP
                    };
                    let mut packet = Packet::new(buf).unwrap();
                    worker.decode_packet(&mut packet, 50, &sink);
                }
            });
        }
        // fold while the workers are still counting
        for _ in 0..20 {
            manager.sum_all();
        }
    });
    manager.sum_all();

    let per_worker_discards = ROUNDS / 5;
    let per_worker_processed = ROUNDS - per_worker_discards;
    assert_eq!(
        pegs(&manager, "esp"),
        (
            (WORKERS * per_worker_processed) as u64,
            (WORKERS * per_worker_discards) as u64
        )
    );
    assert_eq!(
        pegs(&manager, "raw").0,
        (WORKERS * per_worker_processed) as u64
    );
}

#[test]
fn every_length_and_padding_decodes_without_panicking() {
    let manager = manager(true);
    let worker = manager.instantiate();
    let sink = CollectingSink::default();
    let mut counts = [0usize; 4];

    for len in 0..=300usize {
        for pad in 0..=u8::MAX {
            for next in [6u8, 200] {
                let mut buf = vec![0xa5; len];
                if len >= 14 {
                    buf[len - 14] = pad;
                    buf[len - 13] = next;
                }
                let mut packet = Packet::new(&buf).unwrap();
                let trace = worker.decode_packet(&mut packet, 50, &sink);
                let outcome = trace.layers[0].outcome;

                if len < 22 {
                    assert_eq!(outcome, DecodeOutcome::Rejected, "len {len}");
                    assert_eq!(packet.dsize(), len);
                    counts[0] += 1;
                } else if usize::from(pad) >= len {
                    assert_eq!(outcome, DecodeOutcome::Opaque { consumed: 22 });
                    assert_eq!(packet.data().offset(), 8);
                    assert_eq!(packet.dsize(), len - 22);
                    assert_eq!(packet.flags(), PacketFlags::TRUST);
                    counts[1] += 1;
                } else if next == 6 {
                    let consumed = 22 + u16::from(pad);
                    assert_eq!(
                        outcome,
                        DecodeOutcome::Decodable { consumed, next: 6 },
                        "len {len} pad {pad}"
                    );
                    assert_eq!(packet.data().offset(), 8);
                    assert_eq!(packet.dsize(), len.saturating_sub(usize::from(consumed)));
                    assert_eq!(packet.flags(), PacketFlags::TRUST);
                    counts[2] += 1;
                } else {
                    assert_eq!(
                        outcome,
                        DecodeOutcome::Ambiguous {
                            consumed: 22 + u16::from(pad),
                            next: 200
                        }
                    );
                    assert_eq!(packet.data(), packet.raw());
                    assert_eq!(packet.flags(), PacketFlags::UNSURE_ENCAP);
                    counts[3] += 1;
                }
            }
        }
    }
    drop(worker);

    let [rejected, opaque, decodable, ambiguous] = counts;
    assert_eq!(rejected, 22 * 256 * 2);
    assert_eq!(decodable, ambiguous);
    assert_eq!(rejected + opaque + decodable + ambiguous, 301 * 256 * 2);
    assert_eq!(sink.0.lock().unwrap().len(), rejected);
    assert_eq!(
        pegs(&manager, "esp"),
        ((opaque + decodable + ambiguous) as u64, rejected as u64)
    );
}
