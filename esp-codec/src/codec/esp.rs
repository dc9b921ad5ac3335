//! ESP (IP protocol 50) layer decoder.
//!
//! ESP carries no explicit payload length and no reliable indication of
//! whether its payload is encrypted. The decoder reads the trailer at the end
//! of the span and uses the pad length as a plausibility test: padding that
//! is at least as long as the whole packet means the trailer bytes are
//! ciphertext, so the payload is treated as opaque. Otherwise the trailer's
//! next-header value names the inner protocol.
//!
//! The ICV is assumed to be a 12-byte HMAC-96 and is never validated; neither
//! are the SPI and sequence number.

use std::sync::Arc;

use network_types::{
    esp::{ESP_MIN_LEN, ESP_PROTO, Esp},
    ip::IpProto,
};
use tracing::{debug, trace};

use crate::{
    codec::{Codec, CodecApi, DecodeContext, DecodeOutcome},
    events::DecoderEvent,
    packet::{ByteSpan, Packet, PacketFlags},
    runtime::conf::EspConf,
    stats::{Peg, PegCounts, PegLanes},
};

pub const ESP_CODEC_NAME: &str = "esp";

const PROTOCOL_IDS: &[u16] = &[ESP_PROTO];

/// Framing bytes outside the payload: header, ICV and the two trailer bytes.
const TRAILER_LEN: usize = ESP_MIN_LEN;

/// One worker's ESP decoder.
#[derive(Debug)]
pub struct EspCodec {
    enabled: bool,
    pegs: Arc<PegCounts>,
}

impl EspCodec {
    pub fn new(enabled: bool, pegs: Arc<PegCounts>) -> Self {
        Self { enabled, pegs }
    }
}

impl Codec for EspCodec {
    fn name(&self) -> &'static str {
        ESP_CODEC_NAME
    }

    fn pegs(&self) -> &Arc<PegCounts> {
        &self.pegs
    }

    fn decode<'a>(
        &self,
        raw: ByteSpan<'a>,
        packet: &mut Packet<'a>,
        ctx: &DecodeContext<'_>,
    ) -> DecodeOutcome {
        if !self.enabled {
            return DecodeOutcome::Rejected;
        }

        let len = raw.len();
        if len < ESP_MIN_LEN {
            ctx.events.emit(DecoderEvent::EspHeaderTruncated, packet);
            packet.set_data(raw);
            self.pegs.inc(Peg::Discards);
            return DecodeOutcome::Rejected;
        }

        self.pegs.inc(Peg::Processed);

        let Some(payload) = raw.tail(Esp::LEN) else {
            return DecodeOutcome::Rejected;
        };
        // pad length and next header sit right before the ICV
        let (Some(pad_len), Some(next)) = (
            payload.get(len - TRAILER_LEN),
            payload.get(len - TRAILER_LEN + 1),
        ) else {
            return DecodeOutcome::Rejected;
        };

        if usize::from(pad_len) >= len {
            let Some(opaque) = payload.slice(0, len - TRAILER_LEN) else {
                return DecodeOutcome::Rejected;
            };
            packet.set_flags(PacketFlags::TRUST);
            packet.set_data(opaque);
            trace!(
                event.name = "codec.esp.opaque",
                esp.spi = Esp::from_bytes(raw.as_bytes()).map_or(0, |hdr| hdr.spi()),
                esp.pad_len = pad_len,
                packet.len = len,
                "ESP payload treated as encrypted"
            );
            return DecodeOutcome::Opaque {
                consumed: TRAILER_LEN as u16,
            };
        }

        let consumed = TRAILER_LEN + usize::from(pad_len);
        let next = u16::from(next);

        if !ctx.registry.has_decoder(next) {
            debug!(
                event.name = "codec.esp.unknown_next_header",
                net.protocol = next,
                net.protocol.name = IpProto::name_of(next).unwrap_or("unassigned"),
                "no decoder for ESP next header"
            );
            packet.set_flags(PacketFlags::UNSURE_ENCAP);
            return DecodeOutcome::Ambiguous {
                consumed: consumed as u16,
                next,
            };
        }

        let remaining = match len.checked_sub(consumed) {
            Some(remaining) => remaining,
            None => {
                debug!(
                    event.name = "codec.esp.padding_exceeds_packet",
                    esp.pad_len = pad_len,
                    esp.consumed = consumed,
                    packet.len = len,
                    "ESP padding runs past the start of the payload, inner view clamped to empty"
                );
                0
            }
        };
        let Some(inner) = payload.slice(0, remaining) else {
            return DecodeOutcome::Rejected;
        };
        packet.set_flags(PacketFlags::TRUST);
        packet.set_data(inner);

        DecodeOutcome::Decodable {
            consumed: consumed as u16,
            next,
        }
    }
}

/// Descriptor for [`EspCodec`].
#[derive(Debug, Default)]
pub struct EspCodecApi {
    enabled: bool,
    pegs: PegLanes,
}

impl EspCodecApi {
    pub fn new(conf: &EspConf) -> Self {
        Self {
            enabled: conf.enabled,
            pegs: PegLanes::default(),
        }
    }
}

impl CodecApi for EspCodecApi {
    fn name(&self) -> &'static str {
        ESP_CODEC_NAME
    }

    fn protocol_ids(&self) -> &[u16] {
        PROTOCOL_IDS
    }

    fn ctor(&self) -> Box<dyn Codec> {
        Box::new(EspCodec::new(self.enabled, self.pegs.register()))
    }

    fn dtor(&self, codec: Box<dyn Codec>) {
        self.pegs.retire(codec.pegs());
    }

    fn sum(&self) {
        self.pegs.sum();
    }

    fn stats(&self) -> Vec<(&'static str, u64)> {
        self.pegs.totals().snapshot()
    }
}
