//! Decoder events.
//!
//! Codecs report anomalies through an [`EventSink`] and move on; emitting an
//! event never changes how a packet is decoded. Rate limiting, if any, is the
//! sink's business.

use tracing::warn;

use crate::{metrics::registry, packet::Packet};

/// Generator id shared by all decoder events.
pub const DECODE_GID: u32 = 116;

/// Anomalies a codec can report about a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderEvent {
    /// Fewer bytes than header + ICV + trailer follow the ESP header.
    EspHeaderTruncated,
}

impl DecoderEvent {
    pub const fn sid(self) -> u32 {
        match self {
            DecoderEvent::EspHeaderTruncated => 294,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            DecoderEvent::EspHeaderTruncated => "ESP header truncated",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DecoderEvent::EspHeaderTruncated => "esp_header_truncated",
        }
    }
}

impl AsRef<str> for DecoderEvent {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Fire-and-forget receiver of decoder events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DecoderEvent, packet: &Packet<'_>);
}

/// Sink that logs every event and counts it in the metrics registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: DecoderEvent, packet: &Packet<'_>) {
        registry::DECODER_EVENTS_TOTAL
            .with_label_values(&[event.as_str()])
            .inc();
        warn!(
            event.name = "decoder.event",
            decoder.event = event.as_str(),
            decoder.gid = DECODE_GID,
            decoder.sid = event.sid(),
            packet.len = packet.raw().len(),
            "{}",
            event.message()
        );
    }
}
