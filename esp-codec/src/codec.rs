//! Codec plumbing.
//!
//! A *codec* decodes one protocol layer. It is described to the host by a
//! [`CodecApi`] descriptor (name, claimed protocol ids, construction,
//! destruction and stats hooks) and instantiated once per worker through that
//! descriptor. The host keeps the descriptors in a
//! [`manager::CodecManager`], which doubles as the [`ProtocolRegistry`] codecs
//! consult to learn whether an inner protocol can be decoded further.
//!
//! - `esp`: the ESP layer decoder
//! - `terminal`: hand-off codec for protocols inspected elsewhere
//! - `manager`: descriptor table and the layer-by-layer dispatch loop

pub mod esp;
pub mod manager;
pub mod terminal;

use std::sync::Arc;

use crate::{
    events::EventSink,
    packet::{ByteSpan, Packet},
    stats::PegCounts,
};

/// Answers whether a decoder exists for a protocol id.
///
/// Implementations are read-only once decoding starts and are shared by all
/// workers.
pub trait ProtocolRegistry: Send + Sync {
    fn has_decoder(&self, protocol: u16) -> bool;
}

/// Collaborators a codec may consult while decoding one layer.
#[derive(Clone, Copy)]
pub struct DecodeContext<'c> {
    pub registry: &'c dyn ProtocolRegistry,
    pub events: &'c dyn EventSink,
}

/// What one codec made of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The layer could not be parsed (or the codec is disabled); the caller
    /// treats the rest of the packet as payload of the outer layer.
    Rejected,
    /// The payload looks encrypted; nothing follows that can be decoded.
    Opaque { consumed: u16 },
    /// An inner protocol follows and a decoder exists for it.
    Decodable { consumed: u16, next: u16 },
    /// An inner protocol was named but nothing can decode it.
    Ambiguous { consumed: u16, next: u16 },
    /// The layer was recognised and its payload is handed to later
    /// inspection as is.
    Handoff { consumed: u16 },
}

/// Layer result in the host's wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerDecode {
    /// Bytes that belong to this layer's framing.
    pub lyr_len: u16,
    /// Next protocol id, or [`LayerDecode::NO_NEXT_PROTOCOL`].
    pub next_prot_id: i32,
}

impl LayerDecode {
    pub const NO_NEXT_PROTOCOL: i32 = -1;
}

impl DecodeOutcome {
    /// `None` for a rejected layer, the `(lyr_len, next_prot_id)` pair
    /// otherwise.
    pub fn layer(self) -> Option<LayerDecode> {
        let (lyr_len, next) = match self {
            DecodeOutcome::Rejected => return None,
            DecodeOutcome::Opaque { consumed } | DecodeOutcome::Handoff { consumed } => {
                (consumed, None)
            }
            DecodeOutcome::Decodable { consumed, next }
            | DecodeOutcome::Ambiguous { consumed, next } => (consumed, Some(next)),
        };
        Some(LayerDecode {
            lyr_len,
            next_prot_id: next.map_or(LayerDecode::NO_NEXT_PROTOCOL, i32::from),
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DecodeOutcome::Rejected => "rejected",
            DecodeOutcome::Opaque { .. } => "opaque",
            DecodeOutcome::Decodable { .. } => "decodable",
            DecodeOutcome::Ambiguous { .. } => "ambiguous",
            DecodeOutcome::Handoff { .. } => "handoff",
        }
    }
}

/// A worker-owned decoder for one protocol layer.
pub trait Codec: Send {
    fn name(&self) -> &'static str;

    /// The peg lane this instance counts into.
    fn pegs(&self) -> &Arc<PegCounts>;

    /// Decodes the layer starting at `raw`, which runs to the end of the
    /// packet. May narrow `packet`'s payload view and add flags.
    fn decode<'a>(
        &self,
        raw: ByteSpan<'a>,
        packet: &mut Packet<'a>,
        ctx: &DecodeContext<'_>,
    ) -> DecodeOutcome;
}

/// Descriptor through which the host discovers, instantiates and tears down a
/// codec, and collects its pegs.
pub trait CodecApi: Send + Sync {
    fn name(&self) -> &'static str;

    /// Protocol ids this codec claims.
    fn protocol_ids(&self) -> &[u16];

    /// Builds an instance for one worker, with its own peg lane.
    fn ctor(&self) -> Box<dyn Codec>;

    /// Folds the instance's remaining counts and drops it.
    fn dtor(&self, codec: Box<dyn Codec>);

    /// Folds every live lane into the global totals.
    fn sum(&self);

    /// Global `(peg name, total)` pairs as of the last fold.
    fn stats(&self) -> Vec<(&'static str, u64)>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{collections::HashSet, sync::Mutex};

    use super::*;
    use crate::events::DecoderEvent;

    /// Registry backed by a fixed set of protocol ids.
    #[derive(Debug, Default)]
    pub struct StaticRegistry(pub HashSet<u16>);

    impl StaticRegistry {
        pub fn with(ids: &[u16]) -> Self {
            Self(ids.iter().copied().collect())
        }
    }

    impl ProtocolRegistry for StaticRegistry {
        fn has_decoder(&self, protocol: u16) -> bool {
            self.0.contains(&protocol)
        }
    }

    /// Sink that remembers every event it receives.
    #[derive(Debug, Default)]
    pub struct RecordingSink(pub Mutex<Vec<DecoderEvent>>);

    impl RecordingSink {
        pub fn events(&self) -> Vec<DecoderEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: DecoderEvent, _packet: &Packet<'_>) {
            self.0.lock().unwrap().push(event);
        }
    }
}
