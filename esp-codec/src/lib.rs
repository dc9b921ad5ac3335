//! ESP (IP protocol 50) layer decoding.
//!
//! [`codec::esp::EspCodec`] classifies an ESP layer as opaque, decodable or
//! ambiguous from its trailer alone. The rest of the crate hosts it: codec
//! descriptors and dispatch ([`codec`]), per-worker peg counters ([`stats`]),
//! decoder events ([`events`]), and a worker-pool runner over hex-encoded
//! input ([`runtime`], [`source`]) with Prometheus [`metrics`].

pub mod codec;
pub mod error;
pub mod events;
pub mod metrics;
pub mod packet;
pub mod runtime;
pub mod source;
pub mod stats;

pub use codec::{DecodeContext, DecodeOutcome, LayerDecode, ProtocolRegistry};
pub use error::{CodecError, Result};
pub use packet::{ByteSpan, Packet, PacketFlags};
