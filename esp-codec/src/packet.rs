//! Packet views handed to codecs.
//!
//! A [`types::Packet`] borrows the captured buffer and carries the two pieces
//! of state that codecs mutate as they peel layers off:
//! - the *current payload* ([`span::ByteSpan`]) that later layers read
//! - the classification flags ([`types::PacketFlags`])

pub mod span;
pub mod types;

pub use span::ByteSpan;
pub use types::{MAX_PACKET_LEN, Packet, PacketFlags};
