use std::ops::{BitOr, BitOrAssign};

use crate::{
    error::{CodecError, Result},
    packet::span::ByteSpan,
};

/// Largest packet the capture system can hand us (IPv4 total length limit).
pub const MAX_PACKET_LEN: usize = u16::MAX as usize;

/// Classification flags OR-ed onto a packet by codecs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PacketFlags(u32);

impl PacketFlags {
    pub const NONE: PacketFlags = PacketFlags(0);
    /// The current payload is structurally meaningful and may be passed on to
    /// later, more permissive inspection.
    pub const TRUST: PacketFlags = PacketFlags(0x0000_0001);
    /// An inner protocol was named but no decoder exists for it; anything
    /// built on top of this layer is speculative.
    pub const UNSURE_ENCAP: PacketFlags = PacketFlags(0x0000_0002);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: PacketFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lower-case flag names, for logs and summaries.
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(PacketFlags::TRUST) {
            names.push("trust");
        }
        if self.contains(PacketFlags::UNSURE_ENCAP) {
            names.push("unsure_encap");
        }
        names
    }
}

impl BitOr for PacketFlags {
    type Output = PacketFlags;

    fn bitor(self, rhs: PacketFlags) -> PacketFlags {
        PacketFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for PacketFlags {
    fn bitor_assign(&mut self, rhs: PacketFlags) {
        self.0 |= rhs.0;
    }
}

/// A captured packet as seen by the codec chain.
///
/// The packet owns nothing: it borrows the capture buffer for the duration of
/// one decode pass. Codecs narrow `data` as they consume framing and OR
/// classification flags into `flags`.
#[derive(Debug, Clone)]
pub struct Packet<'a> {
    raw: ByteSpan<'a>,
    data: ByteSpan<'a>,
    flags: PacketFlags,
}

impl<'a> Packet<'a> {
    /// Wraps a captured buffer. Buffers larger than [`MAX_PACKET_LEN`] are
    /// refused so every length a codec sees fits the 16-bit size fields.
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        if buf.len() > MAX_PACKET_LEN {
            return Err(CodecError::PacketTooLarge {
                len: buf.len(),
                max: MAX_PACKET_LEN,
            });
        }
        let raw = ByteSpan::new(buf);
        Ok(Self {
            raw,
            data: raw,
            flags: PacketFlags::NONE,
        })
    }

    /// The whole captured buffer.
    #[inline]
    pub fn raw(&self) -> ByteSpan<'a> {
        self.raw
    }

    /// The current payload view.
    #[inline]
    pub fn data(&self) -> ByteSpan<'a> {
        self.data
    }

    /// Size of the current payload view.
    #[inline]
    pub fn dsize(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn set_data(&mut self, data: ByteSpan<'a>) {
        self.data = data;
    }

    #[inline]
    pub fn flags(&self) -> PacketFlags {
        self.flags
    }

    #[inline]
    pub fn set_flags(&mut self, flags: PacketFlags) {
        self.flags |= flags;
    }
}
