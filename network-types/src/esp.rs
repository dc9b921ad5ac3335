use core::mem;
/// # Encapsulating Security Payload (ESP)
///
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ ----
/// |               Security Parameters Index (SPI)                 | ^Int.
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ |Cov-
/// |                      Sequence Number                          | |ered
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ | ----
/// |                    Payload Data* (variable)                   | |   ^
/// ~                                                               ~ |   |
/// |                                                               | |Conf.
/// ~               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ |Cov-
/// |               |     Padding (0-255 bytes)                     | |ered*
/// +-+-+-+-+-+-+-+-+               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ |   |
/// |                               |  Pad Length   | Next Header   | v   v
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ ------
/// |         Integrity Check Value-ICV   (variable)                |
/// ~                                                               ~
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ## Fields
///
/// * **Security Parameters Index (SPI) (32 bits)**: An arbitrary value used to uniquely identify the **security association** of the receiving party.
/// * **Sequence Number (32 bits)**: A monotonically increasing counter for protecting against **replay attacks**.
#[repr(C, packed)]
#[derive(Debug, Copy, Clone)]
pub struct Esp {
    pub spi: [u8; 4],
    pub seq_num: [u8; 4],
}

impl Esp {
    /// The total size in bytes of the ESP header
    pub const LEN: usize = mem::size_of::<Esp>();

    /// Builds a header from the first [`Esp::LEN`] bytes of `buf`.
    #[inline]
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let hdr = buf.get(..Self::LEN)?;
        Some(Esp {
            spi: [hdr[0], hdr[1], hdr[2], hdr[3]],
            seq_num: [hdr[4], hdr[5], hdr[6], hdr[7]],
        })
    }

    /// Gets the Security Parameters Index (SPI) value.
    #[inline]
    pub fn spi(&self) -> u32 {
        u32::from_be_bytes(self.spi)
    }

    /// Sets the Security Parameters Index (SPI) value.
    #[inline]
    pub fn set_spi(&mut self, spi: u32) {
        self.spi = spi.to_be_bytes();
    }

    /// Gets the Sequence Number value.
    #[inline]
    pub fn seq_num(&self) -> u32 {
        u32::from_be_bytes(self.seq_num)
    }

    /// Sets the Sequence Number value.
    #[inline]
    pub fn set_seq_num(&mut self, seq_num: u32) {
        self.seq_num = seq_num.to_be_bytes();
    }
}

/// Length of the pad length + next header pair that closes the ESP payload,
/// directly in front of the ICV.
///
/// Whether these bytes are actually cleartext depends on the cipher in use,
/// which the packet does not announce.
pub const ESP_TRAILER_LEN: usize = 2;

/// IANA protocol number of ESP.
pub const ESP_PROTO: u16 = 50;

/// ICV length assumed for every packet. RFC 2406 forbids NULL encryption
/// together with NULL authentication, and the mandatory authenticators
/// (HMAC-MD5-96, HMAC-SHA-1-96) both produce 12 bytes.
pub const ESP_AUTH_DATA_LEN: usize = 12;

/// Header + ICV + trailer; anything shorter cannot hold an ESP envelope.
pub const ESP_MIN_LEN: usize = Esp::LEN + ESP_AUTH_DATA_LEN + ESP_TRAILER_LEN;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_esp_len_constant() {
        assert_eq!(Esp::LEN, 8); // spi (4 bytes) + seq_num (4 bytes)
        assert_eq!(Esp::LEN, mem::size_of::<Esp>());
    }

    #[test]
    fn test_envelope_constants() {
        assert_eq!(ESP_TRAILER_LEN, 2);
        assert_eq!(ESP_MIN_LEN, 22);
        assert_eq!(ESP_PROTO, 50);
    }

    #[test]
    fn test_esp_getters_setters() {
        let mut header = Esp {
            spi: [0; 4],
            seq_num: [0; 4],
        };

        header.set_spi(0x12345678);
        assert_eq!(header.spi(), 0x12345678);
        assert_eq!(header.spi, [0x12, 0x34, 0x56, 0x78]);

        header.set_seq_num(0x87654321);
        assert_eq!(header.seq_num(), 0x87654321);
        assert_eq!(header.seq_num, [0x87, 0x65, 0x43, 0x21]);
    }

    #[test]
    fn test_esp_from_bytes() {
        let buf = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x00, 0x00, 0x2a, 0xff];
        let header = Esp::from_bytes(&buf).expect("8 bytes available");
        assert_eq!(header.spi(), 0xdeadbeef);
        assert_eq!(header.seq_num(), 42);

        assert!(Esp::from_bytes(&buf[..7]).is_none());
    }
}
