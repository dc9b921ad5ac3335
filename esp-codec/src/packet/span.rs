/// A bounds-checked window into a packet buffer.
///
/// Every accessor fails closed: reads or sub-spans that would leave the
/// window return `None` instead of panicking. A span always remembers its
/// absolute offset in the underlying buffer so later layers can be handed a
/// view that still points into the same packet.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan<'a> {
    buf: &'a [u8],
    start: usize,
    len: usize,
}

impl<'a> ByteSpan<'a> {
    /// Span covering the whole buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            start: 0,
            len: buf.len(),
        }
    }

    /// Absolute offset of the first byte of this span in the packet buffer.
    #[inline]
    pub fn offset(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte at `index`, relative to the start of the span.
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        if index >= self.len {
            return None;
        }
        self.buf.get(self.start + index).copied()
    }

    /// Sub-span of `len` bytes starting `off` bytes into this span.
    pub fn slice(&self, off: usize, len: usize) -> Option<ByteSpan<'a>> {
        let end = off.checked_add(len)?;
        if end > self.len {
            return None;
        }
        Some(ByteSpan {
            buf: self.buf,
            start: self.start + off,
            len,
        })
    }

    /// Everything from `off` to the end of this span.
    pub fn tail(&self, off: usize) -> Option<ByteSpan<'a>> {
        let len = self.len.checked_sub(off)?;
        self.slice(off, len)
    }

    /// The bytes covered by the span.
    pub fn as_bytes(&self) -> &'a [u8] {
        // start + len never exceeds buf.len(): every constructor checks it
        &self.buf[self.start..self.start + self.len]
    }
}

impl core::fmt::Debug for ByteSpan<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ByteSpan")
            .field("offset", &self.start)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_is_relative_to_span_start() {
        let buf = [0u8, 1, 2, 3, 4, 5];
        let span = ByteSpan::new(&buf).slice(2, 3).unwrap();
        assert_eq!(span.offset(), 2);
        assert_eq!(span.get(0), Some(2));
        assert_eq!(span.get(2), Some(4));
        assert_eq!(span.get(3), None, "index 3 lies outside the span");
    }

    #[test]
    fn slice_fails_closed() {
        let buf = [0u8; 10];
        let span = ByteSpan::new(&buf);
        assert!(span.slice(8, 3).is_none());
        assert!(span.slice(usize::MAX, 2).is_none());
        assert!(span.tail(11).is_none());
        assert_eq!(span.tail(10).map(|s| s.len()), Some(0));
    }

    #[test]
    fn nested_slices_keep_absolute_offsets() {
        let buf: Vec<u8> = (0..32).collect();
        let inner = ByteSpan::new(&buf)
            .tail(8)
            .and_then(|s| s.slice(4, 6))
            .unwrap();
        assert_eq!(inner.offset(), 12);
        assert_eq!(inner.as_bytes(), &[12, 13, 14, 15, 16, 17]);
    }

    #[test]
    fn empty_span() {
        let span = ByteSpan::new(&[]);
        assert!(span.is_empty());
        assert_eq!(span.get(0), None);
        assert_eq!(span.as_bytes(), &[] as &[u8]);
    }
}
