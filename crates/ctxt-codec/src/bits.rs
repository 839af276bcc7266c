//! Bit-granular access to a byte buffer.
//!
//! Bits are addressed big-endian: bit 0 is the most significant bit of
//! byte 0, bit 8 the most significant bit of byte 1, and so on. Reads and
//! writes take an absolute bit offset, so callers never track byte indices
//! or shift amounts themselves.

/// Widest field a single `read`/`write` handles.
pub const MAX_WIDTH: u32 = 32;

/// Cursor over a byte buffer that reads and writes fixed-width bit fields.
#[derive(Debug, Clone)]
pub struct BitCursor<B> {
    buf: B,
}

impl<B: AsRef<[u8]>> BitCursor<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    /// Total number of addressable bits.
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.buf.as_ref().len() * 8
    }

    /// Read `width` bits starting at bit `offset`, most significant first.
    ///
    /// Bits past the end of the buffer read as zero, which is what pads the
    /// final partial septet of an encoding.
    pub fn read(&self, offset: usize, width: u32) -> u32 {
        debug_assert!(width <= MAX_WIDTH);
        let bytes = self.buf.as_ref();
        let mut value = 0u32;
        for bit in offset..offset + width as usize {
            value <<= 1;
            if let Some(byte) = bytes.get(bit / 8) {
                value |= u32::from((byte >> (7 - bit % 8)) & 1);
            }
        }
        value
    }

    pub fn into_inner(self) -> B {
        self.buf
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BitCursor<B> {
    /// Write the low `width` bits of `value` starting at bit `offset`.
    ///
    /// Bits that would land past the end of the buffer are dropped.
    pub fn write(&mut self, offset: usize, width: u32, value: u32) {
        debug_assert!(width <= MAX_WIDTH);
        let bytes = self.buf.as_mut();
        for i in 0..width {
            let bit = offset + i as usize;
            let Some(byte) = bytes.get_mut(bit / 8) else {
                break;
            };
            let mask = 0x80u8 >> (bit % 8);
            if (value >> (width - 1 - i)) & 1 == 1 {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
        }
    }
}
