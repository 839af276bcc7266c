//! Byte buffer <-> septet text.
//!
//! Trailing bits: when `len * 8` is not a multiple of 7, `encode` zero-pads
//! the last partial septet and emits one extra symbol. `decode` keeps only
//! whole bytes, so the padding falls away again and every buffer length
//! round-trips without carrying its length out of band.

use thiserror::Error;

use crate::alphabet::{septet_for, symbol_for};
use crate::bits::BitCursor;

/// Bits per symbol.
pub const SEPTET_BITS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("symbol {symbol:?} at position {position} is not in the septet alphabet")]
    InvalidSymbol { symbol: char, position: usize },
}

/// Number of symbols `encode` produces for `byte_len` bytes.
#[inline]
pub fn encoded_len(byte_len: usize) -> usize {
    (byte_len * 8).div_ceil(SEPTET_BITS as usize)
}

/// Number of bytes `decode` produces for `symbol_len` symbols.
#[inline]
pub fn decoded_len(symbol_len: usize) -> usize {
    symbol_len * SEPTET_BITS as usize / 8
}

/// Encode bytes as septet text.
pub fn encode(bytes: &[u8]) -> String {
    let cursor = BitCursor::new(bytes);
    (0..encoded_len(bytes.len()))
        .map(|i| symbol_for(cursor.read(i * SEPTET_BITS as usize, SEPTET_BITS) as u8))
        .collect()
}

/// Decode septet text back into bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    let symbols = text.chars().count();
    let mut cursor = BitCursor::new(vec![0u8; decoded_len(symbols)]);
    for (position, symbol) in text.chars().enumerate() {
        let septet = septet_for(symbol).ok_or(CodecError::InvalidSymbol { symbol, position })?;
        cursor.write(
            position * SEPTET_BITS as usize,
            SEPTET_BITS,
            u32::from(septet),
        );
    }
    Ok(cursor.into_inner())
}

/// True if every symbol of `text` is in the alphabet.
pub fn is_septet_text(text: &str) -> bool {
    text.chars().all(|c| septet_for(c).is_some())
}
