//! ctxt codec: SMS-safe text packing for binary payloads.
//!
//! An SMS body only carries the GSM 7-bit default alphabet reliably, so
//! ciphertext is re-packed 7 bits at a time into that alphabet:
//!
//! ```text
//! bytes   |10110010|01110001|11000000| ...
//! septets |1011001|0011100|0111000|000....
//! symbols    'Y'     'Æ'     '8'   ...
//! ```
//!
//! - `bits`    : `BitCursor`, the only bit arithmetic in the crate
//! - `alphabet`: the 128-symbol table and its reverse lookup
//! - `septet`  : `encode` / `decode`

pub mod alphabet;
pub mod bits;
pub mod septet;

pub use alphabet::{ALPHABET, septet_for, symbol_for};
pub use bits::BitCursor;
pub use septet::{CodecError, decode, decoded_len, encode, encoded_len, is_septet_text};
