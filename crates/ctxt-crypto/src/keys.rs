//! RSA parameters and DER helpers shared by the directory and the vault.

use ctxt_codec::encoded_len;
use rsa::RsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;

use crate::error::{CryptoError, CryptoResult};

/// 1064 = 8 * 133 = 7 * 152: a ciphertext block is a whole number of both
/// bytes and septets, and 152 symbols fit one SMS.
pub const MODULUS_BITS: usize = 1064;

/// Bytes in one ciphertext block.
pub const MODULUS_BYTES: usize = MODULUS_BITS / 8;

/// PKCS#1 v1.5 encryption padding overhead.
pub const PKCS1_OVERHEAD: usize = 11;

/// Longest plaintext one block carries.
pub const MAX_PLAINTEXT: usize = MODULUS_BYTES - PKCS1_OVERHEAD;

/// Symbols in a transport body produced by a `MODULUS_BITS` key.
pub const BODY_SYMBOLS: usize = MODULUS_BITS / 7;

/// Parse X.509 SubjectPublicKeyInfo DER into an RSA key.
pub fn parse_public_key(der: &[u8]) -> CryptoResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_der(der).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Plaintext capacity of `key`.
pub fn capacity(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(PKCS1_OVERHEAD)
}

/// Symbols a ciphertext from a `modulus_len`-byte key encodes to.
pub fn body_symbols(modulus_len: usize) -> usize {
    encoded_len(modulus_len)
}
