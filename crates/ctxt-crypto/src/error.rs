use std::time::Duration;

use ctxt_codec::CodecError;
use ctxt_store::StoreError;
use ctxt_types::{NumberError, PhoneNumber, ShareError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("no private key on this device")]
    NoPrivateKey,
    /// Wrong block length or bad padding. Deliberately carries no detail.
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("a key is already stored for {0}")]
    DuplicateKey(PhoneNumber),
    /// Another handle on the same store generated the device key first.
    #[error("this device already has a key pair")]
    KeyPairExists,
    #[error("plaintext is {len} bytes, at most {max} fit in one block")]
    PlaintextTooLong { len: usize, max: usize },
    #[error("invalid public key: {0}")]
    InvalidKey(String),
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
    #[error("invalid phone number: {0}")]
    InvalidNumber(#[from] NumberError),
    #[error("share payload: {0}")]
    Share(#[from] ShareError),
    #[error("stored record {id:?} is corrupt: {reason}")]
    CorruptRecord { id: String, reason: String },
    #[error("no public key stored for {0}")]
    UnknownPeer(PhoneNumber),
    #[error("message body has {actual} symbols, expected {expected}")]
    UnexpectedBodyLength { expected: usize, actual: usize },
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    #[error("key generation did not finish within {0:?}")]
    KeyGenerationTimedOut(Duration),
    #[error("lock poisoned")]
    Poisoned,
    #[error("crypto worker stopped")]
    WorkerGone,
    #[error("spawn crypto worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
