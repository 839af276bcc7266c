//! Key lifecycle and end-to-end encryption for SMS-sized messages.
//!
//! [`CryptoContext`] is the entry point. It pairs a [`KeyDirectory`] of
//! peers' public keys with the device's [`KeyVault`], both persisted in a
//! [`ctxt_store::BlobStore`]. Ciphertext blocks are one RSA modulus long and
//! travel as septet text (see `ctxt_codec`).

pub mod context;
pub mod directory;
pub mod error;
pub mod keys;
pub mod vault;
pub mod worker;

pub use context::CryptoContext;
pub use directory::{KeyDirectory, PRIVATE_KEY_ID, SELF_NUMBER_ID};
pub use error::{CryptoError, CryptoResult};
pub use keys::{BODY_SYMBOLS, MAX_PLAINTEXT, MODULUS_BITS, MODULUS_BYTES};
pub use vault::KeyVault;
pub use worker::{CryptoWorker, Pending, WorkerHandle};
