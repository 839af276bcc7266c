//! The device's single RSA key pair.
//!
//! A vault starts with no key or with the key restored from the store. It
//! moves to ready at most once, through [`KeyVault::generate_key_pair`], and
//! never goes back. The private key is never handed out: callers get
//! plaintext from [`KeyVault::decrypt`] and nothing else.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use ctxt_store::BlobStore;
use ctxt_types::PhoneNumber;
use rand_core::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::directory::{KeyDirectory, PRIVATE_KEY_ID};
use crate::error::{CryptoError, CryptoResult};
use crate::keys::MODULUS_BITS;

pub struct KeyVault {
    store: Arc<dyn BlobStore>,
    directory: Arc<KeyDirectory>,
    key: RwLock<Option<Arc<RsaPrivateKey>>>,
    /// Held for the whole of a generation so two callers cannot both mint a key.
    generation: Mutex<()>,
}

impl KeyVault {
    /// Restore the persisted private key, if there is one.
    pub fn open(store: Arc<dyn BlobStore>, directory: Arc<KeyDirectory>) -> CryptoResult<Self> {
        let key = match store.get(PRIVATE_KEY_ID)? {
            Some(der) => {
                let der = Zeroizing::new(der);
                let key = RsaPrivateKey::from_pkcs8_der(&der).map_err(|e| {
                    warn!(error = %e, "Stored private key does not parse");
                    CryptoError::CorruptRecord {
                        id: PRIVATE_KEY_ID.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                info!(bits = key.size() * 8, "Private key restored");
                Some(Arc::new(key))
            }
            None => None,
        };

        Ok(Self {
            store,
            directory,
            key: RwLock::new(key),
            generation: Mutex::new(()),
        })
    }

    pub fn is_key_available(&self) -> bool {
        matches!(self.loaded(), Ok(Some(_)))
    }

    /// Byte length of the local modulus, once a key exists.
    pub fn modulus_len(&self) -> Option<usize> {
        self.loaded().ok().flatten().map(|key| key.size())
    }

    /// Create and persist the device key pair for `owner`.
    ///
    /// Does nothing if a key already exists. The public half goes into the
    /// directory first, so a `DuplicateKey` for `owner` aborts before any
    /// private key is written. If another handle on the same store wins the
    /// race, this fails with `KeyPairExists` and the winner's key stays.
    pub fn generate_key_pair(&self, owner: &str) -> CryptoResult<()> {
        self.generate(owner, None)
    }

    /// Like [`generate_key_pair`](Self::generate_key_pair), but gives up
    /// after `timeout`. A key that arrives late is dropped unused.
    pub fn generate_key_pair_within(&self, owner: &str, timeout: Duration) -> CryptoResult<()> {
        self.generate(owner, Some(timeout))
    }

    /// Decrypt one ciphertext block with the local private key.
    ///
    /// PKCS#1 v1.5 padding checks are not constant time. A failure must
    /// never be sent back to the sender in any form they can time or count.
    pub fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        let key = self.loaded()?.ok_or(CryptoError::NoPrivateKey)?;
        if ciphertext.len() != key.size() {
            debug!(
                len = ciphertext.len(),
                expected = key.size(),
                "Ciphertext has wrong block length"
            );
            return Err(CryptoError::DecryptionFailed);
        }
        key.decrypt(Pkcs1v15Encrypt, ciphertext).map_err(|e| {
            debug!(error = %e, "Decryption failed");
            CryptoError::DecryptionFailed
        })
    }

    fn loaded(&self) -> CryptoResult<Option<Arc<RsaPrivateKey>>> {
        let key = self.key.read().map_err(|_| CryptoError::Poisoned)?;
        Ok(key.clone())
    }

    fn generate(&self, owner: &str, timeout: Option<Duration>) -> CryptoResult<()> {
        let owner = PhoneNumber::parse(owner)?;
        let _guard = self.generation.lock().map_err(|_| CryptoError::Poisoned)?;
        if self.loaded()?.is_some() {
            debug!("Key pair already present, nothing to generate");
            return Ok(());
        }

        info!(bits = MODULUS_BITS, "Generating key pair");
        let key = match timeout {
            None => new_key().map_err(|e| CryptoError::KeyGeneration(e.to_string()))?,
            Some(timeout) => generate_on_helper(timeout)?,
        };

        let spki = key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        self.directory.register_self(&owner, spki.as_bytes())?;

        let pkcs8 = key
            .to_pkcs8_der()
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        if !self.store.put_new(PRIVATE_KEY_ID, pkcs8.as_bytes())? {
            warn!(%owner, "Another handle stored a private key first");
            return Err(CryptoError::KeyPairExists);
        }

        *self.key.write().map_err(|_| CryptoError::Poisoned)? = Some(Arc::new(key));
        info!(%owner, "Key pair generated");
        Ok(())
    }
}

fn new_key() -> rsa::Result<RsaPrivateKey> {
    RsaPrivateKey::new(&mut OsRng, MODULUS_BITS)
}

fn generate_on_helper(timeout: Duration) -> CryptoResult<RsaPrivateKey> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::Builder::new()
        .name("ctxt-keygen".to_string())
        .spawn(move || {
            // The receiver is gone if the caller already timed out.
            let _ = tx.send(new_key());
        })
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result.map_err(|e| CryptoError::KeyGeneration(e.to_string())),
        Err(RecvTimeoutError::Timeout) => {
            warn!(?timeout, "Key generation timed out");
            Err(CryptoError::KeyGenerationTimedOut(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(CryptoError::KeyGeneration(
            "key generation thread exited".to_string(),
        )),
    }
}
