use std::sync::Arc;
use std::time::Duration;

use ctxt_codec::septet;
use ctxt_store::BlobStore;
use ctxt_types::{KeyRecord, PhoneNumber};
use tracing::{debug, info};

use crate::directory::KeyDirectory;
use crate::error::{CryptoError, CryptoResult};
use crate::keys::body_symbols;
use crate::vault::KeyVault;

/// Everything the rest of the application needs from the crypto layer.
///
/// Built in two steps: the directory over the store, then the vault over
/// the store and the directory. Hold one per store and pass it by reference
/// (or through a [`CryptoWorker`](crate::CryptoWorker)).
pub struct CryptoContext {
    directory: Arc<KeyDirectory>,
    vault: KeyVault,
}

impl CryptoContext {
    pub fn open(store: Arc<dyn BlobStore>) -> CryptoResult<Self> {
        let directory = Arc::new(KeyDirectory::new(store.clone()));
        let vault = KeyVault::open(store, directory.clone())?;
        Ok(Self { directory, vault })
    }

    pub fn encrypt(&self, plaintext: &[u8], spki_der: &[u8]) -> CryptoResult<Vec<u8>> {
        self.directory.encrypt(plaintext, spki_der)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.vault.decrypt(ciphertext)
    }

    pub fn fetch_key(&self, number: &str) -> CryptoResult<Option<KeyRecord>> {
        self.directory.fetch_key(number)
    }

    pub fn new_key(&self, number: &str, spki_der: &[u8]) -> CryptoResult<KeyRecord> {
        self.directory.new_key(number, spki_der)
    }

    pub fn share_key(&self) -> CryptoResult<Option<KeyRecord>> {
        self.directory.share_key()
    }

    pub fn enumerate_keys(&self) -> CryptoResult<Vec<PhoneNumber>> {
        self.directory.enumerate_keys()
    }

    pub fn is_key_available(&self) -> bool {
        self.vault.is_key_available()
    }

    pub fn generate_key_pair(&self, owner: &str) -> CryptoResult<()> {
        self.vault.generate_key_pair(owner)
    }

    pub fn generate_key_pair_within(&self, owner: &str, timeout: Duration) -> CryptoResult<()> {
        self.vault.generate_key_pair_within(owner, timeout)
    }

    /// Encrypt `plaintext` for `peer` and encode it as an SMS body.
    pub fn seal(&self, peer: &str, plaintext: &[u8]) -> CryptoResult<String> {
        let number = PhoneNumber::parse(peer)?;
        let record = self
            .directory
            .fetch_key(number.as_str())?
            .ok_or(CryptoError::UnknownPeer(number))?;
        let ciphertext = self.directory.encrypt(plaintext, &record.public_key)?;
        Ok(septet::encode(&ciphertext))
    }

    /// Decode and decrypt an SMS body sealed for this device.
    ///
    /// Bodies that are not exactly one encoded block long are not ours and
    /// are rejected before any RSA work.
    pub fn open_message(&self, body: &str) -> CryptoResult<Vec<u8>> {
        let modulus_len = self.vault.modulus_len().ok_or(CryptoError::NoPrivateKey)?;
        let expected = body_symbols(modulus_len);
        let actual = body.chars().count();
        if actual != expected {
            debug!(expected, actual, "Ignoring body of unexpected length");
            return Err(CryptoError::UnexpectedBodyLength { expected, actual });
        }
        let ciphertext = septet::decode(body)?;
        self.vault.decrypt(&ciphertext)
    }

    /// This device's key as a share payload, once it has one.
    pub fn export_share(&self) -> CryptoResult<Option<Vec<u8>>> {
        Ok(self.directory.share_key()?.map(|r| r.to_share_payload()))
    }

    /// Add the contact carried by a share payload.
    pub fn import_share(&self, payload: &[u8]) -> CryptoResult<KeyRecord> {
        let shared = KeyRecord::from_share_payload(payload)?;
        let record = self
            .directory
            .new_key(shared.number.as_str(), &shared.public_key)?;
        info!(number = %record.number, fingerprint = %record.fingerprint(), "Imported shared key");
        Ok(record)
    }
}
