//! Public keys by phone number.
//!
//! A contact lives in the blob store under its normalized number, holding
//! SubjectPublicKeyInfo DER. Records are write-once: a second key for the
//! same number is refused, never merged or overwritten. The device's own
//! number is kept in the reserved [`SELF_NUMBER_ID`] blob so [`share_key`]
//! can find the local public key again.
//!
//! [`share_key`]: KeyDirectory::share_key

use std::sync::{Arc, Mutex};

use ctxt_store::BlobStore;
use ctxt_types::{KeyRecord, PhoneNumber};
use rand_core::OsRng;
use rsa::Pkcs1v15Encrypt;
use tracing::{info, warn};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{capacity, parse_public_key};

/// Blob holding the PKCS#8 private key. Only the vault reads or writes it.
pub const PRIVATE_KEY_ID: &str = ".private_key";

/// Blob holding the device's own normalized number.
pub const SELF_NUMBER_ID: &str = ".self_number";

pub struct KeyDirectory {
    store: Arc<dyn BlobStore>,
    /// Keeps a contact insert and its self-number write together.
    /// Write-once itself comes from [`BlobStore::put_new`].
    writer: Mutex<()>,
}

impl KeyDirectory {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    pub fn fetch_key(&self, number: &str) -> CryptoResult<Option<KeyRecord>> {
        let number = PhoneNumber::parse(number)?;
        self.load(&number)
    }

    pub fn contains(&self, number: &str) -> CryptoResult<bool> {
        let number = PhoneNumber::parse(number)?;
        Ok(self.store.get(number.as_str())?.is_some())
    }

    /// Store `spki_der` as the key for `number`.
    ///
    /// Fails with `DuplicateKey` if the number already has a key; the stored
    /// record is left exactly as it was.
    pub fn new_key(&self, number: &str, spki_der: &[u8]) -> CryptoResult<KeyRecord> {
        let number = PhoneNumber::parse(number)?;
        parse_public_key(spki_der)?;

        let _guard = self.writer.lock().map_err(|_| CryptoError::Poisoned)?;
        self.insert_locked(number, spki_der)
    }

    /// The device's own record, once a key pair has been generated.
    pub fn share_key(&self) -> CryptoResult<Option<KeyRecord>> {
        let Some(number) = self.self_number()? else {
            return Ok(None);
        };
        self.load(&number)
    }

    /// Every contact number, sorted. Reserved blobs are not contacts.
    pub fn enumerate_keys(&self) -> CryptoResult<Vec<PhoneNumber>> {
        let mut numbers: Vec<PhoneNumber> = self
            .store
            .list()?
            .into_iter()
            .filter(|id| PhoneNumber::is_normalized(id))
            .filter_map(|id| PhoneNumber::parse(&id).ok())
            .collect();
        numbers.sort();
        Ok(numbers)
    }

    /// Encrypt one block for the holder of `spki_der`.
    ///
    /// Padding is randomized, so equal plaintexts give different ciphertexts.
    pub fn encrypt(&self, plaintext: &[u8], spki_der: &[u8]) -> CryptoResult<Vec<u8>> {
        let key = parse_public_key(spki_der)?;
        let max = capacity(&key);
        if plaintext.len() > max {
            return Err(CryptoError::PlaintextTooLong {
                len: plaintext.len(),
                max,
            });
        }
        key.encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    /// Publish the local public key under `number` and remember `number` as
    /// this device's own.
    ///
    /// Fails with `KeyPairExists` if some handle on the store already
    /// claimed the self number; the claim is never overwritten.
    pub(crate) fn register_self(
        &self,
        number: &PhoneNumber,
        spki_der: &[u8],
    ) -> CryptoResult<KeyRecord> {
        let _guard = self.writer.lock().map_err(|_| CryptoError::Poisoned)?;
        let record = self.insert_locked(number.clone(), spki_der)?;
        if !self.store.put_new(SELF_NUMBER_ID, number.as_str().as_bytes())? {
            warn!(%number, "Self number already claimed");
            return Err(CryptoError::KeyPairExists);
        }
        Ok(record)
    }

    pub(crate) fn self_number(&self) -> CryptoResult<Option<PhoneNumber>> {
        let Some(bytes) = self.store.get(SELF_NUMBER_ID)? else {
            return Ok(None);
        };
        let number = std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| PhoneNumber::parse(s).ok())
            .ok_or_else(|| {
                warn!("Self number blob is not a valid number");
                CryptoError::CorruptRecord {
                    id: SELF_NUMBER_ID.to_string(),
                    reason: "not a phone number".to_string(),
                }
            })?;
        Ok(Some(number))
    }

    fn insert_locked(&self, number: PhoneNumber, spki_der: &[u8]) -> CryptoResult<KeyRecord> {
        if !self.store.put_new(number.as_str(), spki_der)? {
            warn!(%number, "Refusing to replace existing key");
            return Err(CryptoError::DuplicateKey(number));
        }
        info!(%number, "Public key stored");
        Ok(KeyRecord::new(number, spki_der.to_vec()))
    }

    fn load(&self, number: &PhoneNumber) -> CryptoResult<Option<KeyRecord>> {
        let Some(der) = self.store.get(number.as_str())? else {
            return Ok(None);
        };
        if let Err(e) = parse_public_key(&der) {
            warn!(%number, error = %e, "Stored public key does not parse");
            return Err(CryptoError::CorruptRecord {
                id: number.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(Some(KeyRecord::new(number.clone(), der)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxt_store::{FsBlobStore, MemoryBlobStore};
    use rsa::RsaPrivateKey;
    use rsa::pkcs8::EncodePublicKey;
    use std::sync::OnceLock;

    // Small keys keep these tests fast; the directory accepts any RSA size.
    fn spki(n: usize) -> Vec<u8> {
        static KEYS: OnceLock<Vec<Vec<u8>>> = OnceLock::new();
        KEYS.get_or_init(|| {
            (0..2)
                .map(|_| {
                    RsaPrivateKey::new(&mut OsRng, 512)
                        .unwrap()
                        .to_public_key()
                        .to_public_key_der()
                        .unwrap()
                        .into_vec()
                })
                .collect()
        })[n]
            .clone()
    }

    fn directory() -> (Arc<MemoryBlobStore>, KeyDirectory) {
        let store = Arc::new(MemoryBlobStore::new());
        (store.clone(), KeyDirectory::new(store))
    }

    #[test]
    fn unknown_number_is_none() {
        let (_, dir) = directory();
        assert!(dir.fetch_key("+1 555 000 0000").unwrap().is_none());
        assert!(!dir.contains("15550000000").unwrap());
    }

    #[test]
    fn stores_under_normalized_number() {
        let (store, dir) = directory();
        let record = dir.new_key("+49 (151) 1234-5678", &spki(0)).unwrap();
        assert_eq!(record.number, "4915112345678");
        assert_eq!(store.get("4915112345678").unwrap(), Some(spki(0)));

        let fetched = dir.fetch_key("0049 151 12345678").unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn dial_prefix_after_plus_finds_stored_key() {
        let (store, dir) = directory();
        let record = dir.new_key("+0015551234567", &spki(0)).unwrap();
        assert_eq!(record.number, "15551234567");
        assert_eq!(store.list().unwrap(), vec!["15551234567"]);

        let fetched = dir.fetch_key(record.number.as_str()).unwrap().unwrap();
        assert_eq!(fetched, record);
        assert_eq!(dir.enumerate_keys().unwrap(), vec![record.number.clone()]);
        assert!(matches!(
            dir.new_key(record.number.as_str(), &spki(1)),
            Err(CryptoError::DuplicateKey(_))
        ));
    }

    #[test]
    fn duplicate_keeps_first_key() {
        let (_, dir) = directory();
        dir.new_key("15551234567", &spki(0)).unwrap();
        let err = dir.new_key("+1 555 123 4567", &spki(1)).unwrap_err();
        assert!(matches!(err, CryptoError::DuplicateKey(n) if n == "15551234567"));
        assert_eq!(dir.fetch_key("15551234567").unwrap().unwrap().public_key, spki(0));
    }

    #[test]
    fn rejects_bad_input_before_touching_store() {
        let (store, dir) = directory();
        assert!(matches!(
            dir.new_key("15551234567", b"junk"),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(
            dir.new_key("call me", &spki(0)),
            Err(CryptoError::InvalidNumber(_))
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn corrupt_record_is_reported() {
        let (store, dir) = directory();
        store.put("15551234567", b"garbage").unwrap();
        assert!(matches!(
            dir.fetch_key("15551234567"),
            Err(CryptoError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn enumerate_skips_reserved_blobs() {
        let (store, dir) = directory();
        dir.new_key("447700900123", &spki(0)).unwrap();
        dir.register_self(&PhoneNumber::parse("15551234567").unwrap(), &spki(1))
            .unwrap();
        store.put(PRIVATE_KEY_ID, b"secret").unwrap();

        let numbers = dir.enumerate_keys().unwrap();
        assert_eq!(numbers, vec![
            PhoneNumber::parse("15551234567").unwrap(),
            PhoneNumber::parse("447700900123").unwrap(),
        ]);
    }

    #[test]
    fn share_key_follows_self_number() {
        let (_, dir) = directory();
        assert!(dir.share_key().unwrap().is_none());
        let own = PhoneNumber::parse("15551234567").unwrap();
        dir.register_self(&own, &spki(1)).unwrap();
        let shared = dir.share_key().unwrap().unwrap();
        assert_eq!(shared.number, own);
        assert_eq!(shared.public_key, spki(1));
    }

    #[test]
    fn separate_handles_cannot_both_store_a_number() {
        let root = tempfile::tempdir().unwrap();
        let open = || KeyDirectory::new(Arc::new(FsBlobStore::open(root.path()).unwrap()));
        let (first, second) = (open(), open());

        first.new_key("15551234567", &spki(0)).unwrap();
        assert!(matches!(
            second.new_key("15551234567", &spki(1)),
            Err(CryptoError::DuplicateKey(_))
        ));
        assert_eq!(second.fetch_key("15551234567").unwrap().unwrap().public_key, spki(0));
    }

    #[test]
    fn self_number_is_claimed_once() {
        let (store, dir) = directory();
        dir.register_self(&PhoneNumber::parse("15551234567").unwrap(), &spki(0))
            .unwrap();
        let other = PhoneNumber::parse("447700900123").unwrap();
        assert!(matches!(
            dir.register_self(&other, &spki(1)),
            Err(CryptoError::KeyPairExists)
        ));
        assert_eq!(store.get(SELF_NUMBER_ID).unwrap().as_deref(), Some(&b"15551234567"[..]));
        assert_eq!(dir.share_key().unwrap().unwrap().public_key, spki(0));
    }

    #[test]
    fn register_self_refuses_taken_number() {
        let (store, dir) = directory();
        dir.new_key("15551234567", &spki(0)).unwrap();
        let own = PhoneNumber::parse("15551234567").unwrap();
        assert!(matches!(
            dir.register_self(&own, &spki(1)),
            Err(CryptoError::DuplicateKey(_))
        ));
        assert_eq!(store.get(SELF_NUMBER_ID).unwrap(), None);
    }

    #[test]
    fn encrypt_checks_capacity() {
        let (_, dir) = directory();
        // 512-bit key: 64-byte blocks, 53 bytes of payload.
        let block = dir.encrypt(&[7u8; 53], &spki(0)).unwrap();
        assert_eq!(block.len(), 64);
        assert!(matches!(
            dir.encrypt(&[7u8; 54], &spki(0)),
            Err(CryptoError::PlaintextTooLong { len: 54, max: 53 })
        ));
        assert!(matches!(
            dir.encrypt(b"hi", b"junk"),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn encryption_is_randomized() {
        let (_, dir) = directory();
        let a = dir.encrypt(b"same", &spki(0)).unwrap();
        let b = dir.encrypt(b"same", &spki(0)).unwrap();
        assert_ne!(a, b);
    }
}
