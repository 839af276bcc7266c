use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::phone::PhoneNumber;

/// A directory entry: one phone number bound to one RSA public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub number: PhoneNumber,
    /// X.509 SubjectPublicKeyInfo, DER.
    #[serde(with = "b64")]
    pub public_key: Vec<u8>,
}

impl KeyRecord {
    pub fn new(number: PhoneNumber, public_key: Vec<u8>) -> Self {
        Self { number, public_key }
    }

    /// Human-comparable fingerprint: first 20 bytes of SHA-256 over the DER,
    /// hex, in groups of 4.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.public_key);
        digest[..20]
            .chunks(2)
            .map(hex::encode)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

mod b64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
