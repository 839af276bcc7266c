//! Key-share payload exchanged out of band (NFC tap, Bluetooth, file).
//!
//! ```text
//! [0..2]        Number length N (u16 BE)
//! [2..2+N]      Normalized number, UTF-8
//! [2+N..6+N]    Key length K (u32 BE)
//! [6+N..6+N+K]  SubjectPublicKeyInfo DER
//! ```

use thiserror::Error;

use crate::phone::{NumberError, PhoneNumber};
use crate::record::KeyRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShareError {
    #[error("share payload truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("{0} unexpected bytes after share payload")]
    TrailingBytes(usize),
    #[error("share payload number is not UTF-8")]
    InvalidUtf8,
    #[error("share payload number: {0}")]
    InvalidNumber(#[from] NumberError),
}

impl KeyRecord {
    pub fn to_share_payload(&self) -> Vec<u8> {
        let number = self.number.as_str().as_bytes();
        let mut out = Vec::with_capacity(6 + number.len() + self.public_key.len());
        // Normalized numbers are at most 15 bytes; keys are a few hundred.
        out.extend_from_slice(&(number.len() as u16).to_be_bytes());
        out.extend_from_slice(number);
        out.extend_from_slice(&(self.public_key.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.public_key);
        out
    }

    pub fn from_share_payload(data: &[u8]) -> Result<Self, ShareError> {
        let mut reader = Reader { data, pos: 0 };

        let number_len = u16::from_be_bytes(reader.array()?) as usize;
        let number = std::str::from_utf8(reader.take(number_len)?)
            .map_err(|_| ShareError::InvalidUtf8)?;
        let number = PhoneNumber::parse(number)?;

        let key_len = u32::from_be_bytes(reader.array()?) as usize;
        let public_key = reader.take(key_len)?.to_vec();

        let rest = data.len() - reader.pos;
        if rest != 0 {
            return Err(ShareError::TrailingBytes(rest));
        }
        Ok(KeyRecord { number, public_key })
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], ShareError> {
        let needed = self.pos.saturating_add(len);
        let slice = self.data.get(self.pos..needed).ok_or(ShareError::Truncated {
            needed,
            available: self.data.len(),
        })?;
        self.pos = needed;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ShareError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}
