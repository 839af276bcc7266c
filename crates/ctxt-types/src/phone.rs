use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// E.164 caps subscriber numbers at 15 digits.
pub const MAX_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error("phone number is empty")]
    Empty,
    #[error("invalid character {0:?} in phone number")]
    InvalidCharacter(char),
    #[error("phone number has {0} digits, at most 15 allowed")]
    TooLong(usize),
}

/// International phone number reduced to its digits.
///
/// Two spellings of the same number (`+44 20 7946-0958`, `0044207946 0958`)
/// normalize to the same value, so a number can key a directory entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, NumberError> {
        let trimmed = raw.trim();
        let rest = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' | '/' => {}
                other => return Err(NumberError::InvalidCharacter(other)),
            }
        }

        // `00` is the dialled form of `+`. Strip every occurrence so the
        // result never starts with `00` and parsing it again is a no-op.
        let start = digits.len() - digits.trim_start_matches("00").len();
        digits.drain(..start);

        if digits.is_empty() {
            return Err(NumberError::Empty);
        }
        if digits.len() > MAX_DIGITS {
            return Err(NumberError::TooLong(digits.len()));
        }
        Ok(Self(digits))
    }

    /// True if `id` is already in normalized form, i.e. `parse(id)` would
    /// return it unchanged.
    pub fn is_normalized(id: &str) -> bool {
        !id.is_empty()
            && id.len() <= MAX_DIGITS
            && !id.starts_with("00")
            && id.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = NumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(number: PhoneNumber) -> Self {
        number.0
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for PhoneNumber {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
