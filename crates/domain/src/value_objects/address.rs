//! Ledger account address.
//!
//! An address is a 32-byte public key. Its human-readable form appends the
//! last four bytes of the SHA-512/256 digest of the key and base32-encodes the
//! result without padding.

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a public key in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length of the checksum appended to the public key.
const CHECKSUM_LENGTH: usize = 4;

/// Length of the base32 text form.
pub const ENCODED_ADDRESS_LENGTH: usize = 58;

/// Domain separator for application escrow addresses.
const APP_ID_PREFIX: &[u8] = b"appID";

/// Errors raised while parsing or building an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Raw key material is not 32 bytes.
    #[error("expected {PUBLIC_KEY_LENGTH} address bytes, found {0}")]
    InvalidLength(usize),
    /// Text form is not 58 characters.
    #[error("expected {ENCODED_ADDRESS_LENGTH} address characters, found {0}")]
    InvalidTextLength(usize),
    /// Text form is not valid base32.
    #[error("address is not valid base32: {0}")]
    InvalidEncoding(String),
    /// Checksum does not match the key.
    #[error("address checksum mismatch")]
    ChecksumMismatch,
}

/// A 32-byte ledger account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; PUBLIC_KEY_LENGTH]);

impl Address {
    /// Wraps raw public key bytes.
    #[must_use]
    pub const fn new(public_key: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(public_key)
    }

    /// Builds an address from a byte slice, rejecting any length but 32.
    ///
    /// # Errors
    /// Returns [`AddressError::InvalidLength`] for slices of the wrong size.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let key: [u8; PUBLIC_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(key))
    }

    /// Escrow address of an application.
    #[must_use]
    pub fn for_application(app_id: u64) -> Self {
        let digest = Sha512_256::new()
            .chain_update(APP_ID_PREFIX)
            .chain_update(app_id.to_be_bytes())
            .finalize();
        let mut key = [0u8; PUBLIC_KEY_LENGTH];
        key.copy_from_slice(&digest);
        Self(key)
    }

    /// The raw public key.
    #[must_use]
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Whether this is the all-zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    fn checksum(&self) -> [u8; CHECKSUM_LENGTH] {
        let digest = Sha512_256::digest(self.0);
        let mut out = [0u8; CHECKSUM_LENGTH];
        out.copy_from_slice(&digest[digest.len() - CHECKSUM_LENGTH..]);
        out
    }

    /// Checksummed base32 text form.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut buf = Vec::with_capacity(PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH);
        buf.extend_from_slice(&self.0);
        buf.extend_from_slice(&self.checksum());
        BASE32_NOPAD.encode(&buf)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ENCODED_ADDRESS_LENGTH {
            return Err(AddressError::InvalidTextLength(s.len()));
        }
        let raw = BASE32_NOPAD
            .decode(s.as_bytes())
            .map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;
        if raw.len() != PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH {
            return Err(AddressError::InvalidLength(raw.len()));
        }
        let address = Self::from_slice(&raw[..PUBLIC_KEY_LENGTH])?;
        if raw[PUBLIC_KEY_LENGTH..] != address.checksum() {
            return Err(AddressError::ChecksumMismatch);
        }
        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
