use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Length of one contract page hash.
pub const PAGE_HASH_LENGTH: usize = 32;

/// Hash of one page of a staged contract program.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHash(pub [u8; PAGE_HASH_LENGTH]);

impl PageHash {
    /// Raw hash bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PAGE_HASH_LENGTH] {
        &self.0
    }

    /// Lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageHash({})", self.to_hex())
    }
}

impl Serialize for PageHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PageHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        let hash: [u8; PAGE_HASH_LENGTH] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("page hash must be 32 bytes"))?;
        Ok(Self(hash))
    }
}
