use std::fmt;

use serde::{Deserialize, Serialize};

/// Width of an object id in hex characters (SHA-1).
pub const HEX_LEN: usize = 40;

/// Width of an object id in raw bytes, as it appears inside tree entries.
pub const RAW_LEN: usize = 20;

/// Content hash identifying an object, held as 40 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse a hex id. Uppercase digits are accepted and normalized.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(ObjectId(s.to_ascii_lowercase()))
    }

    /// Build an id from its binary form.
    pub fn from_raw(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != RAW_LEN {
            return None;
        }
        Some(ObjectId(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory shard and file name used by on-disk object layouts.
    pub fn split_path(&self) -> (&str, &str) {
        self.0.split_at(2)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ObjectId::from_hex(&value).ok_or_else(|| format!("invalid object id: {value:?}"))
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}
