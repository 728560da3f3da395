use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::object::ObjectId;

/// In-memory ref table: unique, case-sensitive names mapped to object ids.
///
/// Kept sorted so `list` output and the serialized form are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefTable {
    refs: BTreeMap<String, ObjectId>,
}

impl RefTable {
    pub fn get(&self, name: &str) -> Option<&ObjectId> {
        self.refs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.refs.contains_key(name)
    }

    /// Set or remove a ref, returning the previous target.
    pub fn set(&mut self, name: &str, target: Option<ObjectId>) -> Option<ObjectId> {
        match target {
            Some(id) => self.refs.insert(name.to_string(), id),
            None => self.refs.remove(name),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObjectId)> {
        self.refs.iter().map(|(name, id)| (name.as_str(), id))
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}
