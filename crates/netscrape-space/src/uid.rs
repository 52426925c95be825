//! Stable external identifiers.
//!
//! A [`Uid`] is the join key between every layer of netscrape: the mapper
//! derives it, the topology deduplicates on it and the store looks nodes up by
//! it (`xid`). Every constructor except [`Uid::random`] is a pure function of
//! its input, so two workers (or two runs) that observe the same natural key
//! always agree on the identifier without talking to each other.

use crate::error::SpaceError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque, stable identifier of a resource or entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Wrap an identifier supplied by the external source (e.g. a GitHub node id).
    pub fn from_external(id: impl Into<String>) -> Result<Self, SpaceError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(SpaceError::invalid("uid", "must not be empty"));
        }
        Ok(Self(id))
    }

    /// Derive the uid of a named sub-entity: `lowercase(name) + "-" + resource`.
    ///
    /// Repeated names across records (topics, languages, owners) collapse onto
    /// the same uid and therefore onto the same node.
    pub fn derive(name: &str, resource: &str) -> Result<Self, SpaceError> {
        if name.trim().is_empty() {
            return Err(SpaceError::invalid("name", "must not be empty"));
        }
        if resource.is_empty() {
            return Err(SpaceError::invalid("resource", "must not be empty"));
        }
        Ok(Self(format!("{}-{}", name.to_lowercase(), resource)))
    }

    /// Hex SHA-256 over length-prefixed parts.
    ///
    /// Length prefixes keep `["ab", "c"]` and `["a", "bc"]` apart.
    pub fn hashed<S: AsRef<str>>(parts: &[S]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            let bytes = part.as_ref().as_bytes();
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest.iter() {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        Self(out)
    }

    /// Random v4 uid, for entities that have no natural key.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
