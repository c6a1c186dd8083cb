//! Opaque entity identifier.
//!
//! [`ObjectId`] is a 12-byte identifier rendered as 24 lower-case hex
//! characters. Events, rewards, reward requests and users all share this
//! id shape; the service never interprets the bytes beyond generating them.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of the hex rendering of an [`ObjectId`].
pub const OBJECT_ID_HEX_LEN: usize = 24;

/// Unique identifier for a catalog entity, reward request or user.
///
/// Generated ids start with 4 bytes of big-endian Unix seconds followed
/// by 8 random bytes, so ids created later sort after earlier ones at
/// second granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Creates a new, time-prefixed random `ObjectId`.
    #[must_use]
    pub fn new() -> Self {
        let secs = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
        let random = uuid::Uuid::new_v4();
        let (random_prefix, _) = random.as_bytes().split_at(8);
        let mut bytes = [0u8; 12];
        let (time_part, random_part) = bytes.split_at_mut(4);
        time_part.copy_from_slice(&secs.to_be_bytes());
        random_part.copy_from_slice(random_prefix);
        Self(bytes)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Error returned when a string is not a valid [`ObjectId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid id (expected 24 hex characters)")]
pub struct InvalidObjectId(String);

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidObjectId(s.to_string());
        if s.len() != OBJECT_ID_HEX_LEN {
            return Err(invalid());
        }
        let mut bytes = [0u8; 12];
        for (slot, pair) in bytes.iter_mut().zip(s.as_bytes().chunks_exact(2)) {
            let (Some(hi), Some(lo)) = (
                pair.first().copied().and_then(hex_nibble),
                pair.get(1).copied().and_then(hex_nibble),
            ) else {
                return Err(invalid());
            };
            *slot = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

const fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
