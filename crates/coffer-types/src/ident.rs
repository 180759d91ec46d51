//! Content-derived object identity.
//!
//! Every entity in the ledger is named by the 20-byte SHA-1 digest of its
//! canonical byte encoding. Equal content always yields an equal identity,
//! bitwise, across processes. References between objects are expressed as
//! IDs, which makes the repository a Merkle DAG: a transaction's identity
//! covers its state, and a state's identity covers its accounts and budget.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};

/// Length in bytes of an [`ObjectId`].
pub const ID_LENGTH: usize = 20;

/// A 20-byte content hash identifying an object.
///
/// The all-zero value is the null sentinel: it marks the unset parent of an
/// initial transaction and the HEAD of an empty repository. It never names a
/// stored object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; ID_LENGTH]);

impl ObjectId {
    /// The null sentinel.
    pub const NULL: ObjectId = ObjectId([0; ID_LENGTH]);

    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: [u8; ID_LENGTH]) -> Self {
        ObjectId(bytes)
    }

    /// True for the all-zero sentinel.
    pub fn is_null(&self) -> bool {
        self.0 == [0; ID_LENGTH]
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; ID_LENGTH] {
        &self.0
    }

    /// Lower-case 40-character hexadecimal rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; ID_LENGTH];
        if s.len() != 2 * ID_LENGTH {
            return Err(ParseIdError(s.to_string()));
        }
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseIdError(s.to_string()))?;
        Ok(ObjectId(bytes))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The given text is not a 40-character hexadecimal object ID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0:?} is not a 40 character hexadecimal object ID")]
pub struct ParseIdError(pub String);

/// Digests a canonical object body under a kind tag.
///
/// The framing is `<kind> <body-len>\0<body>`, so two objects of different
/// kinds can never share an identity even when their bodies coincide.
pub(crate) fn hash_object(kind: &str, body: &str) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(kind.as_bytes());
    hasher.update(b" ");
    hasher.update(body.len().to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(body.as_bytes());
    ObjectId(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let id = hash_object("test", "payload");
        let parsed: ObjectId = id.to_hex().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn same_content_same_id() {
        assert_eq!(hash_object("test", "payload"), hash_object("test", "payload"));
    }

    #[test]
    fn kind_participates_in_identity() {
        assert_ne!(hash_object("accounts", ""), hash_object("budget", ""));
    }

    #[test]
    fn null_is_all_zero() {
        assert!(ObjectId::NULL.is_null());
        assert_eq!(ObjectId::NULL.to_hex(), "0".repeat(40));
        assert!(!hash_object("test", "payload").is_null());
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("abc".parse::<ObjectId>().is_err());
        assert!("zz".repeat(20).parse::<ObjectId>().is_err());
    }

    #[test]
    fn serde_uses_hex_text() {
        let id = hash_object("test", "payload");
        let encoded = serde_json::to_string(&id).unwrap();
        assert_eq!(encoded, format!("\"{}\"", id.to_hex()));
        let decoded: ObjectId = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, id);
    }
}
