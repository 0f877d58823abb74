//! UDF descriptor.
//!
//! Identifies the computation the worker runs. The transport stores it next
//! to the input and hands it back to the orchestrator; it never inspects it
//! and it never influences framing.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque description of a user-defined function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdfDescriptor {
    /// Human-readable name, used in log events.
    pub name: String,
    /// Serialized function body as produced by the host (e.g. a serialized closure).
    #[serde(with = "serde_bytes_as_vec")]
    pub payload: Bytes,
}

impl UdfDescriptor {
    /// Create a new descriptor.
    pub fn new(name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Descriptor with an empty payload.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Bytes::new())
    }

    /// Serialize to JSON, e.g. for handing to the worker launcher.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

mod serde_bytes_as_vec {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        Vec::<u8>::deserialize(deserializer).map(Bytes::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let udf = UdfDescriptor::new("upper", vec![0x80, 0x04, 0x95]);
        let json = udf.to_json().unwrap();
        assert_eq!(UdfDescriptor::from_json(&json).unwrap(), udf);
    }

    #[test]
    fn test_named_has_empty_payload() {
        let udf = UdfDescriptor::named("noop");
        assert_eq!(udf.name, "noop");
        assert!(udf.payload.is_empty());
    }
}
