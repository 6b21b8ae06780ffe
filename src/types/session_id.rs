use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque identifier the service assigns to a stored conversation.
///
/// The service may send the identifier as a JSON string or a JSON integer;
/// both deserialize to the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new `SessionId` from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Text(text) => Ok(Self(text)),
            Wire::Signed(n) => Ok(Self(n.to_string())),
            Wire::Unsigned(n) => Ok(Self(n.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_value, json, to_value};

    #[test]
    fn deserialize_string_and_integer_ids() {
        let id: SessionId = from_value(json!("abc123")).unwrap();
        assert_eq!(id.as_str(), "abc123");

        let id: SessionId = from_value(json!(42)).unwrap();
        assert_eq!(id, SessionId::new("42"));
    }

    #[test]
    fn rejects_non_scalar_ids() {
        assert!(from_value::<SessionId>(json!({"id": 1})).is_err());
        assert!(from_value::<SessionId>(json!(null)).is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        assert_eq!(to_value(SessionId::new("7")).unwrap(), json!("7"));
    }
}
