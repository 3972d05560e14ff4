//! Tri-state attribute values.
//!
//! Every attribute the host sends is either null, unknown (not yet computed
//! during planning) or a concrete value. On the wire an unknown value is the
//! placeholder string [`UNKNOWN_SENTINEL`]; everything else is plain JSON.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// JSON placeholder the host uses for values that are not known until apply.
pub const UNKNOWN_SENTINEL: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// An attribute value that may be null or unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr<T> {
    /// Absent from configuration and state.
    Null,
    /// Will only be known after apply.
    Unknown,
    /// A concrete value.
    Known(T),
}

impl<T> Attr<T> {
    /// Returns true if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true if the value is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns the concrete value, if any.
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Maps a concrete value, keeping null and unknown as they are.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Self::Null => Attr::Null,
            Self::Unknown => Attr::Unknown,
            Self::Known(v) => Attr::Known(f(v)),
        }
    }
}

impl<T> Default for Attr<T> {
    fn default() -> Self {
        Self::Null
    }
}

impl Attr<String> {
    /// The string value, or `""` when null or unknown.
    pub fn value_str(&self) -> &str {
        self.known().map(String::as_str).unwrap_or_default()
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Unknown => serializer.serialize_str(UNKNOWN_SENTINEL),
            Self::Known(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Self::Null);
        }
        if is_unknown(&value) {
            return Ok(Self::Unknown);
        }
        serde_json::from_value(value)
            .map(Self::Known)
            .map_err(D::Error::custom)
    }
}

/// Returns true if a raw JSON value is the unknown placeholder.
pub fn is_unknown(value: &Value) -> bool {
    value.as_str() == Some(UNKNOWN_SENTINEL)
}

/// The unknown placeholder as a raw JSON value.
pub fn unknown() -> Value {
    Value::String(UNKNOWN_SENTINEL.to_string())
}
