//! Job identifiers.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Identifier used to reference a job from dependency lists.
///
/// Integers and strings are distinct: `1` and `"1"` never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum JobId {
    /// Numeric identifier.
    Int(i64),
    /// Textual identifier.
    Text(String),
}

impl JobId {
    /// Interpret a parsed value as an identifier.
    ///
    /// Returns `None` for floats, booleans, `null`, arrays and objects.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_i64().map(Self::Int),
            Value::String(text) => Some(Self::Text(text.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => write!(f, "{id:?}"),
        }
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}
