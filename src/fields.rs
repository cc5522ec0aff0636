//! Case-insensitive, alias-tolerant field access over parsed descriptions.
//!
//! Job and graph descriptions arrive as generic JSON objects. Their keys are
//! normalised to upper case once, after which each logical [`Field`] is looked
//! up through a static table of accepted spellings. The first spelling present
//! (in table order) wins.
//!
//! ```
//! use qsubgraph::fields::{Field, FieldTree};
//! use serde_json::json;
//!
//! let tree = FieldTree::from_value(&json!({"q": "short", "Cmd": "true"}), "job")
//!     .expect("object");
//! assert_eq!(tree.get(Field::Queue), Some(&json!("short")));
//! assert_eq!(tree.list(Field::Commands).len(), 1);
//! ```

use std::fmt;

use serde_json::{Map, Value};

use crate::error::ModelError;

/// Logical fields recognised in job and graph descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Job identifier referenced by dependency lists.
    Id,
    /// Job or graph name.
    Name,
    /// Working directory.
    Directory,
    /// Destination queue.
    Queue,
    /// Resource request mapping.
    Resources,
    /// Variable scope mapping.
    Variables,
    /// Command lines.
    Commands,
    /// Ids of prerequisite jobs.
    Dependencies,
    /// Job entries of a graph.
    Jobs,
    /// Whether the shell environment participates in substitution.
    Shell,
}

/// Accepted spellings per field, in lookup order.
const ALIASES: &[(Field, &[&str])] = &[
    (Field::Id, &["ID"]),
    (Field::Name, &["NAME"]),
    (Field::Directory, &["DIR", "DIRECTORY", "FLODER", "PATH"]),
    (Field::Queue, &["QUEUE", "Q"]),
    (Field::Resources, &["RES", "RESOURCES", "RESOURCE"]),
    (Field::Variables, &["VAR", "VARS", "VARIABLE"]),
    (Field::Commands, &["CMD", "CMDS", "COMMAND", "COMMANDS"]),
    (
        Field::Dependencies,
        &["DEPEND", "DEPENDENT", "DEPENDENCE", "DEPENDENCES"],
    ),
    (Field::Jobs, &["JOB", "JOBS", "NODES"]),
    (Field::Shell, &["SHELL"]),
];

impl Field {
    /// Spellings accepted for this field, already upper-cased.
    #[must_use]
    pub fn aliases(self) -> &'static [&'static str] {
        ALIASES
            .iter()
            .find(|(field, _)| *field == self)
            .map_or(&[][..], |(_, aliases)| *aliases)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.aliases().first().copied().unwrap_or("?"))
    }
}

/// A description object whose keys have been upper-cased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTree {
    entries: Map<String, Value>,
}

impl FieldTree {
    /// Normalise the keys of `map`.
    ///
    /// When two keys collide after upper-casing, the later one wins.
    #[must_use]
    pub fn normalize(map: &Map<String, Value>) -> Self {
        let entries = map
            .iter()
            .map(|(key, value)| (key.to_uppercase(), value.clone()))
            .collect();
        Self { entries }
    }

    /// Normalise `value`, which must be a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotAnObject`] when `value` is not an object.
    /// `context` names what the object describes in that error.
    pub fn from_value(value: &Value, context: &str) -> Result<Self, ModelError> {
        value
            .as_object()
            .map(Self::normalize)
            .ok_or_else(|| ModelError::NotAnObject {
                context: context.to_owned(),
            })
    }

    /// Return the value stored under the first alias of `field` present.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&Value> {
        field
            .aliases()
            .iter()
            .find_map(|alias| self.entries.get(*alias))
    }

    /// Return the value for `field`, failing when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingField`] when no alias is present.
    pub fn require(&self, field: Field) -> Result<&Value, ModelError> {
        self.get(field).ok_or(ModelError::MissingField { field })
    }

    /// Return `field` as a textual scalar, if present.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] when the value is an array or an
    /// object.
    pub fn text(&self, field: Field) -> Result<Option<String>, ModelError> {
        self.get(field)
            .map(|value| {
                scalar_text(value).ok_or(ModelError::InvalidValue {
                    field,
                    expected: "a string or number",
                })
            })
            .transpose()
    }

    /// Return `field` as a list, wrapping a scalar into a single element.
    ///
    /// A missing field or an explicit `null` yields an empty list.
    #[must_use]
    pub fn list(&self, field: Field) -> Vec<&Value> {
        match self.get(field) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().collect(),
            Some(other) => vec![other],
        }
    }

    /// Return `field` as an object, if present.
    ///
    /// # Errors
    ///
    /// Returns `not_mapping` when the value is present but not an object.
    /// An explicit `null` counts as absent.
    pub fn mapping(
        &self,
        field: Field,
        not_mapping: ModelError,
    ) -> Result<Option<&Map<String, Value>>, ModelError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(not_mapping),
        }
    }
}

/// Render a scalar JSON value as text.
///
/// Strings are returned verbatim, numbers in JSON notation, booleans as
/// `true`/`false` and `null` as the empty string. Arrays and objects yield
/// `None`.
#[must_use]
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Render any JSON value as text, falling back to compact JSON for
/// arrays and objects.
#[must_use]
pub fn value_text(value: &Value) -> String {
    scalar_text(value).unwrap_or_else(|| value.to_string())
}
