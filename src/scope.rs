//! Variable scopes consulted during substitution.
//!
//! A [`Scope`] maps variable names to text. Jobs combine up to three tiers
//! (their own variables, the graph's variables and the shell environment)
//! with [`Scope::layered`], where earlier tiers take precedence and later
//! tiers only fill names that are still unset.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::fields::value_text;

/// Ordered mapping from variable name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Scope(IndexMap<String, String>);

impl Scope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scope from a parsed `VAR` block, coercing values to text.
    #[must_use]
    pub fn from_mapping(map: &Map<String, Value>) -> Self {
        map.iter()
            .map(|(name, value)| (name.clone(), value_text(value)))
            .collect()
    }

    /// Capture the current process environment.
    ///
    /// Only the command line layer should call this; the model receives the
    /// result as ordinary data. Variables that are not valid UTF-8 are skipped.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    /// Combine `tiers`, highest precedence first.
    ///
    /// Each tier only contributes names not already set by an earlier one.
    #[must_use]
    pub fn layered(tiers: &[&Self]) -> Self {
        let mut merged = Self::new();
        for tier in tiers {
            merged.fill_from(tier);
        }
        merged
    }

    /// Copy entries from `lower` whose names are not yet present.
    pub fn fill_from(&mut self, lower: &Self) {
        for (name, value) in &lower.0 {
            self.0
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for Scope
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
