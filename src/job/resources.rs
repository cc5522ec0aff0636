//! Resource requests and their `#PBS -l` rendering.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::fields::value_text;

/// Resource key for the node count.
pub const NODES_KEY: &str = "nodes";
/// Resource key for MPI processes per node.
pub const PPN_KEY: &str = "ppn";

/// Ordered mapping from resource name to requested value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Resources(IndexMap<String, String>);

impl Default for Resources {
    /// One node with one process per node.
    fn default() -> Self {
        Self::from_iter([(NODES_KEY, "1"), (PPN_KEY, "1")])
    }
}

impl Resources {
    /// Build a request from a parsed `RES` block, coercing values to text.
    #[must_use]
    pub fn from_mapping(map: &Map<String, Value>) -> Self {
        map.iter()
            .map(|(key, value)| (key.clone(), value_text(value)))
            .collect()
    }

    /// Look up an entry by exact key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Render the `-l` arguments for this request.
    ///
    /// When both `nodes` and `ppn` (matched case-insensitively) are present
    /// they are combined into a single `nodes=N:ppn=P` entry placed first.
    /// Every other entry, including an unpaired `nodes`, follows in mapping
    /// order as `key=value`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PpnWithoutNodes`] when `ppn` is present without
    /// `nodes`. `job` names the owning job in that error.
    pub fn directives(&self, job: &str) -> Result<Vec<String>, ModelError> {
        let nodes = self.find(NODES_KEY);
        let ppn = self.find(PPN_KEY);
        if ppn.is_some() && nodes.is_none() {
            return Err(ModelError::PpnWithoutNodes {
                job: job.to_owned(),
            });
        }
        let paired = nodes
            .zip(ppn)
            .map(|(nodes, ppn)| format!("{NODES_KEY}={nodes}:{PPN_KEY}={ppn}"));
        let nodes_paired = paired.is_some();
        let rest = self.0.iter().filter_map(|(key, value)| {
            if key.eq_ignore_ascii_case(NODES_KEY) {
                (!nodes_paired).then(|| format!("{NODES_KEY}={value}"))
            } else if key.eq_ignore_ascii_case(PPN_KEY) {
                None
            } else {
                Some(format!("{key}={value}"))
            }
        });
        Ok(paired.into_iter().chain(rest).collect())
    }

    fn find(&self, wanted: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
            .map(|(_, value)| value.as_str())
    }
}

impl<K, V> FromIterator<(K, V)> for Resources
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
