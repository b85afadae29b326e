use std::collections::HashSet;

use postes_logging::postes_debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::label::{EstablishmentId, JobCatalog, LabelId};
use crate::merge_set::MergeSet;

/// Minimal serializable projection of a merge set: one id list per group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergeRecord {
    groups: Vec<Vec<LabelId>>,
}

impl MergeRecord {
    pub fn new(groups: Vec<Vec<LabelId>>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[Vec<LabelId>] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Lenient decoding of stored data.
    ///
    /// A non-array top level yields an empty record; non-array groups and
    /// entries that are not non-negative integers are dropped.
    pub fn from_json_value(value: &Value) -> Self {
        let Some(groups) = value.as_array() else {
            return Self::default();
        };
        let groups = groups
            .iter()
            .filter_map(Value::as_array)
            .map(|group| group.iter().filter_map(Value::as_u64).collect())
            .collect();
        Self { groups }
    }

    /// Lenient decoding from text; unparseable text yields an empty record.
    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_json_value(&value),
            Err(err) => {
                postes_debug!("Ignoring unparseable merge record: {}", err);
                Self::default()
            }
        }
    }

    pub fn to_json_string(&self) -> String {
        // Serializing a list of integer lists cannot fail.
        serde_json::to_string(&self.groups).unwrap_or_else(|_| "[]".to_string())
    }

    /// Rebuilds a merge set against `catalog`.
    ///
    /// Unknown ids are dropped silently, repeats inside a group keep their
    /// first position, and groups left with fewer than two members are dropped.
    pub fn hydrate(&self, establishment: EstablishmentId, catalog: &JobCatalog) -> MergeSet {
        let mut merges = MergeSet::new(establishment);
        for ids in &self.groups {
            let mut seen = HashSet::new();
            let members: Vec<_> = ids
                .iter()
                .filter(|id| seen.insert(**id))
                .filter_map(|&id| {
                    let label = catalog.get(id);
                    if label.is_none() {
                        postes_debug!("Pruning unknown label id={} during hydration", id);
                    }
                    label.cloned()
                })
                .collect();
            if members.len() >= 2 {
                merges.create_group_with(members);
            } else {
                postes_debug!("Dropping stored group {:?}: fewer than two members remain", ids);
            }
        }
        merges
    }
}

impl From<Vec<Vec<LabelId>>> for MergeRecord {
    fn from(groups: Vec<Vec<LabelId>>) -> Self {
        Self::new(groups)
    }
}
