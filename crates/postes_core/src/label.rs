use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned job label identifier, unique per establishment.
pub type LabelId = u64;

/// National business identifier of the establishment under inspection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EstablishmentId(String);

impl EstablishmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EstablishmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One catalog entry. Identity is by `id`; the text is display only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobLabel {
    pub id: LabelId,
    pub text: String,
    #[serde(default)]
    pub is_merged_result: bool,
}

impl JobLabel {
    pub fn new(id: LabelId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            is_merged_result: false,
        }
    }

    pub fn merged(id: LabelId, text: impl Into<String>) -> Self {
        Self {
            is_merged_result: true,
            ..Self::new(id, text)
        }
    }
}

/// Ordered list of job labels for one establishment, indexed by id.
///
/// Duplicate ids in the input keep their first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobCatalog {
    labels: Vec<JobLabel>,
    index: HashMap<LabelId, usize>,
}

impl JobCatalog {
    pub fn new(labels: impl IntoIterator<Item = JobLabel>) -> Self {
        let mut catalog = Self::default();
        for label in labels {
            if catalog.index.contains_key(&label.id) {
                continue;
            }
            catalog.index.insert(label.id, catalog.labels.len());
            catalog.labels.push(label);
        }
        catalog
    }

    pub fn get(&self, id: LabelId) -> Option<&JobLabel> {
        self.index.get(&id).map(|&pos| &self.labels[pos])
    }

    pub fn contains(&self, id: LabelId) -> bool {
        self.index.contains_key(&id)
    }

    /// Display text for `id`, or `#id` when the catalog no longer knows it.
    pub fn display_text(&self, id: LabelId) -> String {
        self.get(id)
            .map(|label| label.text.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    pub fn labels(&self) -> &[JobLabel] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobLabel> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn into_labels(self) -> Vec<JobLabel> {
        self.labels
    }
}

impl FromIterator<JobLabel> for JobCatalog {
    fn from_iter<T: IntoIterator<Item = JobLabel>>(iter: T) -> Self {
        Self::new(iter)
    }
}
