use std::collections::HashSet;

use postes_logging::postes_debug;
use serde::{Deserialize, Serialize};

use crate::label::{JobCatalog, JobLabel, LabelId};

/// One member of a backend-proposed candidate, as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionEntry {
    pub id: LabelId,
    pub text: String,
}

impl SuggestionEntry {
    pub fn new(id: LabelId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// A read-only candidate grouping resolved against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    members: Vec<JobLabel>,
}

impl Suggestion {
    pub fn members(&self) -> &[JobLabel] {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<LabelId> {
        self.members.iter().map(|label| label.id).collect()
    }
}

/// Resolves raw candidates against `catalog`.
///
/// Ids missing from the catalog are dropped from their candidate, repeated ids
/// keep their first position, and a candidate left with fewer than two members
/// is dropped. Member text comes from the catalog, not from the candidate.
pub fn import_suggestions(
    raw: impl IntoIterator<Item = Vec<SuggestionEntry>>,
    catalog: &JobCatalog,
) -> Vec<Suggestion> {
    raw.into_iter()
        .filter_map(|candidate| resolve_candidate(candidate, catalog))
        .collect()
}

fn resolve_candidate(candidate: Vec<SuggestionEntry>, catalog: &JobCatalog) -> Option<Suggestion> {
    let mut seen = HashSet::new();
    let mut members = Vec::with_capacity(candidate.len());
    for entry in candidate {
        match catalog.get(entry.id) {
            Some(label) => {
                if seen.insert(label.id) {
                    members.push(label.clone());
                }
            }
            None => {
                postes_debug!(
                    "Dropping stale suggestion reference id={} text={:?}",
                    entry.id,
                    entry.text
                );
            }
        }
    }

    if members.len() < 2 {
        return None;
    }
    Some(Suggestion { members })
}
