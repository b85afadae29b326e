use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::label::{JobCatalog, LabelId};
use crate::merge_set::MergeSet;
use crate::record::MergeRecord;

/// Labels claimed by more than one group, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("labels claimed by more than one group: {ids:?}")]
pub struct ConflictError {
    ids: Vec<LabelId>,
}

impl ConflictError {
    pub fn new(ids: Vec<LabelId>) -> Self {
        Self { ids }
    }

    pub fn ids(&self) -> &[LabelId] {
        &self.ids
    }

    pub fn into_ids(self) -> Vec<LabelId> {
        self.ids
    }

    /// Display texts of the conflicting labels, `#id` for unknown ones.
    pub fn labels(&self, catalog: &JobCatalog) -> Vec<String> {
        self.ids.iter().map(|&id| catalog.display_text(id)).collect()
    }
}

/// Checks that no label id appears in more than one group.
///
/// Runs in time linear in the total number of memberships. Repeats of an id
/// inside a single group are not conflicts; `MergeSet` keeps members unique.
pub fn validate(merges: &MergeSet) -> Result<(), ConflictError> {
    duplicate_ids(
        merges
            .groups()
            .iter()
            .map(|group| group.members().iter().map(|label| label.id)),
    )
}

/// Same check over a serialized grouping, for callers that only hold ids.
pub fn validate_record(record: &MergeRecord) -> Result<(), ConflictError> {
    duplicate_ids(record.groups().iter().map(|group| group.iter().copied()))
}

fn duplicate_ids<G, I>(groups: G) -> Result<(), ConflictError>
where
    G: IntoIterator<Item = I>,
    I: IntoIterator<Item = LabelId>,
{
    let mut owners: HashMap<LabelId, usize> = HashMap::new();
    let mut reported: HashSet<LabelId> = HashSet::new();
    let mut ids = Vec::new();

    for (index, group) in groups.into_iter().enumerate() {
        for id in group {
            match owners.get(&id) {
                None => {
                    owners.insert(id, index);
                }
                Some(&owner) if owner != index && reported.insert(id) => {
                    ids.push(id);
                }
                Some(_) => {}
            }
        }
    }

    if ids.is_empty() {
        Ok(())
    } else {
        Err(ConflictError::new(ids))
    }
}
