use std::collections::HashSet;

use crate::label::{EstablishmentId, JobLabel, LabelId};
use crate::merge_set::GroupId;
use crate::options::{group_options, with_merge_marks, OptionMode};
use crate::state::{Feedback, IndicatorKind, IndicatorState, SessionState, SubmissionStatus};
use crate::validate::validate;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    pub establishment: Option<EstablishmentId>,
    pub ready: bool,
    pub groups: Vec<GroupView>,
    pub editing: Option<GroupId>,
    /// Labels selectable for the edited group, or for a new group when none is edited.
    pub options: Vec<JobLabel>,
    pub hide_merged: bool,
    pub suggestions: Vec<SuggestionView>,
    /// Server-recomputed catalog with the saved grouping applied.
    pub catalog: Vec<JobLabel>,
    pub submission: SubmissionStatus,
    pub indicators: Vec<(IndicatorKind, IndicatorState)>,
    pub feedback: Option<Feedback>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub group_id: GroupId,
    pub canonical: Option<String>,
    pub members: Vec<JobLabel>,
    /// Fewer than two members: kept on screen, never submitted.
    pub effective: bool,
    /// Members also claimed by another group.
    pub conflicting: Vec<LabelId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionView {
    pub index: usize,
    pub members: Vec<JobLabel>,
    /// Members already claimed by a group; accepting is refused while non-empty.
    pub conflicts: Vec<LabelId>,
    /// An existing group holds exactly these labels.
    pub already_applied: bool,
}

impl SuggestionView {
    pub fn usable(&self) -> bool {
        self.conflicts.is_empty()
    }
}

impl SessionState {
    pub fn view(&self) -> SessionView {
        let merges = self.merges();
        let conflicting: HashSet<LabelId> = validate(merges)
            .err()
            .map(|err| err.ids().iter().copied().collect())
            .unwrap_or_default();

        let groups = merges
            .groups()
            .iter()
            .map(|group| GroupView {
                group_id: group.id(),
                canonical: group.canonical_text().map(ToOwned::to_owned),
                members: group.members().to_vec(),
                effective: group.is_effective(),
                conflicting: group
                    .member_ids()
                    .into_iter()
                    .filter(|id| conflicting.contains(id))
                    .collect(),
            })
            .collect();

        let options = self
            .raw_catalog()
            .map(|raw| {
                let catalog = with_merge_marks(raw, self.merged_catalog());
                group_options(&catalog, merges, self.editing(), self.option_mode())
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let group_sets: Vec<HashSet<LabelId>> = merges
            .groups()
            .iter()
            .map(|group| group.member_ids().into_iter().collect())
            .collect();
        let suggestions = self
            .suggestions()
            .iter()
            .enumerate()
            .map(|(index, suggestion)| {
                let ids: HashSet<LabelId> = suggestion.member_ids().into_iter().collect();
                SuggestionView {
                    index,
                    members: suggestion.members().to_vec(),
                    conflicts: merges.conflicts_with(suggestion.member_ids()),
                    already_applied: group_sets.iter().any(|set| *set == ids),
                }
            })
            .collect();

        SessionView {
            establishment: Some(self.establishment().clone()),
            ready: self.is_ready(),
            groups,
            editing: self.editing(),
            options,
            hide_merged: self.option_mode() == OptionMode::HideMerged,
            suggestions,
            catalog: self
                .merged_catalog()
                .map(|catalog| catalog.labels().to_vec())
                .unwrap_or_default(),
            submission: self.submission(),
            indicators: self
                .indicators()
                .iter()
                .map(|(kind, state)| (*kind, state.clone()))
                .collect(),
            feedback: self.feedback().cloned(),
            dirty: self.is_dirty(),
        }
    }
}
