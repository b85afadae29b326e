use serde_json::Value;

use crate::effect::Generation;
use crate::label::{JobCatalog, LabelId};
use crate::merge_set::{GroupId, MergeSet};
use crate::record::MergeRecord;
use crate::state::{IndicatorKind, SubmitFailure};
use crate::suggestion::SuggestionEntry;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The user opened the establishment's job page.
    Entered,
    /// Raw catalog response.
    CatalogLoaded(Result<JobCatalog, String>),
    /// Stored record for the establishment, empty when none exists.
    StoredMergesLoaded(MergeRecord),
    SuggestionsLoaded(Result<Vec<Vec<SuggestionEntry>>, String>),
    MergedCatalogLoaded {
        generation: Generation,
        result: Result<JobCatalog, String>,
    },
    CreateGroupClicked,
    DeleteGroupClicked(GroupId),
    /// User focused a group's selector; `None` closes it.
    GroupSelected(Option<GroupId>),
    MemberAdded { group: GroupId, label: LabelId },
    MemberRemoved { group: GroupId, label: LabelId },
    /// Multi-select replaced the whole selection of a group.
    MembersSet { group: GroupId, labels: Vec<LabelId> },
    /// User accepted the suggestion at this index of the view list.
    SuggestionAccepted(usize),
    HideMergedToggled(bool),
    /// A typed input step produced a complete grouping replacing the current one.
    MergesReplaced(MergeSet),
    SaveClicked,
    ResetClicked,
    SubmitCompleted {
        generation: Generation,
        result: Result<JobCatalog, SubmitFailure>,
    },
    IndicatorLoaded {
        batch: Generation,
        kind: IndicatorKind,
        result: Result<Value, String>,
    },
    /// The user navigated away; nothing arriving afterwards is applied.
    Left,
    NoOp,
}
