use crate::label::{JobCatalog, JobLabel};
use crate::merge_set::{GroupId, MergeSet};

/// How much of the catalog the selector offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionMode {
    /// Everything not claimed by another group.
    #[default]
    All,
    /// Additionally hide entries the server already reports as merge results,
    /// unless they are part of the current selection. Raw catalogs carry no
    /// such marks; see [`with_merge_marks`].
    HideMerged,
}

/// The raw catalog with `is_merged_result` taken from the merged catalog.
///
/// Options are always raw labels, but only the merged catalog knows which ids
/// the server collapsed into merge results.
pub fn with_merge_marks(raw: &JobCatalog, merged: Option<&JobCatalog>) -> JobCatalog {
    let Some(merged) = merged else {
        return raw.clone();
    };
    raw.iter()
        .map(|label| JobLabel {
            is_merged_result: label.is_merged_result
                || merged.get(label.id).is_some_and(|entry| entry.is_merged_result),
            ..label.clone()
        })
        .collect()
}

/// Catalog labels offered while editing `editing`, in catalog order.
///
/// Labels claimed by other groups are excluded; the edited group's own members
/// stay in the list so they can be kept or removed. Purely presentational:
/// the conflict validator never consults it.
pub fn group_options<'a>(
    catalog: &'a JobCatalog,
    merges: &MergeSet,
    editing: Option<GroupId>,
    mode: OptionMode,
) -> Vec<&'a JobLabel> {
    let claimed_elsewhere = merges.claimed_ids(editing);
    let selected = editing
        .and_then(|group_id| merges.group(group_id))
        .map(|group| group.member_ids())
        .unwrap_or_default();

    catalog
        .iter()
        .filter(|label| !claimed_elsewhere.contains(&label.id))
        .filter(|label| match mode {
            OptionMode::All => true,
            OptionMode::HideMerged => !label.is_merged_result || selected.contains(&label.id),
        })
        .collect()
}
