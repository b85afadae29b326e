use std::collections::HashSet;

use thiserror::Error;

use crate::label::{EstablishmentId, JobLabel, LabelId};
use crate::record::MergeRecord;
use crate::suggestion::Suggestion;
use crate::validate::{validate, ConflictError};

/// Locally generated group token. Stable for the session, never sent to the server.
pub type GroupId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("unknown group {0}")]
    UnknownGroup(GroupId),
    #[error("label {label} is already a member of group {group}")]
    AlreadyMember { group: GroupId, label: LabelId },
}

/// An ordered set of labels treated as one real position.
///
/// The first member's text is the canonical display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    id: GroupId,
    members: Vec<JobLabel>,
}

impl MergeGroup {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn members(&self) -> &[JobLabel] {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<LabelId> {
        self.members.iter().map(|label| label.id).collect()
    }

    pub fn contains(&self, id: LabelId) -> bool {
        self.members.iter().any(|label| label.id == id)
    }

    pub fn canonical_text(&self) -> Option<&str> {
        self.members.first().map(|label| label.text.as_str())
    }

    /// A group only merges anything once it has two distinct members.
    pub fn is_effective(&self) -> bool {
        self.members.len() >= 2
    }
}

/// The in-progress grouping for one establishment session.
///
/// Groups with fewer than two members are allowed while editing; they are
/// filtered out of [`MergeSet::to_record`] and therefore never submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSet {
    establishment: EstablishmentId,
    groups: Vec<MergeGroup>,
    next_group_id: GroupId,
}

impl MergeSet {
    pub fn new(establishment: EstablishmentId) -> Self {
        Self {
            establishment,
            groups: Vec::new(),
            next_group_id: 1,
        }
    }

    pub fn establishment(&self) -> &EstablishmentId {
        &self.establishment
    }

    pub fn groups(&self) -> &[MergeGroup] {
        &self.groups
    }

    pub fn group(&self, group_id: GroupId) -> Option<&MergeGroup> {
        self.groups.iter().find(|group| group.id == group_id)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn create_group(&mut self) -> GroupId {
        self.push_group(Vec::new())
    }

    /// Adds a group holding `members`, dropping repeated ids.
    pub fn create_group_with(&mut self, members: impl IntoIterator<Item = JobLabel>) -> GroupId {
        self.push_group(dedupe_members(members))
    }

    pub fn delete_group(&mut self, group_id: GroupId) -> bool {
        let before = self.groups.len();
        self.groups.retain(|group| group.id != group_id);
        self.groups.len() != before
    }

    /// Appends a member. Membership in another group is not refused here;
    /// the conflict validator reports it at save time.
    pub fn add_member(&mut self, group_id: GroupId, label: JobLabel) -> Result<(), EditError> {
        let group = self.group_mut(group_id)?;
        if group.contains(label.id) {
            return Err(EditError::AlreadyMember {
                group: group_id,
                label: label.id,
            });
        }
        group.members.push(label);
        Ok(())
    }

    pub fn remove_member(&mut self, group_id: GroupId, label_id: LabelId) -> Result<bool, EditError> {
        let group = self.group_mut(group_id)?;
        let before = group.members.len();
        group.members.retain(|label| label.id != label_id);
        Ok(group.members.len() != before)
    }

    /// Replaces the whole selection of a group, keeping the given order.
    pub fn set_members(
        &mut self,
        group_id: GroupId,
        members: impl IntoIterator<Item = JobLabel>,
    ) -> Result<(), EditError> {
        let members = dedupe_members(members);
        self.group_mut(group_id)?.members = members;
        Ok(())
    }

    /// Group currently holding `label_id`, other than `except`.
    pub fn group_for_label(&self, label_id: LabelId, except: Option<GroupId>) -> Option<GroupId> {
        self.groups
            .iter()
            .filter(|group| Some(group.id) != except)
            .find(|group| group.contains(label_id))
            .map(|group| group.id)
    }

    /// Ids claimed by any group other than `except`.
    pub fn claimed_ids(&self, except: Option<GroupId>) -> HashSet<LabelId> {
        self.groups
            .iter()
            .filter(|group| Some(group.id) != except)
            .flat_map(|group| group.members.iter().map(|label| label.id))
            .collect()
    }

    /// Ids of `candidates` already claimed by some group, in candidate order.
    pub fn conflicts_with(&self, candidates: impl IntoIterator<Item = LabelId>) -> Vec<LabelId> {
        let claimed = self.claimed_ids(None);
        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|id| claimed.contains(id) && seen.insert(*id))
            .collect()
    }

    /// Copies a suggestion in as a new group.
    ///
    /// Refused, leaving the set untouched, when any member already belongs to
    /// a group.
    pub fn accept_suggestion(&mut self, suggestion: &Suggestion) -> Result<GroupId, ConflictError> {
        let member_ids = suggestion.member_ids();
        let conflicts = self.conflicts_with(member_ids.iter().copied());
        if !conflicts.is_empty() {
            return Err(ConflictError::new(conflicts));
        }

        let group_id = self.push_group(dedupe_members(suggestion.members().iter().cloned()));
        if let Err(err) = validate(self) {
            let introduced: Vec<LabelId> = err
                .ids()
                .iter()
                .copied()
                .filter(|id| member_ids.contains(id))
                .collect();
            if !introduced.is_empty() {
                self.groups.pop();
                return Err(ConflictError::new(introduced));
            }
        }
        Ok(group_id)
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Minimal projection for persistence and submission: effective groups only.
    pub fn to_record(&self) -> MergeRecord {
        MergeRecord::new(
            self.groups
                .iter()
                .filter(|group| group.is_effective())
                .map(MergeGroup::member_ids)
                .collect(),
        )
    }

    /// Validates the whole set, then projects it. Nothing partial is returned.
    pub fn submittable(&self) -> Result<MergeRecord, ConflictError> {
        validate(self)?;
        Ok(self.to_record())
    }

    fn push_group(&mut self, members: Vec<JobLabel>) -> GroupId {
        let id = self.next_group_id;
        self.next_group_id += 1;
        self.groups.push(MergeGroup { id, members });
        id
    }

    fn group_mut(&mut self, group_id: GroupId) -> Result<&mut MergeGroup, EditError> {
        self.groups
            .iter_mut()
            .find(|group| group.id == group_id)
            .ok_or(EditError::UnknownGroup(group_id))
    }
}

fn dedupe_members(members: impl IntoIterator<Item = JobLabel>) -> Vec<JobLabel> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|label| seen.insert(label.id))
        .collect()
}
