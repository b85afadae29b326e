use thiserror::Error;

use crate::label::{EstablishmentId, JobCatalog, JobLabel, LabelId};
use crate::merge_set::MergeSet;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("group {group}: {token:?} is not a label id")]
    InvalidId { group: usize, token: String },
    #[error("group {group}: unknown label id {id}")]
    UnknownLabel { group: usize, id: LabelId },
    #[error("group {group}: label id {id} is listed twice")]
    RepeatedId { group: usize, id: LabelId },
    #[error("group {group}: a merge needs at least two labels")]
    TooFewMembers { group: usize },
}

/// Parses comma-joined id lists, one string per group, into a merge set.
///
/// Groups are numbered from 1 in errors. Unlike hydration, unknown ids are
/// errors here: this is user input, not stored state.
pub fn parse_groups<S: AsRef<str>>(
    establishment: EstablishmentId,
    inputs: &[S],
    catalog: &JobCatalog,
) -> Result<MergeSet, ParseError> {
    let mut merges = MergeSet::new(establishment);
    for (index, input) in inputs.iter().enumerate() {
        let group = index + 1;
        let mut members: Vec<JobLabel> = Vec::new();
        for token in input.as_ref().split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let id: LabelId = token.parse().map_err(|_| ParseError::InvalidId {
                group,
                token: token.to_string(),
            })?;
            let label = catalog
                .get(id)
                .ok_or(ParseError::UnknownLabel { group, id })?;
            if members.iter().any(|member| member.id == id) {
                return Err(ParseError::RepeatedId { group, id });
            }
            members.push(label.clone());
        }
        if members.len() < 2 {
            return Err(ParseError::TooFewMembers { group });
        }
        merges.create_group_with(members);
    }
    Ok(merges)
}
