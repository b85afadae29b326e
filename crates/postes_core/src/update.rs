use postes_logging::{postes_debug, postes_warn};

use crate::effect::{Effect, Generation};
use crate::label::{EstablishmentId, JobCatalog, JobLabel, LabelId};
use crate::merge_set::MergeSet;
use crate::msg::Msg;
use crate::options::OptionMode;
use crate::record::MergeRecord;
use crate::state::{
    Feedback, IndicatorState, Phase, SessionState, SubmissionStatus, SubmitFailure,
};
use crate::suggestion::import_suggestions;

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: SessionState, msg: Msg) -> (SessionState, Vec<Effect>) {
    if state.is_closed() {
        postes_debug!("Session {} closed; dropping {:?}", state.establishment(), msg);
        return (state, Vec::new());
    }
    if is_edit(&msg) && !state.is_ready() {
        postes_debug!("Session {} not ready; ignoring edit", state.establishment());
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Entered => {
            if state.phase() != Phase::Idle {
                return (state, Vec::new());
            }
            state.set_phase(Phase::Loading);
            let establishment = state.establishment().clone();
            vec![
                Effect::FetchCatalog {
                    establishment: establishment.clone(),
                },
                Effect::LoadStoredMerges {
                    establishment: establishment.clone(),
                },
                Effect::FetchSuggestions { establishment },
            ]
        }
        Msg::CatalogLoaded(Ok(catalog)) => {
            if state.raw_catalog().is_some() {
                return (state, Vec::new());
            }
            state.set_raw_catalog(catalog);
            import_pending_suggestions(&mut state);
            try_hydrate(&mut state)
        }
        Msg::CatalogLoaded(Err(message)) => {
            postes_warn!("Catalog fetch failed for {}: {}", state.establishment(), message);
            state.set_feedback(Some(Feedback::LoadFailed(message)));
            Vec::new()
        }
        Msg::StoredMergesLoaded(record) => {
            if state.stored().is_some() {
                return (state, Vec::new());
            }
            state.set_stored(record);
            try_hydrate(&mut state)
        }
        Msg::SuggestionsLoaded(Ok(raw)) => {
            state.set_pending_suggestions(raw);
            import_pending_suggestions(&mut state);
            Vec::new()
        }
        Msg::SuggestionsLoaded(Err(message)) => {
            // Suggestions are optional; the editor works without them.
            postes_warn!("Suggestion fetch failed for {}: {}", state.establishment(), message);
            Vec::new()
        }
        Msg::MergedCatalogLoaded { generation, result } => {
            if state.merged_pending() != Some(generation) {
                postes_debug!("Dropping stale merged catalog generation={}", generation);
                return (state, Vec::new());
            }
            state.set_merged_pending(None);
            match result {
                Ok(catalog) => state.set_merged_catalog(catalog),
                Err(message) => {
                    postes_warn!("Merged catalog fetch failed: {}", message);
                    state.set_feedback(Some(Feedback::LoadFailed(message)));
                }
            }
            Vec::new()
        }
        Msg::CreateGroupClicked => {
            begin_edit(&mut state);
            let group = state.merges_mut().create_group();
            state.set_editing(Some(group));
            Vec::new()
        }
        Msg::DeleteGroupClicked(group) => {
            begin_edit(&mut state);
            if !state.merges_mut().delete_group(group) {
                reject_edit(&mut state, format!("unknown group {group}"));
            } else if state.editing() == Some(group) {
                state.set_editing(None);
            }
            Vec::new()
        }
        Msg::GroupSelected(group) => {
            match group {
                Some(id) if state.merges().group(id).is_none() => {
                    reject_edit(&mut state, format!("unknown group {id}"));
                }
                _ => state.set_editing(group),
            }
            Vec::new()
        }
        Msg::MemberAdded { group, label } => {
            begin_edit(&mut state);
            match resolve_labels(&state, &[label]) {
                Ok(mut labels) => {
                    if let Some(label) = labels.pop() {
                        if let Err(err) = state.merges_mut().add_member(group, label) {
                            reject_edit(&mut state, err.to_string());
                        }
                    }
                }
                Err(message) => reject_edit(&mut state, message),
            }
            Vec::new()
        }
        Msg::MemberRemoved { group, label } => {
            begin_edit(&mut state);
            if let Err(err) = state.merges_mut().remove_member(group, label) {
                reject_edit(&mut state, err.to_string());
            }
            Vec::new()
        }
        Msg::MembersSet { group, labels } => {
            begin_edit(&mut state);
            match resolve_labels(&state, &labels) {
                Ok(labels) => {
                    if let Err(err) = state.merges_mut().set_members(group, labels) {
                        reject_edit(&mut state, err.to_string());
                    }
                }
                Err(message) => reject_edit(&mut state, message),
            }
            Vec::new()
        }
        Msg::SuggestionAccepted(index) => {
            begin_edit(&mut state);
            let Some(suggestion) = state.suggestions().get(index).cloned() else {
                reject_edit(&mut state, format!("no suggestion at position {index}"));
                return (state, Vec::new());
            };
            match state.merges_mut().accept_suggestion(&suggestion) {
                Ok(group) => state.set_editing(Some(group)),
                Err(conflict) => {
                    let labels = display_labels(&state, conflict.ids());
                    state.set_feedback(Some(Feedback::SuggestionRefused {
                        index,
                        ids: conflict.into_ids(),
                        labels,
                    }));
                }
            }
            Vec::new()
        }
        Msg::HideMergedToggled(hide) => {
            state.set_option_mode(if hide {
                OptionMode::HideMerged
            } else {
                OptionMode::All
            });
            Vec::new()
        }
        Msg::MergesReplaced(merges) => {
            begin_edit(&mut state);
            if merges.establishment() != state.establishment() {
                reject_edit(
                    &mut state,
                    format!("grouping belongs to establishment {}", merges.establishment()),
                );
            } else {
                state.replace_merges(merges);
            }
            Vec::new()
        }
        Msg::SaveClicked => save(&mut state),
        Msg::ResetClicked => reset(&mut state),
        Msg::SubmitCompleted { generation, result } => {
            if state.submission() != SubmissionStatus::InFlight || generation != state.generation() {
                postes_debug!("Dropping stale submission result generation={}", generation);
                return (state, Vec::new());
            }
            complete_submission(&mut state, generation, result)
        }
        Msg::IndicatorLoaded {
            batch,
            kind,
            result,
        } => {
            if state.indicator_batch() != Some(batch) {
                postes_debug!("Dropping {} result from stale batch {}", kind, batch);
                return (state, Vec::new());
            }
            let indicator = match result {
                Ok(value) => IndicatorState::Ready(value),
                Err(message) => {
                    postes_warn!("Indicator {} failed: {}", kind, message);
                    IndicatorState::Failed(message)
                }
            };
            state.set_indicator(kind, indicator);
            Vec::new()
        }
        Msg::Left => {
            state.cancel_indicator_batch();
            state.next_generation();
            state.set_merged_pending(None);
            state.set_submitted(None);
            state.set_phase(Phase::Closed);
            vec![Effect::CancelIndicators]
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn is_edit(msg: &Msg) -> bool {
    matches!(
        msg,
        Msg::CreateGroupClicked
            | Msg::DeleteGroupClicked(_)
            | Msg::GroupSelected(_)
            | Msg::MemberAdded { .. }
            | Msg::MemberRemoved { .. }
            | Msg::MembersSet { .. }
            | Msg::SuggestionAccepted(_)
            | Msg::MergesReplaced(_)
            | Msg::SaveClicked
            | Msg::ResetClicked
    )
}

/// Hydrates the merge set once both the raw catalog and the stored record are in.
fn try_hydrate(state: &mut SessionState) -> Vec<Effect> {
    if state.phase() != Phase::Loading {
        return Vec::new();
    }
    let (merges, raw) = match (state.raw_catalog(), state.stored()) {
        (Some(catalog), Some(record)) => (
            record.hydrate(state.establishment().clone(), catalog),
            catalog.clone(),
        ),
        _ => return Vec::new(),
    };

    let saved = merges.to_record();
    state.replace_merges(merges);
    state.set_saved(saved.clone());
    state.set_phase(Phase::Ready);

    let generation = state.next_generation();
    let establishment = state.establishment().clone();
    let mut effects = Vec::with_capacity(2);
    if saved.is_empty() {
        state.set_merged_catalog(raw);
    } else {
        state.set_merged_pending(Some(generation));
        effects.push(Effect::FetchMergedCatalog {
            establishment: establishment.clone(),
            record: saved.clone(),
            generation,
        });
    }
    effects.push(refresh_indicators(state, establishment, saved, generation));
    effects
}

fn import_pending_suggestions(state: &mut SessionState) {
    if state.raw_catalog().is_none() {
        return;
    }
    let Some(raw) = state.take_pending_suggestions() else {
        return;
    };
    let suggestions = state
        .raw_catalog()
        .map(|catalog| import_suggestions(raw, catalog))
        .unwrap_or_default();
    state.set_suggestions(suggestions);
}

fn save(state: &mut SessionState) -> Vec<Effect> {
    let record = match state.merges().submittable() {
        Ok(record) => record,
        Err(conflict) => {
            let labels = display_labels(state, conflict.ids());
            state.set_feedback(Some(Feedback::Conflict {
                ids: conflict.into_ids(),
                labels,
            }));
            return Vec::new();
        }
    };

    let mut effects = Vec::with_capacity(2);
    if state.cancel_indicator_batch() {
        effects.push(Effect::CancelIndicators);
    }
    let generation = state.next_generation();
    state.set_merged_pending(None);
    state.set_submitted(Some(record.clone()));
    state.set_submission(SubmissionStatus::InFlight);
    state.set_feedback(None);
    effects.push(Effect::SubmitMerges {
        establishment: state.establishment().clone(),
        record,
        generation,
    });
    effects
}

fn reset(state: &mut SessionState) -> Vec<Effect> {
    let establishment = state.establishment().clone();
    let mut effects = Vec::with_capacity(3);
    if state.cancel_indicator_batch() {
        effects.push(Effect::CancelIndicators);
    }

    state.replace_merges(MergeSet::new(establishment.clone()));
    state.set_saved(MergeRecord::default());
    state.set_submitted(None);
    state.set_merged_pending(None);
    if let Some(raw) = state.raw_catalog().cloned() {
        state.set_merged_catalog(raw);
    }
    state.set_submission(SubmissionStatus::Idle);
    state.set_feedback(None);

    let generation = state.next_generation();
    effects.push(Effect::ClearStoredMerges {
        establishment: establishment.clone(),
        generation,
    });
    effects.push(refresh_indicators(
        state,
        establishment,
        MergeRecord::default(),
        generation,
    ));
    effects
}

fn complete_submission(
    state: &mut SessionState,
    generation: Generation,
    result: Result<JobCatalog, SubmitFailure>,
) -> Vec<Effect> {
    let submitted = state.take_submitted().unwrap_or_default();
    let establishment = state.establishment().clone();

    match result {
        Ok(catalog) => {
            state.set_saved(submitted.clone());
            state.set_merged_catalog(catalog);
            state.set_submission(SubmissionStatus::Saved);
            state.set_feedback(Some(Feedback::Saved));
            vec![refresh_indicators(state, establishment, submitted, generation)]
        }
        Err(failure) => {
            state.set_submission(SubmissionStatus::Failed);
            let feedback = match failure {
                SubmitFailure::Conflict(ids) => {
                    let labels = display_labels(state, &ids);
                    Feedback::Conflict { ids, labels }
                }
                SubmitFailure::Transport(message) => {
                    postes_warn!("Submission failed for {}: {}", establishment, message);
                    Feedback::SubmitFailed(message)
                }
            };
            state.set_feedback(Some(feedback));

            restore_saved_view(state, establishment)
        }
    }
}

/// After a failed save, brings back whatever the submission displaced for the
/// last grouping the backend accepted: the merged catalog if its fetch was
/// dropped, and indicators if their batch was cancelled.
fn restore_saved_view(state: &mut SessionState, establishment: EstablishmentId) -> Vec<Effect> {
    let catalog_missing = state.merged_catalog().is_none();
    let indicators_interrupted = state.has_unsettled_indicators();
    if !catalog_missing && !indicators_interrupted {
        return Vec::new();
    }

    let generation = state.next_generation();
    let saved = state.saved_record().clone();
    let mut effects = Vec::with_capacity(2);
    if catalog_missing {
        if saved.is_empty() {
            if let Some(raw) = state.raw_catalog().cloned() {
                state.set_merged_catalog(raw);
            }
        } else {
            state.set_merged_pending(Some(generation));
            effects.push(Effect::FetchMergedCatalog {
                establishment: establishment.clone(),
                record: saved.clone(),
                generation,
            });
        }
    }
    if indicators_interrupted {
        effects.push(refresh_indicators(state, establishment, saved, generation));
    }
    effects
}

fn refresh_indicators(
    state: &mut SessionState,
    establishment: EstablishmentId,
    record: MergeRecord,
    batch: Generation,
) -> Effect {
    state.start_indicator_batch(batch);
    Effect::RefreshIndicators {
        establishment,
        record,
        batch,
    }
}

fn begin_edit(state: &mut SessionState) {
    if state.feedback().is_some() {
        state.set_feedback(None);
    }
    if state.submission() != SubmissionStatus::InFlight {
        state.set_submission(SubmissionStatus::Idle);
    }
}

fn reject_edit(state: &mut SessionState, message: String) {
    postes_debug!("Edit rejected: {}", message);
    state.set_feedback(Some(Feedback::EditRejected(message)));
}

fn resolve_labels(state: &SessionState, ids: &[LabelId]) -> Result<Vec<JobLabel>, String> {
    ids.iter()
        .map(|&id| {
            state
                .raw_catalog()
                .and_then(|catalog| catalog.get(id))
                .cloned()
                .ok_or_else(|| format!("unknown label {id}"))
        })
        .collect()
}

fn display_labels(state: &SessionState, ids: &[LabelId]) -> Vec<String> {
    match state.raw_catalog() {
        Some(catalog) => ids.iter().map(|&id| catalog.display_text(id)).collect(),
        None => ids.iter().map(|id| format!("#{id}")).collect(),
    }
}
