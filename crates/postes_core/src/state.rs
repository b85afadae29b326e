use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::effect::Generation;
use crate::label::{EstablishmentId, JobCatalog, LabelId};
use crate::merge_set::{GroupId, MergeSet};
use crate::options::OptionMode;
use crate::record::MergeRecord;
use crate::suggestion::{Suggestion, SuggestionEntry};

/// Aggregates recomputed whenever the grouping changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndicatorKind {
    JobProportions,
    PrecariousJobs,
    DelayInfractionsByJob,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 3] = [
        IndicatorKind::JobProportions,
        IndicatorKind::PrecariousJobs,
        IndicatorKind::DelayInfractionsByJob,
    ];

    /// Path segment used by the aggregation service.
    pub fn slug(self) -> &'static str {
        match self {
            IndicatorKind::JobProportions => "job-proportions",
            IndicatorKind::PrecariousJobs => "precarious-jobs",
            IndicatorKind::DelayInfractionsByJob => "delay-infractions-by-job",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum IndicatorState {
    #[default]
    Idle,
    Loading,
    Ready(Value),
    Failed(String),
    /// The batch was cancelled before this indicator settled.
    Cancelled,
}

impl IndicatorState {
    pub fn is_settled(&self) -> bool {
        matches!(self, IndicatorState::Ready(_) | IndicatorState::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    /// The backend found labels claimed by several groups.
    Conflict(Vec<LabelId>),
    /// Timeout, network error or unexpected status.
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    InFlight,
    Saved,
    Failed,
}

/// Inline feedback shown next to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Labels claimed by more than one group, found locally or by the backend.
    Conflict { ids: Vec<LabelId>, labels: Vec<String> },
    /// A suggestion collides with existing groups and was not applied.
    SuggestionRefused {
        index: usize,
        ids: Vec<LabelId>,
        labels: Vec<String>,
    },
    EditRejected(String),
    SubmitFailed(String),
    LoadFailed(String),
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Closed,
}

/// State of one establishment-detail session.
///
/// Owned by the session driver and dropped on navigation; nothing is shared
/// between sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    establishment: EstablishmentId,
    phase: Phase,
    raw_catalog: Option<JobCatalog>,
    merged_catalog: Option<JobCatalog>,
    merged_pending: Option<Generation>,
    stored: Option<MergeRecord>,
    pending_suggestions: Option<Vec<Vec<SuggestionEntry>>>,
    suggestions: Vec<Suggestion>,
    merges: MergeSet,
    saved: MergeRecord,
    submitted: Option<MergeRecord>,
    editing: Option<GroupId>,
    option_mode: OptionMode,
    generation: Generation,
    submission: SubmissionStatus,
    indicator_batch: Option<Generation>,
    indicators: BTreeMap<IndicatorKind, IndicatorState>,
    feedback: Option<Feedback>,
    dirty: bool,
}

impl SessionState {
    pub fn new(establishment: EstablishmentId) -> Self {
        Self {
            merges: MergeSet::new(establishment.clone()),
            establishment,
            phase: Phase::Idle,
            raw_catalog: None,
            merged_catalog: None,
            merged_pending: None,
            stored: None,
            pending_suggestions: None,
            suggestions: Vec::new(),
            saved: MergeRecord::default(),
            submitted: None,
            editing: None,
            option_mode: OptionMode::All,
            generation: 0,
            submission: SubmissionStatus::Idle,
            indicator_batch: None,
            indicators: IndicatorKind::ALL
                .into_iter()
                .map(|kind| (kind, IndicatorState::Idle))
                .collect(),
            feedback: None,
            dirty: false,
        }
    }

    pub fn establishment(&self) -> &EstablishmentId {
        &self.establishment
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn merges(&self) -> &MergeSet {
        &self.merges
    }

    pub fn raw_catalog(&self) -> Option<&JobCatalog> {
        self.raw_catalog.as_ref()
    }

    pub fn merged_catalog(&self) -> Option<&JobCatalog> {
        self.merged_catalog.as_ref()
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Last grouping known to be accepted by the backend (or hydrated from storage).
    pub fn saved_record(&self) -> &MergeRecord {
        &self.saved
    }

    pub fn editing(&self) -> Option<GroupId> {
        self.editing
    }

    pub fn option_mode(&self) -> OptionMode {
        self.option_mode
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn submission(&self) -> SubmissionStatus {
        self.submission
    }

    pub fn indicator_batch(&self) -> Option<Generation> {
        self.indicator_batch
    }

    pub fn indicator(&self, kind: IndicatorKind) -> &IndicatorState {
        self.indicators.get(&kind).unwrap_or(&IndicatorState::Idle)
    }

    pub fn indicators(&self) -> &BTreeMap<IndicatorKind, IndicatorState> {
        &self.indicators
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    /// True once every indicator of the current batch has settled and no
    /// submission or catalog fetch is outstanding.
    pub fn is_quiescent(&self) -> bool {
        match self.phase {
            Phase::Closed => true,
            Phase::Idle => true,
            Phase::Loading => self.feedback.is_some() && self.raw_catalog.is_none(),
            Phase::Ready => {
                self.submission != SubmissionStatus::InFlight
                    && self.merged_pending.is_none()
                    && self.indicators.values().all(|state| {
                        state.is_settled() || matches!(state, IndicatorState::Idle)
                    })
            }
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.mark_dirty();
    }

    pub(crate) fn set_feedback(&mut self, feedback: Option<Feedback>) {
        self.feedback = feedback;
        self.mark_dirty();
    }

    pub(crate) fn set_raw_catalog(&mut self, catalog: JobCatalog) {
        self.raw_catalog = Some(catalog);
        self.mark_dirty();
    }

    pub(crate) fn set_merged_catalog(&mut self, catalog: JobCatalog) {
        self.merged_catalog = Some(catalog);
        self.mark_dirty();
    }

    pub(crate) fn set_merged_pending(&mut self, generation: Option<Generation>) {
        self.merged_pending = generation;
    }

    pub(crate) fn merged_pending(&self) -> Option<Generation> {
        self.merged_pending
    }

    pub(crate) fn set_stored(&mut self, record: MergeRecord) {
        self.stored = Some(record);
    }

    pub(crate) fn stored(&self) -> Option<&MergeRecord> {
        self.stored.as_ref()
    }

    pub(crate) fn set_pending_suggestions(&mut self, raw: Vec<Vec<SuggestionEntry>>) {
        self.pending_suggestions = Some(raw);
    }

    pub(crate) fn take_pending_suggestions(&mut self) -> Option<Vec<Vec<SuggestionEntry>>> {
        self.pending_suggestions.take()
    }

    pub(crate) fn set_suggestions(&mut self, suggestions: Vec<Suggestion>) {
        self.suggestions = suggestions;
        self.mark_dirty();
    }

    pub(crate) fn merges_mut(&mut self) -> &mut MergeSet {
        self.mark_dirty();
        &mut self.merges
    }

    pub(crate) fn replace_merges(&mut self, merges: MergeSet) {
        self.merges = merges;
        self.editing = None;
        self.mark_dirty();
    }

    pub(crate) fn set_saved(&mut self, record: MergeRecord) {
        self.saved = record;
    }

    pub(crate) fn set_submitted(&mut self, record: Option<MergeRecord>) {
        self.submitted = record;
    }

    pub(crate) fn take_submitted(&mut self) -> Option<MergeRecord> {
        self.submitted.take()
    }

    pub(crate) fn set_editing(&mut self, editing: Option<GroupId>) {
        self.editing = editing;
        self.mark_dirty();
    }

    pub(crate) fn set_option_mode(&mut self, mode: OptionMode) {
        self.option_mode = mode;
        self.mark_dirty();
    }

    pub(crate) fn next_generation(&mut self) -> Generation {
        self.generation += 1;
        self.generation
    }

    pub(crate) fn set_submission(&mut self, status: SubmissionStatus) {
        self.submission = status;
        self.mark_dirty();
    }

    /// Starts tracking a new indicator batch; every indicator goes back to loading.
    pub(crate) fn start_indicator_batch(&mut self, batch: Generation) {
        self.indicator_batch = Some(batch);
        for state in self.indicators.values_mut() {
            *state = IndicatorState::Loading;
        }
        self.mark_dirty();
    }

    /// Forgets the current batch; unsettled indicators become cancelled.
    /// Returns true when a running batch had work in flight.
    pub(crate) fn cancel_indicator_batch(&mut self) -> bool {
        let had_batch = self.indicator_batch.take().is_some();
        let mut interrupted = false;
        for state in self.indicators.values_mut() {
            if matches!(state, IndicatorState::Loading) {
                *state = IndicatorState::Cancelled;
                interrupted = true;
            }
        }
        self.mark_dirty();
        had_batch && interrupted
    }

    pub(crate) fn has_unsettled_indicators(&self) -> bool {
        self.indicators
            .values()
            .any(|state| matches!(state, IndicatorState::Loading | IndicatorState::Cancelled))
    }

    pub(crate) fn set_indicator(&mut self, kind: IndicatorKind, state: IndicatorState) {
        self.indicators.insert(kind, state);
        self.mark_dirty();
    }
}
