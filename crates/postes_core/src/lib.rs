//! Postes core: job-label merge model and the pure session state machine.
mod effect;
mod label;
mod merge_set;
mod msg;
mod options;
mod parse;
mod record;
mod state;
mod suggestion;
mod update;
mod validate;
mod view_model;

pub use effect::{Effect, Generation};
pub use label::{EstablishmentId, JobCatalog, JobLabel, LabelId};
pub use merge_set::{EditError, GroupId, MergeGroup, MergeSet};
pub use msg::Msg;
pub use options::{group_options, with_merge_marks, OptionMode};
pub use parse::{parse_groups, ParseError};
pub use record::MergeRecord;
pub use state::{
    Feedback, IndicatorKind, IndicatorState, Phase, SessionState, SubmissionStatus, SubmitFailure,
};
pub use suggestion::{import_suggestions, Suggestion, SuggestionEntry};
pub use update::update;
pub use validate::{validate, validate_record, ConflictError};
pub use view_model::{GroupView, SessionView, SuggestionView};
