use std::fmt;

use postes_core::{
    EstablishmentId, Generation, IndicatorKind, JobCatalog, LabelId, MergeRecord, SuggestionEntry,
};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    CatalogFetched {
        establishment: EstablishmentId,
        result: Result<JobCatalog, ApiError>,
    },
    MergedCatalogFetched {
        establishment: EstablishmentId,
        generation: Generation,
        result: Result<JobCatalog, ApiError>,
    },
    SuggestionsFetched {
        establishment: EstablishmentId,
        result: Result<Vec<Vec<SuggestionEntry>>, ApiError>,
    },
    StoredMergesLoaded {
        establishment: EstablishmentId,
        record: MergeRecord,
    },
    SubmitCompleted {
        establishment: EstablishmentId,
        generation: Generation,
        result: Result<JobCatalog, ApiError>,
    },
    IndicatorFetched {
        batch: Generation,
        kind: IndicatorKind,
        result: Result<Value, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Conflicting ids when the backend rejected the grouping.
    pub fn conflicting_ids(&self) -> Option<&[LabelId]> {
        match &self.kind {
            FailureKind::Conflict { ids } => Some(ids),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    /// Semantic rejection: labels claimed by more than one group.
    Conflict { ids: Vec<LabelId> },
}

impl FailureKind {
    /// Everything except a semantic conflict is a transport-level failure.
    pub fn is_transport(&self) -> bool {
        !matches!(self, FailureKind::Conflict { .. })
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "invalid response body"),
            FailureKind::Conflict { ids } => write!(f, "duplicate membership {ids:?}"),
        }
    }
}
