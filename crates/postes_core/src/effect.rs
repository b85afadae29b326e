use crate::label::EstablishmentId;
use crate::record::MergeRecord;

/// Monotonic counter tagging every request whose result depends on the grouping.
pub type Generation = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the catalog without any grouping applied.
    FetchCatalog { establishment: EstablishmentId },
    /// Fetch the catalog with `record` applied server-side.
    FetchMergedCatalog {
        establishment: EstablishmentId,
        record: MergeRecord,
        generation: Generation,
    },
    FetchSuggestions { establishment: EstablishmentId },
    LoadStoredMerges { establishment: EstablishmentId },
    /// Remove the stored record; submissions older than `generation` must not restore it.
    ClearStoredMerges {
        establishment: EstablishmentId,
        generation: Generation,
    },
    /// Submit the grouping; the stored record is replaced only on success.
    SubmitMerges {
        establishment: EstablishmentId,
        record: MergeRecord,
        generation: Generation,
    },
    /// Start a new batch of dependent indicator fetches, cancelling the previous one.
    RefreshIndicators {
        establishment: EstablishmentId,
        record: MergeRecord,
        batch: Generation,
    },
    CancelIndicators,
}
