use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use postes_core::{
    validate_record, ConflictError, EstablishmentId, Generation, JobCatalog, MergeRecord, MergeSet,
};
use postes_logging::{postes_debug, postes_error, postes_info, postes_warn};
use thiserror::Error;

use crate::client::PostesApi;
use crate::persist::{MergeStore, PersistError};
use crate::{ApiError, FailureKind};

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Caught locally; nothing was sent.
    #[error(transparent)]
    Invalid(#[from] ConflictError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Submits groupings and keeps the stored record in step with the backend.
///
/// Each submission carries a generation. Only the newest generation seen for
/// an establishment may write storage, so a slow, superseded submission never
/// overwrites a newer save or a reset.
pub struct Reconciler {
    api: Arc<dyn PostesApi>,
    store: Arc<dyn MergeStore>,
    latest: Mutex<HashMap<EstablishmentId, Generation>>,
}

impl Reconciler {
    pub fn new(api: Arc<dyn PostesApi>, store: Arc<dyn MergeStore>) -> Self {
        Self {
            api,
            store,
            latest: Mutex::new(HashMap::new()),
        }
    }

    /// Marks `generation` as the newest for the establishment.
    pub fn supersede(&self, establishment: &EstablishmentId, generation: Generation) {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        let entry = latest.entry(establishment.clone()).or_insert(0);
        *entry = (*entry).max(generation);
    }

    /// Submits a record. On success the record is persisted if this is still
    /// the newest submission; on failure nothing is touched.
    ///
    /// A record with overlapping groups is refused with a conflict before
    /// anything is sent.
    pub async fn submit(
        &self,
        establishment: &EstablishmentId,
        record: &MergeRecord,
        generation: Generation,
    ) -> Result<JobCatalog, ApiError> {
        if let Err(conflict) = validate_record(record) {
            postes_warn!("Refusing overlapping grouping for {}: {}", establishment, conflict);
            return Err(ApiError::new(
                FailureKind::Conflict {
                    ids: conflict.into_ids(),
                },
                "rejected before sending",
            ));
        }
        let catalog = match self.api.submit_merges(establishment, record).await {
            Ok(catalog) => catalog,
            Err(err) => {
                postes_warn!("Submission for {} rejected: {}", establishment, err);
                return Err(err);
            }
        };

        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        let newest = latest.entry(establishment.clone()).or_insert(0);
        if generation < *newest {
            postes_debug!(
                "Not persisting superseded submission generation={} newest={}",
                generation,
                newest
            );
            return Ok(catalog);
        }
        *newest = generation;
        if let Err(err) = self.store.store(establishment, record) {
            // The backend accepted the grouping; the catalog stays valid.
            postes_error!("Failed to persist merges for {}: {}", establishment, err);
        } else {
            postes_info!(
                "Saved {} merge group(s) for {}",
                record.groups().len(),
                establishment
            );
        }
        Ok(catalog)
    }

    /// Validates the whole set first; a conflicting set sends nothing.
    pub async fn submit_set(
        &self,
        merges: &MergeSet,
        generation: Generation,
    ) -> Result<JobCatalog, ReconcileError> {
        let record = merges.submittable()?;
        self.supersede(merges.establishment(), generation);
        Ok(self.submit(merges.establishment(), &record, generation).await?)
    }

    /// Removes the stored record; older in-flight submissions will not restore it.
    pub fn reset(
        &self,
        establishment: &EstablishmentId,
        generation: Generation,
    ) -> Result<(), PersistError> {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        let entry = latest.entry(establishment.clone()).or_insert(0);
        *entry = (*entry).max(generation);
        self.store.clear(establishment)
    }

    pub fn store(&self) -> &Arc<dyn MergeStore> {
        &self.store
    }
}
