use std::time::Duration;

use postes_core::{Effect, EstablishmentId, Msg, SubmitFailure};
use postes_engine::{ApiError, EngineEvent, EngineHandle, FailureKind};
use postes_logging::{postes_debug, postes_info};

/// Executes core effects on the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchCatalog { establishment } => {
                    postes_info!("FetchCatalog establishment={}", establishment);
                    self.engine.fetch_catalog(establishment);
                }
                Effect::FetchMergedCatalog {
                    establishment,
                    record,
                    generation,
                } => {
                    postes_info!(
                        "FetchMergedCatalog establishment={} groups={} generation={}",
                        establishment,
                        record.groups().len(),
                        generation
                    );
                    self.engine
                        .fetch_merged_catalog(establishment, record, generation);
                }
                Effect::FetchSuggestions { establishment } => {
                    postes_info!("FetchSuggestions establishment={}", establishment);
                    self.engine.fetch_suggestions(establishment);
                }
                Effect::LoadStoredMerges { establishment } => {
                    postes_info!("LoadStoredMerges establishment={}", establishment);
                    self.engine.load_stored_merges(establishment);
                }
                Effect::ClearStoredMerges {
                    establishment,
                    generation,
                } => {
                    postes_info!(
                        "ClearStoredMerges establishment={} generation={}",
                        establishment,
                        generation
                    );
                    self.engine.clear_stored_merges(establishment, generation);
                }
                Effect::SubmitMerges {
                    establishment,
                    record,
                    generation,
                } => {
                    postes_info!(
                        "SubmitMerges establishment={} groups={} generation={}",
                        establishment,
                        record.groups().len(),
                        generation
                    );
                    self.engine.submit_merges(establishment, record, generation);
                }
                Effect::RefreshIndicators {
                    establishment,
                    record,
                    batch,
                } => {
                    postes_info!(
                        "RefreshIndicators establishment={} groups={} batch={}",
                        establishment,
                        record.groups().len(),
                        batch
                    );
                    self.engine.refresh_indicators(establishment, record, batch);
                }
                Effect::CancelIndicators => {
                    postes_info!("CancelIndicators");
                    self.engine.cancel_indicators();
                }
            }
        }
    }

    /// Waits up to `wait` for the next engine event addressed to `establishment`.
    pub fn next_msg(&self, establishment: &EstablishmentId, wait: Duration) -> Option<Msg> {
        self.engine
            .recv_timeout(wait)
            .map(|event| map_event(establishment, event))
    }
}

pub fn map_event(session: &EstablishmentId, event: EngineEvent) -> Msg {
    match event {
        EngineEvent::CatalogFetched {
            establishment,
            result,
        } if &establishment == session => {
            Msg::CatalogLoaded(result.map_err(|err| err.to_string()))
        }
        EngineEvent::MergedCatalogFetched {
            establishment,
            generation,
            result,
        } if &establishment == session => Msg::MergedCatalogLoaded {
            generation,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::SuggestionsFetched {
            establishment,
            result,
        } if &establishment == session => {
            Msg::SuggestionsLoaded(result.map_err(|err| err.to_string()))
        }
        EngineEvent::StoredMergesLoaded {
            establishment,
            record,
        } if &establishment == session => Msg::StoredMergesLoaded(record),
        EngineEvent::SubmitCompleted {
            establishment,
            generation,
            result,
        } if &establishment == session => Msg::SubmitCompleted {
            generation,
            result: result.map_err(map_submit_failure),
        },
        EngineEvent::IndicatorFetched {
            batch,
            kind,
            result,
        } => Msg::IndicatorLoaded {
            batch,
            kind,
            result: result.map_err(|err| err.to_string()),
        },
        other => {
            postes_debug!("Ignoring event for another establishment: {:?}", other);
            Msg::NoOp
        }
    }
}

fn map_submit_failure(err: ApiError) -> SubmitFailure {
    match err.kind {
        FailureKind::Conflict { ids } => SubmitFailure::Conflict(ids),
        _ => SubmitFailure::Transport(err.to_string()),
    }
}
