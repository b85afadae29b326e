use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use postes_core::{EstablishmentId, Generation, IndicatorKind, MergeRecord};
use postes_logging::{postes_error, postes_warn};
use tokio::runtime::Runtime;

use crate::client::{ClientSettings, PostesApi, ReqwestPostesClient};
use crate::indicators::{ChannelEventSink, EventSink, IndicatorBatcher};
use crate::persist::{FileMergeStore, MergeStore};
use crate::reconcile::Reconciler;
use crate::{ApiError, EngineEvent};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub client: ClientSettings,
    pub store_dir: PathBuf,
    pub indicators: Vec<IndicatorKind>,
}

impl EngineConfig {
    pub fn default_with_store(store_dir: PathBuf) -> Self {
        Self {
            client: ClientSettings::default(),
            store_dir,
            indicators: IndicatorKind::ALL.to_vec(),
        }
    }
}

enum EngineCommand {
    FetchCatalog {
        establishment: EstablishmentId,
    },
    FetchMergedCatalog {
        establishment: EstablishmentId,
        record: MergeRecord,
        generation: Generation,
    },
    FetchSuggestions {
        establishment: EstablishmentId,
    },
    LoadStored {
        establishment: EstablishmentId,
    },
    ClearStored {
        establishment: EstablishmentId,
        generation: Generation,
    },
    Submit {
        establishment: EstablishmentId,
        record: MergeRecord,
        generation: Generation,
    },
    RefreshIndicators {
        establishment: EstablishmentId,
        record: MergeRecord,
        batch: Generation,
    },
    CancelIndicators,
}

struct EngineContext {
    api: Arc<dyn PostesApi>,
    reconciler: Reconciler,
    indicators: IndicatorBatcher,
    sink: Arc<dyn EventSink>,
}

/// Runs backend calls and storage on a background runtime.
///
/// Commands are dispatched in the order they are sent; network calls then
/// complete concurrently and report through [`EngineHandle::try_recv`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, ApiError> {
        let client = Arc::new(ReqwestPostesClient::new(config.client)?);
        let store: Arc<dyn MergeStore> = Arc::new(FileMergeStore::new(config.store_dir));
        Ok(Self::with_parts(
            client.clone(),
            client,
            store,
            config.indicators,
        ))
    }

    /// Builds an engine over explicit collaborators.
    pub fn with_parts(
        api: Arc<dyn PostesApi>,
        indicator_source: Arc<dyn crate::IndicatorSource>,
        store: Arc<dyn MergeStore>,
        indicators: Vec<IndicatorKind>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let context = Arc::new(EngineContext {
            reconciler: Reconciler::new(api.clone(), store),
            indicators: IndicatorBatcher::new(indicator_source, indicators),
            sink: Arc::new(ChannelEventSink::new(event_tx)),
            api,
        });

        thread::spawn(move || {
            let runtime = Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                dispatch(&runtime, &context, command);
            }
            context.indicators.cancel();
        });

        Self { cmd_tx, event_rx }
    }

    pub fn fetch_catalog(&self, establishment: EstablishmentId) {
        self.send(EngineCommand::FetchCatalog { establishment });
    }

    pub fn fetch_merged_catalog(
        &self,
        establishment: EstablishmentId,
        record: MergeRecord,
        generation: Generation,
    ) {
        self.send(EngineCommand::FetchMergedCatalog {
            establishment,
            record,
            generation,
        });
    }

    pub fn fetch_suggestions(&self, establishment: EstablishmentId) {
        self.send(EngineCommand::FetchSuggestions { establishment });
    }

    pub fn load_stored_merges(&self, establishment: EstablishmentId) {
        self.send(EngineCommand::LoadStored { establishment });
    }

    pub fn clear_stored_merges(&self, establishment: EstablishmentId, generation: Generation) {
        self.send(EngineCommand::ClearStored {
            establishment,
            generation,
        });
    }

    pub fn submit_merges(
        &self,
        establishment: EstablishmentId,
        record: MergeRecord,
        generation: Generation,
    ) {
        self.send(EngineCommand::Submit {
            establishment,
            record,
            generation,
        });
    }

    pub fn refresh_indicators(
        &self,
        establishment: EstablishmentId,
        record: MergeRecord,
        batch: Generation,
    ) {
        self.send(EngineCommand::RefreshIndicators {
            establishment,
            record,
            batch,
        });
    }

    pub fn cancel_indicators(&self) {
        self.send(EngineCommand::CancelIndicators);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            postes_error!("Engine thread has stopped; command dropped");
        }
    }
}

/// Storage, batch bookkeeping and submission ordering happen here, in send
/// order; only the network calls are spawned.
fn dispatch(runtime: &Runtime, context: &Arc<EngineContext>, command: EngineCommand) {
    match command {
        EngineCommand::FetchCatalog { establishment } => {
            let context = context.clone();
            runtime.spawn(async move {
                let result = context.api.fetch_catalog(&establishment, None).await;
                context.sink.emit(EngineEvent::CatalogFetched {
                    establishment,
                    result,
                });
            });
        }
        EngineCommand::FetchMergedCatalog {
            establishment,
            record,
            generation,
        } => {
            let context = context.clone();
            runtime.spawn(async move {
                let result = context.api.fetch_catalog(&establishment, Some(&record)).await;
                context.sink.emit(EngineEvent::MergedCatalogFetched {
                    establishment,
                    generation,
                    result,
                });
            });
        }
        EngineCommand::FetchSuggestions { establishment } => {
            let context = context.clone();
            runtime.spawn(async move {
                let result = context.api.fetch_suggestions(&establishment).await;
                context.sink.emit(EngineEvent::SuggestionsFetched {
                    establishment,
                    result,
                });
            });
        }
        EngineCommand::LoadStored { establishment } => {
            let record = match context.reconciler.store().retrieve(&establishment) {
                Ok(record) => record,
                Err(err) => {
                    postes_warn!("Failed to read stored merges for {}: {}", establishment, err);
                    MergeRecord::default()
                }
            };
            context.sink.emit(EngineEvent::StoredMergesLoaded {
                establishment,
                record,
            });
        }
        EngineCommand::ClearStored {
            establishment,
            generation,
        } => {
            if let Err(err) = context.reconciler.reset(&establishment, generation) {
                postes_error!("Failed to clear stored merges for {}: {}", establishment, err);
            }
        }
        EngineCommand::Submit {
            establishment,
            record,
            generation,
        } => {
            context.reconciler.supersede(&establishment, generation);
            let context = context.clone();
            runtime.spawn(async move {
                let result = context
                    .reconciler
                    .submit(&establishment, &record, generation)
                    .await;
                context.sink.emit(EngineEvent::SubmitCompleted {
                    establishment,
                    generation,
                    result,
                });
            });
        }
        EngineCommand::RefreshIndicators {
            establishment,
            record,
            batch,
        } => {
            context.indicators.start(
                runtime.handle(),
                establishment,
                record,
                batch,
                context.sink.clone(),
            );
        }
        EngineCommand::CancelIndicators => context.indicators.cancel(),
    }
}
