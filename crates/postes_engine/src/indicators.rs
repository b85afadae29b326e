use std::sync::{mpsc, Arc, Mutex};

use postes_core::{EstablishmentId, Generation, IndicatorKind, MergeRecord};
use postes_logging::{postes_debug, postes_info};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::IndicatorSource;
use crate::EngineEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

struct ActiveBatch {
    batch: Generation,
    token: CancellationToken,
}

/// Runs one fetch per indicator kind for the current grouping.
///
/// Starting a batch cancels the previous one. A cancelled fetch emits
/// nothing, even if its response is already on the wire.
pub struct IndicatorBatcher {
    source: Arc<dyn IndicatorSource>,
    kinds: Vec<IndicatorKind>,
    active: Mutex<Option<ActiveBatch>>,
}

impl IndicatorBatcher {
    pub fn new(source: Arc<dyn IndicatorSource>, kinds: Vec<IndicatorKind>) -> Self {
        Self {
            source,
            kinds,
            active: Mutex::new(None),
        }
    }

    pub fn kinds(&self) -> &[IndicatorKind] {
        &self.kinds
    }

    /// Batch currently allowed to emit results.
    pub fn active_batch(&self) -> Option<Generation> {
        self.lock_active().as_ref().map(|active| active.batch)
    }

    pub fn start(
        &self,
        runtime: &Handle,
        establishment: EstablishmentId,
        grouping: MergeRecord,
        batch: Generation,
        sink: Arc<dyn EventSink>,
    ) -> Vec<JoinHandle<()>> {
        let token = CancellationToken::new();
        let previous = self.lock_active().replace(ActiveBatch {
            batch,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            postes_debug!("Batch {} superseded by {}", previous.batch, batch);
            previous.token.cancel();
        }
        postes_info!(
            "Refreshing {} indicator(s) for {} batch={}",
            self.kinds.len(),
            establishment,
            batch
        );

        let establishment = Arc::new(establishment);
        let grouping = Arc::new(grouping);
        self.kinds
            .iter()
            .map(|&kind| {
                let source = self.source.clone();
                let token = token.clone();
                let sink = sink.clone();
                let establishment = establishment.clone();
                let grouping = grouping.clone();
                runtime.spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {
                            postes_debug!("Indicator {} batch={} cancelled", kind, batch);
                        }
                        result = source.fetch_indicator(&establishment, kind, &grouping) => {
                            if token.is_cancelled() {
                                postes_debug!("Discarding late {} result batch={}", kind, batch);
                            } else {
                                sink.emit(EngineEvent::IndicatorFetched { batch, kind, result });
                            }
                        }
                    }
                })
            })
            .collect()
    }

    /// Cancels the running batch, if any.
    pub fn cancel(&self) {
        if let Some(active) = self.lock_active().take() {
            postes_debug!("Cancelling indicator batch {}", active.batch);
            active.token.cancel();
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveBatch>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}
