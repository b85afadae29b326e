use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;
use postes_core::{EstablishmentId, IndicatorKind, MergeRecord};
use postes_engine::{ApiError, EngineEvent, EventSink, IndicatorBatcher, IndicatorSource};
use serde_json::{json, Value};
use tokio::runtime::Handle;

struct DelayedSource {
    delay: Duration,
    calls: AtomicUsize,
}

impl DelayedSource {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl IndicatorSource for DelayedSource {
    async fn fetch_indicator(
        &self,
        _establishment: &EstablishmentId,
        kind: IndicatorKind,
        grouping: &MergeRecord,
    ) -> Result<Value, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(json!({"kind": kind.slug(), "groups": grouping.groups().len()}))
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl CollectingSink {
    fn batches(&self) -> Vec<u64> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::IndicatorFetched { batch, .. } => Some(*batch),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn establishment() -> EstablishmentId {
    EstablishmentId::new("12345678900011")
}

#[tokio::test]
async fn batch_fetches_every_kind_once() {
    let source = Arc::new(DelayedSource::new(Duration::from_millis(5)));
    let batcher = IndicatorBatcher::new(source.clone(), IndicatorKind::ALL.to_vec());
    let sink = Arc::new(CollectingSink::default());

    let handles = batcher.start(
        &Handle::current(),
        establishment(),
        MergeRecord::new(vec![vec![1, 2]]),
        1,
        sink.clone(),
    );
    join_all(handles).await;

    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    assert_eq!(sink.batches(), vec![1, 1, 1]);
    assert_eq!(batcher.active_batch(), Some(1));
}

#[tokio::test]
async fn new_batch_cancels_previous_one() {
    let source = Arc::new(DelayedSource::new(Duration::from_millis(100)));
    let batcher = IndicatorBatcher::new(source, IndicatorKind::ALL.to_vec());
    let sink = Arc::new(CollectingSink::default());

    let first = batcher.start(
        &Handle::current(),
        establishment(),
        MergeRecord::default(),
        1,
        sink.clone(),
    );
    let second = batcher.start(
        &Handle::current(),
        establishment(),
        MergeRecord::new(vec![vec![1, 2]]),
        2,
        sink.clone(),
    );
    join_all(first.into_iter().chain(second)).await;

    assert_eq!(sink.batches(), vec![2, 2, 2]);
}

#[tokio::test]
async fn cancel_discards_in_flight_results() {
    let source = Arc::new(DelayedSource::new(Duration::from_millis(100)));
    let batcher = IndicatorBatcher::new(source, vec![IndicatorKind::JobProportions]);
    let sink = Arc::new(CollectingSink::default());

    let handles = batcher.start(
        &Handle::current(),
        establishment(),
        MergeRecord::default(),
        7,
        sink.clone(),
    );
    batcher.cancel();
    join_all(handles).await;

    assert!(sink.batches().is_empty());
    assert_eq!(batcher.active_batch(), None);
}
