use std::time::{Duration, Instant};

use postes_core::{EstablishmentId, IndicatorKind, MergeRecord};
use postes_engine::{ClientSettings, EngineConfig, EngineEvent, EngineHandle, FileMergeStore, MergeStore};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SIRET: &str = "12345678900011";

fn collect_until(
    engine: &EngineHandle,
    mut done: impl FnMut(&[EngineEvent]) -> bool,
) -> Vec<EngineEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut events = Vec::new();
    while Instant::now() < deadline && !done(&events) {
        if let Some(event) = engine.recv_timeout(Duration::from_millis(50)) {
            events.push(event);
        }
    }
    events
}

#[tokio::test(flavor = "multi_thread")]
async fn engine_submits_persists_and_refreshes() {
    postes_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/establishments/{SIRET}/job-labels/merges")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "text": "A", "isMergedResult": true}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/establishments/{SIRET}/indicators/job-proportions")))
        .and(query_param("merges", "[[1,2]]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"A": 1.0})))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = EngineConfig::default_with_store(temp.path().to_path_buf());
    config.client = ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    };
    config.indicators = vec![IndicatorKind::JobProportions];
    let engine = EngineHandle::new(config).unwrap();

    let establishment = EstablishmentId::new(SIRET);
    let record = MergeRecord::new(vec![vec![1, 2]]);
    engine.submit_merges(establishment.clone(), record.clone(), 3);
    engine.refresh_indicators(establishment.clone(), record.clone(), 3);

    let events = tokio::task::spawn_blocking(move || {
        let events = collect_until(&engine, |events| events.len() >= 2);
        (engine, events)
    })
    .await
    .unwrap()
    .1;

    assert!(events.iter().any(|event| matches!(
        event,
        EngineEvent::SubmitCompleted { generation: 3, result: Ok(_), .. }
    )));
    assert!(events.iter().any(|event| matches!(
        event,
        EngineEvent::IndicatorFetched { batch: 3, kind: IndicatorKind::JobProportions, result: Ok(_) }
    )));

    let store = FileMergeStore::new(temp.path().to_path_buf());
    assert_eq!(store.retrieve(&establishment).unwrap(), record);
}

#[test]
fn engine_loads_and_clears_stored_record() {
    postes_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let establishment = EstablishmentId::new(SIRET);
    let store = FileMergeStore::new(temp.path().to_path_buf());
    store
        .store(&establishment, &MergeRecord::new(vec![vec![4, 5]]))
        .unwrap();

    let engine = EngineHandle::new(EngineConfig::default_with_store(temp.path().to_path_buf()))
        .unwrap();
    engine.load_stored_merges(establishment.clone());
    engine.clear_stored_merges(establishment.clone(), 1);
    engine.load_stored_merges(establishment.clone());

    let events = collect_until(&engine, |events| events.len() >= 2);
    let records: Vec<MergeRecord> = events
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::StoredMergesLoaded { record, .. } => Some(record),
            _ => None,
        })
        .collect();
    assert_eq!(
        records,
        vec![MergeRecord::new(vec![vec![4, 5]]), MergeRecord::default()]
    );
}
