use std::time::Duration;

use postes_core::{
    EstablishmentId, IndicatorKind, JobCatalog, JobLabel, MergeRecord, SuggestionEntry,
};
use postes_engine::{
    ClientSettings, FailureKind, IndicatorSource, PostesApi, ReqwestPostesClient,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SIRET: &str = "12345678900011";

fn establishment() -> EstablishmentId {
    EstablishmentId::new(SIRET)
}

fn client_for(server: &MockServer) -> ReqwestPostesClient {
    ReqwestPostesClient::new(ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    })
    .expect("client")
}

#[tokio::test]
async fn fetches_raw_catalog_in_server_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/establishments/{SIRET}/job-labels")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "text": "Serveur", "isMergedResult": false},
            {"id": 1, "text": "Cuisinier", "isMergedResult": false},
            {"id": 3, "text": "Plongeur"}
        ])))
        .mount(&server)
        .await;

    let catalog = client_for(&server)
        .fetch_catalog(&establishment(), None)
        .await
        .expect("catalog");
    assert_eq!(
        catalog,
        JobCatalog::new(vec![
            JobLabel::new(2, "Serveur"),
            JobLabel::new(1, "Cuisinier"),
            JobLabel::new(3, "Plongeur"),
        ])
    );
}

#[tokio::test]
async fn grouping_is_sent_as_query_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/establishments/{SIRET}/job-labels")))
        .and(query_param("merges", "[[1,2]]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "text": "Cuisinier", "isMergedResult": true},
            {"id": 3, "text": "Plongeur", "isMergedResult": false}
        ])))
        .mount(&server)
        .await;

    let record = MergeRecord::new(vec![vec![1, 2]]);
    let catalog = client_for(&server)
        .fetch_catalog(&establishment(), Some(&record))
        .await
        .expect("catalog");
    assert!(catalog.get(1).unwrap().is_merged_result);
    assert!(!catalog.contains(2));
}

#[tokio::test]
async fn base_path_is_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/establishments/{SIRET}/job-labels/suggestions")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [{"id": 1, "text": "Cuisinier"}, {"id": 2, "text": "CUISINIER"}]
        ])))
        .mount(&server)
        .await;

    let client = ReqwestPostesClient::new(ClientSettings {
        base_url: format!("{}/api/", server.uri()),
        ..ClientSettings::default()
    })
    .unwrap();
    let suggestions = client.fetch_suggestions(&establishment()).await.unwrap();
    assert_eq!(
        suggestions,
        vec![vec![
            SuggestionEntry::new(1, "Cuisinier"),
            SuggestionEntry::new(2, "CUISINIER"),
        ]]
    );
}

#[tokio::test]
async fn submit_posts_grouping_and_returns_recomputed_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/establishments/{SIRET}/job-labels/merges")))
        .and(body_json(json!({"establishmentId": SIRET, "merges": [[1, 2]]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "text": "A", "isMergedResult": true},
            {"id": 3, "text": "C", "isMergedResult": false}
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let record = MergeRecord::new(vec![vec![1, 2]]);
    let first = client.submit_merges(&establishment(), &record).await.unwrap();
    let second = client.submit_merges(&establishment(), &record).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn backend_conflict_is_distinguished_from_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/establishments/{SIRET}/job-labels/merges")))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"conflictingIds": [2]})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit_merges(&establishment(), &MergeRecord::new(vec![vec![1, 2], vec![2, 3]]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Conflict { ids: vec![2] });
    assert!(!err.kind.is_transport());
    assert_eq!(err.conflicting_ids(), Some(&[2][..]));
}

#[tokio::test]
async fn conflict_status_without_ids_is_a_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(409).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit_merges(&establishment(), &MergeRecord::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(409));
    assert!(err.kind.is_transport());
}

#[tokio::test]
async fn server_error_maps_to_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_catalog(&establishment(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"labels": []})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_catalog(&establishment(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn slow_submission_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    let client = ReqwestPostesClient::new(ClientSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..ClientSettings::default()
    })
    .unwrap();
    let err = client
        .submit_merges(&establishment(), &MergeRecord::new(vec![vec![1, 2]]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn indicator_request_carries_grouping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/establishments/{SIRET}/indicators/precarious-jobs"
        )))
        .and(query_param("merges", "[[4,5]]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ranking": [4]})))
        .mount(&server)
        .await;

    let value = client_for(&server)
        .fetch_indicator(
            &establishment(),
            IndicatorKind::PrecariousJobs,
            &MergeRecord::new(vec![vec![4, 5]]),
        )
        .await
        .unwrap();
    assert_eq!(value, json!({"ranking": [4]}));
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = ReqwestPostesClient::new(ClientSettings {
        base_url: "not a url".to_string(),
        ..ClientSettings::default()
    })
    .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
