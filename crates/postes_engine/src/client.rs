use std::time::Duration;

use postes_core::{
    EstablishmentId, IndicatorKind, JobCatalog, JobLabel, LabelId, MergeRecord, SuggestionEntry,
};
use postes_logging::postes_debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::{ApiError, FailureKind};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Root of the aggregation service, e.g. `http://127.0.0.1:8080/api`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Backend endpoints owning the job catalog and merge recomputation.
#[async_trait::async_trait]
pub trait PostesApi: Send + Sync {
    /// Catalog for the establishment, with `grouping` applied server-side when given.
    async fn fetch_catalog(
        &self,
        establishment: &EstablishmentId,
        grouping: Option<&MergeRecord>,
    ) -> Result<JobCatalog, ApiError>;

    async fn fetch_suggestions(
        &self,
        establishment: &EstablishmentId,
    ) -> Result<Vec<Vec<SuggestionEntry>>, ApiError>;

    /// Submits the complete grouping; the backend accepts or rejects it whole.
    async fn submit_merges(
        &self,
        establishment: &EstablishmentId,
        record: &MergeRecord,
    ) -> Result<JobCatalog, ApiError>;
}

/// Dependent aggregates recomputed against the current grouping.
#[async_trait::async_trait]
pub trait IndicatorSource: Send + Sync {
    async fn fetch_indicator(
        &self,
        establishment: &EstablishmentId,
        kind: IndicatorKind,
        grouping: &MergeRecord,
    ) -> Result<Value, ApiError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    establishment_id: &'a str,
    merges: &'a MergeRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConflictBody {
    conflicting_ids: Vec<LabelId>,
}

#[derive(Debug, Clone)]
pub struct ReqwestPostesClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestPostesClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(
        &self,
        establishment: &EstablishmentId,
        tail: &[&str],
        grouping: Option<&MergeRecord>,
    ) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "base url has no path"))?;
            segments
                .pop_if_empty()
                .push("establishments")
                .push(establishment.as_str())
                .extend(tail);
        }
        if let Some(record) = grouping {
            url.query_pairs_mut()
                .append_pair("merges", &record.to_json_string());
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        postes_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }
}

#[async_trait::async_trait]
impl PostesApi for ReqwestPostesClient {
    async fn fetch_catalog(
        &self,
        establishment: &EstablishmentId,
        grouping: Option<&MergeRecord>,
    ) -> Result<JobCatalog, ApiError> {
        let url = self.endpoint(establishment, &["job-labels"], grouping)?;
        let labels: Vec<JobLabel> = self.get_json(url).await?;
        Ok(JobCatalog::new(labels))
    }

    async fn fetch_suggestions(
        &self,
        establishment: &EstablishmentId,
    ) -> Result<Vec<Vec<SuggestionEntry>>, ApiError> {
        let url = self.endpoint(establishment, &["job-labels", "suggestions"], None)?;
        self.get_json(url).await
    }

    async fn submit_merges(
        &self,
        establishment: &EstablishmentId,
        record: &MergeRecord,
    ) -> Result<JobCatalog, ApiError> {
        let url = self.endpoint(establishment, &["job-labels", "merges"], None)?;
        let body = serde_json::to_vec(&SubmitBody {
            establishment_id: establishment.as_str(),
            merges: record,
        })
        .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;

        postes_debug!("POST {} groups={}", url, record.groups().len());
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status() == StatusCode::CONFLICT {
            let status = response.status();
            let bytes = response.bytes().await.map_err(map_reqwest_error)?;
            return Err(match serde_json::from_slice::<ConflictBody>(&bytes) {
                Ok(conflict) => ApiError::new(
                    FailureKind::Conflict {
                        ids: conflict.conflicting_ids,
                    },
                    "backend rejected duplicate membership",
                ),
                Err(_) => ApiError::new(FailureKind::HttpStatus(status.as_u16()), status.to_string()),
            });
        }

        let labels: Vec<JobLabel> = read_json(response).await?;
        Ok(JobCatalog::new(labels))
    }
}

#[async_trait::async_trait]
impl IndicatorSource for ReqwestPostesClient {
    async fn fetch_indicator(
        &self,
        establishment: &EstablishmentId,
        kind: IndicatorKind,
        grouping: &MergeRecord,
    ) -> Result<Value, ApiError> {
        let url = self.endpoint(establishment, &["indicators", kind.slug()], Some(grouping))?;
        self.get_json(url).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
