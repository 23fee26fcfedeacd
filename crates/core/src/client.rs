//! HTTP client for the disruption management, roadworks and CARS APIs.

use std::sync::Arc;

use api_types::{
    CarsFeature, DisruptionListResponse, DisruptionPayload, IncidentId, IncidentListResponse, IncidentPayload,
    IncidentSaveResponse, LayoutRecord, WorksiteRecord,
};
use chrono::NaiveDate;
use itertools::Itertools;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    config::ConsoleConfig,
    error::{ConsoleError, ConsoleFuture, Result},
    incident::IncidentDraft,
    roadworks::RoadworksSource,
};

/// Appends `path` and `query` to `base`, keeping any path prefix `base` has.
pub fn endpoint(base: &Url, path: &str, query: &[(&str, &str)]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ConsoleError::InvalidUrl(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(path.split('/').filter(|segment| !segment.is_empty()));
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Pulls a readable message out of an error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json.get("message")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}

fn parse_base(name: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| ConsoleError::InvalidUrl(format!("{name} {raw:?}: {e}")))
}

#[derive(Clone, Debug)]
pub struct ConsoleClient {
    http: Client,
    disruption_api: Url,
    roadworks_api: Url,
    cars_api: Url,
}

impl ConsoleClient {
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            http,
            disruption_api: parse_base("disruption API", &config.disruption_api_url)?,
            roadworks_api: parse_base("roadworks API", &config.roadworks_api_url)?,
            cars_api: parse_base("CARS API", &config.cars_api_url)?,
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, url: &Url) -> Result<T> {
        debug!(%url, "Sending request");
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, %status, "Request failed");
            return Err(ConsoleError::Api {
                status: status.as_u16(),
                endpoint: url.path().to_owned(),
                message: error_message(&body),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.send(self.http.get(url.clone()), &url).await
    }

    // ========================================================================
    // Roadworks
    // ========================================================================

    pub async fn worksite(&self, worksite_code: &str, date_from: NaiveDate, date_to: NaiveDate) -> Result<WorksiteRecord> {
        let (from, to) = (date_from.to_string(), date_to.to_string());
        let url = endpoint(
            &self.roadworks_api,
            "worksite",
            &[("worksite_code", worksite_code), ("date_from", from.as_str()), ("date_to", to.as_str())],
        )?;
        self.get(url).await
    }

    pub async fn layouts(&self, tmp_ids: &[Arc<str>], date_from: NaiveDate, date_to: NaiveDate) -> Result<Vec<LayoutRecord>> {
        let ids = tmp_ids.iter().join(",");
        let (from, to) = (date_from.to_string(), date_to.to_string());
        let url = endpoint(
            &self.roadworks_api,
            "layout",
            &[("tmp_ids", ids.as_str()), ("date_from", from.as_str()), ("date_to", to.as_str())],
        )?;
        self.get(url).await
    }

    pub async fn cars_features(&self) -> Result<Vec<CarsFeature>> {
        self.get(endpoint(&self.cars_api, "feature", &[])?).await
    }

    // ========================================================================
    // Incidents
    // ========================================================================

    pub async fn incident(&self, id: IncidentId) -> Result<IncidentPayload> {
        self.get(endpoint(&self.disruption_api, &format!("incident/{}", id.0), &[])?)
            .await
    }

    pub async fn create_incident(&self, payload: &IncidentPayload) -> Result<IncidentSaveResponse> {
        let url = endpoint(&self.disruption_api, "incident", &[])?;
        self.send(self.http.post(url.clone()).json(payload), &url).await
    }

    pub async fn update_incident(&self, payload: &IncidentPayload) -> Result<IncidentSaveResponse> {
        let url = endpoint(&self.disruption_api, "incident", &[])?;
        self.send(self.http.put(url.clone()).json(payload), &url).await
    }

    /// Validates `draft`, creates or updates it, and records the new version
    pub async fn save_incident(&self, draft: &mut IncidentDraft) -> Result<IncidentSaveResponse> {
        let payload = draft.to_payload()?;
        let response = if draft.is_new() {
            self.create_incident(&payload).await?
        } else {
            self.update_incident(&payload).await?
        };
        draft.apply_save_response(&response);
        debug!(incident_id = response.incident_id.0, version = response.version, "Saved incident");
        Ok(response)
    }

    pub async fn disruptions(&self) -> Result<Vec<DisruptionPayload>> {
        let list: DisruptionListResponse = self.get(endpoint(&self.disruption_api, "disruption", &[])?).await?;
        Ok(list.disruptions)
    }

    pub async fn incidents(&self) -> Result<Vec<IncidentPayload>> {
        let list: IncidentListResponse = self.get(endpoint(&self.disruption_api, "incident", &[])?).await?;
        Ok(list.incidents)
    }
}

impl RoadworksSource for ConsoleClient {
    fn fetch_worksite<'a>(
        &'a self,
        worksite_code: &'a str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> ConsoleFuture<'a, WorksiteRecord> {
        Box::pin(self.worksite(worksite_code, date_from, date_to))
    }

    fn fetch_layouts<'a>(
        &'a self,
        tmp_ids: &'a [Arc<str>],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> ConsoleFuture<'a, Vec<LayoutRecord>> {
        Box::pin(self.layouts(tmp_ids, date_from, date_to))
    }

    fn fetch_cars_features(&self) -> ConsoleFuture<'_, Vec<CarsFeature>> {
        Box::pin(self.cars_features())
    }
}
