//! Station schedule API client

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Stage, SyncError};
use crate::show::ShowInfo;

/// HTTP access to one station's API.
///
/// Holds a single `reqwest::Client` so every request of a run shares the
/// connection pool.
#[derive(Debug, Clone)]
pub struct StationClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StationClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.station.url, &config.station.api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Upcoming-broadcasts endpoint, without the key query parameter.
    pub fn upcoming_url(&self) -> String {
        format!("{}/api/broadcasts/upcoming", self.base_url)
    }

    /// Show-detail endpoint. `show_id` is percent-encoded as one path segment.
    pub fn show_url(&self, show_id: &str) -> Result<Url, SyncError> {
        let bad_base = || {
            SyncError::malformed(
                Stage::Show,
                format!("station url {:?} cannot take a path", self.base_url),
            )
        };

        let mut url = Url::parse(&self.base_url).map_err(|_| bad_base())?;
        url.path_segments_mut()
            .map_err(|_| bad_base())?
            .pop_if_empty()
            .extend(["api", "show", show_id]);
        Ok(url)
    }

    /// Fetch the station's upcoming broadcasts, soonest first.
    ///
    /// Entries are left undecoded; only the first one matters to a run.
    pub async fn upcoming_broadcasts(&self) -> Result<Vec<Value>, SyncError> {
        let url = self.upcoming_url();
        debug!("Upcoming broadcast URL: {}?key=<redacted>", url);

        let request = self.http.get(&url).query(&[("key", self.api_key.as_str())]);
        self.get_json(Stage::Resolve, &url, request).await
    }

    pub async fn show(&self, show_id: &str) -> Result<ShowInfo, SyncError> {
        let url = self.show_url(show_id)?;
        debug!("Show URL: {}", url);

        let request = self.http.get(url.clone());
        self.get_json(Stage::Show, url.as_str(), request).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        stage: Stage,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SyncError> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SyncError::network(stage, url, e))?;

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::network(stage, url, e))?;
        debug!("Response from {}: {}", url, body);

        serde_json::from_str(&body)
            .map_err(|e| SyncError::malformed(stage, format!("{url}: {e}")))
    }
}
