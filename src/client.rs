// 🌐 HTTP Remote Store
// `RemoteStore` over the REST API served by `tracker-server` (or anything
// speaking the same contract).

use crate::api::{
    ApiResponse, DashboardOverview, RemoteStore, StatusHistoryEntry, StatusUpdateRequest,
    StatusUpdateResponse,
};
use crate::config::ClientConfig;
use crate::entity::{CountScope, Entity, EntityKey, EntityQuery};
use crate::error::{Result, TrackerError};
use crate::status::StatusCounts;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

const NO_QUERY: &[(&str, &str)] = &[];

pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpStore {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.api_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET and decode, mapping every failure to a Load error for `what`
    async fn get_json<T, Q>(&self, path: &str, query: &Q, what: &str) -> Result<T>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = self.url(path);
        tracing::debug!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| TrackerError::load(what, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response)
                .await
                .unwrap_or_else(|| format!("server responded {}", status));
            return Err(TrackerError::load(what, message));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TrackerError::load(what, format!("Invalid data format received: {}", e)))
    }
}

/// Pull `error` out of a JSON error body, if there is one
async fn error_message(response: reqwest::Response) -> Option<String> {
    let body: serde_json::Value = response.json().await.ok()?;
    body.get("error")?.as_str().map(str::to_string)
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn list_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>> {
        let response: ApiResponse<Vec<Entity>> =
            self.get_json("entities", query, "entities").await?;
        response.into_data("entities")
    }

    async fn status_counts(&self, scope: &CountScope) -> Result<StatusCounts> {
        self.get_json("entities/status-counts", scope, "status counts")
            .await
    }

    async fn categories(&self) -> Result<Vec<String>> {
        self.get_json("categories", NO_QUERY, "categories").await
    }

    async fn update_status(
        &self,
        key: EntityKey,
        update: &StatusUpdateRequest,
    ) -> Result<StatusUpdateResponse> {
        let url = self.url(&format!("entities/{}/status", key));
        tracing::debug!(%url, status = %update.status, "POST");

        let response = self.client.post(&url).json(update).send().await?;
        let http_status = response.status();

        // Rejections still carry {success: false, error}; keep that message
        match response.json::<StatusUpdateResponse>().await {
            Ok(body) => Ok(body),
            Err(_) if !http_status.is_success() => Ok(StatusUpdateResponse {
                success: false,
                error: Some(format!("server responded {}", http_status)),
                ..StatusUpdateResponse::default()
            }),
            Err(e) => Err(TrackerError::Persist(format!(
                "Invalid response from server: {}",
                e
            ))),
        }
    }

    async fn dashboard_overview(&self) -> Result<DashboardOverview> {
        self.get_json("dashboard-overview", NO_QUERY, "dashboard overview")
            .await
    }

    async fn status_history(&self, key: EntityKey) -> Result<Vec<StatusHistoryEntry>> {
        let path = format!("entities/{}/history", key);
        let response: ApiResponse<Vec<StatusHistoryEntry>> =
            self.get_json(&path, NO_QUERY, "status history").await?;
        response.into_data("status history")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let store = HttpStore::new("http://localhost:5000/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(store.base_url(), "http://localhost:5000/api");
        assert_eq!(
            store.url("/entities/7/status"),
            "http://localhost:5000/api/entities/7/status"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_load_failure() {
        // Port 9 (discard) on localhost is closed on test machines
        let store = HttpStore::new("http://127.0.0.1:9/api", Duration::from_millis(500)).unwrap();
        let err = store
            .list_entities(&EntityQuery::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TrackerError::Load { .. }));
    }
}
