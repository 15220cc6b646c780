//! Twilio Sync REST client.
//!
//! Covers the slice of the Sync API the conversation store needs: services,
//! maps and map items. Map-level "not found" answers are returned as `None`
//! or `false` rather than errors, and create-vs-exists races are resolved
//! here so callers get idempotent operations.

use crate::config::SyncConfig;
use crate::error::SyncApiError;
use reqwest::{RequestBuilder, Response, Url};
use rootcause::Report;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, instrument};

/// A Sync service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncService {
    /// Service SID (`IS...`).
    pub sid: String,
    /// Friendly name.
    #[serde(default)]
    pub friendly_name: Option<String>,
}

/// A Sync map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncMap {
    /// Map SID (`MP...`).
    pub sid: String,
    /// Unique name the map is addressed by.
    #[serde(default)]
    pub unique_name: Option<String>,
}

/// An item of a Sync map.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncMapItem {
    /// Item key.
    pub key: String,
    /// Item payload.
    #[serde(default)]
    pub data: JsonValue,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(default)]
    next_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServicePage {
    #[serde(default)]
    services: Vec<SyncService>,
    meta: PageMeta,
}

#[derive(Debug, Deserialize)]
struct ItemPage {
    #[serde(default)]
    items: Vec<SyncMapItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

/// A non-success answer from Twilio.
#[derive(Debug)]
struct Failure {
    status: u16,
    code: Option<u32>,
    message: String,
}

impl Failure {
    fn is_not_found(&self) -> bool {
        self.status == 404
    }

    fn is_conflict(&self) -> bool {
        self.status == 409
    }

    fn into_error(self) -> SyncApiError {
        SyncApiError::Api {
            status: self.status,
            code: self.code,
            message: self.message,
        }
    }
}

enum Reply {
    Success(Response),
    Failed(Failure),
}

/// Twilio Sync REST client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    base_url: Url,
    account_sid: String,
    auth_token: String,
}

impl SyncClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(config: &SyncConfig) -> Result<Self, Report<SyncApiError>> {
        let base_url = Url::parse(&config.base_url).map_err(|e| SyncApiError::InvalidConfig {
            details: format!("invalid base URL '{}': {}", config.base_url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SyncApiError::InvalidConfig {
                details: format!("base URL '{}' cannot carry a path", config.base_url),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SyncApiError::InvalidConfig {
                details: format!("HTTP client error: {}", e),
            })?;

        Ok(Self {
            http,
            base_url,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// Finds a service by friendly name, walking every page of the listing.
    #[instrument(skip(self))]
    pub async fn find_service(
        &self,
        friendly_name: &str,
    ) -> Result<Option<SyncService>, Report<SyncApiError>> {
        let mut next = Some(self.url(&["Services"]));
        while let Some(url) = next {
            let page: ServicePage = self.expect_success(self.http.get(url)).await?;
            if let Some(service) = page
                .services
                .into_iter()
                .find(|s| s.friendly_name.as_deref() == Some(friendly_name))
            {
                return Ok(Some(service));
            }
            next = match page.meta.next_page_url {
                Some(raw) => Some(Url::parse(&raw).map_err(|e| SyncApiError::Decode {
                    details: format!("invalid next page URL '{}': {}", raw, e),
                })?),
                None => None,
            };
        }
        Ok(None)
    }

    /// Creates a service.
    #[instrument(skip(self))]
    pub async fn create_service(
        &self,
        friendly_name: &str,
    ) -> Result<SyncService, Report<SyncApiError>> {
        let request = self
            .http
            .post(self.url(&["Services"]))
            .form(&[("FriendlyName", friendly_name)]);
        self.expect_success(request).await
    }

    /// Returns the service with this friendly name, creating it if needed.
    pub async fn find_or_create_service(
        &self,
        friendly_name: &str,
    ) -> Result<SyncService, Report<SyncApiError>> {
        if let Some(service) = self.find_service(friendly_name).await? {
            return Ok(service);
        }
        debug!(friendly_name, "sync service not found, creating it");
        self.create_service(friendly_name).await
    }

    /// Fetches a map by unique name. `None` if it does not exist.
    #[instrument(skip(self))]
    pub async fn fetch_map(
        &self,
        service_sid: &str,
        unique_name: &str,
    ) -> Result<Option<SyncMap>, Report<SyncApiError>> {
        let url = self.url(&["Services", service_sid, "Maps", unique_name]);
        match self.send(self.http.get(url)).await? {
            Reply::Success(response) => Ok(Some(decode(response).await?)),
            Reply::Failed(failure) if failure.is_not_found() => Ok(None),
            Reply::Failed(failure) => Err(failure.into_error().into()),
        }
    }

    /// Returns the map with this unique name, creating it if needed.
    ///
    /// A concurrent creation surfaces as a conflict; the map the other
    /// writer created is fetched and returned instead.
    #[instrument(skip(self))]
    pub async fn ensure_map(
        &self,
        service_sid: &str,
        unique_name: &str,
    ) -> Result<SyncMap, Report<SyncApiError>> {
        if let Some(map) = self.fetch_map(service_sid, unique_name).await? {
            return Ok(map);
        }

        let request = self
            .http
            .post(self.url(&["Services", service_sid, "Maps"]))
            .form(&[("UniqueName", unique_name)]);
        match self.send(request).await? {
            Reply::Success(response) => decode(response).await,
            Reply::Failed(failure) if failure.is_conflict() => {
                debug!("map created concurrently, fetching the existing one");
                match self.fetch_map(service_sid, unique_name).await? {
                    Some(map) => Ok(map),
                    None => Err(failure.into_error().into()),
                }
            }
            Reply::Failed(failure) => Err(failure.into_error().into()),
        }
    }

    /// Deletes a map and its items. Returns false if it did not exist.
    #[instrument(skip(self))]
    pub async fn delete_map(
        &self,
        service_sid: &str,
        unique_name: &str,
    ) -> Result<bool, Report<SyncApiError>> {
        let url = self.url(&["Services", service_sid, "Maps", unique_name]);
        match self.send(self.http.delete(url)).await? {
            Reply::Success(_) => Ok(true),
            Reply::Failed(failure) if failure.is_not_found() => Ok(false),
            Reply::Failed(failure) => Err(failure.into_error().into()),
        }
    }

    /// Returns the item with the greatest key.
    ///
    /// `None` if the map does not exist or is empty.
    #[instrument(skip(self))]
    pub async fn last_item(
        &self,
        service_sid: &str,
        unique_name: &str,
    ) -> Result<Option<SyncMapItem>, Report<SyncApiError>> {
        let request = self
            .http
            .get(self.url(&["Services", service_sid, "Maps", unique_name, "Items"]))
            .query(&[("PageSize", "1"), ("Order", "desc")]);
        match self.send(request).await? {
            Reply::Success(response) => {
                let page: ItemPage = decode(response).await?;
                Ok(page.items.into_iter().next())
            }
            Reply::Failed(failure) if failure.is_not_found() => Ok(None),
            Reply::Failed(failure) => Err(failure.into_error().into()),
        }
    }

    /// Writes an item, replacing the data of an existing item with the same key.
    #[instrument(skip(self, data))]
    pub async fn put_item(
        &self,
        service_sid: &str,
        unique_name: &str,
        key: &str,
        data: &JsonValue,
    ) -> Result<SyncMapItem, Report<SyncApiError>> {
        let encoded = data.to_string();
        let create = self
            .http
            .post(self.url(&["Services", service_sid, "Maps", unique_name, "Items"]))
            .form(&[("Key", key), ("Data", encoded.as_str())]);
        match self.send(create).await? {
            Reply::Success(response) => decode(response).await,
            Reply::Failed(failure) if failure.is_conflict() => {
                debug!("item key exists, updating in place");
                let update = self
                    .http
                    .post(self.url(&["Services", service_sid, "Maps", unique_name, "Items", key]))
                    .form(&[("Data", encoded.as_str())]);
                self.expect_success(update).await
            }
            Reply::Failed(failure) => Err(failure.into_error().into()),
        }
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL can carry a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Reply, Report<SyncApiError>> {
        let response = request
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| SyncApiError::Transport {
                details: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(Reply::Success(response));
        }

        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
        let code = parsed.as_ref().and_then(|b| b.code);
        let message = parsed
            .and_then(|b| b.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
        Ok(Reply::Failed(Failure {
            status: status.as_u16(),
            code,
            message,
        }))
    }

    async fn expect_success<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, Report<SyncApiError>> {
        match self.send(request).await? {
            Reply::Success(response) => decode(response).await,
            Reply::Failed(failure) => Err(failure.into_error().into()),
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, Report<SyncApiError>> {
    response.json::<T>().await.map_err(|e| {
        SyncApiError::Decode {
            details: e.to_string(),
        }
        .into()
    })
}
