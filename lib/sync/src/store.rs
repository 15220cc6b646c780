//! Conversation store backed by Twilio Sync.
//!
//! One Sync map per caller, named after the normalized caller id. Each map
//! item is one snapshot keyed by its ISO-8601 entry key; Sync lists items in
//! key order, so the latest snapshot is the first item of a descending page.

use crate::client::SyncClient;
use crate::config::SyncConfig;
use crate::error::SyncApiError;
use async_trait::async_trait;
use lasting_conversation::{
    ConversationStore, EntryKey, LogHandle, Snapshot, StoreError, StoreLookup,
};
use lasting_core::CallerId;
use rootcause::Report;
use tracing::{debug, info, instrument, warn};

/// Twilio Sync implementation of [`ConversationStore`].
#[derive(Debug, Clone)]
pub struct SyncConversationStore {
    client: SyncClient,
    service_sid: String,
}

impl SyncConversationStore {
    /// Creates a store over an already resolved service.
    #[must_use]
    pub fn new(client: SyncClient, service_sid: impl Into<String>) -> Self {
        Self {
            client,
            service_sid: service_sid.into(),
        }
    }

    /// Builds the client and resolves the Sync service.
    ///
    /// Uses `service_sid` when configured, otherwise finds the service by
    /// friendly name and creates it if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built or the service cannot
    /// be resolved.
    pub async fn connect(config: &SyncConfig) -> Result<Self, Report<StoreError>> {
        let client = SyncClient::new(config).map_err(|report| {
            let reason = report.current_context().to_string();
            report.context(StoreError::ConnectionFailed { reason })
        })?;

        let service_sid = match &config.service_sid {
            Some(sid) => sid.clone(),
            None => {
                let service = client
                    .find_or_create_service(&config.service_name)
                    .await
                    .map_err(|report| store_error("resolve_service", report))?;
                service.sid
            }
        };

        info!(service_sid = %service_sid, "Connected to Twilio Sync");
        Ok(Self::new(client, service_sid))
    }

    /// Returns the SID of the service holding the logs.
    #[must_use]
    pub fn service_sid(&self) -> &str {
        &self.service_sid
    }
}

/// Wraps a Sync API failure in the store error matching its cause.
fn store_error(operation: &str, report: Report<SyncApiError>) -> Report<StoreError> {
    let context = match report.current_context() {
        SyncApiError::Transport { details } => StoreError::ConnectionFailed {
            reason: details.clone(),
        },
        SyncApiError::Decode { details } => StoreError::UnexpectedResponse {
            operation: operation.to_string(),
            reason: details.clone(),
        },
        other => StoreError::RequestFailed {
            operation: operation.to_string(),
            reason: other.to_string(),
        },
    };
    report.context(context)
}

#[async_trait]
impl ConversationStore for SyncConversationStore {
    #[instrument(skip_all, fields(caller = %caller))]
    async fn ensure_log(&self, caller: &CallerId) -> Result<LogHandle, Report<StoreError>> {
        let handle = LogHandle::for_caller(caller);
        let map = self
            .client
            .ensure_map(&self.service_sid, handle.name())
            .await
            .map_err(|report| store_error("ensure_log", report))?;
        debug!(map_sid = %map.sid, "Caller log ready");
        Ok(handle)
    }

    #[instrument(skip_all, fields(log = log.name(), key = %key))]
    async fn append(
        &self,
        log: &LogHandle,
        key: &EntryKey,
        snapshot: &Snapshot,
    ) -> Result<(), Report<StoreError>> {
        let data = serde_json::to_value(snapshot).map_err(|e| StoreError::InvalidData {
            reason: e.to_string(),
        })?;
        self.client
            .put_item(&self.service_sid, log.name(), key.as_str(), &data)
            .await
            .map_err(|report| store_error("append", report))?;
        Ok(())
    }

    #[instrument(skip_all, fields(log = log.name()))]
    async fn latest(&self, log: &LogHandle) -> Result<StoreLookup, Report<StoreError>> {
        let item = self
            .client
            .last_item(&self.service_sid, log.name())
            .await
            .map_err(|report| store_error("latest", report))?;

        let Some(item) = item else {
            return Ok(StoreLookup::NotFound);
        };

        match serde_json::from_value::<Snapshot>(item.data) {
            Ok(snapshot) => Ok(StoreLookup::Found {
                key: EntryKey::new(item.key),
                snapshot,
            }),
            Err(e) => {
                warn!(key = %item.key, error = %e, "Unreadable snapshot, treating log as empty");
                Ok(StoreLookup::NotFound)
            }
        }
    }

    #[instrument(skip_all, fields(log = log.name()))]
    async fn delete_log(&self, log: &LogHandle) -> Result<(), Report<StoreError>> {
        let existed = self
            .client
            .delete_map(&self.service_sid, log.name())
            .await
            .map_err(|report| store_error("delete_log", report))?;
        if !existed {
            debug!("Caller log already absent");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lasting_conversation::{Page, Parameters};
    use lasting_core::SessionId;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn caller() -> CallerId {
        CallerId::parse("+15551234567").expect("valid caller")
    }

    fn store(server: &Server) -> SyncConversationStore {
        let config = SyncConfig::new("AC123", "secret").with_base_url(server.url());
        SyncConversationStore::new(SyncClient::new(&config).expect("client"), "IS1")
    }

    fn items_body(items: serde_json::Value) -> String {
        json!({ "items": items, "meta": {} }).to_string()
    }

    #[tokio::test]
    async fn connect_uses_configured_service_sid() {
        let mut server = Server::new_async().await;
        let list = server
            .mock("GET", "/Services")
            .expect(0)
            .create_async()
            .await;

        let config = SyncConfig::new("AC123", "secret")
            .with_base_url(server.url())
            .with_service_sid("IS42");
        let store = SyncConversationStore::connect(&config)
            .await
            .expect("connect");

        assert_eq!(store.service_sid(), "IS42");
        list.assert_async().await;
    }

    #[tokio::test]
    async fn connect_resolves_service_by_name() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/Services")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "services": [{ "sid": "IS7", "friendly_name": "lasting-sessions" }],
                    "meta": { "next_page_url": null }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let config = SyncConfig::new("AC123", "secret").with_base_url(server.url());
        let store = SyncConversationStore::connect(&config)
            .await
            .expect("connect");
        assert_eq!(store.service_sid(), "IS7");
    }

    #[tokio::test]
    async fn latest_decodes_stored_snapshot() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/Services/IS1/Maps/15551234567/Items")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(items_body(json!([{
                "key": "2026-10-19T08:15:31.000Z",
                "data": {
                    "sessionID": "s1",
                    "currentPage": { "name": "pages/amount", "displayName": "Collect Amount" },
                    "parameters": { "amount": "500" },
                    "virtualAgentReply": ["How much would you like to pay?"]
                }
            }])))
            .create_async()
            .await;

        let lookup = store(&server)
            .latest(&LogHandle::for_caller(&caller()))
            .await
            .expect("latest");

        let StoreLookup::Found { key, snapshot } = lookup else {
            panic!("expected an entry");
        };
        assert_eq!(key.as_str(), "2026-10-19T08:15:31.000Z");
        assert_eq!(snapshot.session_id, Some(SessionId::new("s1")));
        assert!(snapshot.is_revivable());
    }

    #[tokio::test]
    async fn latest_on_empty_or_missing_log_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/Services/IS1/Maps/15551234567/Items")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(items_body(json!([])))
            .create_async()
            .await;
        server
            .mock("GET", "/Services/IS1/Maps/15550000000/Items")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(json!({ "code": 20404, "message": "not found", "status": 404 }).to_string())
            .create_async()
            .await;

        let store = store(&server);
        let empty = store
            .latest(&LogHandle::for_caller(&caller()))
            .await
            .expect("latest");
        let missing = store
            .latest(&LogHandle::for_caller(
                &CallerId::parse("15550000000").expect("valid caller"),
            ))
            .await
            .expect("latest");

        assert_eq!(empty, StoreLookup::NotFound);
        assert_eq!(missing, StoreLookup::NotFound);
    }

    #[tokio::test]
    async fn latest_with_unreadable_data_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/Services/IS1/Maps/15551234567/Items")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(items_body(json!([{
                "key": "2026-10-19T08:15:31.000Z",
                "data": { "sessionID": 17 }
            }])))
            .create_async()
            .await;

        let lookup = store(&server)
            .latest(&LogHandle::for_caller(&caller()))
            .await
            .expect("latest");
        assert_eq!(lookup, StoreLookup::NotFound);
    }

    #[tokio::test]
    async fn append_writes_snapshot_under_key() {
        let mut server = Server::new_async().await;
        let snapshot = Snapshot {
            session_id: Some(SessionId::new("s1")),
            current_page: Some(Page::new("pages/amount", "Collect Amount")),
            parameters: Some(Parameters::new()),
            ..Snapshot::default()
        };
        let write = server
            .mock("POST", "/Services/IS1/Maps/15551234567/Items")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("Key".to_string(), "2026-10-19T08:15:31.000Z".to_string()),
                Matcher::Regex("sessionID".to_string()),
            ]))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(json!({ "key": "2026-10-19T08:15:31.000Z", "data": {} }).to_string())
            .create_async()
            .await;

        store(&server)
            .append(
                &LogHandle::for_caller(&caller()),
                &EntryKey::new("2026-10-19T08:15:31.000Z"),
                &snapshot,
            )
            .await
            .expect("append");
        write.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_sync_is_connection_failure() {
        // Nothing listens on port 9 of the loopback address.
        let config = SyncConfig::new("AC123", "secret").with_base_url("http://127.0.0.1:9");
        let store = SyncConversationStore::new(SyncClient::new(&config).expect("client"), "IS1");

        let err = store
            .latest(&LogHandle::for_caller(&caller()))
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            StoreError::ConnectionFailed { .. }
        ));
    }

    #[tokio::test]
    async fn delete_log_tolerates_missing_map() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", "/Services/IS1/Maps/15551234567")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(json!({ "code": 20404, "message": "not found", "status": 404 }).to_string())
            .create_async()
            .await;

        store(&server)
            .delete_log(&LogHandle::for_caller(&caller()))
            .await
            .expect("delete_log");
        delete.assert_async().await;
    }
}
