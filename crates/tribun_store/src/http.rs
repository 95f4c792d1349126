//! HTTP store implementation.
//!
//! This module provides a store that submits transactions to the store's
//! `/v1/txn` endpoint. The actual HTTP client is abstracted via a trait so
//! different implementations (reqwest, ureq, a loopback for tests) can be
//! plugged in.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryStore;
use crate::store::KvStore;
use crate::txn::{TxnOp, TxnResponse};
use std::sync::Arc;
use tracing::trace;

/// Header carrying the ACL token.
pub const TOKEN_HEADER: &str = "X-Consul-Token";

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. Timeouts are
/// the client's responsibility.
pub trait HttpClient: Send + Sync {
    /// Sends a PUT request and returns the response, whatever its status.
    ///
    /// An `Err` means no response was received.
    fn put(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, String>;
}

/// Store reached over HTTP.
///
/// Uses JSON encoding for request/response bodies.
pub struct HttpStore<C: HttpClient> {
    config: StoreConfig,
    client: C,
}

impl<C: HttpClient> HttpStore<C> {
    /// Creates a new HTTP store.
    pub fn new(config: StoreConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = &self.config.token {
            headers.push((TOKEN_HEADER.to_string(), token.clone()));
        }
        headers
    }
}

impl<C: HttpClient> KvStore for HttpStore<C> {
    fn txn(&self, ops: &[TxnOp]) -> StoreResult<TxnResponse> {
        let body = serde_json::to_vec(ops)?;
        let url = self.config.txn_url()?;
        trace!(%url, ops = ops.len(), "PUT transaction");

        let response = self
            .client
            .put(&url, &self.headers(), body)
            .map_err(StoreError::Transport)?;

        if !response.is_success() {
            return Err(StoreError::status(
                response.status,
                String::from_utf8_lossy(&response.body),
            ));
        }

        Ok(serde_json::from_slice(&response.body)?)
    }
}

/// A loopback HTTP client that routes requests directly to a server.
///
/// Useful for testing the wire format without a network.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles a PUT request.
    fn handle_put(&self, path: &str, body: &[u8]) -> HttpResponse;
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    fn put(
        &self,
        url: &str,
        _headers: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, String> {
        let path = url.find("/v1/").map(|i| &url[i..]).unwrap_or(url);
        let path = path.split('?').next().unwrap_or(path);
        Ok(self.server.handle_put(path, &body))
    }
}

impl LoopbackServer for InMemoryStore {
    fn handle_put(&self, path: &str, body: &[u8]) -> HttpResponse {
        if path != "/v1/txn" {
            return HttpResponse::new(404, format!("no handler for {path}"));
        }

        let ops: Vec<TxnOp> = match serde_json::from_slice(body) {
            Ok(ops) => ops,
            Err(e) => return HttpResponse::new(400, format!("Failed to parse body: {e}")),
        };

        match self.txn(&ops) {
            Ok(response) => match serde_json::to_vec(&response) {
                Ok(body) => HttpResponse::new(200, body),
                Err(e) => HttpResponse::new(500, e.to_string()),
            },
            Err(StoreError::Status { code, body }) => HttpResponse::new(code, body),
            Err(e) => HttpResponse::new(500, e.to_string()),
        }
    }
}

impl<S: LoopbackServer + ?Sized> LoopbackServer for Arc<S> {
    fn handle_put(&self, path: &str, body: &[u8]) -> HttpResponse {
        (**self).handle_put(path, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txn::decode_value;
    use parking_lot::Mutex;

    fn loopback_store() -> (Arc<InMemoryStore>, HttpStore<LoopbackClient<Arc<InMemoryStore>>>) {
        let backend = Arc::new(InMemoryStore::new());
        let store = HttpStore::new(
            StoreConfig::default(),
            LoopbackClient::new(Arc::clone(&backend)),
        );
        (backend, store)
    }

    struct RecordingClient {
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
        response: Result<HttpResponse, String>,
    }

    impl HttpClient for RecordingClient {
        fn put(
            &self,
            url: &str,
            headers: &[(String, String)],
            _body: Vec<u8>,
        ) -> Result<HttpResponse, String> {
            self.requests
                .lock()
                .push((url.to_string(), headers.to_vec()));
            self.response.clone()
        }
    }

    #[test]
    fn loopback_round_trip() {
        let (backend, store) = loopback_store();

        store.txn(&[TxnOp::set("a/b", "value")]).unwrap();
        assert_eq!(backend.get_raw("a/b").as_deref(), Some("value"));

        let response = store.txn(&[TxnOp::get("a/b")]).unwrap();
        let pair = response.pairs().next().unwrap();
        assert_eq!(decode_value(pair.value.as_deref().unwrap()).unwrap(), "value");
    }

    #[test]
    fn loopback_conflict_keeps_body() {
        let (_backend, store) = loopback_store();

        let err = store.txn(&[TxnOp::get("absent")]).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.missing_keys(), Some(vec!["absent".to_string()]));
    }

    #[test]
    fn loopback_unknown_path() {
        let backend = InMemoryStore::new();
        let response = backend.handle_put("/v1/kv/a", b"[]");
        assert_eq!(response.status, 404);
    }

    #[test]
    fn token_and_datacenter_are_sent() {
        let client = RecordingClient {
            requests: Mutex::new(Vec::new()),
            response: Ok(HttpResponse::new(200, r#"{"Results":[],"Errors":null}"#)),
        };
        let config = StoreConfig::new("http://agent:8500")
            .with_token("s3cr3t")
            .with_datacenter("eu");
        let store = HttpStore::new(config, client);

        store.txn(&[TxnOp::get("a")]).unwrap();

        let requests = store.client.requests.lock();
        assert_eq!(requests[0].0, "http://agent:8500/v1/txn?dc=eu");
        assert!(requests[0]
            .1
            .contains(&(TOKEN_HEADER.to_string(), "s3cr3t".to_string())));
    }

    #[test]
    fn invalid_datacenter_sends_nothing() {
        let client = RecordingClient {
            requests: Mutex::new(Vec::new()),
            response: Ok(HttpResponse::new(200, r#"{"Results":[],"Errors":null}"#)),
        };
        let config = StoreConfig::new("http://agent:8500").with_datacenter("eu&stale=1");
        let store = HttpStore::new(config, client);

        let err = store.txn(&[TxnOp::get("a")]).unwrap_err();

        assert!(matches!(err, StoreError::Config(_)));
        assert!(store.client.requests.lock().is_empty());
    }

    #[test]
    fn transport_failure() {
        let client = RecordingClient {
            requests: Mutex::new(Vec::new()),
            response: Err("connection refused".into()),
        };
        let store = HttpStore::new(StoreConfig::default(), client);

        let err = store.txn(&[TxnOp::get("a")]).unwrap_err();
        assert!(matches!(err, StoreError::Transport(ref m) if m == "connection refused"));
    }

    #[test]
    fn malformed_success_body() {
        let client = RecordingClient {
            requests: Mutex::new(Vec::new()),
            response: Ok(HttpResponse::new(200, "not json")),
        };
        let store = HttpStore::new(StoreConfig::default(), client);

        assert!(matches!(
            store.txn(&[TxnOp::get("a")]),
            Err(StoreError::Json(_))
        ));
    }
}
