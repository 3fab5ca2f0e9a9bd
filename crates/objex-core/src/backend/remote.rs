//! # Remote Backend
//!
//! Speaks the objex daemon's REST API, turning every trait operation into
//! one HTTP round-trip. TTL enforcement happens on the daemon side; this
//! side only ships the requested lifetime along with the payload.
//!
//! Identifiers are UUID v4: many server processes may share one daemon, so
//! a process-local counter would collide.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::Backend;
use crate::error::ObjexError;

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Body of `PUT /kv/{key}`. Payload bytes travel base64-encoded.
#[derive(Debug, Serialize)]
struct SetRequest {
    payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl_seconds: Option<u64>,
}

/// Body of a successful `GET /kv/{key}`.
#[derive(Debug, Deserialize)]
struct FetchResponse {
    payload: String,
}

/// Body of `DELETE /kv/{key}`.
#[derive(Debug, Deserialize)]
struct DeleteResponse {
    deleted: bool,
}

/// Body of `GET /status`. Only the live-key count matters here.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    keys: usize,
}

// =============================================================================
// REMOTE BACKEND
// =============================================================================

/// Networked backend delegating storage and expiry to an objex daemon.
#[derive(Clone)]
pub struct RemoteBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl RemoteBackend {
    /// Connect to a daemon and verify it is reachable.
    ///
    /// The health check runs here so a bad connection string fails process
    /// startup immediately instead of surfacing on the first store call.
    pub async fn connect(
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, ObjexError> {
        let backend = Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url.into()),
            api_key,
        };
        backend.ping().await?;
        Ok(backend)
    }

    /// GET /health, mapping any failure to `BackendUnavailable`.
    async fn ping(&self) -> Result<(), ObjexError> {
        let resp = self
            .send(self.request(reqwest::Method::GET, "/health"))
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ObjexError::BackendUnavailable(format!(
                "{} answered health check with {}",
                self.base_url,
                resp.status()
            )))
        }
    }

    /// Build a request with optional Bearer auth.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Send a request and map connection errors.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ObjexError> {
        req.send().await.map_err(|e| {
            ObjexError::BackendUnavailable(format!("{}: {e}", self.base_url))
        })
    }

    /// Reject non-success statuses that have no domain meaning.
    fn check_status(&self, resp: &reqwest::Response) -> Result<(), ObjexError> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ObjexError::BackendUnavailable(format!(
                "{} returned {status}",
                self.base_url
            )))
        }
    }
}

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[async_trait]
impl Backend for RemoteBackend {
    fn generate_id(&self) -> Result<String, ObjexError> {
        Ok(Uuid::new_v4().to_string())
    }

    async fn set(
        &self,
        key: &str,
        payload: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), ObjexError> {
        let body = SetRequest {
            payload: BASE64.encode(payload),
            ttl_seconds: ttl.map(|ttl| ttl.as_secs()),
        };
        let req = self
            .request(reqwest::Method::PUT, &format!("/kv/{key}"))
            .json(&body);
        let resp = self.send(req).await?;
        self.check_status(&resp)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ObjexError> {
        let req = self.request(reqwest::Method::GET, &format!("/kv/{key}"));
        let resp = self.send(req).await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.check_status(&resp)?;

        let body: FetchResponse = resp
            .json()
            .await
            .map_err(|e| ObjexError::DecodingError(e.to_string()))?;
        let payload = BASE64
            .decode(body.payload)
            .map_err(|e| ObjexError::DecodingError(format!("invalid base64 payload: {e}")))?;
        Ok(Some(payload))
    }

    async fn delete(&self, key: &str) -> Result<bool, ObjexError> {
        let req = self.request(reqwest::Method::DELETE, &format!("/kv/{key}"));
        let resp = self.send(req).await?;
        self.check_status(&resp)?;

        let body: DeleteResponse = resp
            .json()
            .await
            .map_err(|e| ObjexError::DecodingError(e.to_string()))?;
        Ok(body.deleted)
    }

    async fn len(&self) -> Result<usize, ObjexError> {
        let resp = self
            .send(self.request(reqwest::Method::GET, "/status"))
            .await?;
        self.check_status(&resp)?;

        let body: StatusResponse = resp
            .json()
            .await
            .map_err(|e| ObjexError::DecodingError(e.to_string()))?;
        Ok(body.keys)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slashes_are_trimmed() {
        assert_eq!(
            normalize_base_url("http://localhost:7474///".to_string()),
            "http://localhost:7474"
        );
        assert_eq!(
            normalize_base_url("http://localhost:7474".to_string()),
            "http://localhost:7474"
        );
    }

    #[test]
    fn generated_ids_are_uuids() {
        let backend = RemoteBackend {
            http: reqwest::Client::new(),
            base_url: "http://localhost:7474".to_string(),
            api_key: None,
        };
        let a = backend.generate_id().expect("id");
        let b = backend.generate_id().expect("id");
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn set_request_omits_absent_ttl() {
        let without = serde_json::to_string(&SetRequest {
            payload: BASE64.encode(b"v"),
            ttl_seconds: None,
        })
        .expect("serialize");
        assert!(!without.contains("ttl_seconds"));

        let with = serde_json::to_string(&SetRequest {
            payload: BASE64.encode(b"v"),
            ttl_seconds: Some(600),
        })
        .expect("serialize");
        assert!(with.contains("\"ttl_seconds\":600"));
    }
}
