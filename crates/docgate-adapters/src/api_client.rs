//! Remote [`DataAccess`] over the docgate HTTP API.
//!
//! Reads (`GET`, query, export) use a 10 second timeout and writes
//! (insert, update, delete) 20 seconds.  Transport failures are reported as
//! error envelopes naming the target URL.  A response that carries an
//! envelope body is passed through even when the HTTP status is not 2xx,
//! so store errors raised by the server reach the caller verbatim.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use docgate_store::{Document, Filter};

use crate::access::DataAccess;
use crate::envelope::Envelope;
use crate::error::{AdapterError, Result};

/// Timeout applied to read requests.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout applied to write requests.
const WRITE_TIMEOUT: Duration = Duration::from_secs(20);

/// Default API location.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8001";

/// Settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the HTTP API; routes are resolved relative to it.
    pub base_url: String,
    /// When `false` every call answers "API bridge disabled".
    pub enabled: bool,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.into(),
            enabled: true,
        }
    }
}

/// HTTP client for the collections API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    enabled: bool,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client for `config.base_url`.
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let mut base = Url::parse(&config.base_url)?;
        if base.cannot_be_a_base() {
            return Err(AdapterError::ConfigError(format!(
                "API url `{}` cannot be used as a base",
                config.base_url
            )));
        }
        // Relative joins must land below the base path, not replace its
        // last segment.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("docgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AdapterError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base,
            enabled: config.enabled,
            client,
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a route relative to the base URL.
    fn endpoint(&self, route: &str) -> Result<Url> {
        Ok(self.base.join(route)?)
    }

    /// `collections/{name}/info`, with `name` percent-encoded as one segment.
    fn info_endpoint(&self, collection: &str) -> Result<Url> {
        let mut url = self.endpoint("collections/")?;
        url.path_segments_mut()
            .map_err(|()| AdapterError::ConfigError("API url cannot be a base".into()))?
            .pop_if_empty()
            .push(collection)
            .push("info");
        Ok(url)
    }

    async fn get_route(&self, route: &str) -> Result<Envelope> {
        self.get(self.endpoint(route)?).await
    }

    async fn post_route(&self, route: &str, body: Value, timeout: Duration) -> Result<Envelope> {
        let url = self.endpoint(route)?;
        let request = self.client.post(url.clone()).json(&body);
        self.send(request, url, timeout).await
    }

    async fn get(&self, url: Url) -> Result<Envelope> {
        let request = self.client.get(url.clone());
        self.send(request, url, READ_TIMEOUT).await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: Url,
        timeout: Duration,
    ) -> Result<Envelope> {
        if !self.enabled {
            return Err(AdapterError::Disabled);
        }
        debug!(url = %url, timeout_secs = timeout.as_secs(), "API request");

        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, &url))?;
        let status = response.status();

        let body = response.bytes().await.map_err(|e| transport_error(e, &url))?;
        match serde_json::from_slice::<Envelope>(&body) {
            Ok(envelope) => {
                if !status.is_success() {
                    debug!(url = %url, status = status.as_u16(), "API returned an error envelope");
                }
                Ok(envelope)
            }
            Err(_) if !status.is_success() => Err(AdapterError::Request(format!(
                "{status} from {url}"
            ))),
            Err(e) => Err(AdapterError::Request(format!(
                "invalid response body from {url}: {e}"
            ))),
        }
    }
}

fn transport_error(err: reqwest::Error, url: &Url) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_connect() {
        AdapterError::Connect {
            url: url.to_string(),
        }
    } else {
        AdapterError::Request(err.to_string())
    }
}

fn finish(operation: &str, result: Result<Envelope>) -> Envelope {
    if let Err(e) = &result {
        warn!(operation, error = %e, "API call failed");
    }
    result.into()
}

#[async_trait]
impl DataAccess for ApiClient {
    async fn list_collections(&self) -> Envelope {
        finish("list_collections", self.get_route("collections").await)
    }

    async fn query(&self, collection: &str, filter: Filter, limit: usize) -> Envelope {
        let body = json!({"collection": collection, "filter": filter, "limit": limit});
        finish(
            "query",
            self.post_route("collections/query", body, READ_TIMEOUT).await,
        )
    }

    async fn insert(&self, collection: &str, document: Document) -> Envelope {
        let body = json!({"collection": collection, "document": document});
        finish(
            "insert",
            self.post_route("collections/insert", body, WRITE_TIMEOUT).await,
        )
    }

    async fn update(&self, collection: &str, filter: Filter, update: Value) -> Envelope {
        let body = json!({"collection": collection, "filter": filter, "update": update});
        finish(
            "update",
            self.post_route("collections/update", body, WRITE_TIMEOUT).await,
        )
    }

    async fn delete(&self, collection: &str, filter: Filter) -> Envelope {
        let body = json!({"collection": collection, "filter": filter});
        finish(
            "delete",
            self.post_route("collections/delete", body, WRITE_TIMEOUT).await,
        )
    }

    async fn collection_info(&self, collection: &str) -> Envelope {
        let result = match self.info_endpoint(collection) {
            Ok(url) => self.get(url).await,
            Err(e) => Err(e),
        };
        finish("collection_info", result)
    }

    async fn export(&self, collection: &str, filter: Filter) -> Envelope {
        let body = json!({"collection": collection, "filter": filter});
        finish(
            "export",
            self.post_route("collections/export", body, READ_TIMEOUT).await,
        )
    }

    async fn health(&self) -> Envelope {
        match self.get_route("health").await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "API health check failed");
                Envelope::unhealthy(e.to_string())
            }
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(ApiClientConfig {
            base_url: base.into(),
            enabled: true,
        })
        .unwrap()
    }

    #[test]
    fn base_without_trailing_slash_keeps_its_path() {
        let c = client("http://localhost:8001/api");
        assert_eq!(
            c.endpoint("collections/query").unwrap().as_str(),
            "http://localhost:8001/api/collections/query"
        );
    }

    #[test]
    fn info_endpoint_encodes_collection_name() {
        let c = client("http://localhost:8001");
        assert_eq!(
            c.info_endpoint("my coll").unwrap().as_str(),
            "http://localhost:8001/collections/my%20coll/info"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ApiClient::new(ApiClientConfig {
            base_url: "not a url".into(),
            enabled: true,
        })
        .unwrap_err();
        assert!(matches!(err, AdapterError::ConfigError(_)));
    }

    #[tokio::test]
    async fn disabled_bridge_short_circuits() {
        let c = ApiClient::new(ApiClientConfig {
            base_url: DEFAULT_API_URL.into(),
            enabled: false,
        })
        .unwrap();
        let env = c.list_collections().await;
        assert_eq!(env.error_message(), Some("API bridge disabled"));
        let health = c.health().await;
        assert_eq!(health.status, crate::Status::Unhealthy);
    }

    #[tokio::test]
    async fn unreachable_api_names_the_url() {
        // Bind then drop a listener so the port is very likely closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let c = client(&format!("http://127.0.0.1:{port}"));
        let env = c.query("employees", Filter::empty(), 10).await;
        let message = env.error_message().unwrap();
        assert!(
            message.starts_with("Cannot connect to API at http://127.0.0.1:"),
            "{message}"
        );
        assert!(message.ends_with("/collections/query"), "{message}");
    }
}
