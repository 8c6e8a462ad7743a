//! HTTP transport over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use http::Method;
use parking_lot::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::response::RawResponse;

/// A fully resolved request: method, absolute URL, body bytes and headers.
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// Resolved HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Body bytes; `None` for bodiless methods.
    pub body: Option<Bytes>,
    /// Header lines in application order; repeated names stay repeated.
    pub headers: Vec<(String, String)>,
}

/// Byte-level HTTP exchange with the cluster.
///
/// Injected into the client as a strategy object, which keeps connection
/// pooling, TLS and proxying out of the dispatch path and makes the client
/// testable against a stub.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the exchange and buffer the response.
    ///
    /// Connect-phase failures are reported as
    /// [`ClientError::CouldNotConnect`] carrying the target URL; any other
    /// I/O failure surfaces as [`ClientError::Transport`].
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse>;

    /// Drop pooled connections that are sitting idle.
    async fn evict_idle(&self);
}

#[derive(Debug, Clone)]
struct TransportSettings {
    connect_timeout: Duration,
    request_timeout: Duration,
    pool_idle_timeout: Duration,
    pool_max_idle_per_host: usize,
    gzip: bool,
    proxy: Option<String>,
    user_agent: String,
}

/// Default [`Transport`] backed by a pooled reqwest client.
pub struct HttpTransport {
    inner: RwLock<reqwest::Client>,
    settings: TransportSettings,
    auth_header: Option<String>,
}

impl HttpTransport {
    /// Build a transport from the client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let settings = TransportSettings {
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
            pool_idle_timeout: config.pool_idle_timeout,
            pool_max_idle_per_host: config.pool_max_idle_per_host,
            gzip: config.gzip,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
        };
        let inner = build_client(&settings)?;
        let auth_header = config.credentials.as_ref().map(|credentials| {
            let encoded = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", credentials.username, credentials.password));
            format!("Basic {encoded}")
        });

        Ok(Self {
            inner: RwLock::new(inner),
            settings,
            auth_header,
        })
    }
}

fn build_client(settings: &TransportSettings) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .connect_timeout(settings.connect_timeout)
        .pool_idle_timeout(settings.pool_idle_timeout)
        .pool_max_idle_per_host(settings.pool_max_idle_per_host)
        .user_agent(settings.user_agent.clone())
        .gzip(settings.gzip);

    if let Some(proxy) = &settings.proxy {
        let proxy = reqwest::Proxy::all(proxy.as_str())
            .map_err(|error| ClientError::Configuration(format!("invalid proxy {proxy}: {error}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|error| ClientError::Configuration(format!("failed to build transport: {error}")))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse> {
        let client = self.inner.read().clone();

        let mut builder = client.request(request.method, request.url.clone());
        if let Some(auth) = &self.auth_header {
            builder = builder.header(http::header::AUTHORIZATION, auth.as_str());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|error| {
            if error.is_connect() {
                ClientError::CouldNotConnect {
                    url: request.url.to_string(),
                    source: error,
                }
            } else {
                ClientError::Transport(error)
            }
        })?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let url = response.url().clone();
        // Drain the body here so the connection goes back to the pool no
        // matter what happens downstream.
        let body = response.bytes().await.map_err(ClientError::Transport)?;

        Ok(RawResponse {
            status,
            reason: status.canonical_reason().unwrap_or("").to_string(),
            version,
            headers,
            body,
            url,
        })
    }

    async fn evict_idle(&self) {
        match build_client(&self.settings) {
            Ok(fresh) => {
                // Swapping in a fresh pool drops every idle connection;
                // in-flight requests hold clones of the old client and
                // finish undisturbed.
                *self.inner.write() = fresh;
                debug!("dropped pooled connections");
            }
            Err(error) => warn!(%error, "failed to rebuild connection pool"),
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("settings", &self.settings)
            .finish()
    }
}
