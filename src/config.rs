//! Client configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::discovery::{NodeFilter, NodeInfo};
use crate::error::{ClientError, Result};

/// Basic-auth credentials applied to every outgoing request.
#[derive(Clone)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Cluster client configuration.
///
/// [`ClientConfig::default`] targets a single local node, the conventional
/// "no configuration" setup. Anything built through the builder must name at
/// least one server or client construction fails with a configuration error.
#[derive(Clone)]
pub struct ClientConfig {
    /// Initial base URIs of the backend nodes. Must not be empty.
    pub server_uris: Vec<String>,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Overall per-request timeout, covering everything past the connect.
    pub request_timeout: Duration,
    /// Whether to run periodic node discovery.
    pub discovery_enabled: bool,
    /// Interval between discovery cycles.
    pub discovery_interval: Duration,
    /// Optional predicate over discovered nodes; `None` accepts all.
    pub discovery_filter: Option<NodeFilter>,
    /// Scheme used for base URLs built from discovered addresses.
    pub discovery_scheme: String,
    /// Idle age past which pooled connections are reaped; `None` disables
    /// the reaper.
    pub max_connection_idle_time: Option<Duration>,
    /// Interval between reaper cycles.
    pub reap_interval: Duration,
    /// Idle timeout applied by the transport's own pool.
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// Headers applied to every request before per-action headers.
    pub default_headers: Vec<(String, String)>,
    /// Enable response compression on the transport.
    pub gzip: bool,
    /// Optional proxy URL, passed through to the transport.
    pub proxy: Option<String>,
    /// Optional basic-auth credentials.
    pub credentials: Option<Credentials>,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_uris: vec!["http://localhost:9200".to_string()],
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            discovery_enabled: false,
            discovery_interval: Duration::from_secs(10),
            discovery_filter: None,
            discovery_scheme: "http".to_string(),
            max_connection_idle_time: None,
            reap_interval: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            default_headers: Vec::new(),
            gzip: true,
            proxy: None,
            credentials: None,
            user_agent: format!("shoal/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create a configuration builder with no servers preset.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Parse and validate the configured server list.
    pub(crate) fn parsed_servers(&self) -> Result<Vec<Url>> {
        if self.server_uris.is_empty() {
            return Err(ClientError::Configuration(
                "at least one server URI is required".to_string(),
            ));
        }
        self.server_uris
            .iter()
            .map(|raw| {
                let url = Url::parse(raw).map_err(|error| {
                    ClientError::Configuration(format!("invalid server URI `{raw}`: {error}"))
                })?;
                if url.host_str().is_none() {
                    return Err(ClientError::Configuration(format!(
                        "server URI `{raw}` has no host"
                    )));
                }
                Ok(url)
            })
            .collect()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_uris", &self.server_uris)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("discovery_enabled", &self.discovery_enabled)
            .field("discovery_interval", &self.discovery_interval)
            .field("discovery_filter", &self.discovery_filter.is_some())
            .field("discovery_scheme", &self.discovery_scheme)
            .field("max_connection_idle_time", &self.max_connection_idle_time)
            .field("reap_interval", &self.reap_interval)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("default_headers", &self.default_headers)
            .field("gzip", &self.gzip)
            .field("proxy", &self.proxy)
            .field("credentials", &self.credentials)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            config: ClientConfig {
                server_uris: Vec::new(),
                ..ClientConfig::default()
            },
        }
    }
}

impl ClientConfigBuilder {
    /// Add a backend node base URI.
    pub fn server(mut self, uri: impl Into<String>) -> Self {
        self.config.server_uris.push(uri.into());
        self
    }

    /// Replace the full server list.
    pub fn servers<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.server_uris = uris.into_iter().map(Into::into).collect();
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Enable or disable periodic node discovery.
    pub fn discovery_enabled(mut self, enabled: bool) -> Self {
        self.config.discovery_enabled = enabled;
        self
    }

    /// Set the interval between discovery cycles.
    pub fn discovery_interval(mut self, interval: Duration) -> Self {
        self.config.discovery_interval = interval;
        self
    }

    /// Only admit discovered nodes the predicate accepts.
    pub fn discovery_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&NodeInfo) -> bool + Send + Sync + 'static,
    {
        self.config.discovery_filter = Some(Arc::new(filter));
        self
    }

    /// Scheme for base URLs built from discovered publish addresses.
    pub fn discovery_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.discovery_scheme = scheme.into();
        self
    }

    /// Reap pooled connections idle longer than this.
    pub fn max_connection_idle_time(mut self, max_idle: Duration) -> Self {
        self.config.max_connection_idle_time = Some(max_idle);
        self
    }

    /// Set the interval between reaper cycles.
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.config.reap_interval = interval;
        self
    }

    /// Set the transport pool idle timeout.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Set the maximum idle connections per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Add a header applied to every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    /// Enable or disable response compression.
    pub fn gzip(mut self, enable: bool) -> Self {
        self.config.gzip = enable;
        self
    }

    /// Route requests through a proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Authenticate every request with basic auth.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
