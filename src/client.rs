//! Cluster client and per-call dispatch.

use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use http::Method;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use url::Url;

use crate::action::{Action, Body};
use crate::config::ClientConfig;
use crate::discovery::NodeDiscovery;
use crate::error::{ClientError, Result};
use crate::pool::ServerPool;
use crate::reaper::IdleReaper;
use crate::response::{RawResponse, decode};
use crate::task::PeriodicTask;
use crate::transport::{HttpTransport, PreparedRequest, Transport};

/// Receives the outcome of [`ShoalClient::execute_callback`].
///
/// Exactly one of the two methods is invoked per submitted action, on a
/// runtime worker rather than the submitting task.
pub trait ResultHandler<T>: Send + 'static {
    /// The action completed and decoded.
    fn completed(&self, value: T);

    /// The action failed; connect-phase failures arrive as
    /// [`ClientError::CouldNotConnect`], exactly as on the awaited path.
    fn failed(&self, error: ClientError);
}

#[derive(Default)]
struct TaskSet {
    discovery: Option<PeriodicTask>,
    reaper: Option<PeriodicTask>,
}

/// The per-call execution path: resolves the next server, renders the
/// concrete request and runs it through the transport. Shared between the
/// client surface and the discovery task.
pub(crate) struct Dispatcher {
    transport: Arc<dyn Transport>,
    pool: ServerPool,
    default_headers: Vec<(String, String)>,
}

impl Dispatcher {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        pool: ServerPool,
        default_headers: Vec<(String, String)>,
    ) -> Self {
        Self {
            transport,
            pool,
            default_headers,
        }
    }

    pub(crate) fn pool(&self) -> &ServerPool {
        &self.pool
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Build the concrete request for an action: next pool server plus the
    /// action URI, method dispatch, body rendering, then configuration
    /// headers and per-action headers applied literally, duplicates and all.
    pub(crate) fn prepare<T>(&self, action: &Action<T>) -> Result<PreparedRequest> {
        let base = self.pool.next();
        let url = request_url(&base, action.uri())?;
        let (method, body) = construct_method(action.method(), action.body())?;

        debug!(method = %method, url = %url, "prepared request");

        let mut headers = self.default_headers.clone();
        headers.extend(action.headers().iter().cloned());

        Ok(PreparedRequest {
            method,
            url,
            body,
            headers,
        })
    }

    pub(crate) async fn execute<T: DeserializeOwned>(&self, action: &Action<T>) -> Result<T> {
        let request = self.prepare(action)?;
        let request_line = format!("{} {}", request.method, request.url);
        let response = self.transport.execute(request).await?;
        decode(&response, &request_line)
    }

    pub(crate) async fn execute_raw<T>(&self, action: &Action<T>) -> Result<RawResponse> {
        let request = self.prepare(action)?;
        self.transport.execute(request).await
    }
}

/// Join a pool base URL and an action URI suffix.
fn request_url(base: &Url, uri: &str) -> Result<Url> {
    let mut raw = base.as_str().trim_end_matches('/').to_string();
    let suffix = uri.trim_start_matches('/');
    if !suffix.is_empty() {
        raw.push('/');
        raw.push_str(suffix);
    }
    Url::parse(&raw).map_err(ClientError::from)
}

/// Map a method name onto a concrete method and body.
///
/// Case-insensitive over a fixed set: GET and HEAD never carry a body;
/// POST, PUT and DELETE always do, an empty one if the action supplied
/// none. Any other name yields a bare request with only the URL set rather
/// than an error.
fn construct_method(name: &str, body: Option<&Body>) -> Result<(Method, Option<Bytes>)> {
    fn payload(body: Option<&Body>) -> Result<Bytes> {
        match body {
            Some(body) => Ok(Bytes::from(body.to_bytes()?)),
            None => Ok(Bytes::new()),
        }
    }

    if name.eq_ignore_ascii_case("POST") {
        Ok((Method::POST, Some(payload(body)?)))
    } else if name.eq_ignore_ascii_case("PUT") {
        Ok((Method::PUT, Some(payload(body)?)))
    } else if name.eq_ignore_ascii_case("DELETE") {
        Ok((Method::DELETE, Some(payload(body)?)))
    } else if name.eq_ignore_ascii_case("GET") {
        Ok((Method::GET, None))
    } else if name.eq_ignore_ascii_case("HEAD") {
        Ok((Method::HEAD, None))
    } else {
        Ok((Method::GET, None))
    }
}

/// Cluster-aware HTTP client.
///
/// Distributes actions across a round-robin pool of backend nodes, keeps
/// the pool fresh through periodic discovery and reclaims idle transport
/// connections in the background. Cloning is cheap and clones share the
/// pool, the transport and the background tasks.
#[derive(Clone)]
pub struct ShoalClient {
    dispatcher: Arc<Dispatcher>,
    tasks: Arc<Mutex<TaskSet>>,
}

impl ShoalClient {
    /// Build a client over the default reqwest-backed transport and start
    /// the background tasks the configuration asks for. Returns only once
    /// every started task is confirmed running.
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(config, transport).await
    }

    /// Build a client over a caller-supplied transport.
    pub async fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let pool = ServerPool::new(config.parsed_servers()?)?;
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&transport),
            pool,
            config.default_headers.clone(),
        ));

        let mut tasks = TaskSet::default();

        if config.discovery_enabled {
            info!(interval = ?config.discovery_interval, "node discovery enabled");
            let discovery = Arc::new(NodeDiscovery::new(
                Arc::clone(&dispatcher),
                config.discovery_scheme.clone(),
                config.discovery_filter.clone(),
            ));
            let mut task = PeriodicTask::new(
                "node-discovery",
                config.discovery_interval,
                move || {
                    let discovery = Arc::clone(&discovery);
                    async move { discovery.run_cycle().await }.boxed()
                },
            );
            task.start().await;
            tasks.discovery = Some(task);
        } else {
            debug!("node discovery disabled");
        }

        if let Some(max_idle) = config.max_connection_idle_time {
            info!(max_idle = ?max_idle, "idle connection reaping enabled");
            let reaper = Arc::new(IdleReaper::new(Arc::clone(&transport), max_idle));
            let mut task = PeriodicTask::new("idle-reaper", config.reap_interval, move || {
                let reaper = Arc::clone(&reaper);
                async move { reaper.run_cycle().await }.boxed()
            });
            task.start().await;
            tasks.reaper = Some(task);
        } else {
            debug!("idle connection reaping disabled");
        }

        Ok(Self {
            dispatcher,
            tasks: Arc::new(Mutex::new(tasks)),
        })
    }

    /// Execute an action and decode its response, blocking the calling task
    /// until both complete. One pool selection per call; failed calls are
    /// not retried on another server — resubmission is the caller's choice.
    pub async fn execute<T: DeserializeOwned>(&self, action: &Action<T>) -> Result<T> {
        self.dispatcher.execute(action).await
    }

    /// Execute an action and return the buffered response without decoding,
    /// for status-only calls such as HEAD probes.
    pub async fn execute_raw<T>(&self, action: &Action<T>) -> Result<RawResponse> {
        self.dispatcher.execute_raw(action).await
    }

    /// Execute an action without blocking the caller, delivering the
    /// outcome to `handler` on a runtime worker. Every failure, decode
    /// failures included, is funneled into [`ResultHandler::failed`] —
    /// nothing escapes into the runtime.
    pub fn execute_callback<T, H>(&self, action: Action<T>, handler: H)
    where
        T: DeserializeOwned + Send + 'static,
        H: ResultHandler<T>,
    {
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            match dispatcher.execute(&action).await {
                Ok(value) => handler.completed(value),
                Err(err) => {
                    error!(error = %err, "asynchronous execution failed");
                    handler.failed(err);
                }
            }
        });
    }

    /// Build the concrete request an action would be sent as. Advances the
    /// round-robin position. Exposed for diagnostics and tests.
    pub fn prepare_request<T>(&self, action: &Action<T>) -> Result<PreparedRequest> {
        self.dispatcher.prepare(action)
    }

    /// Base URL at the current round-robin position, advancing it.
    pub fn next_server(&self) -> Url {
        self.dispatcher.pool.next()
    }

    /// Number of servers currently in the pool.
    pub fn server_pool_len(&self) -> usize {
        self.dispatcher.pool.len()
    }

    /// Stop the background tasks and drop pooled connections. Returns only
    /// once no discovery or reaper cycle can fire anymore. Idempotent.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        if let Some(task) = tasks.discovery.as_mut() {
            task.stop().await;
        }
        if let Some(task) = tasks.reaper.as_mut() {
            task.stop().await;
        }
        self.dispatcher.transport().evict_idle().await;
        info!("cluster client shut down");
    }
}

impl std::fmt::Debug for ShoalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShoalClient")
            .field("servers", &self.dispatcher.pool.snapshot())
            .finish()
    }
}
