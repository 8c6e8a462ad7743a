//! # Shoal
//!
//! A resilient HTTP client for search-engine clusters: requests are spread
//! round-robin across a pool of interchangeable backend nodes, the pool is
//! kept fresh by periodic node discovery, and idle transport connections
//! are reclaimed in the background.
//!
//! ## Features
//!
//! - **Round-Robin Pool**: lock-free server rotation over an atomically
//!   swapped membership snapshot
//! - **Node Discovery**: periodic `_nodes/http` polling with an optional
//!   node filter
//! - **Idle Reaping**: background eviction of idle pooled connections
//! - **Sync and Callback Execution**: await an action or hand its outcome
//!   to a result handler
//! - **Stable Error Vocabulary**: connect failures, transport failures,
//!   protocol mismatches and decode failures are told apart
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shoal::{Action, ClientConfig, ShoalClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .server("http://localhost:9200")
//!         .build();
//!     let client = ShoalClient::new(config).await?;
//!
//!     let health: serde_json::Value = client.execute(&Action::get("_cluster/health")).await?;
//!     println!("cluster status: {}", health["status"]);
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## With Discovery and Reaping
//!
//! ```rust,no_run
//! use shoal::{ClientConfig, ShoalClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .server("http://seed1:9200")
//!         .server("http://seed2:9200")
//!         .discovery_enabled(true)
//!         .discovery_interval(Duration::from_secs(30))
//!         .discovery_filter(|node| node.attributes.get("role").is_none_or(|r| r == "data"))
//!         .max_connection_idle_time(Duration::from_secs(60))
//!         .build();
//!
//!     // the pool now follows the cluster's live membership
//!     let client = ShoalClient::new(config).await?;
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```

mod action;
mod client;
mod config;
mod discovery;
mod error;
mod pool;
mod reaper;
mod response;
mod task;
mod transport;

pub use action::{Action, Body};
pub use client::{ResultHandler, ShoalClient};
pub use config::{ClientConfig, ClientConfigBuilder, Credentials};
pub use discovery::{NodeFilter, NodeHttp, NodeInfo};
pub use error::{ClientError, Result};
pub use pool::ServerPool;
pub use response::RawResponse;
pub use transport::{HttpTransport, PreparedRequest, Transport};

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, Method, StatusCode, header};
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use shoal::prelude::*;
/// ```
pub mod prelude {
    pub use crate::action::{Action, Body};
    pub use crate::client::{ResultHandler, ShoalClient};
    pub use crate::config::{ClientConfig, ClientConfigBuilder, Credentials};
    pub use crate::error::{ClientError, Result};
    pub use crate::response::RawResponse;
    pub use crate::transport::{PreparedRequest, Transport};
    pub use http::{Method, StatusCode};
}
