//! Periodic cluster node discovery.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::action::Action;
use crate::client::Dispatcher;
use crate::error::Result;

/// Well-known endpoint listing the live cluster nodes.
const NODES_URI: &str = "_nodes/http";

/// Predicate applied to discovered nodes before they join the pool.
pub type NodeFilter = Arc<dyn Fn(&NodeInfo) -> bool + Send + Sync>;

/// One live node as advertised by the cluster.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfo {
    /// Node identifier (the key in the cluster's node map).
    #[serde(skip)]
    pub id: String,
    /// Node name, if advertised.
    #[serde(default)]
    pub name: Option<String>,
    /// Node attributes, if advertised.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// HTTP transport details.
    #[serde(default)]
    pub http: Option<NodeHttp>,
}

/// HTTP details of a discovered node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeHttp {
    /// Address the node serves HTTP on. Comes as `host:port` or
    /// `hostname/ip:port`.
    #[serde(default)]
    pub publish_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NodesResponse {
    #[serde(default)]
    nodes: HashMap<String, NodeInfo>,
}

/// Keeps the server pool in step with the cluster's live membership.
pub(crate) struct NodeDiscovery {
    dispatcher: Arc<Dispatcher>,
    scheme: String,
    filter: Option<NodeFilter>,
}

impl NodeDiscovery {
    pub(crate) fn new(
        dispatcher: Arc<Dispatcher>,
        scheme: String,
        filter: Option<NodeFilter>,
    ) -> Self {
        Self {
            dispatcher,
            scheme,
            filter,
        }
    }

    /// One discovery cycle. Failures are logged and swallowed; the pool is
    /// only touched when the cluster advertised at least one usable node.
    pub(crate) async fn run_cycle(&self) {
        match self.discover().await {
            Ok(servers) if servers.is_empty() => {
                warn!("discovery returned no usable nodes, keeping current pool");
            }
            Ok(servers) => {
                debug!(nodes = servers.len(), "installing discovered cluster nodes");
                self.dispatcher.pool().replace(servers);
            }
            Err(error) => warn!(%error, "node discovery cycle failed"),
        }
    }

    async fn discover(&self) -> Result<Vec<Url>> {
        let action = Action::get(NODES_URI).typed::<NodesResponse>();
        let listing = self.dispatcher.execute(&action).await?;

        let mut servers = Vec::new();
        for (id, mut node) in listing.nodes {
            node.id = id;
            if let Some(filter) = &self.filter
                && !filter(&node)
            {
                debug!(node = %node.id, "node rejected by discovery filter");
                continue;
            }
            let Some(address) = node.http.as_ref().and_then(|http| http.publish_address.as_deref())
            else {
                debug!(node = %node.id, "node advertises no http address");
                continue;
            };
            match self.base_url(address) {
                Ok(url) => servers.push(url),
                Err(error) => {
                    warn!(node = %node.id, address, %error, "ignoring unparsable publish address");
                }
            }
        }
        Ok(servers)
    }

    fn base_url(&self, publish_address: &str) -> Result<Url> {
        // `hostname/ip:port` advertises both names; the part after the
        // slash is the one to dial.
        let address = publish_address
            .rsplit('/')
            .next()
            .unwrap_or(publish_address);
        Ok(Url::parse(&format!("{}://{}", self.scheme, address))?)
    }
}
