//! Idle connection reaping.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::transport::Transport;

/// Tells the transport to drop connections that sat idle past the
/// configured threshold. No decoding, no pool interaction.
pub(crate) struct IdleReaper {
    transport: Arc<dyn Transport>,
    max_idle: Duration,
}

impl IdleReaper {
    pub(crate) fn new(transport: Arc<dyn Transport>, max_idle: Duration) -> Self {
        Self { transport, max_idle }
    }

    pub(crate) async fn run_cycle(&self) {
        debug!(max_idle = ?self.max_idle, "reaping idle connections");
        self.transport.evict_idle().await;
    }
}
