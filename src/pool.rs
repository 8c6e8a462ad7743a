//! Round-robin server pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use url::Url;

use crate::error::{ClientError, Result};

/// Ordered set of backend base URLs with round-robin selection.
///
/// The membership is an immutable snapshot swapped out atomically by
/// [`replace`](Self::replace), so readers always observe a fully formed
/// list. The cursor is a monotonic counter taken modulo the snapshot
/// length, which keeps [`next`](Self::next) lock-free apart from the
/// snapshot clone and makes an out-of-range index impossible even while a
/// replacement is in flight.
pub struct ServerPool {
    servers: RwLock<Arc<Vec<Url>>>,
    cursor: AtomicUsize,
}

impl ServerPool {
    /// Create a pool from an initial membership. At least one base URL is
    /// required; the pool never becomes empty afterwards.
    pub fn new(servers: Vec<Url>) -> Result<Self> {
        if servers.is_empty() {
            return Err(ClientError::Configuration(
                "server pool requires at least one base URL".to_string(),
            ));
        }
        Ok(Self {
            servers: RwLock::new(Arc::new(servers)),
            cursor: AtomicUsize::new(0),
        })
    }

    /// Base URL at the current round-robin position, advancing the position.
    pub fn next(&self) -> Url {
        let snapshot = Arc::clone(&self.servers.read());
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % snapshot.len();
        snapshot[index].clone()
    }

    /// Number of servers currently in the pool.
    pub fn len(&self) -> usize {
        self.servers.read().len()
    }

    /// Always `false`; a constructed pool holds at least one server.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically install a new membership and rewind the cursor. An empty
    /// replacement is a no-op returning `false`; deciding whether that is
    /// worth a warning is the caller's business.
    pub fn replace(&self, servers: Vec<Url>) -> bool {
        if servers.is_empty() {
            return false;
        }
        let mut current = self.servers.write();
        *current = Arc::new(servers);
        self.cursor.store(0, Ordering::Relaxed);
        true
    }

    /// Current membership snapshot.
    pub fn snapshot(&self) -> Arc<Vec<Url>> {
        Arc::clone(&self.servers.read())
    }
}

impl std::fmt::Debug for ServerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerPool")
            .field("servers", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn urls(raw: &[&str]) -> Vec<Url> {
        raw.iter().map(|u| Url::parse(u).unwrap()).collect()
    }

    #[test]
    fn empty_initial_list_is_rejected() {
        let result = ServerPool::new(Vec::new());
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn next_cycles_through_all_servers_in_order() {
        let pool = ServerPool::new(urls(&[
            "http://node1:9200",
            "http://node2:9200",
            "http://node3:9200",
        ]))
        .unwrap();

        assert_eq!(pool.next().as_str(), "http://node1:9200/");
        assert_eq!(pool.next().as_str(), "http://node2:9200/");
        assert_eq!(pool.next().as_str(), "http://node3:9200/");
        // wraps around
        assert_eq!(pool.next().as_str(), "http://node1:9200/");
    }

    #[test]
    fn single_server_repeats() {
        let pool = ServerPool::new(urls(&["http://only:9200"])).unwrap();
        assert_eq!(pool.next().as_str(), "http://only:9200/");
        assert_eq!(pool.next().as_str(), "http://only:9200/");
    }

    #[test]
    fn replace_with_empty_list_is_a_noop() {
        let pool = ServerPool::new(urls(&["http://node1:9200", "http://node2:9200"])).unwrap();
        assert_eq!(pool.next().as_str(), "http://node1:9200/");

        assert!(!pool.replace(Vec::new()));

        assert_eq!(pool.len(), 2);
        // position unchanged
        assert_eq!(pool.next().as_str(), "http://node2:9200/");
    }

    #[test]
    fn replace_installs_new_membership_and_rewinds() {
        let pool = ServerPool::new(urls(&["http://old:9200"])).unwrap();
        pool.next();

        assert!(pool.replace(urls(&["http://new1:9200", "http://new2:9200"])));

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.next().as_str(), "http://new1:9200/");
        assert_eq!(pool.next().as_str(), "http://new2:9200/");
    }

    #[test]
    fn concurrent_replace_and_next_never_go_out_of_range() {
        let pool = Arc::new(
            ServerPool::new(urls(&["http://node1:9200", "http://node2:9200"])).unwrap(),
        );

        let mut handles = Vec::new();
        for worker in 0..4 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                for round in 0..1000 {
                    if worker == 0 && round % 7 == 0 {
                        let size = round % 3 + 1;
                        let replacement = (0..size)
                            .map(|i| Url::parse(&format!("http://node{i}:9200")).unwrap())
                            .collect();
                        pool.replace(replacement);
                    } else {
                        let url = pool.next();
                        assert!(url.host_str().is_some());
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(pool.len() >= 1);
    }
}
