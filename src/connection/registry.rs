//! Live-Connection Registry
//!
//! Tracks every currently open client connection. The registry is owned by
//! the [`Server`](crate::server::Server) and threaded into each connection
//! task at accept time; connections register on entry and unregister when
//! their loop exits for any reason.
//!
//! The shutdown path reads it to know how many sockets are being
//! force-closed and to wait (bounded) until every handler has torn down.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// The set of currently open connections, keyed by a per-process id.
#[derive(Debug, Default)]
pub struct Registry {
    next_id: AtomicU64,
    conns: Mutex<HashMap<u64, SocketAddr>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly accepted connection and returns its id.
    pub fn register(&self, addr: SocketAddr) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.conns.lock().unwrap().insert(id, addr);
        id
    }

    /// Removes a connection. Safe to call with an id that is already gone.
    pub fn unregister(&self, id: u64) {
        self.conns.lock().unwrap().remove(&id);
    }

    /// Number of currently open connections.
    pub fn len(&self) -> usize {
        self.conns.lock().unwrap().len()
    }

    /// Returns true if no connections are open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Peer addresses of all open connections, for shutdown diagnostics.
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.conns.lock().unwrap().values().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    #[test]
    fn test_register_unregister() {
        let registry = Registry::new();
        assert!(registry.is_empty());

        let a = registry.register(addr(1000));
        let b = registry.register(addr(1001));
        assert_eq!(registry.len(), 2);
        assert_ne!(a, b);

        registry.unregister(a);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.peers(), vec![addr(1001)]);

        registry.unregister(b);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_unknown_id_is_noop() {
        let registry = Registry::new();
        registry.unregister(42);
        assert!(registry.is_empty());
    }
}
