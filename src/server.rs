//! TCP Server and Shutdown Coordination
//!
//! The [`Server`] owns the listening socket and the live-connection
//! registry. Its accept loop registers and spawns one handler task per
//! client and keeps accepting until the shutdown signal fires.
//!
//! Shutdown is abrupt by policy, not a drain: the signal stops the accept
//! loop (closing the listener) and every live connection drops its socket as
//! soon as it observes the same signal. The [`ShutdownHandle`] then waits
//! for the registry to empty; the caller bounds that wait with its own grace
//! period.

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats, Registry};
use crate::storage::Store;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// The listening socket plus everything the accept loop hands to each
/// connection task.
pub struct Server {
    listener: TcpListener,
    storage: Arc<Store>,
    stats: Arc<ConnectionStats>,
    registry: Arc<Registry>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Triggers and observes server shutdown from outside the accept loop.
pub struct ShutdownHandle {
    shutdown_tx: watch::Sender<bool>,
    registry: Arc<Registry>,
}

impl Server {
    /// Binds the listener and returns the server along with its shutdown
    /// handle.
    ///
    /// Failing to bind is a startup error and the only fatal outcome here;
    /// everything after this point is recoverable per connection.
    pub async fn bind(addr: &str, storage: Arc<Store>) -> std::io::Result<(Self, ShutdownHandle)> {
        let listener = TcpListener::bind(addr).await?;
        let registry = Arc::new(Registry::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(addr = %listener.local_addr()?, "Server listening");

        let server = Self {
            listener,
            storage,
            stats: Arc::new(ConnectionStats::new()),
            registry: Arc::clone(&registry),
            shutdown_rx,
        };
        let handle = ShutdownHandle {
            shutdown_tx,
            registry,
        };

        Ok((server, handle))
    }

    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared connection statistics.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Runs the accept loop until shutdown is signalled.
    ///
    /// Transient accept errors are logged and accepting continues; only the
    /// shutdown signal ends the loop. The listener closes when this
    /// function returns.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                result = self.listener.accept() => match result {
                    Ok((stream, addr)) => {
                        let command_handler = CommandHandler::new(Arc::clone(&self.storage));
                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            command_handler,
                            Arc::clone(&self.stats),
                            Arc::clone(&self.registry),
                            self.shutdown_rx.clone(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                    }
                },
                _ = self.shutdown_rx.changed() => {
                    info!("Shutdown signalled, closing listener");
                    break;
                }
            }
        }
    }
}

impl ShutdownHandle {
    /// Signals shutdown and waits for every live connection to tear down.
    ///
    /// Callers are expected to bound this with a grace-period timeout;
    /// the wait itself is unbounded.
    pub async fn shutdown(&self) {
        let peers = self.registry.peers();
        if !peers.is_empty() {
            info!(connections = peers.len(), "Force-closing live connections");
            for peer in &peers {
                debug!(client = %peer, "Closing connection");
            }
        }

        let _ = self.shutdown_tx.send(true);

        while !self.registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
