//! Per-Connection Handler
//!
//! Each accepted client gets its own async task running the loop below:
//!
//! ```text
//! 1. Read bytes from the socket (bounded by the idle deadline)
//! 2. Extract one complete line from the buffer
//! 3. Parse the line into a command
//! 4. Dispatch against the store
//! 5. Write the encoded reply
//! 6. Loop back to 1
//! ```
//!
//! TCP is a stream, so a single read may carry a partial line or several
//! lines at once; a `BytesMut` buffer accumulates input and complete lines
//! are split off as they arrive.
//!
//! Failure domains are independent: any error here tears down this one
//! connection and nothing else. The loop also watches the server's shutdown
//! signal and drops the socket immediately when it fires; in-flight
//! commands are not drained.

use crate::commands::CommandHandler;
use crate::protocol::{parse_line, Reply};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use super::registry::Registry;

/// Close the connection if no data arrives for this long.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum bytes buffered without a complete line before the client is
/// disconnected.
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command dispatcher (shared storage behind it)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Server shutdown signal; when it fires the socket is dropped
    shutdown_rx: watch::Receiver<bool>,

    /// Idle read deadline
    idle_timeout: Duration,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            stats,
            shutdown_rx,
            idle_timeout: IDLE_TIMEOUT,
        }
    }

    /// Overrides the idle deadline. Mainly useful in tests.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Runs the connection loop to completion and logs the exit cause.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client closed connection")
                }
                ConnectionError::IdleTimeout => {
                    info!(client = %self.addr, "Idle deadline exceeded, closing connection")
                }
                ConnectionError::ServerShutdown => {
                    debug!(client = %self.addr, "Connection closed by server shutdown")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The read-parse-dispatch-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(line) = self.take_line() {
                match parse_line(&line) {
                    // Blank line: read on without replying.
                    Ok(None) => continue,
                    Ok(Some(command)) => {
                        trace!(client = %self.addr, command = %command, "Dispatching command");
                        let reply = self.command_handler.execute(&command);
                        self.stats.command_processed();
                        self.send_reply(&reply).await?;
                    }
                    Err(e) => {
                        // Protocol errors are local to the command; the
                        // connection stays open.
                        warn!(client = %self.addr, error = %e, "Bad command line");
                        self.send_reply(&Reply::error("bad command")).await?;
                    }
                }
            }

            self.read_more_data().await?;
        }
    }

    /// Splits one complete line off the buffer, without its `\n` terminator.
    fn take_line(&mut self) -> Option<BytesMut> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line = self.buffer.split_to(pos + 1);
        line.truncate(pos);
        Some(line)
    }

    /// Reads more data from the socket into the buffer.
    ///
    /// Returns an error on idle deadline, server shutdown, orderly close,
    /// or any other I/O failure; each is distinguished for diagnostics.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            warn!(
                client = %self.addr,
                size = self.buffer.len(),
                "Line exceeds buffer limit"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let read = tokio::time::timeout(
            self.idle_timeout,
            self.stream.get_mut().read_buf(&mut self.buffer),
        );

        let n = tokio::select! {
            _ = self.shutdown_rx.changed() => {
                return Err(ConnectionError::ServerShutdown);
            }
            result = read => match result {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(ConnectionError::IoError(e)),
                Err(_) => return Err(ConnectionError::IdleTimeout),
            },
        };

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial line left behind
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Encodes and writes one reply.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let encoded = reply.encode();
        self.stream.write_all(encoded.as_bytes()).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(encoded.len());
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
///
/// All of them are fatal to the one connection and to nothing else.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("client disconnected")]
    ClientDisconnected,

    /// No complete line arrived within the idle deadline
    #[error("idle deadline exceeded")]
    IdleTimeout,

    /// The server is shutting down and force-closed this connection
    #[error("server shutting down")]
    ServerShutdown,

    /// Unexpected end of stream (partial line in the buffer)
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("buffer size limit exceeded")]
    BufferFull,
}

/// Handles one client connection from accept to teardown.
///
/// Registers the connection, runs the loop, and unregisters whatever way
/// the loop exits. This is the function the server spawns per accept.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    registry: Arc<Registry>,
    shutdown_rx: watch::Receiver<bool>,
) {
    let id = registry.register(addr);

    let handler = ConnectionHandler::new(stream, addr, command_handler, stats, shutdown_rx);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected
            | ConnectionError::IdleTimeout
            | ConnectionError::ServerShutdown => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }

    registry.unregister(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct TestServer {
        addr: SocketAddr,
        stats: Arc<ConnectionStats>,
        registry: Arc<Registry>,
        shutdown_tx: watch::Sender<bool>,
    }

    async fn spawn_test_server(idle_timeout: Duration) -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storage = Arc::new(Store::new());
        let stats = Arc::new(ConnectionStats::new());
        let registry = Arc::new(Registry::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let accept_stats = Arc::clone(&stats);
        let accept_registry = Arc::clone(&registry);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let command_handler = CommandHandler::new(Arc::clone(&storage));
                let stats = Arc::clone(&accept_stats);
                let registry = Arc::clone(&accept_registry);
                let shutdown_rx = shutdown_rx.clone();

                tokio::spawn(async move {
                    let id = registry.register(client_addr);
                    let handler = ConnectionHandler::new(
                        stream,
                        client_addr,
                        command_handler,
                        stats,
                        shutdown_rx,
                    )
                    .with_idle_timeout(idle_timeout);
                    let _ = handler.run().await;
                    registry.unregister(id);
                });
            }
        });

        TestServer {
            addr,
            stats,
            registry,
            shutdown_tx,
        }
    }

    async fn send_line(client: &mut TcpStream, line: &str) -> String {
        client.write_all(line.as_bytes()).await.unwrap();
        client.write_all(b"\r\n").await.unwrap();

        let mut buf = [0u8; 256];
        let n = client.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).to_string()
    }

    #[tokio::test]
    async fn test_set_get_del_roundtrip() {
        let server = spawn_test_server(Duration::from_secs(30)).await;
        let mut client = TcpStream::connect(server.addr).await.unwrap();

        assert_eq!(send_line(&mut client, "SET foo bar").await, "+OK\r\n");
        assert_eq!(send_line(&mut client, "GET foo").await, "$3\r\nbar\r\n");
        assert_eq!(send_line(&mut client, "DEL foo").await, "+1\r\n");
        assert_eq!(send_line(&mut client, "GET foo").await, "$-1\r\n");
    }

    #[tokio::test]
    async fn test_setex_ttl_lifecycle() {
        let server = spawn_test_server(Duration::from_secs(30)).await;
        let mut client = TcpStream::connect(server.addr).await.unwrap();

        assert_eq!(send_line(&mut client, "SETEX foo 2 bar").await, "+OK\r\n");

        let ttl_reply = send_line(&mut client, "TTL foo").await;
        let ttl: i64 = ttl_reply
            .trim()
            .strip_prefix(':')
            .and_then(|s| s.parse().ok())
            .unwrap();
        assert!((1..=2).contains(&ttl), "ttl was {}", ttl);

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(send_line(&mut client, "GET foo").await, "$-1\r\n");
        assert_eq!(send_line(&mut client, "TTL foo").await, ":-2\r\n");
    }

    #[tokio::test]
    async fn test_ping_and_unknown_command() {
        let server = spawn_test_server(Duration::from_secs(30)).await;
        let mut client = TcpStream::connect(server.addr).await.unwrap();

        assert_eq!(send_line(&mut client, "PING").await, "+PONG\r\n");
        assert_eq!(send_line(&mut client, "ping hello").await, "$5\r\nhello\r\n");
        assert_eq!(
            send_line(&mut client, "FOO bar").await,
            "-ERR unknown command 'FOO'\r\n"
        );
    }

    #[tokio::test]
    async fn test_blank_line_gets_no_reply() {
        let server = spawn_test_server(Duration::from_secs(30)).await;
        let mut client = TcpStream::connect(server.addr).await.unwrap();

        // A blank line then a PING; the only reply must be the PONG.
        client.write_all(b"\r\nPING\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_idle_connection_is_closed() {
        let server = spawn_test_server(Duration::from_millis(100)).await;
        let mut client = TcpStream::connect(server.addr).await.unwrap();

        // Send nothing; the server must close the socket after the deadline.
        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("server did not close the idle connection")
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_shutdown_force_closes_connections() {
        let server = spawn_test_server(Duration::from_secs(30)).await;
        let mut client = TcpStream::connect(server.addr).await.unwrap();

        assert_eq!(send_line(&mut client, "PING").await, "+PONG\r\n");
        assert_eq!(server.registry.len(), 1);

        server.shutdown_tx.send(true).unwrap();

        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("server did not force-close the connection")
            .unwrap();
        assert_eq!(n, 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(server.registry.is_empty());
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let server = spawn_test_server(Duration::from_secs(30)).await;

        assert_eq!(server.stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(server.addr).await.unwrap();
        assert_eq!(send_line(&mut client, "PING").await, "+PONG\r\n");

        assert_eq!(
            server.stats.connections_accepted.load(Ordering::Relaxed),
            1
        );
        assert_eq!(server.stats.active_connections.load(Ordering::Relaxed), 1);
        assert!(server.stats.commands_processed.load(Ordering::Relaxed) >= 1);
        assert!(server.stats.bytes_read.load(Ordering::Relaxed) > 0);
        assert!(server.stats.bytes_written.load(Ordering::Relaxed) > 0);

        drop(client);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(server.stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_pipelined_commands() {
        let server = spawn_test_server(Duration::from_secs(30)).await;
        let mut client = TcpStream::connect(server.addr).await.unwrap();

        // Two commands in a single write; both replies must arrive.
        client
            .write_all(b"SET k1 v1\r\nGET k1\r\n")
            .await
            .unwrap();

        let mut collected = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        let expected = b"+OK\r\n$2\r\nv1\r\n".len();

        while collected.len() < expected && tokio::time::Instant::now() < deadline {
            let mut buf = [0u8; 64];
            match tokio::time::timeout(Duration::from_millis(100), client.read(&mut buf)).await {
                Ok(Ok(n)) if n > 0 => collected.extend_from_slice(&buf[..n]),
                _ => break,
            }
        }

        assert_eq!(&collected[..], b"+OK\r\n$2\r\nv1\r\n");
    }
}
