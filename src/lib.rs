//! # linekv - A Minimal In-Memory Key-Value Store
//!
//! linekv is a small Redis-style key-value server written in Rust. Clients
//! speak a line-oriented text protocol over TCP: one command per line, one
//! reply per command.
//!
//! ## Features
//!
//! - **Line protocol**: `SET`, `GET`, `DEL`, `TTL`, `SETEX`, `PING` over
//!   plain text lines with RESP-style reply prefixes
//! - **TTL support**: per-key expiration with lazy filtering on lookup plus
//!   a background reaper
//! - **Async I/O**: built on Tokio, one task per connection
//! - **Coordinated shutdown**: SIGINT/SIGTERM stop the listener and
//!   force-close every live connection under a bounded grace period
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                            linekv                              │
//! │                                                                │
//! │  ┌────────────┐     ┌──────────────┐     ┌─────────────────┐  │
//! │  │   Server   │────>│  Connection  │────>│ CommandHandler  │  │
//! │  │ (listener) │     │   Handler    │     │   (dispatch)    │  │
//! │  └────────────┘     └──────────────┘     └────────┬────────┘  │
//! │        │                   │                      │           │
//! │        ▼                   ▼                      ▼           │
//! │  ┌────────────┐     ┌──────────────┐     ┌─────────────────┐  │
//! │  │  Registry  │     │  parse_line  │     │      Store      │  │
//! │  │ (shutdown) │     │    Reply     │     │ (RwLock map) ◄──┼──┼── Reaper
//! │  └────────────┘     └──────────────┘     └─────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use linekv::server::Server;
//! use linekv::storage::{start_reaper, Store};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(Store::new());
//!     let _reaper = start_reaper(Arc::clone(&storage));
//!
//!     let (server, shutdown) = Server::bind("127.0.0.1:4000", storage).await?;
//!     tokio::spawn(server.run());
//!
//!     tokio::signal::ctrl_c().await?;
//!     shutdown.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire Protocol
//!
//! Requests are single lines: `<COMMAND> [arg]*\r\n`. Arguments may not
//! contain whitespace; there is no quoting or binary framing. Replies:
//!
//! ```text
//! +OK\r\n                 simple status
//! -ERR <message>\r\n      error
//! :42\r\n                 integer
//! $3\r\nbar\r\n           bulk string (header line + payload line)
//! $-1\r\n                 absent value
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: request-line parsing and reply encoding
//! - [`storage`]: the shared key-value store and the expiry reaper
//! - [`commands`]: command dispatch and arity validation
//! - [`connection`]: per-client connection loops and the live registry
//! - [`server`]: accept loop and shutdown coordination

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats, Registry};
pub use protocol::{parse_line, Command, ParseError, Reply};
pub use server::{Server, ShutdownHandle};
pub use storage::{start_reaper, Reaper, Store, Value};

/// The default port linekv listens on
pub const DEFAULT_PORT: u16 = 4000;

/// The default host linekv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of linekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
