//! Connection Management
//!
//! One async task per accepted client:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Server                               │
//! │                   (accept loop)                             │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ accept() + register
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ConnectionHandler                          │
//! │                                                             │
//! │  ┌────────────┐   ┌─────────────┐   ┌─────────────────┐    │
//! │  │ Read line  │──>│ Parse line  │──>│ Execute command │    │
//! │  └────────────┘   └─────────────┘   └────────┬────────┘    │
//! │        ▲                                     │              │
//! │        └──────────── write reply ◄───────────┘              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each handler applies an idle-read deadline before every read, watches the
//! server's shutdown signal, and unregisters itself from the live-connection
//! registry on exit.

pub mod handler;
pub mod registry;

// Re-export commonly used types
pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats, IDLE_TIMEOUT,
};
pub use registry::Registry;
