//! Command Processing Layer
//!
//! Sits between the protocol codec and the storage engine:
//!
//! ```text
//! Client line
//!       │
//!       ▼
//! ┌─────────────────┐
//! │   parse_line    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │  validate arity │
//! │  execute        │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Store       │  (storage module)
//! └─────────────────┘
//! ```
//!
//! Supported commands: `SET`, `GET`, `DEL`, `TTL`, `SETEX`, `PING`.

pub mod handler;

// Re-export the main command handler
pub use handler::CommandHandler;
