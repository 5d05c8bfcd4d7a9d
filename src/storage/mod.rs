//! Storage Engine Module
//!
//! The core key-value state of the server: a thread-safe map from string
//! keys to values with optional per-key expiration, plus the background
//! reaper that reclaims memory held by expired entries.
//!
//! ## Expiry model
//!
//! Keys with a TTL are considered gone in two independent ways:
//!
//! 1. **On access**: `Store::get` filters expired entries, so a lookup never
//!    returns stale data no matter when the reaper last ran.
//! 2. **In the background**: the [`Reaper`] periodically evicts expired
//!    entries so that keys nobody reads again do not pin memory.
//!
//! ## Example
//!
//! ```
//! use linekv::storage::Store;
//! use std::time::Duration;
//!
//! let store = Store::new();
//!
//! store.set("name", "value");
//! assert!(store.get("name").is_some());
//!
//! store.set_ex("session", "token123", Duration::from_secs(3600));
//! ```

pub mod engine;
pub mod reaper;

// Re-export commonly used types
pub use engine::{Store, Value};
pub use reaper::{start_reaper, Reaper, SWEEP_INTERVAL};
