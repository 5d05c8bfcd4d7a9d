//! Line Protocol Implementation
//!
//! Requests are single text lines (`<COMMAND> [arg]*\r\n`); replies reuse
//! the RESP reply prefixes (`+`, `-`, `:`, `$`) but the framing is plain
//! text, not binary-safe RESP.
//!
//! ## Modules
//!
//! - `types`: the [`Command`] and [`Reply`] types and reply encoding
//! - `parser`: request-line tokenizer
//!
//! ## Example
//!
//! ```
//! use linekv::protocol::{parse_line, Reply};
//!
//! let cmd = parse_line(b"GET name").unwrap().unwrap();
//! assert_eq!(cmd.name, "GET");
//!
//! let reply = Reply::Bulk("value".to_string());
//! assert_eq!(reply.encode(), "$5\r\nvalue\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_line, ParseError};
pub use types::{Command, Reply, CRLF};
