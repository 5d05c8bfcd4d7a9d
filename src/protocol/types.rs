//! Wire Protocol Types
//!
//! The server speaks a simplified, line-oriented text framing modeled on the
//! RESP reply prefixes. Requests are single whitespace-delimited lines; each
//! reply is a CRLF-terminated fragment whose first byte identifies its kind:
//!
//! - `+` Simple string: `+OK\r\n`
//! - `-` Error: `-ERR unknown command 'FOO'\r\n`
//! - `:` Integer: `:42\r\n`
//! - `$` Bulk string: `$5\r\nhello\r\n`, or the absent sentinel `$-1\r\n`
//!
//! Unlike full RESP, requests are not binary-safe: arguments may not contain
//! whitespace, and there is no quoting or length-prefixed framing on input.

use std::fmt;

/// The CRLF line terminator used on the wire.
pub const CRLF: &str = "\r\n";

/// One parsed client command: an upper-cased name plus positional arguments.
///
/// Commands are ephemeral; they live from parse to dispatch and are not
/// retained afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name, normalized to upper case.
    pub name: String,
    /// Positional string arguments, in order.
    pub args: Vec<String>,
}

impl Command {
    /// Creates a command, upper-casing the name.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into().to_uppercase(),
            args,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// One server reply, by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Simple status string, e.g. `OK`, `PONG`, or an integer-as-string.
    Simple(String),
    /// Error message. Encoded with the `ERR` prefix.
    Error(String),
    /// Bulk string payload (length header line + payload line).
    Bulk(String),
    /// The absent-value sentinel.
    NullBulk,
    /// Signed integer.
    Integer(i64),
}

impl Reply {
    /// Shorthand for the `+OK` acknowledgement.
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// Creates an error reply.
    pub fn error(msg: impl Into<String>) -> Self {
        Reply::Error(msg.into())
    }

    /// Returns true if this reply is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Encodes the reply into its wire representation.
    ///
    /// Known limitation, preserved deliberately: a present-but-empty bulk
    /// payload encodes as `$-1\r\n` and is indistinguishable from an absent
    /// value. Distinguishing them would change wire semantics.
    pub fn encode(&self) -> String {
        match self {
            Reply::Simple(s) => format!("+{}{}", s, CRLF),
            Reply::Error(msg) => format!("-ERR {}{}", msg, CRLF),
            Reply::Bulk(s) if s.is_empty() => format!("$-1{}", CRLF),
            Reply::Bulk(s) => format!("${}{}{}{}", s.len(), CRLF, s, CRLF),
            Reply::NullBulk => format!("$-1{}", CRLF),
            Reply::Integer(n) => format!(":{}{}", n, CRLF),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_uppercases_name() {
        let cmd = Command::new("set", vec!["foo".to_string(), "bar".to_string()]);
        assert_eq!(cmd.name, "SET");
        assert_eq!(cmd.args, vec!["foo", "bar"]);
    }

    #[test]
    fn test_simple_encode() {
        assert_eq!(Reply::ok().encode(), "+OK\r\n");
        assert_eq!(Reply::Simple("PONG".to_string()).encode(), "+PONG\r\n");
        assert_eq!(Reply::Simple("1".to_string()).encode(), "+1\r\n");
    }

    #[test]
    fn test_error_encode() {
        assert_eq!(
            Reply::error("unknown command 'FOO'").encode(),
            "-ERR unknown command 'FOO'\r\n"
        );
    }

    #[test]
    fn test_bulk_encode() {
        assert_eq!(Reply::Bulk("bar".to_string()).encode(), "$3\r\nbar\r\n");
        assert_eq!(Reply::Bulk("hello".to_string()).encode(), "$5\r\nhello\r\n");
    }

    #[test]
    fn test_null_bulk_encode() {
        assert_eq!(Reply::NullBulk.encode(), "$-1\r\n");
    }

    #[test]
    fn test_empty_bulk_conflates_with_null() {
        // Observed wire behavior: empty payloads are not distinguishable
        // from absent values.
        assert_eq!(Reply::Bulk(String::new()).encode(), Reply::NullBulk.encode());
    }

    #[test]
    fn test_integer_encode() {
        assert_eq!(Reply::Integer(42).encode(), ":42\r\n");
        assert_eq!(Reply::Integer(-2).encode(), ":-2\r\n");
    }
}
