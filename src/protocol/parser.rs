//! Request Line Parser
//!
//! Turns one raw input line into a [`Command`]. The request framing is
//! deliberately simple: whitespace-delimited tokens on a single line, the
//! first token being the command name. There is no quoting or escaping, so
//! arguments cannot contain whitespace.
//!
//! The parser returns:
//! - `Ok(Some(command))` for a non-empty, well-formed line
//! - `Ok(None)` for a blank line (the caller silently reads the next line;
//!   no reply is sent)
//! - `Err(ParseError)` for input that cannot be tokenized, which the
//!   dispatcher surfaces to the client as a protocol error

use crate::protocol::types::Command;
use thiserror::Error;

/// Errors that can occur while parsing a request line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line is not valid UTF-8 and cannot be tokenized.
    #[error("invalid UTF-8 in command line")]
    InvalidUtf8,
}

/// Parses one raw line into a command.
///
/// Surrounding whitespace (including the `\r` left over from CRLF line
/// endings) is trimmed before tokenizing.
///
/// # Example
///
/// ```
/// use linekv::protocol::parse_line;
///
/// let cmd = parse_line(b"set foo bar").unwrap().unwrap();
/// assert_eq!(cmd.name, "SET");
/// assert_eq!(cmd.args, vec!["foo", "bar"]);
///
/// assert!(parse_line(b"   ").unwrap().is_none());
/// ```
pub fn parse_line(line: &[u8]) -> Result<Option<Command>, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)?;

    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let name = match parts.next() {
        Some(name) => name,
        None => return Ok(None),
    };

    let args = parts.map(|s| s.to_string()).collect();
    Ok(Some(Command::new(name, args)))
}
