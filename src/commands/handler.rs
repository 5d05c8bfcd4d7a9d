//! Command Dispatch
//!
//! Maps parsed commands onto storage operations and reply encoding. The
//! dispatcher is stateless per call: given one [`Command`], it validates the
//! argument count against a fixed table, executes, and produces one
//! [`Reply`].
//!
//! ## Command table
//!
//! | Command | Arity | Reply |
//! |---|---|---|
//! | `SET k v` | 2 | `+OK` |
//! | `GET k` | 1 | bulk value, or `$-1` when missing/expired |
//! | `DEL k` | 1 | `+1` if removed, `+0` otherwise |
//! | `TTL k` | 1 | `:-2` absent/expired, `:-1` no expiry, else `:<seconds>` |
//! | `SETEX k ttl v` | 3 | `+OK`, or an error for a bad TTL literal |
//! | `PING [msg]` | 0 or 1 | `+PONG`, or a bulk echo of `msg` |
//!
//! Arity mismatches reply with an error naming the command and its expected
//! count, and never touch storage. Unknown commands never reach storage.

use crate::protocol::{Command, Reply};
use crate::storage::Store;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Executes commands against the shared storage engine.
///
/// Cheap to clone; each connection task gets its own copy holding an `Arc`
/// to the one store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<Store>,
}

impl CommandHandler {
    /// Creates a handler backed by `storage`.
    pub fn new(storage: Arc<Store>) -> Self {
        Self { storage }
    }

    /// Executes one command and returns the reply to send back.
    pub fn execute(&self, command: &Command) -> Reply {
        match command.name.as_str() {
            "SET" => self.cmd_set(&command.args),
            "GET" => self.cmd_get(&command.args),
            "DEL" => self.cmd_del(&command.args),
            "TTL" => self.cmd_ttl(&command.args),
            "SETEX" => self.cmd_setex(&command.args),
            "PING" => self.cmd_ping(&command.args),
            name => Reply::error(format!("unknown command '{}'", name)),
        }
    }

    /// SET key value
    fn cmd_set(&self, args: &[String]) -> Reply {
        if args.len() != 2 {
            return Reply::error("wrong number of arguments for 'set', expected 2");
        }

        self.storage.set(args[0].clone(), args[1].clone());
        Reply::ok()
    }

    /// GET key
    fn cmd_get(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return Reply::error("wrong number of arguments for 'get', expected 1");
        }

        match self.storage.get(&args[0]) {
            Some(value) => Reply::Bulk(value.data),
            None => Reply::NullBulk,
        }
    }

    /// DEL key
    fn cmd_del(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return Reply::error("wrong number of arguments for 'del', expected 1");
        }

        if self.storage.delete(&args[0]) {
            Reply::Simple("1".to_string())
        } else {
            Reply::Simple("0".to_string())
        }
    }

    /// TTL key
    fn cmd_ttl(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return Reply::error("wrong number of arguments for 'ttl', expected 1");
        }

        let value = match self.storage.get(&args[0]) {
            Some(value) => value,
            None => return Reply::Integer(-2),
        };

        match value.ttl_secs() {
            None => Reply::Integer(-1),
            // A TTL that reached zero between the lookup and here is
            // reported as already gone.
            Some(ttl) if ttl <= 0 => Reply::Integer(-2),
            Some(ttl) => Reply::Integer(ttl),
        }
    }

    /// SETEX key seconds value
    fn cmd_setex(&self, args: &[String]) -> Reply {
        if args.len() != 3 {
            return Reply::error("wrong number of arguments for 'setex', expected 3");
        }

        let secs = match args[1].parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => return Reply::error("invalid expire time"),
        };

        // A TTL so large that the expiry instant is not representable is
        // rejected like any other bad literal.
        let ttl = Duration::from_secs(secs);
        if Instant::now().checked_add(ttl).is_none() {
            return Reply::error("invalid expire time");
        }

        self.storage.set_ex(args[0].clone(), args[2].clone(), ttl);
        Reply::ok()
    }

    /// PING [message]
    fn cmd_ping(&self, args: &[String]) -> Reply {
        match args.len() {
            0 => Reply::Simple("PONG".to_string()),
            1 => Reply::Bulk(args[0].clone()),
            _ => Reply::error("wrong number of arguments for 'ping', expected 0 or 1"),
        }
    }
}
