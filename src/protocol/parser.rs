//! Command line parser.
//!
//! Turns one decoded protocol line into a [`Command`]:
//! - `get <key>+`
//! - `set <key> <flags> <exptime> <bytes> [noreply]`
//!
//! Every field is validated on its own so that errors name the exact field
//! that was rejected.

use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;

use super::clock::{Clock, SystemClock};

/// Largest `exptime` treated as an offset from now (30 days in seconds).
/// Anything above is an absolute Unix timestamp.
pub const RELATIVE_EXPTIME_MAX: u32 = 60 * 60 * 24 * 30;

/// Literal that suppresses the reply to a `set`.
pub const NOREPLY: &str = "noreply";

/// Parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Retrieve one or more keys, in request order
    Get { keys: Vec<String> },

    /// Store a value of `size` bytes under `key`
    Set {
        key: String,
        flags: u16,
        expiration: DateTime<Utc>,
        size: u64,
        suppress_reply: bool,
    },
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Get { keys } => write!(f, "get {}", keys.join(" ")),
            Command::Set {
                key,
                flags,
                expiration,
                size,
                suppress_reply,
            } => {
                write!(
                    f,
                    "set {} {} {} {}",
                    key,
                    flags,
                    expiration.to_rfc3339(),
                    size
                )?;
                if *suppress_reply {
                    write!(f, " {}", NOREPLY)?;
                }
                Ok(())
            }
        }
    }
}

/// Command parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Line had no fields
    EmptyCommand,
    /// First field is not a known command
    UnrecognizedCommand(String),
    /// `get` without keys
    MissingKeys,
    /// `set` with the wrong number of parameters
    InvalidArity(usize),
    /// Flags not a 16-bit unsigned integer
    InvalidFlags(String),
    /// Exptime not a 32-bit unsigned integer
    InvalidExpiration(String),
    /// Size not a 64-bit unsigned integer
    InvalidSize(String),
    /// Fifth `set` parameter is not `noreply`
    InvalidNoreply(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyCommand => write!(f, "Empty command"),
            ParseError::UnrecognizedCommand(cmd) => write!(f, "Unrecognized command: {}", cmd),
            ParseError::MissingKeys => write!(f, "get requires at least one key"),
            ParseError::InvalidArity(n) => write!(
                f,
                "set requires key, flags, exptime, bytes and optional noreply, got {} parameters",
                n
            ),
            ParseError::InvalidFlags(v) => write!(f, "Invalid flags: {}", v),
            ParseError::InvalidExpiration(v) => write!(f, "Invalid exptime: {}", v),
            ParseError::InvalidSize(v) => write!(f, "Invalid bytes: {}", v),
            ParseError::InvalidNoreply(v) => write!(f, "Invalid noreply field: {}", v),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a line, reading the system clock for relative expirations.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    parse_with_clock(line, &SystemClock)
}

/// Parse a line against an explicit clock.
pub fn parse_with_clock<C: Clock>(line: &str, clock: &C) -> Result<Command, ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let (name, params) = match parts.split_first() {
        Some((name, params)) => (*name, params),
        None => return Err(ParseError::EmptyCommand),
    };

    match name {
        "get" => parse_get(params),
        "set" => parse_set(params, clock),
        _ => Err(ParseError::UnrecognizedCommand(name.to_string())),
    }
}

fn parse_get(params: &[&str]) -> Result<Command, ParseError> {
    if params.is_empty() {
        return Err(ParseError::MissingKeys);
    }

    Ok(Command::Get {
        keys: params.iter().map(|k| k.to_string()).collect(),
    })
}

fn parse_set<C: Clock>(params: &[&str], clock: &C) -> Result<Command, ParseError> {
    // Format: set <key> <flags> <exptime> <bytes> [noreply]
    if params.len() != 4 && params.len() != 5 {
        return Err(ParseError::InvalidArity(params.len()));
    }

    let key = params[0].to_string();

    let flags = parse_decimal::<u16>(params[1])
        .ok_or_else(|| ParseError::InvalidFlags(params[1].to_string()))?;

    let exptime = parse_decimal::<u32>(params[2])
        .ok_or_else(|| ParseError::InvalidExpiration(params[2].to_string()))?;
    let expiration = resolve_expiration(exptime, clock)
        .ok_or_else(|| ParseError::InvalidExpiration(params[2].to_string()))?;

    let size = parse_decimal::<u64>(params[3])
        .ok_or_else(|| ParseError::InvalidSize(params[3].to_string()))?;

    let suppress_reply = match params.get(4) {
        Some(&NOREPLY) => true,
        Some(other) => return Err(ParseError::InvalidNoreply(other.to_string())),
        None => false,
    };

    Ok(Command::Set {
        key,
        flags,
        expiration,
        size,
        suppress_reply,
    })
}

/// Convert a raw exptime into an absolute point in time.
///
/// Values up to [`RELATIVE_EXPTIME_MAX`] inclusive are seconds from now.
fn resolve_expiration<C: Clock>(exptime: u32, clock: &C) -> Option<DateTime<Utc>> {
    if exptime <= RELATIVE_EXPTIME_MAX {
        clock
            .now()
            .checked_add_signed(Duration::seconds(i64::from(exptime)))
    } else {
        DateTime::<Utc>::from_timestamp(i64::from(exptime), 0)
    }
}

/// Parse an unsigned base-10 integer. Signs and separators are rejected.
fn parse_decimal<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::clock::FixedClock;
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    fn parse_fixed(line: &str) -> Result<Command, ParseError> {
        parse_with_clock(line, &clock())
    }

    #[test]
    fn test_parse_get() {
        match parse_fixed("get a b c") {
            Ok(Command::Get { keys }) => assert_eq!(keys, vec!["a", "b", "c"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_get_keeps_order_and_duplicates() {
        match parse_fixed("get b a b") {
            Ok(Command::Get { keys }) => assert_eq!(keys, vec!["b", "a", "b"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_get_missing_keys() {
        assert_eq!(parse_fixed("get"), Err(ParseError::MissingKeys));
        assert_eq!(parse_fixed("  get   "), Err(ParseError::MissingKeys));
    }

    #[test]
    fn test_whitespace_collapses() {
        match parse_fixed("\t get   a \t b  ") {
            Ok(Command::Get { keys }) => assert_eq!(keys, vec!["a", "b"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_empty_command() {
        assert_eq!(parse_fixed(""), Err(ParseError::EmptyCommand));
        assert_eq!(parse_fixed(" \t  "), Err(ParseError::EmptyCommand));
    }

    #[test]
    fn test_unrecognized_command() {
        assert_eq!(
            parse_fixed("delete k"),
            Err(ParseError::UnrecognizedCommand("delete".to_string()))
        );
    }

    #[test]
    fn test_command_names_are_case_sensitive() {
        assert_eq!(
            parse_fixed("GET a"),
            Err(ParseError::UnrecognizedCommand("GET".to_string()))
        );
        assert_eq!(
            parse_fixed("Set k 0 0 1"),
            Err(ParseError::UnrecognizedCommand("Set".to_string()))
        );
    }

    #[test]
    fn test_parse_set() {
        let now = clock().0;
        assert_eq!(
            parse_fixed("set k 0 100 5"),
            Ok(Command::Set {
                key: "k".to_string(),
                flags: 0,
                expiration: now + Duration::seconds(100),
                size: 5,
                suppress_reply: false,
            })
        );
    }

    #[test]
    fn test_parse_set_noreply() {
        let now = clock().0;
        assert_eq!(
            parse_fixed("set k 0 100 5 noreply"),
            Ok(Command::Set {
                key: "k".to_string(),
                flags: 0,
                expiration: now + Duration::seconds(100),
                size: 5,
                suppress_reply: true,
            })
        );
    }

    #[test]
    fn test_parse_set_bad_noreply() {
        assert_eq!(
            parse_fixed("set k 0 100 5 bogus"),
            Err(ParseError::InvalidNoreply("bogus".to_string()))
        );
        assert_eq!(
            parse_fixed("set k 0 100 5 NOREPLY"),
            Err(ParseError::InvalidNoreply("NOREPLY".to_string()))
        );
    }

    #[test]
    fn test_parse_set_arity() {
        assert_eq!(parse_fixed("set"), Err(ParseError::InvalidArity(0)));
        assert_eq!(parse_fixed("set k 0 100"), Err(ParseError::InvalidArity(3)));
        assert_eq!(
            parse_fixed("set k 0 100 5 noreply extra"),
            Err(ParseError::InvalidArity(6))
        );
    }

    #[test]
    fn test_parse_set_flags_range() {
        match parse_fixed("set k 65535 0 1") {
            Ok(Command::Set { flags, .. }) => assert_eq!(flags, u16::MAX),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(
            parse_fixed("set k 65536 0 1"),
            Err(ParseError::InvalidFlags("65536".to_string()))
        );
        assert_eq!(
            parse_fixed("set k -1 0 1"),
            Err(ParseError::InvalidFlags("-1".to_string()))
        );
        assert_eq!(
            parse_fixed("set k +1 0 1"),
            Err(ParseError::InvalidFlags("+1".to_string()))
        );
    }

    #[test]
    fn test_parse_set_exptime_range() {
        match parse_fixed("set k 0 4294967295 1") {
            Ok(Command::Set { expiration, .. }) => {
                assert_eq!(expiration.timestamp(), i64::from(u32::MAX))
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(
            parse_fixed("set k 0 4294967296 1"),
            Err(ParseError::InvalidExpiration("4294967296".to_string()))
        );
        assert_eq!(
            parse_fixed("set k 0 soon 1"),
            Err(ParseError::InvalidExpiration("soon".to_string()))
        );
    }

    #[test]
    fn test_parse_set_size_range() {
        match parse_fixed("set k 0 0 18446744073709551615") {
            Ok(Command::Set { size, .. }) => assert_eq!(size, u64::MAX),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(
            parse_fixed("set k 0 0 18446744073709551616"),
            Err(ParseError::InvalidSize("18446744073709551616".to_string()))
        );
        assert_eq!(
            parse_fixed("set k 0 0 1.5"),
            Err(ParseError::InvalidSize("1.5".to_string()))
        );
    }

    #[test]
    fn test_fields_validated_in_order() {
        assert_eq!(
            parse_fixed("set k x y z"),
            Err(ParseError::InvalidFlags("x".to_string()))
        );
        assert_eq!(
            parse_fixed("set k 0 y z bogus"),
            Err(ParseError::InvalidExpiration("y".to_string()))
        );
        assert_eq!(
            parse_fixed("set k 0 0 z bogus"),
            Err(ParseError::InvalidSize("z".to_string()))
        );
    }

    #[test]
    fn test_leading_zeros_accepted() {
        match parse_fixed("set k 007 0010 0005") {
            Ok(Command::Set {
                flags,
                expiration,
                size,
                ..
            }) => {
                assert_eq!(flags, 7);
                assert_eq!(expiration, clock().0 + Duration::seconds(10));
                assert_eq!(size, 5);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_expiration_relative_boundary() {
        match parse_fixed("set k 0 2592000 5") {
            Ok(Command::Set { expiration, .. }) => {
                assert_eq!(expiration, clock().0 + Duration::seconds(2_592_000))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_expiration_absolute_boundary() {
        match parse_fixed("set k 0 2592001 5") {
            Ok(Command::Set { expiration, .. }) => {
                assert_eq!(expiration, Utc.timestamp_opt(2_592_001, 0).unwrap())
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_expiration_zero_is_now() {
        match parse_fixed("set k 0 0 5") {
            Ok(Command::Set { expiration, .. }) => assert_eq!(expiration, clock().0),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_system_clock() {
        let before = Utc::now();
        let parsed = parse("set k 0 100 5");
        let after = Utc::now();
        match parsed {
            Ok(Command::Set { expiration, .. }) => {
                assert!(expiration >= before + Duration::seconds(100));
                assert!(expiration <= after + Duration::seconds(100));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_keys_are_verbatim() {
        match parse_fixed("set ключ\u{1F511} 1 0 0") {
            Ok(Command::Set { key, .. }) => assert_eq!(key, "ключ\u{1F511}"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_display() {
        let get = parse_fixed("get a b").unwrap();
        assert_eq!(get.to_string(), "get a b");

        let set = parse_fixed("set k 3 2592001 5 noreply").unwrap();
        assert_eq!(set.to_string(), "set k 3 1970-01-31T00:00:01+00:00 5 noreply");
    }
}
