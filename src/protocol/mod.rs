//! Text protocol core.
//!
//! - `split`: reassembles a byte stream into CRLF-terminated lines
//! - `parser`: turns one line into a typed `Command`
//! - `response`: acknowledgement lines for the interpreter
//! - `clock`: time source for relative expirations

pub mod clock;
pub mod parser;
pub mod response;
pub mod split;

pub use clock::{Clock, SystemClock};
#[allow(unused_imports)]
pub use parser::parse;
pub use parser::{parse_with_clock, Command, ParseError};
pub use response::Response;
pub use split::{split, SplitError, SplitResult};
