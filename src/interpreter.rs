//! Read loop driving the tokenizer and parser.
//!
//! Reads bytes into a growable buffer, splits off CRLF lines, parses each
//! one and writes an acknowledgement. Parse errors are reported to the
//! client and the loop continues; tokenizer and I/O errors end the stream.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::protocol::split::DELIMITER;
use crate::protocol::{
    parse_with_clock, split, Clock, Command, Response, SplitError, SplitResult, SystemClock,
};

/// Read buffer size
const BUFFER_SIZE: usize = 16 * 1024;

/// Interpreter settings
#[derive(Debug, Clone)]
pub struct Options {
    /// Longest accepted line payload in bytes (0 = unlimited)
    pub max_line_length: usize,
    /// Whether acknowledgements are written at all
    pub acknowledge: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_line_length: 0,
            acknowledge: true,
        }
    }
}

impl From<&Config> for Options {
    fn from(config: &Config) -> Self {
        Self {
            max_line_length: config.max_line_length,
            acknowledge: config.acknowledge,
        }
    }
}

/// Counters for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Lines split off the stream
    pub lines: u64,
    /// Lines that parsed into a command
    pub commands: u64,
    /// Lines rejected by the parser
    pub errors: u64,
    /// Reply bytes written
    pub bytes_written: u64,
}

/// Errors that end a stream
#[derive(Debug)]
pub enum InterpreterError {
    /// Reading or writing failed
    Io(std::io::Error),
    /// The tokenizer rejected the input
    Split(SplitError),
    /// A line exceeded the configured limit
    LineTooLong { limit: usize, len: usize },
}

impl std::fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpreterError::Io(e) => write!(f, "I/O error: {}", e),
            InterpreterError::Split(e) => write!(f, "Scan error: {}", e),
            InterpreterError::LineTooLong { limit, len } => {
                write!(f, "Line too long: {} bytes exceeds limit of {}", len, limit)
            }
        }
    }
}

impl std::error::Error for InterpreterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InterpreterError::Io(e) => Some(e),
            InterpreterError::Split(e) => Some(e),
            InterpreterError::LineTooLong { .. } => None,
        }
    }
}

impl From<std::io::Error> for InterpreterError {
    fn from(e: std::io::Error) -> Self {
        InterpreterError::Io(e)
    }
}

impl From<SplitError> for InterpreterError {
    fn from(e: SplitError) -> Self {
        InterpreterError::Split(e)
    }
}

/// Line interpreter for one stream.
pub struct Interpreter<C = SystemClock> {
    options: Options,
    clock: C,
}

impl Interpreter<SystemClock> {
    /// Create an interpreter reading the wall clock.
    pub fn new(options: Options) -> Self {
        Self::with_clock(options, SystemClock)
    }
}

impl<C: Clock> Interpreter<C> {
    /// Create an interpreter with an explicit clock.
    pub fn with_clock(options: Options, clock: C) -> Self {
        Self { options, clock }
    }

    /// Process `reader` until end of input, writing replies to `writer`.
    pub async fn run<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<Summary, InterpreterError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);
        let mut summary = Summary::default();
        let mut at_end = false;

        let result = loop {
            match split(&buffer, at_end) {
                SplitResult::Line { consumed, content } => {
                    if let Err(e) = self.check_length(content.len()) {
                        break Err(e);
                    }
                    let line = String::from_utf8_lossy(content).into_owned();
                    buffer.advance(consumed);
                    summary.lines += 1;

                    if let Some(reply) = self.handle_line(&line, &mut summary) {
                        writer.write_all(&reply).await?;
                        summary.bytes_written += reply.len() as u64;
                        trace!(written = reply.len(), "Reply written");
                    }
                }

                SplitResult::NeedMoreData => {
                    // A trailing \r may still be waiting for its \n.
                    let pending = buffer.len().saturating_sub(DELIMITER.len() - 1);
                    if let Err(e) = self.check_length(pending) {
                        break Err(e);
                    }
                    let n = reader.read_buf(&mut buffer).await?;
                    if n == 0 {
                        trace!("End of input");
                        at_end = true;
                    }
                }

                SplitResult::EndOfStream => break Ok(summary),

                SplitResult::Fail(e) => break Err(e.into()),
            }
        };

        writer.flush().await?;
        result
    }

    /// Parse one line and build its reply, if any.
    fn handle_line(&self, line: &str, summary: &mut Summary) -> Option<BytesMut> {
        debug!(line_len = line.len(), text = %line, "Line received");

        let reply = match parse_with_clock(line, &self.clock) {
            Ok(command) => {
                summary.commands += 1;
                debug!(command = %command, "Command parsed");
                match command {
                    Command::Set {
                        suppress_reply: true,
                        ..
                    } => None,
                    Command::Get { .. } | Command::Set { .. } => {
                        Some(BytesMut::from(Response::ok()))
                    }
                }
            }
            Err(e) => {
                summary.errors += 1;
                warn!(error = %e, "Parse error");
                Some(Response::for_parse_error(&e))
            }
        };

        reply.filter(|_| self.options.acknowledge)
    }

    fn check_length(&self, len: usize) -> Result<(), InterpreterError> {
        let limit = self.options.max_line_length;
        if limit > 0 && len > limit {
            return Err(InterpreterError::LineTooLong { limit, len });
        }
        Ok(())
    }
}
