//! CRLF line splitting.
//!
//! `split` is called repeatedly by the interpreter with its accumulated
//! buffer. It keeps no cursor of its own: the result depends only on the
//! bytes passed in and the end-of-input flag, so feeding a stream in one
//! chunk or in many gives the same lines.

/// Line delimiter: carriage return followed by newline.
pub const DELIMITER: &[u8] = b"\r\n";

/// Result of a split attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum SplitResult<'a> {
    /// No delimiter yet; append more bytes and call again.
    NeedMoreData,
    /// A complete line. The caller must discard `consumed` bytes from the
    /// front of the buffer before the next call.
    Line {
        /// Bytes consumed including the delimiter.
        consumed: usize,
        /// Line payload without the delimiter. May be empty.
        content: &'a [u8],
    },
    /// Input exhausted on an empty buffer.
    EndOfStream,
    /// Terminal error for this stream.
    Fail(SplitError),
}

/// Tokenizer errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    /// The stream ended inside a line that has no terminator.
    UnterminatedInput {
        /// Length of the dangling fragment.
        len: usize,
    },
}

impl std::fmt::Display for SplitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplitError::UnterminatedInput { len } => {
                write!(f, "Unexpected end of input: {} bytes without line terminator", len)
            }
        }
    }
}

impl std::error::Error for SplitError {}

/// Split the next CRLF-terminated line off the front of `buffer`.
pub fn split(buffer: &[u8], at_end: bool) -> SplitResult<'_> {
    if at_end && buffer.is_empty() {
        return SplitResult::EndOfStream;
    }

    if let Some(pos) = find_crlf(buffer) {
        return SplitResult::Line {
            consumed: pos + DELIMITER.len(),
            content: &buffer[..pos],
        };
    }

    if at_end {
        return SplitResult::Fail(SplitError::UnterminatedInput { len: buffer.len() });
    }

    SplitResult::NeedMoreData
}

/// Find \r\n in buffer, returning the position of \r.
fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(DELIMITER.len()).position(|w| w == DELIMITER)
}
