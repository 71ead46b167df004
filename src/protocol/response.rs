//! Acknowledgement lines written back by the interpreter.

use bytes::BytesMut;

use super::parser::ParseError;

/// Response generator
pub struct Response;

impl Response {
    /// Generate ok acknowledgement
    pub fn ok() -> &'static [u8] {
        b"ok\r\n"
    }

    /// Generate ERROR response (line is not a known command)
    pub fn error() -> &'static [u8] {
        b"ERROR\r\n"
    }

    /// Generate CLIENT_ERROR response
    pub fn client_error(msg: &str) -> BytesMut {
        let mut response = BytesMut::with_capacity(15 + msg.len());
        response.extend_from_slice(b"CLIENT_ERROR ");
        response.extend_from_slice(msg.as_bytes());
        response.extend_from_slice(b"\r\n");
        response
    }

    /// Map a parse failure to its reply.
    pub fn for_parse_error(e: &ParseError) -> BytesMut {
        match e {
            ParseError::EmptyCommand | ParseError::UnrecognizedCommand(_) => {
                BytesMut::from(Self::error())
            }
            _ => Self::client_error(&e.to_string()),
        }
    }
}
