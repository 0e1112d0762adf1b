use std::io;

use ntex_bytes::ByteString;
use ntex_http::StatusCode;

use crate::frame::{Reason, StreamIdOverflow};

/// Header sequencing errors.
///
/// Each one fails only the stream it was detected on, with a synthetic
/// `400 Bad Request` response carrying the error message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Request scheme already specified")]
    DuplicateScheme,
    #[error("Request authority already specified")]
    DuplicateAuthority,
    #[error("Request method already specified")]
    DuplicateMethod,
    #[error("Request path already specified")]
    DuplicatePath,
    #[error("Request protocol already specified")]
    DuplicateProtocol,
    #[error("Request content length already specified")]
    DuplicateContentLength,
    #[error("Invalid content length {0:?}")]
    InvalidContentLength(ByteString),
    #[error("Invalid pseudo-header {0}")]
    InvalidPseudoHeader(ByteString),
}

impl StreamError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// Errors observed by the consumer or the producer of a body.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodyError {
    /// A chunk would push the body past its declared length
    #[error("Body exceeds declared content length")]
    LengthExceeded,
    /// End of input arrived before the declared length was delivered
    #[error("Body ended before declared content length")]
    Incomplete,
    /// Stream has been reset locally, by the peer or by connection teardown
    #[error("Stream reset: {0}")]
    Reset(Reason),
    /// Body does not accept data anymore
    #[error("Body is closed")]
    Closed,
}

/// Usage errors of server push, reported to the caller only.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("Missing scheme")]
    MissingScheme,
    #[error("Missing authority")]
    MissingAuthority,
    /// Promises can only be sent while the response is not complete
    #[error("Stream is closed")]
    StreamClosed,
    /// Pushed streams cannot promise further requests
    #[error("Push promise on a server initiated stream")]
    NotClientInitiated,
    #[error("Connection is closed")]
    Disconnected,
    #[error("Stream ID space is exhausted")]
    StreamIdOverflow,
}

impl From<StreamIdOverflow> for PushError {
    fn from(_: StreamIdOverflow) -> Self {
        PushError::StreamIdOverflow
    }
}

/// Legacy request reader errors
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("Connection closed before request line")]
    Eof,
    #[error("Malformed request line {0:?}")]
    RequestLine(String),
    #[error("Invalid content length {0:?}")]
    ContentLength(String),
    #[error("{0}")]
    Io(#[from] io::Error),
}
