//! Server side request handling for HTTP/2 streams.
//!
//! The crate turns decoded HTTP/2 frames into application requests. Each
//! stream validates its header block, builds a [`Request`] with a streaming
//! [`Body`] and hands it to the application through [`Requests`]. Responses
//! and pushed promises are encoded back into frames.
//!
//! The crate is decoupled from the binary framing layer and hpack. Decoded
//! frames are passed to [`Connection`], outbound frames are handed to a
//! [`Transport`] implementation.
//!
//! # Layout
//!
//! * [`frame`] contains frame types exchanged with the codec.
//! * [`headers`] contains ordered header lists and pseudo-header names.
//! * [`server`] adapts an `ntex-service` service to the request queue.
//! * [`h1`] reads requests in the legacy line based form.
//!
//! # Streams
//!
//! A stream is created by the connection for each client initiated request
//! and for each promised push. Malformed header sequences are answered with
//! a synthetic `400` response, structurally incomplete requests reset the
//! stream with `PROTOCOL_ERROR`. Only complete requests reach the
//! application, each one exactly once.
#![deny(rust_2018_idioms)]

macro_rules! proto_err {
    (stream: $($msg:tt)+) => {
        log::debug!("stream error PROTOCOL_ERROR -- {};", format_args!($($msg)+))
    };
}

mod body;
mod config;
mod connection;
mod consts;
mod error;
mod request;
mod response;
mod stream;

pub mod frame;
pub mod h1;
pub mod headers;
pub mod server;

pub use self::body::{Body, Writable};
pub use self::config::Config;
pub use self::connection::{Connection, Requests, Transport};
pub use self::consts::DEFAULT_BODY_BUFFER_SIZE;
pub use self::error::{BodyError, ParseError, PushError, StreamError};
pub use self::headers::{HeaderList, Merged};
pub use self::request::Request;
pub use self::response::Response;
pub use self::stream::{HeadersOutcome, Stream};
