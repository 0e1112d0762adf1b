//! Decoded HTTP/2 frames.
//!
//! Binary framing and header compression live in the connection codec,
//! these values carry frames after decoding and before encoding.
use std::fmt;

mod data;
mod headers;
mod protocol;
mod push_promise;
mod reason;
mod reset;
mod stream_id;

pub use self::data::Data;
pub use self::headers::{Headers, HeadersFlag};
pub use self::protocol::Protocol;
pub use self::push_promise::PushPromise;
pub use self::reason::Reason;
pub use self::reset::Reset;
pub use self::stream_id::{StreamId, StreamIdOverflow};

#[derive(Clone)]
pub enum Frame {
    Data(Data),
    Headers(Headers),
    PushPromise(PushPromise),
    Reset(Reset),
}

impl Frame {
    pub fn stream_id(&self) -> StreamId {
        match self {
            Frame::Data(frm) => frm.stream_id(),
            Frame::Headers(frm) => frm.stream_id(),
            Frame::PushPromise(frm) => frm.stream_id(),
            Frame::Reset(frm) => frm.stream_id(),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::Frame::*;

        match *self {
            Data(ref frame) => fmt::Debug::fmt(frame, fmt),
            Headers(ref frame) => fmt::Debug::fmt(frame, fmt),
            PushPromise(ref frame) => fmt::Debug::fmt(frame, fmt),
            Reset(ref frame) => fmt::Debug::fmt(frame, fmt),
        }
    }
}
