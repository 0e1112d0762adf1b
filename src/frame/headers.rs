use std::fmt;

use crate::frame::{Frame, StreamId};
use crate::headers::HeaderList;

bitflags::bitflags! {
    /// Flags of a HEADERS frame
    #[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
    pub struct HeadersFlag: u8 {
        const END_STREAM = 0x1;
        const END_HEADERS = 0x4;
    }
}

/// Decompressed header block.
///
/// Depending on the stream state the block is a request, a response or
/// trailers. Continuation frames are already folded in.
#[derive(Clone)]
pub struct Headers {
    stream_id: StreamId,
    fields: HeaderList,
    flags: HeadersFlag,
}

impl Headers {
    pub fn new(stream_id: StreamId, fields: HeaderList, eof: bool) -> Self {
        let mut flags = HeadersFlag::END_HEADERS;
        flags.set(HeadersFlag::END_STREAM, eof);
        Headers {
            stream_id,
            fields,
            flags,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn flags(&self) -> HeadersFlag {
        self.flags
    }

    pub fn is_end_headers(&self) -> bool {
        self.flags.contains(HeadersFlag::END_HEADERS)
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags.contains(HeadersFlag::END_STREAM)
    }

    pub fn set_end_stream(&mut self) {
        self.flags.insert(HeadersFlag::END_STREAM)
    }

    /// Fields in wire order, pseudo-headers included
    pub fn fields(&self) -> &HeaderList {
        &self.fields
    }

    pub fn into_fields(self) -> HeaderList {
        self.fields
    }
}

impl From<Headers> for Frame {
    fn from(src: Headers) -> Self {
        Frame::Headers(src)
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Headers")
            .field("stream_id", &self.stream_id)
            .field("flags", &self.flags)
            .field("fields", &self.fields)
            .finish()
    }
}
