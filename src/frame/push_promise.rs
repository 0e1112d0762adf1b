use crate::frame::{Frame, StreamId};
use crate::headers::HeaderList;

/// Push promise frame
///
/// Announces a server-initiated stream (`promised_id`) on an open stream
/// initiated by the peer, together with the request headers of the
/// promised exchange.
#[derive(Clone, Debug)]
pub struct PushPromise {
    stream_id: StreamId,
    promised_id: StreamId,
    fields: HeaderList,
}

impl PushPromise {
    pub fn new(stream_id: StreamId, promised_id: StreamId, fields: HeaderList) -> Self {
        debug_assert!(promised_id.is_server_initiated());

        PushPromise {
            stream_id,
            promised_id,
            fields,
        }
    }

    /// Stream the promise is sent on
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Stream reserved by the promise
    pub fn promised_id(&self) -> StreamId {
        self.promised_id
    }

    pub fn fields(&self) -> &HeaderList {
        &self.fields
    }

    pub fn into_fields(self) -> HeaderList {
        self.fields
    }
}

impl From<PushPromise> for Frame {
    fn from(src: PushPromise) -> Self {
        Frame::PushPromise(src)
    }
}
