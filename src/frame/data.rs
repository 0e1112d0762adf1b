use std::fmt;

use ntex_bytes::Bytes;

use crate::frame::{Frame, StreamId};

bitflags::bitflags! {
    #[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
    struct DataFlags: u8 {
        const END_STREAM = 0x1;
    }
}

/// Body chunk of a request or a response
#[derive(Clone, PartialEq, Eq)]
pub struct Data {
    stream_id: StreamId,
    payload: Bytes,
    flags: DataFlags,
}

impl Data {
    pub fn new(stream_id: StreamId, payload: Bytes) -> Self {
        debug_assert!(!stream_id.is_zero(), "DATA on connection stream");
        Data {
            stream_id,
            payload,
            flags: DataFlags::empty(),
        }
    }

    /// Chunk that ends the sending side of the stream
    pub fn last(stream_id: StreamId, payload: Bytes) -> Self {
        let mut data = Data::new(stream_id, payload);
        data.set_end_stream();
        data
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags.contains(DataFlags::END_STREAM)
    }

    pub fn set_end_stream(&mut self) {
        self.flags.insert(DataFlags::END_STREAM);
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

impl From<Data> for Frame {
    fn from(src: Data) -> Self {
        Frame::Data(src)
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // payload is not printed
        f.debug_struct("Data")
            .field("stream_id", &self.stream_id)
            .field("len", &self.payload.len())
            .field("eof", &self.is_end_stream())
            .finish()
    }
}
