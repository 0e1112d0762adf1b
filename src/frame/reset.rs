use std::fmt;

use crate::frame::{Frame, Reason, StreamId};

/// Abnormal termination of a single stream
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Reset {
    stream_id: StreamId,
    reason: Reason,
}

impl Reset {
    pub fn new(stream_id: StreamId, reason: Reason) -> Reset {
        Reset { stream_id, reason }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }
}

impl From<Reset> for Frame {
    fn from(src: Reset) -> Self {
        Frame::Reset(src)
    }
}

impl fmt::Display for Reset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RST_STREAM({}) on {}", self.reason, self.stream_id)
    }
}
