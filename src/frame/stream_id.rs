use std::fmt;

/// 31-bit stream identifier.
///
/// Odd ids belong to client initiated streams, even ids to pushed streams.
/// Zero addresses the connection itself.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StreamId(u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StreamIdOverflow;

const STREAM_ID_MASK: u32 = 1 << 31;

impl StreamId {
    /// Connection level id
    pub const CON: StreamId = StreamId(0);

    pub const MAX: StreamId = StreamId(u32::MAX >> 1);

    pub fn is_client_initiated(&self) -> bool {
        let id = self.0;
        id != 0 && id % 2 == 1
    }

    pub fn is_server_initiated(&self) -> bool {
        let id = self.0;
        id != 0 && id % 2 == 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Next id of the same initiator
    pub fn next_id(&self) -> Result<StreamId, StreamIdOverflow> {
        let next = self.0 + 2;
        if next > StreamId::MAX.0 {
            Err(StreamIdOverflow)
        } else {
            Ok(StreamId(next))
        }
    }
}

impl From<u32> for StreamId {
    fn from(src: u32) -> Self {
        assert_eq!(src & STREAM_ID_MASK, 0, "invalid stream ID -- MSB is set");
        StreamId(src)
    }
}

impl From<StreamId> for u32 {
    fn from(src: StreamId) -> Self {
        src.0
    }
}

impl PartialEq<u32> for StreamId {
    fn eq(&self, other: &u32) -> bool {
        self.0 == *other
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({})", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initiator() {
        assert!(StreamId::from(1).is_client_initiated());
        assert!(!StreamId::from(1).is_server_initiated());
        assert!(StreamId::from(2).is_server_initiated());
        assert!(!StreamId::CON.is_client_initiated());
        assert!(!StreamId::CON.is_server_initiated());
    }

    #[test]
    fn next_id_overflow() {
        assert_eq!(StreamId::from(2).next_id(), Ok(StreamId::from(4)));
        assert_eq!(StreamId::MAX.next_id(), Err(StreamIdOverflow));
    }
}
