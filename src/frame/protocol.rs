use std::fmt;

use ntex_bytes::ByteString;

/// Value of the `:protocol` pseudo-header.
///
/// Requests carry it for the [Extended CONNECT Protocol], responses echo
/// the protocol the application switched to.
///
/// [Extended CONNECT Protocol]: https://datatracker.ietf.org/doc/html/rfc8441#section-4
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Protocol(ByteString);

impl Protocol {
    /// Converts a static string to a protocol name.
    pub const fn from_static(value: &'static str) -> Self {
        Protocol(ByteString::from_static(value))
    }

    /// Returns a str representation of the protocol.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Protocol {
    fn from(value: &str) -> Self {
        Protocol(ByteString::from(value))
    }
}

impl From<ByteString> for Protocol {
    fn from(value: ByteString) -> Self {
        Protocol(value)
    }
}

impl From<Protocol> for ByteString {
    fn from(proto: Protocol) -> Self {
        proto.0
    }
}

impl PartialEq<str> for Protocol {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
