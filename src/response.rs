use ntex_bytes::ByteString;
use ntex_http::{HeaderMap, StatusCode};

use crate::{body::Body, frame::Protocol, headers::HeaderList};

/// Application response
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderList,
    body: Option<Body>,
    protocol: Option<Protocol>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Response {
            status,
            headers: HeaderList::new(),
            body: None,
            protocol: None,
        }
    }

    /// `200 OK` response
    pub fn ok() -> Self {
        Response::new(StatusCode::OK)
    }

    /// `500 Internal Server Error` response with plain text description
    pub fn internal_error<T: Into<Body>>(message: T) -> Self {
        Response::new(StatusCode::INTERNAL_SERVER_ERROR).set_body(message)
    }

    /// Append header field, duplicates are preserved
    pub fn set_header<K, V>(mut self, name: K, value: V) -> Self
    where
        ByteString: From<K> + From<V>,
    {
        self.headers.add(name, value);
        self
    }

    /// Append all fields of a header map
    pub fn set_headers(mut self, map: &HeaderMap) -> Self {
        for (name, value) in HeaderList::from(map) {
            self.headers.add(name, value);
        }
        self
    }

    pub fn set_body<T: Into<Body>>(mut self, body: T) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set `:protocol` sent along with the response body
    pub fn set_protocol<T: Into<Protocol>>(mut self, protocol: T) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderList {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn protocol(&self) -> Option<&Protocol> {
        self.protocol.as_ref()
    }

    pub(crate) fn into_parts(self) -> (StatusCode, HeaderList, Option<Body>, Option<Protocol>) {
        (self.status, self.headers, self.body, self.protocol)
    }
}
