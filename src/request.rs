use std::{fmt, str::FromStr};

use ntex_bytes::ByteString;
use ntex_http::{uri, Method, Uri, Version};

use crate::error::{PushError, StreamError};
use crate::frame::Protocol;
use crate::headers::{self, HeaderList, Merged};
use crate::{body::Body, response::Response, stream::Stream};

/// Request received on a stream.
///
/// Pseudo-header fields are filled by the stream, each one at most once. The
/// application receives the request only after it passed validation and has
/// read-only access to it.
///
/// Dropping an enqueued request that has not been answered resets its
/// stream with `CANCEL`.
pub struct Request {
    scheme: Option<ByteString>,
    authority: Option<ByteString>,
    method: Option<ByteString>,
    path: Option<ByteString>,
    protocol: Option<Protocol>,
    headers: HeaderList,
    body: Option<Body>,
    stream: Stream,
    detached: bool,
}

impl Request {
    pub(crate) fn new(stream: Stream) -> Self {
        Request {
            stream,
            scheme: None,
            authority: None,
            method: None,
            path: None,
            protocol: None,
            headers: HeaderList::new(),
            body: None,
            detached: false,
        }
    }

    /// Response is sent through the stream, dropping the request
    /// does not cancel it
    pub(crate) fn detach(&mut self) {
        self.detached = true;
    }

    pub(crate) fn set_scheme(&mut self, value: ByteString) -> Result<(), StreamError> {
        set_once(&mut self.scheme, value, StreamError::DuplicateScheme)
    }

    pub(crate) fn set_authority(&mut self, value: ByteString) -> Result<(), StreamError> {
        set_once(&mut self.authority, value, StreamError::DuplicateAuthority)
    }

    pub(crate) fn set_method(&mut self, value: ByteString) -> Result<(), StreamError> {
        set_once(&mut self.method, value, StreamError::DuplicateMethod)
    }

    pub(crate) fn set_path(&mut self, value: ByteString) -> Result<(), StreamError> {
        set_once(&mut self.path, value, StreamError::DuplicatePath)
    }

    pub(crate) fn set_protocol(&mut self, value: Protocol) -> Result<(), StreamError> {
        set_once(&mut self.protocol, value, StreamError::DuplicateProtocol)
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderList {
        &mut self.headers
    }

    pub(crate) fn set_body(&mut self, body: Body) {
        self.body = Some(body);
    }

    /// Scheme, method and path are present
    pub fn is_valid(&self) -> bool {
        self.scheme.is_some() && self.method.is_some() && self.path.is_some()
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn protocol(&self) -> Option<&Protocol> {
        self.protocol.as_ref()
    }

    /// Ordinary header fields, in received order
    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn version(&self) -> Version {
        Version::HTTP_2
    }

    /// Parsed request method, `None` for extension methods that fail to parse
    pub fn parsed_method(&self) -> Option<Method> {
        self.method
            .as_deref()
            .and_then(|m| Method::from_bytes(m.as_bytes()).ok())
    }

    /// Request uri assembled from scheme, authority and path
    pub fn uri(&self) -> Uri {
        let mut parts = uri::Parts::default();

        if let Some(ref s) = self.scheme {
            if let Ok(s) = uri::Scheme::from_str(s) {
                parts.scheme = Some(s);
            }
        }
        if let Some(ref s) = self.authority {
            if let Ok(s) = uri::Authority::from_str(s) {
                parts.authority = Some(s);
            }
        }
        if let Some(ref s) = self.path {
            if let Ok(s) = uri::PathAndQuery::from_str(s) {
                parts.path_and_query = Some(s);
            }
        }
        Uri::from_parts(parts).unwrap_or_default()
    }

    /// Request body, absent if headers ended the stream
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// Raw connection takeover is not possible on a multiplexed stream
    pub fn hijack(&self) -> bool {
        false
    }

    /// Check if peer accepts pushed streams
    pub fn is_push_enabled(&self) -> bool {
        self.stream.connection().is_push_enabled()
    }

    /// Promise a `GET` request for `path` to the peer.
    ///
    /// Scheme and authority default to the ones of this request. Extra
    /// `headers` follow the pseudo-headers as is. The promised request is
    /// enqueued like any received request, the returned stream carries it.
    ///
    /// Push capability is not checked, see [`Request::is_push_enabled`].
    pub fn push(
        &self,
        path: &str,
        headers: Option<HeaderList>,
        scheme: Option<&str>,
        authority: Option<&str>,
    ) -> Result<Stream, PushError> {
        let scheme = scheme.or(self.scheme()).ok_or(PushError::MissingScheme)?;
        let authority = authority
            .or(self.authority())
            .ok_or(PushError::MissingAuthority)?;

        let pseudo = HeaderList::from([
            (headers::SCHEME, scheme),
            (headers::METHOD, Method::GET.as_str()),
            (headers::PATH, path),
            (headers::AUTHORITY, authority),
        ]);
        let push_headers = match headers {
            Some(fields) => Merged::new(pseudo, fields).into(),
            None => pseudo,
        };
        self.stream.send_push_promise(push_headers)
    }

    /// Send response on the request's stream
    pub async fn send_response(&self, response: Option<Response>) {
        self.stream.send_response(response).await
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if !self.detached {
            self.stream.request_dropped();
        }
    }
}

fn set_once<T>(field: &mut Option<T>, value: T, err: StreamError) -> Result<(), StreamError> {
    if field.is_some() {
        Err(err)
    } else {
        *field = Some(value);
        Ok(())
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("stream", &self.stream.id())
            .field("scheme", &self.scheme)
            .field("authority", &self.authority)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("protocol", &self.protocol)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}
