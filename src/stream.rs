use std::{cell::Cell, cell::RefCell, fmt, rc::Rc};

use ntex_bytes::{ByteString, Bytes};
use ntex_http::StatusCode;

use crate::body::{Body, Writable};
use crate::connection::Connection;
use crate::error::{BodyError, PushError, StreamError};
use crate::frame::{self, Data, PushPromise, Reason, Reset, StreamId};
use crate::headers::{self, HeaderList, Merged, PSEUDO_SIGIL};
use crate::{consts, request::Request, response::Response};

/// Http/2 stream serving one request.
///
/// Streams are created by the connection when a request starts or when the
/// application pushes a promised request.
#[derive(Clone)]
pub struct Stream(Rc<StreamInner>);

struct StreamInner {
    /// The h2 stream identifier
    id: StreamId,
    recv: Cell<HalfState>,
    send: Cell<HalfState>,
    flags: Cell<Flags>,
    /// Declared length of request body
    content_length: Cell<Option<u64>>,
    /// Request under construction, handed off once headers are applied
    request: RefCell<Option<Request>>,
    /// Producer side of request body
    input: RefCell<Option<Writable>>,
    connection: Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HalfState {
    Headers,
    Payload,
    Closed,
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    struct Flags: u8 {
        const ENQUEUED = 0b0000_0001;
        const RESET    = 0b0000_0010;
    }
}

/// Result of applying a header block to the stream's request.
#[derive(Debug)]
pub enum HeadersOutcome {
    /// Request is complete and valid
    Applied(Request),
    /// Header sequencing error, answered with a synthetic response
    StreamFailure(StatusCode, ByteString),
    /// Request is structurally incomplete, stream must be reset
    ProtocolReset(Reason),
}

impl Stream {
    pub(crate) fn new(id: StreamId, connection: Connection) -> Self {
        let stream = Stream(Rc::new(StreamInner {
            id,
            connection,
            recv: Cell::new(HalfState::Headers),
            send: Cell::new(HalfState::Headers),
            flags: Cell::new(Flags::empty()),
            content_length: Cell::new(None),
            request: RefCell::new(None),
            input: RefCell::new(None),
        }));
        *stream.0.request.borrow_mut() = Some(Request::new(stream.clone()));
        stream
    }

    pub fn id(&self) -> StreamId {
        self.0.id
    }

    pub fn connection(&self) -> &Connection {
        &self.0.connection
    }

    /// Returns true if request has been handed to the application
    pub fn is_enqueued(&self) -> bool {
        self.0.flags.get().contains(Flags::ENQUEUED)
    }

    /// Returns true if stream has been reset, locally or by peer
    pub fn is_reset(&self) -> bool {
        self.0.flags.get().contains(Flags::RESET)
    }

    /// Returns true if both directions are closed
    pub fn is_closed(&self) -> bool {
        self.0.recv.get() == HalfState::Closed && self.0.send.get() == HalfState::Closed
    }

    /// Process received HEADERS frame
    pub fn receive_headers(&self, hdrs: frame::Headers) {
        log::trace!("processing HEADERS for {:?}: {:#?}", self.0.id, hdrs);

        let eof = hdrs.is_end_stream();
        match self.0.recv.get() {
            HalfState::Headers => {
                let outcome = self.apply_headers(hdrs.fields(), eof);
                self.handle_outcome(outcome, eof);
            }
            HalfState::Payload => self.receive_trailers(hdrs.into_fields(), eof),
            HalfState::Closed => {
                proto_err!(stream: "unexpected HEADERS frame for {:?}", self.0.id);
                self.send_reset_stream(Reason::STREAM_CLOSED);
            }
        }
    }

    /// Apply header fields to the request, strictly in order.
    ///
    /// Processing stops at the first sequencing error. A request that is
    /// valid after all fields are applied is returned, with a streaming body
    /// unless `eof` is set.
    pub fn apply_headers(&self, headers: &HeaderList, eof: bool) -> HeadersOutcome {
        let req = self.0.request.borrow_mut().take();
        let mut req = if let Some(req) = req {
            req
        } else {
            proto_err!(stream: "request for {:?} is already processed", self.0.id);
            return HeadersOutcome::ProtocolReset(Reason::PROTOCOL_ERROR);
        };

        for (name, value) in headers {
            if let Err(err) = self.apply_field(&mut req, name, value) {
                return HeadersOutcome::StreamFailure(err.status(), err.to_string().into());
            }
        }

        if !req.is_valid() {
            proto_err!(stream: "incomplete request for {:?}: {:?}", self.0.id, req);
            return HeadersOutcome::ProtocolReset(Reason::PROTOCOL_ERROR);
        }

        // body exists only if data is coming
        if !eof {
            let (input, body) = Writable::new(
                self.0.content_length.get(),
                self.0.connection.config().body_buffer_size,
            );
            *self.0.input.borrow_mut() = Some(input);
            req.set_body(body);
        }
        HeadersOutcome::Applied(req)
    }

    fn apply_field(
        &self,
        req: &mut Request,
        name: &ByteString,
        value: &ByteString,
    ) -> Result<(), StreamError> {
        match &**name {
            headers::SCHEME => req.set_scheme(value.clone()),
            headers::AUTHORITY => req.set_authority(value.clone()),
            headers::METHOD => req.set_method(value.clone()),
            headers::PATH => req.set_path(value.clone()),
            headers::PROTOCOL => req.set_protocol(value.clone().into()),
            headers::CONTENT_LENGTH => {
                if self.0.content_length.get().is_some() {
                    return Err(StreamError::DuplicateContentLength);
                }
                let length = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| StreamError::InvalidContentLength(value.clone()))?;
                self.0.content_length.set(Some(length));
                Ok(())
            }
            n if n.starts_with(PSEUDO_SIGIL) => Err(StreamError::InvalidPseudoHeader(name.clone())),
            _ => {
                req.headers_mut().add(name.clone(), value.clone());
                Ok(())
            }
        }
    }

    fn handle_outcome(&self, outcome: HeadersOutcome, eof: bool) {
        match outcome {
            HeadersOutcome::Applied(req) => {
                self.0.recv.set(if eof {
                    HalfState::Closed
                } else {
                    HalfState::Payload
                });

                log::trace!("request is ready {:?}", req);
                match self.0.connection.enqueue(req) {
                    Ok(()) => self.insert_flags(Flags::ENQUEUED),
                    Err(req) => {
                        log::debug!("request queue is closed, refuse {:?}", self.0.id);
                        self.send_reset_stream(Reason::REFUSED_STREAM);
                        drop(req);
                    }
                }
            }
            HeadersOutcome::StreamFailure(status, message) => self.send_failure(status, &message),
            HeadersOutcome::ProtocolReset(reason) => self.send_reset_stream(reason),
        }
    }

    fn receive_trailers(&self, trailers: HeaderList, eof: bool) {
        if !eof || trailers.has_pseudo() {
            proto_err!(stream: "malformed trailers for {:?}: {:?}", self.0.id, trailers);
            self.send_reset_stream(Reason::PROTOCOL_ERROR);
            return;
        }

        self.0.recv.set(HalfState::Closed);
        let input = self.0.input.borrow_mut().take();
        if let Some(input) = input {
            input.set_trailers(trailers);
            if let Err(err) = input.feed_eof() {
                proto_err!(stream: "request body for {:?} failed: {}", self.0.id, err);
                self.send_reset_stream(Reason::PROTOCOL_ERROR);
                return;
            }
        }
        self.maybe_close();
    }

    /// Process received DATA frame.
    ///
    /// Waits while request body buffer is full. Calls must not overlap,
    /// see [`Connection::recv_data`].
    pub async fn receive_data(&self, data: Data) {
        log::trace!(
            "processing DATA for {:?}: {:?}",
            self.0.id,
            data.len()
        );

        if self.0.recv.get() != HalfState::Payload {
            proto_err!(stream: "unexpected DATA frame for {:?}", self.0.id);
            self.send_reset_stream(Reason::STREAM_CLOSED);
            return;
        }

        let input = self.0.input.borrow().clone();
        if let Some(input) = input {
            input.ready().await;

            // stream could be reset while waiting
            if self.0.recv.get() != HalfState::Payload {
                return;
            }

            let eof = data.is_end_stream();
            let result = input.feed_data(data.into_payload()).and_then(|_| {
                if eof {
                    input.feed_eof()
                } else {
                    Ok(())
                }
            });

            match result {
                Ok(()) if eof => {
                    self.0.recv.set(HalfState::Closed);
                    self.0.input.borrow_mut().take();
                    self.maybe_close();
                }
                Ok(()) => (),
                Err(err) => {
                    proto_err!(stream: "request body for {:?} failed: {}", self.0.id, err);
                    self.send_reset_stream(Reason::PROTOCOL_ERROR);
                }
            }
        }
    }

    /// Process reset, from peer or from connection teardown
    pub fn receive_reset(&self, reason: Reason) {
        log::trace!("stream {:?} is reset by peer: {:?}", self.0.id, reason);
        if !self.is_reset() {
            self.terminate(reason);
        }
    }

    /// Answer with synthetic response and end the stream.
    ///
    /// Only this stream is affected.
    pub fn send_failure(&self, status: StatusCode, message: &str) {
        if self.0.send.get() != HalfState::Headers {
            log::debug!("response for {:?} is already started", self.0.id);
            self.send_reset_stream(Reason::PROTOCOL_ERROR);
            return;
        }
        proto_err!(stream: "{:?} failed with {}: {}", self.0.id, status, message);

        let body = Bytes::copy_from_slice(message.as_bytes());
        let headers = HeaderList::from([
            (headers::STATUS, status.as_str()),
            ("content-type", consts::FAILURE_CONTENT_TYPE),
        ])
        .field(headers::CONTENT_LENGTH, body.len().to_string());

        // nothing else is read from this stream
        self.0.recv.set(HalfState::Closed);
        let input = self.0.input.borrow_mut().take();
        if let Some(input) = input {
            input.set_error(BodyError::Closed);
        }
        let req = self.0.request.borrow_mut().take();
        drop(req);

        self.send_headers(headers, false);
        self.send_data(body, true);
    }

    /// Send RST_STREAM and close the stream
    pub fn send_reset_stream(&self, reason: Reason) {
        if self.is_reset() {
            return;
        }
        log::debug!("reset stream {:?}: {:?}", self.0.id, reason);

        self.0
            .connection
            .encode(Reset::new(self.0.id, reason).into());
        self.terminate(reason);
    }

    /// Request was dropped by the application, cancel the stream unless
    /// a response is already on its way
    pub(crate) fn request_dropped(&self) {
        if self.is_enqueued() && self.0.send.get() == HalfState::Headers {
            log::debug!("request for {:?} is dropped without response", self.0.id);
            self.send_reset_stream(Reason::CANCEL);
        }
    }

    fn terminate(&self, reason: Reason) {
        self.insert_flags(Flags::RESET);
        self.0.recv.set(HalfState::Closed);
        self.0.send.set(HalfState::Closed);

        let input = self.0.input.borrow_mut().take();
        if let Some(input) = input {
            input.set_error(BodyError::Reset(reason));
        }
        let req = self.0.request.borrow_mut().take();
        drop(req);

        self.0.connection.remove(self.0.id);
    }

    fn maybe_close(&self) {
        if self.is_closed() {
            let req = self.0.request.borrow_mut().take();
            drop(req);
            self.0.connection.remove(self.0.id);
        }
    }

    fn insert_flags(&self, f: Flags) {
        let mut flags = self.0.flags.get();
        flags.insert(f);
        self.0.flags.set(flags);
    }

    /// Allocate promised stream and enqueue its request.
    ///
    /// Promised requests never carry a body.
    pub fn create_push_promise_stream(&self, headers: HeaderList) -> Result<Stream, PushError> {
        let stream = self.0.connection.create_push_promise_stream()?;
        log::trace!(
            "push promise {:?} on {:?}: {:?}",
            stream.id(),
            self.0.id,
            headers
        );

        self.0
            .connection
            .encode(PushPromise::new(self.0.id, stream.id(), headers.clone()).into());

        let outcome = stream.apply_headers(&headers, true);
        stream.handle_outcome(outcome, true);
        Ok(stream)
    }

    /// Promise a request to the peer, see [`Request::push`]
    pub fn send_push_promise(&self, headers: HeaderList) -> Result<Stream, PushError> {
        if !self.0.id.is_client_initiated() {
            Err(PushError::NotClientInitiated)
        } else if self.0.send.get() == HalfState::Closed {
            Err(PushError::StreamClosed)
        } else {
            self.create_push_promise_stream(headers)
        }
    }

    pub(crate) fn send_headers(&self, headers: HeaderList, eof: bool) {
        let hdrs = frame::Headers::new(self.0.id, headers, eof);
        log::trace!("send headers {:#?}", hdrs);

        self.0.send.set(if eof {
            HalfState::Closed
        } else {
            HalfState::Payload
        });
        self.0.connection.encode(hdrs.into());
        if eof {
            self.maybe_close();
        }
    }

    pub(crate) fn send_data(&self, chunk: Bytes, eof: bool) {
        let data = if eof {
            self.0.send.set(HalfState::Closed);
            Data::last(self.0.id, chunk)
        } else {
            Data::new(self.0.id, chunk)
        };
        self.0.connection.encode(data.into());
        if eof {
            self.maybe_close();
        }
    }

    /// Stream body as DATA frames, the last one ends the stream
    pub async fn send_body(&self, mut body: Body) {
        let mut pending: Option<Bytes> = None;

        while let Some(item) = body.recv().await {
            if self.0.send.get() != HalfState::Payload {
                log::trace!("stream {:?} is closed, drop response body", self.0.id);
                return;
            }
            match item {
                Ok(chunk) => {
                    if let Some(prev) = pending.replace(chunk) {
                        self.send_data(prev, false);
                    }
                }
                Err(err) => {
                    log::debug!("response body for {:?} failed: {}", self.0.id, err);
                    self.send_reset_stream(Reason::INTERNAL_ERROR);
                    return;
                }
            }
        }

        if self.0.send.get() == HalfState::Payload {
            self.send_data(pending.unwrap_or_default(), true);
        }
    }

    /// Encode response.
    ///
    /// Absent response is answered with bare `500` status.
    pub async fn send_response(&self, response: Option<Response>) {
        if self.0.send.get() != HalfState::Headers {
            log::debug!("response for {:?} is already sent", self.0.id);
            return;
        }

        let res = if let Some(res) = response {
            res
        } else {
            let hdrs = HeaderList::from([(headers::STATUS, consts::NO_RESPONSE_STATUS.as_str())]);
            self.send_headers(hdrs, true);
            return;
        };

        let (status, fields, body, protocol) = res.into_parts();
        let mut pseudo = HeaderList::from([(headers::STATUS, status.as_str())]);

        match body {
            Some(body) if !body.is_empty() => {
                if let Some(protocol) = protocol {
                    pseudo.add(headers::PROTOCOL, ByteString::from(protocol));
                }
                if let Some(length) = body.length() {
                    pseudo.add(headers::CONTENT_LENGTH, length.to_string());
                }
                self.send_headers(Merged::new(pseudo, fields).into(), false);
                self.send_body(body).await;
            }
            _ => self.send_headers(Merged::new(pseudo, fields).into(), true),
        }
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Stream) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("stream_id", &self.0.id)
            .field("recv_state", &self.0.recv.get())
            .field("send_state", &self.0.send.get())
            .field("flags", &self.0.flags.get())
            .finish()
    }
}
