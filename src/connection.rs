use std::cell::{Cell, RefCell};
use std::task::{Context, Poll};
use std::{collections::VecDeque, fmt, future::poll_fn, mem, pin::Pin, rc::Rc};

use ntex_util::{task::LocalWaker, HashMap, Stream as FutStream};

use crate::frame::{self, Frame, Reason, Reset, StreamId};
use crate::{config::Config, error::PushError, request::Request, stream::Stream};

/// Outbound side of the frame codec.
///
/// Frames are handed over fully built, header blocks still have to be
/// compressed by the implementation.
pub trait Transport {
    fn encode(&self, frame: Frame);
}

impl<T: Transport> Transport for Rc<T> {
    fn encode(&self, frame: Frame) {
        (**self).encode(frame)
    }
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    struct Flags: u8 {
        const PUSH_ENABLED = 0b0000_0001;
        const DISCONNECTED = 0b0000_0010;
    }
}

/// Server side of an http/2 connection.
///
/// Frames decoded by the codec are dispatched through `recv_*` methods, one
/// at a time. Completed requests are delivered through [`Requests`].
#[derive(Clone)]
pub struct Connection(Rc<ConnectionInner>);

struct ConnectionInner {
    transport: Box<dyn Transport>,
    config: Config,
    flags: Cell<Flags>,
    streams: RefCell<HashMap<StreamId, Stream>>,
    last_remote_id: Cell<StreamId>,
    last_push_id: Cell<StreamId>,
    queue: Rc<Queue>,
}

/// Inbound request queue.
///
/// Requests are delivered in the order their headers were completed.
pub struct Requests(Rc<Queue>);

#[derive(Default)]
struct Queue {
    items: RefCell<VecDeque<Request>>,
    closed: Cell<bool>,
    rx_dropped: Cell<bool>,
    waker: LocalWaker,
}

impl Connection {
    pub fn new<T>(transport: T, config: Config) -> (Connection, Requests)
    where
        T: Transport + 'static,
    {
        let mut flags = Flags::empty();
        if config.enable_push {
            flags.insert(Flags::PUSH_ENABLED);
        }
        let queue = Rc::new(Queue::default());

        let con = Connection(Rc::new(ConnectionInner {
            transport: Box::new(transport),
            config,
            flags: Cell::new(flags),
            streams: RefCell::new(HashMap::default()),
            last_remote_id: Cell::new(StreamId::CON),
            last_push_id: Cell::new(StreamId::CON),
            queue: queue.clone(),
        }));
        (con, Requests(queue))
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    /// Check if peer accepts server push
    pub fn is_push_enabled(&self) -> bool {
        self.0.flags.get().contains(Flags::PUSH_ENABLED)
    }

    /// Update push capability from peer's `SETTINGS_ENABLE_PUSH`
    pub fn set_push_enabled(&self, enabled: bool) {
        let mut flags = self.0.flags.get();
        flags.set(Flags::PUSH_ENABLED, enabled);
        self.0.flags.set(flags);
    }

    pub fn is_disconnected(&self) -> bool {
        self.0.flags.get().contains(Flags::DISCONNECTED)
    }

    /// Number of open streams
    pub fn active_streams(&self) -> usize {
        self.0.streams.borrow().len()
    }

    pub fn query(&self, id: StreamId) -> Option<Stream> {
        self.0.streams.borrow().get(&id).cloned()
    }

    /// Dispatch HEADERS frame
    pub fn recv_headers(&self, hdrs: frame::Headers) {
        if self.is_disconnected() {
            log::trace!("connection is closed, ignore {:?}", hdrs);
            return;
        }

        let id = hdrs.stream_id();
        if let Some(stream) = self.query(id) {
            stream.receive_headers(hdrs);
        } else if !id.is_client_initiated() {
            proto_err!(stream: "HEADERS on non client stream {:?}", id);
            self.encode(Reset::new(id, Reason::PROTOCOL_ERROR).into());
        } else if id <= self.0.last_remote_id.get() {
            proto_err!(stream: "HEADERS on closed stream {:?}", id);
            self.encode(Reset::new(id, Reason::STREAM_CLOSED).into());
        } else {
            self.0.last_remote_id.set(id);
            let stream = Stream::new(id, self.clone());
            self.0.streams.borrow_mut().insert(id, stream.clone());
            stream.receive_headers(hdrs);
        }
    }

    /// Dispatch DATA frame.
    ///
    /// Completes once the stream's body accepted the payload, it waits
    /// while that body is full. Only the caller is suspended, so a reader
    /// that awaits every frame inline stalls all streams behind one slow
    /// body. Drive each stream's DATA from its own task to keep streams
    /// independent.
    ///
    /// At most one delivery per stream may be pending at a time, the body
    /// keeps a single producer waker.
    pub async fn recv_data(&self, data: frame::Data) {
        if self.is_disconnected() {
            log::trace!("connection is closed, ignore {:?}", data);
            return;
        }

        if let Some(stream) = self.query(data.stream_id()) {
            stream.receive_data(data).await;
        } else {
            proto_err!(stream: "DATA on unknown stream {:?}", data.stream_id());
            self.encode(Reset::new(data.stream_id(), Reason::STREAM_CLOSED).into());
        }
    }

    /// Dispatch RST_STREAM frame
    pub fn recv_reset(&self, rst: frame::Reset) {
        log::trace!("processing RST_STREAM: {:?}", rst);

        if let Some(stream) = self.query(rst.stream_id()) {
            stream.receive_reset(rst.reason());
        }
    }

    /// Tear down all streams and close the request queue
    pub fn disconnect(&self) {
        let mut flags = self.0.flags.get();
        if flags.contains(Flags::DISCONNECTED) {
            return;
        }
        flags.insert(Flags::DISCONNECTED);
        self.0.flags.set(flags);

        let streams = mem::take(&mut *self.0.streams.borrow_mut());
        log::debug!("connection is closed, {} active streams", streams.len());
        for stream in streams.into_values() {
            stream.receive_reset(Reason::CANCEL);
        }
        self.0.queue.close();
    }

    pub(crate) fn encode(&self, frame: Frame) {
        if self.is_disconnected() {
            log::trace!("connection is closed, drop {:?}", frame);
        } else {
            self.0.transport.encode(frame);
        }
    }

    /// Hand request to the application, gives it back if nobody listens
    pub(crate) fn enqueue(&self, req: Request) -> Result<(), Request> {
        self.0.queue.push(req)
    }

    /// Allocate server initiated stream
    pub(crate) fn create_push_promise_stream(&self) -> Result<Stream, PushError> {
        if self.is_disconnected() {
            return Err(PushError::Disconnected);
        }
        let id = self.0.last_push_id.get().next_id()?;
        self.0.last_push_id.set(id);

        let stream = Stream::new(id, self.clone());
        self.0.streams.borrow_mut().insert(id, stream.clone());
        Ok(stream)
    }

    pub(crate) fn remove(&self, id: StreamId) {
        let stream = self.0.streams.borrow_mut().remove(&id);
        if stream.is_some() {
            log::trace!("stream {:?} is closed", id);
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("flags", &self.0.flags.get())
            .field("streams", &self.0.streams.borrow().len())
            .field("config", &self.0.config)
            .finish()
    }
}

impl Queue {
    fn push(&self, req: Request) -> Result<(), Request> {
        if self.closed.get() || self.rx_dropped.get() {
            Err(req)
        } else {
            self.items.borrow_mut().push_back(req);
            self.waker.wake();
            Ok(())
        }
    }

    fn close(&self) {
        self.closed.set(true);
        self.waker.wake();
    }
}

impl Requests {
    /// Next request, `None` once the connection is closed and the queue
    /// is drained
    pub async fn recv(&self) -> Option<Request> {
        poll_fn(|cx| self.poll_recv(cx)).await
    }

    pub fn poll_recv(&self, cx: &Context<'_>) -> Poll<Option<Request>> {
        if let Some(req) = self.0.items.borrow_mut().pop_front() {
            Poll::Ready(Some(req))
        } else if self.0.closed.get() {
            Poll::Ready(None)
        } else {
            self.0.waker.register(cx.waker());
            Poll::Pending
        }
    }

    /// Take request without waiting
    pub fn try_recv(&self) -> Option<Request> {
        self.0.items.borrow_mut().pop_front()
    }

    /// Number of requests waiting for the application
    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }
}

impl Drop for Requests {
    fn drop(&mut self) {
        self.0.rx_dropped.set(true);
        let pending = mem::take(&mut *self.0.items.borrow_mut());
        for req in pending {
            log::debug!("request queue is dropped, refuse {:?}", req.stream().id());
            req.stream().send_reset_stream(Reason::REFUSED_STREAM);
        }
    }
}

impl FutStream for Requests {
    type Item = Request;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Request>> {
        self.poll_recv(cx)
    }
}

impl fmt::Debug for Requests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requests")
            .field("pending", &self.len())
            .field("closed", &self.0.closed.get())
            .finish()
    }
}
