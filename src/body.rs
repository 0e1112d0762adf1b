//! Request and response payloads.
//!
//! Inbound bodies are fed by DATA frames through a [`Writable`] handle and
//! drained by the application through [`Body`]. Unread data is bounded, once
//! the configured amount is buffered the producer has to wait in
//! [`Writable::ready`] until the consumer catches up.
use std::cell::{Cell, RefCell};
use std::task::{Context, Poll};
use std::{collections::VecDeque, fmt, future::poll_fn, pin::Pin, rc::Rc};

use ntex_bytes::{Bytes, BytesMut};
use ntex_util::{task::LocalWaker, Stream as FutStream};

use crate::{error::BodyError, headers::HeaderList};

/// Lazy, finite sequence of byte chunks.
///
/// The sequence cannot be restarted, chunks are yielded in arrival order.
pub struct Body {
    kind: Kind,
}

enum Kind {
    Empty,
    Chunks {
        chunks: VecDeque<Bytes>,
        length: Option<u64>,
    },
    Channel(Rc<Shared>),
}

/// Producer side of a streaming body.
#[derive(Clone)]
pub struct Writable(Rc<Shared>);

struct Shared {
    length: Option<u64>,
    capacity: usize,
    delivered: Cell<u64>,
    buffered: Cell<usize>,
    state: Cell<State>,
    rx_dropped: Cell<bool>,
    items: RefCell<VecDeque<Bytes>>,
    trailers: RefCell<Option<HeaderList>>,
    rx_task: LocalWaker,
    tx_task: LocalWaker,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Open,
    Eof,
    Failed(BodyError),
    Done,
}

impl Body {
    /// Body without content
    pub fn empty() -> Self {
        Body { kind: Kind::Empty }
    }

    /// Body yielding pre-built chunks.
    ///
    /// `length` is announced to the peer as content length, it is not
    /// checked against the chunks.
    pub fn from_chunks<I>(chunks: I, length: Option<u64>) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        Body {
            kind: Kind::Chunks {
                chunks: chunks.into_iter().collect(),
                length,
            },
        }
    }

    /// Declared length, if known
    pub fn length(&self) -> Option<u64> {
        match self.kind {
            Kind::Empty => Some(0),
            Kind::Chunks { length, .. } => length,
            Kind::Channel(ref shared) => shared.length,
        }
    }

    /// Returns true if body is known to carry no data
    pub fn is_empty(&self) -> bool {
        self.length() == Some(0)
    }

    /// Trailers received after the last chunk
    pub fn trailers(&self) -> Option<HeaderList> {
        match self.kind {
            Kind::Channel(ref shared) => shared.trailers.borrow().clone(),
            _ => None,
        }
    }

    /// Attempt to pull out the next chunk, registering the current task for
    /// wakeup if the chunk is not yet available. Returns `None` once the body
    /// is exhausted.
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, BodyError>>> {
        match self.kind {
            Kind::Empty => Poll::Ready(None),
            Kind::Chunks { ref mut chunks, .. } => Poll::Ready(chunks.pop_front().map(Ok)),
            Kind::Channel(ref shared) => shared.poll_recv(cx),
        }
    }

    /// Next chunk of the body
    pub async fn recv(&mut self) -> Option<Result<Bytes, BodyError>> {
        poll_fn(|cx| self.poll_recv(cx)).await
    }

    /// Read the whole body into memory
    pub async fn read_to_end(mut self) -> Result<Bytes, BodyError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.recv().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl Drop for Body {
    fn drop(&mut self) {
        if let Kind::Channel(ref shared) = self.kind {
            shared.rx_dropped.set(true);
            shared.buffered.set(0);
            shared.items.borrow_mut().clear();
            shared.tx_task.wake();
        }
    }
}

impl FutStream for Body {
    type Item = Result<Bytes, BodyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_recv(cx)
    }
}

impl From<Bytes> for Body {
    fn from(chunk: Bytes) -> Self {
        let length = Some(chunk.len() as u64);
        Body::from_chunks(Some(chunk), length)
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::from(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::from(Bytes::from(s))
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::from(Bytes::from(v))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Empty => f.write_str("Body::Empty"),
            Kind::Chunks {
                ref chunks, length, ..
            } => f
                .debug_struct("Body::Chunks")
                .field("chunks", &chunks.len())
                .field("length", &length)
                .finish(),
            Kind::Channel(ref shared) => f
                .debug_struct("Body::Stream")
                .field("length", &shared.length)
                .field("delivered", &shared.delivered.get())
                .field("state", &shared.state.get())
                .finish(),
        }
    }
}

impl Writable {
    /// Create a streaming body bound to an optional declared length.
    ///
    /// `capacity` is the amount of unread bytes after which the producer
    /// is suspended.
    pub fn new(length: Option<u64>, capacity: usize) -> (Writable, Body) {
        let state = if length == Some(0) {
            State::Eof
        } else {
            State::Open
        };
        let shared = Rc::new(Shared {
            length,
            capacity,
            delivered: Cell::new(0),
            buffered: Cell::new(0),
            state: Cell::new(state),
            rx_dropped: Cell::new(false),
            items: RefCell::new(VecDeque::new()),
            trailers: RefCell::new(None),
            rx_task: LocalWaker::default(),
            tx_task: LocalWaker::default(),
        });
        (
            Writable(shared.clone()),
            Body {
                kind: Kind::Channel(shared),
            },
        )
    }

    /// Declared length
    pub fn length(&self) -> Option<u64> {
        self.0.length
    }

    /// Number of bytes accepted so far
    pub fn delivered(&self) -> u64 {
        self.0.delivered.get()
    }

    /// Returns true if the body is complete, failed or its consumer is gone
    pub fn is_closed(&self) -> bool {
        self.0.state.get() != State::Open || self.0.rx_dropped.get()
    }

    /// Check if the body can buffer more data.
    ///
    /// Returns `Pending` while the unread data reaches capacity, closed
    /// bodies are always ready. Only the last registered task is woken.
    pub fn poll_ready(&self, cx: &Context<'_>) -> Poll<()> {
        if self.is_closed() || self.0.buffered.get() < self.0.capacity {
            Poll::Ready(())
        } else {
            self.0.tx_task.register(cx.waker());
            Poll::Pending
        }
    }

    /// Wait until the body can buffer more data
    pub async fn ready(&self) {
        poll_fn(|cx| self.poll_ready(cx)).await
    }

    /// Append a chunk.
    ///
    /// A chunk that would exceed the declared length is rejected as a whole
    /// and fails the body with `BodyError::LengthExceeded`.
    pub fn feed_data(&self, chunk: Bytes) -> Result<(), BodyError> {
        let inner = &self.0;
        if chunk.is_empty() {
            return Ok(());
        }

        match inner.state.get() {
            State::Open => (),
            State::Eof if inner.length.is_some() => return Err(BodyError::LengthExceeded),
            State::Failed(err) => return Err(err),
            State::Eof | State::Done => return Err(BodyError::Closed),
        }

        let total = inner.delivered.get() + chunk.len() as u64;
        if let Some(length) = inner.length {
            if total > length {
                log::debug!(
                    "body chunk of {} bytes exceeds declared length {} ({} delivered)",
                    chunk.len(),
                    length,
                    inner.delivered.get()
                );
                inner.fail(BodyError::LengthExceeded, false);
                return Err(BodyError::LengthExceeded);
            }
        }
        inner.delivered.set(total);

        if !inner.rx_dropped.get() {
            inner.buffered.set(inner.buffered.get() + chunk.len());
            inner.items.borrow_mut().push_back(chunk);
        }
        if inner.length == Some(total) {
            inner.state.set(State::Eof);
        }
        inner.rx_task.wake();
        Ok(())
    }

    /// Signal end of input.
    ///
    /// Fails the body with `BodyError::Incomplete` if less than the declared
    /// length has been delivered.
    pub fn feed_eof(&self) -> Result<(), BodyError> {
        let inner = &self.0;
        match inner.state.get() {
            State::Open => {
                if let Some(length) = inner.length {
                    if inner.delivered.get() < length {
                        inner.fail(BodyError::Incomplete, false);
                        return Err(BodyError::Incomplete);
                    }
                }
                inner.state.set(State::Eof);
                inner.rx_task.wake();
                Ok(())
            }
            State::Eof => Ok(()),
            State::Failed(err) => Err(err),
            State::Done => Err(BodyError::Closed),
        }
    }

    /// Attach trailers, they become visible through `Body::trailers()`
    pub fn set_trailers(&self, trailers: HeaderList) {
        *self.0.trailers.borrow_mut() = Some(trailers);
    }

    /// Tear down an incomplete body.
    ///
    /// Unread data is discarded, the consumer receives `err` and then the end
    /// of the sequence. Completed bodies are left intact.
    pub fn set_error(&self, err: BodyError) {
        if self.0.state.get() == State::Open {
            self.0.fail(err, true);
        }
    }
}

impl fmt::Debug for Writable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writable")
            .field("length", &self.0.length)
            .field("delivered", &self.0.delivered.get())
            .field("buffered", &self.0.buffered.get())
            .field("state", &self.0.state.get())
            .finish()
    }
}

impl Shared {
    fn fail(&self, err: BodyError, discard: bool) {
        if discard {
            self.items.borrow_mut().clear();
            self.buffered.set(0);
        }
        self.state.set(State::Failed(err));
        self.rx_task.wake();
        self.tx_task.wake();
    }

    fn poll_recv(&self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, BodyError>>> {
        if let Some(chunk) = self.items.borrow_mut().pop_front() {
            self.buffered.set(self.buffered.get() - chunk.len());
            self.tx_task.wake();
            return Poll::Ready(Some(Ok(chunk)));
        }

        match self.state.get() {
            State::Open => {
                self.rx_task.register(cx.waker());
                Poll::Pending
            }
            State::Eof | State::Done => Poll::Ready(None),
            State::Failed(err) => {
                self.state.set(State::Done);
                Poll::Ready(Some(Err(err)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::task::{Context, Poll, Waker};

    use super::*;

    fn poll(body: &mut Body) -> Poll<Option<Result<Bytes, BodyError>>> {
        body.poll_recv(&mut Context::from_waker(Waker::noop()))
    }

    fn ready(w: &Writable) -> bool {
        w.poll_ready(&Context::from_waker(Waker::noop())).is_ready()
    }

    #[test]
    fn declared_length_completes() {
        let (w, mut body) = Writable::new(Some(10), 1024);
        assert!(poll(&mut body).is_pending());

        w.feed_data(Bytes::from_static(b"01234")).unwrap();
        w.feed_data(Bytes::from_static(b"56789")).unwrap();
        assert!(w.is_closed());
        assert_eq!(w.delivered(), 10);

        assert_eq!(poll(&mut body), Poll::Ready(Some(Ok(Bytes::from_static(b"01234")))));
        assert_eq!(poll(&mut body), Poll::Ready(Some(Ok(Bytes::from_static(b"56789")))));
        assert_eq!(poll(&mut body), Poll::Ready(None));

        // extra byte after completion is rejected, body stays complete
        assert_eq!(
            w.feed_data(Bytes::from_static(b"x")),
            Err(BodyError::LengthExceeded)
        );
        assert_eq!(w.delivered(), 10);
        assert_eq!(poll(&mut body), Poll::Ready(None));
    }

    #[test]
    fn overflow_rejects_whole_chunk() {
        let (w, mut body) = Writable::new(Some(10), 1024);
        w.feed_data(Bytes::from_static(b"01234567")).unwrap();
        assert_eq!(
            w.feed_data(Bytes::from_static(b"89A")),
            Err(BodyError::LengthExceeded)
        );
        assert_eq!(w.delivered(), 8);

        assert_eq!(
            poll(&mut body),
            Poll::Ready(Some(Ok(Bytes::from_static(b"01234567"))))
        );
        assert_eq!(
            poll(&mut body),
            Poll::Ready(Some(Err(BodyError::LengthExceeded)))
        );
        assert_eq!(poll(&mut body), Poll::Ready(None));
    }

    #[test]
    fn unknown_length_needs_eof() {
        let (w, mut body) = Writable::new(None, 1024);
        w.feed_data(Bytes::from_static(b"hello")).unwrap();
        assert!(!w.is_closed());
        assert_eq!(poll(&mut body), Poll::Ready(Some(Ok(Bytes::from_static(b"hello")))));
        assert!(poll(&mut body).is_pending());

        w.feed_eof().unwrap();
        assert_eq!(poll(&mut body), Poll::Ready(None));
        assert_eq!(w.feed_data(Bytes::from_static(b"!")), Err(BodyError::Closed));
    }

    #[test]
    fn early_eof_is_incomplete() {
        let (w, mut body) = Writable::new(Some(4), 1024);
        w.feed_data(Bytes::from_static(b"ab")).unwrap();
        assert_eq!(w.feed_eof(), Err(BodyError::Incomplete));

        assert_eq!(poll(&mut body), Poll::Ready(Some(Ok(Bytes::from_static(b"ab")))));
        assert_eq!(poll(&mut body), Poll::Ready(Some(Err(BodyError::Incomplete))));
        assert_eq!(poll(&mut body), Poll::Ready(None));
    }

    #[test]
    fn zero_length_is_complete() {
        let (w, mut body) = Writable::new(Some(0), 1024);
        assert!(w.is_closed());
        assert!(body.is_empty());
        assert_eq!(w.feed_eof(), Ok(()));
        assert_eq!(w.feed_data(Bytes::new()), Ok(()));
        assert_eq!(poll(&mut body), Poll::Ready(None));
    }

    #[test]
    fn backpressure() {
        let (w, mut body) = Writable::new(None, 4);
        assert!(ready(&w));
        w.feed_data(Bytes::from_static(b"abcd")).unwrap();
        assert!(!ready(&w));

        assert!(poll(&mut body).is_ready());
        assert!(ready(&w));
    }

    #[test]
    fn reset_discards_pending_data() {
        let (w, mut body) = Writable::new(None, 4);
        w.feed_data(Bytes::from_static(b"abcd")).unwrap();
        w.set_error(BodyError::Reset(crate::frame::Reason::CANCEL));

        // producer is released
        assert!(ready(&w));
        assert_eq!(
            poll(&mut body),
            Poll::Ready(Some(Err(BodyError::Reset(crate::frame::Reason::CANCEL))))
        );
        assert_eq!(poll(&mut body), Poll::Ready(None));
    }

    #[test]
    fn dropped_consumer_releases_producer() {
        let (w, body) = Writable::new(None, 4);
        w.feed_data(Bytes::from_static(b"abcd")).unwrap();
        assert!(!ready(&w));
        drop(body);
        assert!(ready(&w));
        assert!(w.feed_data(Bytes::from_static(b"efgh")).is_ok());
    }

    #[test]
    fn fixed_bodies() {
        let mut body = Body::from("hello");
        assert_eq!(body.length(), Some(5));
        assert_eq!(poll(&mut body), Poll::Ready(Some(Ok(Bytes::from_static(b"hello")))));
        assert_eq!(poll(&mut body), Poll::Ready(None));

        let mut body = Body::empty();
        assert!(body.is_empty());
        assert_eq!(poll(&mut body), Poll::Ready(None));

        let body = Body::from_chunks(vec![Bytes::from_static(b"a")], None);
        assert_eq!(body.length(), None);
        assert!(!body.is_empty());
    }
}
