use ntex_bytes::Bytes;
use ntex_h2_request::frame::{Reason, StreamId};
use ntex_h2_request::{Body, Requests, Response, Writable};
use ntex_http::StatusCode;

mod support;
use self::support::*;

fn request(requests: &Requests) -> ntex_h2_request::Request {
    requests.try_recv().expect("request is enqueued")
}

fn strs<'a>(pairs: &'a [(String, String)]) -> Vec<(&'a str, &'a str)> {
    pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect()
}

#[ntex::test]
async fn no_response() {
    let (con, requests, rec) = connection();
    con.recv_headers(headers(1, request_headers(&[]), true));
    let req = request(&requests);

    req.send_response(None).await;

    let frames = rec.take();
    assert_eq!(frames.len(), 1);
    let hdrs = get_headers(frames.into_iter().next().unwrap());
    assert_eq!(hdrs.stream_id(), StreamId::from(1));
    assert!(hdrs.is_end_stream());
    assert_eq!(strs(&pairs(hdrs.fields())), vec![(":status", "500")]);

    assert!(req.stream().is_closed());
    assert_eq!(con.active_streams(), 0);
}

#[ntex::test]
async fn response_with_body() {
    let (con, requests, rec) = connection();
    con.recv_headers(headers(1, request_headers(&[]), true));
    let req = request(&requests);

    let res = Response::ok()
        .set_header("content-type", "text/plain")
        .set_header("set-cookie", "a=1")
        .set_header("set-cookie", "b=2")
        .set_body("hello");
    req.send_response(Some(res)).await;

    let mut frames = rec.take().into_iter();
    let hdrs = get_headers(frames.next().unwrap());
    assert!(!hdrs.is_end_stream());
    assert_eq!(
        strs(&pairs(hdrs.fields())),
        vec![
            (":status", "200"),
            ("content-length", "5"),
            ("content-type", "text/plain"),
            ("set-cookie", "a=1"),
            ("set-cookie", "b=2"),
        ]
    );

    let data = get_data(frames.next().unwrap());
    assert!(data.is_end_stream());
    assert_eq!(data.payload(), &Bytes::from_static(b"hello"));
    assert!(frames.next().is_none());
    assert_eq!(con.active_streams(), 0);
}

#[ntex::test]
async fn response_without_body() {
    let (con, requests, rec) = connection();
    con_request(&con);
    let req = request(&requests);

    let res = Response::new(StatusCode::NO_CONTENT)
        .set_header("x-id", "1")
        .set_protocol("websocket");
    req.send_response(Some(res)).await;

    let frames = rec.take();
    assert_eq!(frames.len(), 1);
    let hdrs = get_headers(frames.into_iter().next().unwrap());
    assert!(hdrs.is_end_stream());
    // protocol accompanies a body only
    assert_eq!(
        strs(&pairs(hdrs.fields())),
        vec![(":status", "204"), ("x-id", "1")]
    );
}

fn con_request(con: &ntex_h2_request::Connection) {
    con.recv_headers(headers(1, request_headers(&[]), true));
}

#[ntex::test]
async fn empty_body_ends_stream() {
    let (con, requests, rec) = connection();
    con_request(&con);
    let req = request(&requests);

    req.send_response(Some(Response::ok().set_body(Body::empty())))
        .await;

    let frames = rec.take();
    assert_eq!(frames.len(), 1);
    let hdrs = get_headers(frames.into_iter().next().unwrap());
    assert!(hdrs.is_end_stream());
    assert_eq!(hdrs.fields().get("content-length"), None);
}

#[ntex::test]
async fn protocol_with_body() {
    let (con, requests, rec) = connection();
    con_request(&con);
    let req = request(&requests);

    let res = Response::ok().set_protocol("websocket").set_body("x");
    req.send_response(Some(res)).await;

    let hdrs = get_headers(rec.take().into_iter().next().unwrap());
    assert_eq!(
        strs(&pairs(hdrs.fields())),
        vec![
            (":status", "200"),
            (":protocol", "websocket"),
            ("content-length", "1"),
        ]
    );
}

#[ntex::test]
async fn streaming_body() {
    let (con, requests, rec) = connection();
    con_request(&con);
    let req = request(&requests);

    let (tx, body) = Writable::new(None, 1024);
    tx.feed_data(Bytes::from_static(b"a")).unwrap();
    tx.feed_data(Bytes::from_static(b"b")).unwrap();
    tx.feed_eof().unwrap();
    req.send_response(Some(Response::ok().set_body(body))).await;

    let mut frames = rec.take().into_iter();
    let hdrs = get_headers(frames.next().unwrap());
    assert!(!hdrs.is_end_stream());
    assert_eq!(hdrs.fields().get("content-length"), None);

    let data = get_data(frames.next().unwrap());
    assert!(!data.is_end_stream());
    assert_eq!(data.payload(), &Bytes::from_static(b"a"));
    let data = get_data(frames.next().unwrap());
    assert!(data.is_end_stream());
    assert_eq!(data.payload(), &Bytes::from_static(b"b"));
    assert!(frames.next().is_none());
}

#[ntex::test]
async fn failed_body_resets_stream() {
    let (con, requests, rec) = connection();
    con_request(&con);
    let req = request(&requests);

    let (tx, body) = Writable::new(Some(10), 1024);
    tx.feed_data(Bytes::from_static(b"abc")).unwrap();
    assert!(tx.feed_eof().is_err());
    req.send_response(Some(Response::ok().set_body(body))).await;

    let mut frames = rec.take().into_iter();
    let hdrs = get_headers(frames.next().unwrap());
    assert_eq!(hdrs.fields().get("content-length"), Some("10"));
    let rst = get_reset(frames.next().unwrap());
    assert_eq!(rst.reason(), Reason::INTERNAL_ERROR);
    assert!(req.stream().is_reset());
}

#[ntex::test]
async fn single_response_per_stream() {
    let (con, requests, rec) = connection();
    con_request(&con);
    let req = request(&requests);

    req.send_response(Some(Response::ok())).await;
    req.send_response(Some(Response::ok().set_body("late"))).await;
    req.send_response(None).await;

    assert_eq!(rec.take().len(), 1);
}

#[ntex::test]
async fn response_after_reset() {
    let (con, requests, rec) = connection();
    con_request(&con);
    let req = request(&requests);

    con.recv_reset(ntex_h2_request::frame::Reset::new(
        StreamId::from(1),
        Reason::CANCEL,
    ));
    req.send_response(Some(Response::ok().set_body("hello"))).await;
    assert_eq!(rec.len(), 0);
}
