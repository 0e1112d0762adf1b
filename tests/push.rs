use ntex_h2_request::frame::StreamId;
use ntex_h2_request::{Config, HeaderList, PushError, Response};

mod support;
use self::support::*;

#[ntex::test]
async fn push_promise() {
    let (con, requests, rec) = connection_with_config(Config::default().set_enable_push(true));
    con.recv_headers(headers(1, request_headers(&[]), true));
    let req = requests.try_recv().unwrap();
    assert!(req.is_push_enabled());

    let pushed = req
        .push(
            "/foo.png",
            Some(HeaderList::from([("accept", "image/png")])),
            Some("https"),
            Some("example.com"),
        )
        .unwrap();
    assert_eq!(pushed.id(), StreamId::from(2));
    assert!(pushed.id().is_server_initiated());
    assert!(pushed.is_enqueued());

    let frames = rec.take();
    assert_eq!(frames.len(), 1);
    let pp = get_push_promise(frames.into_iter().next().unwrap());
    assert_eq!(pp.stream_id(), StreamId::from(1));
    assert_eq!(pp.promised_id(), StreamId::from(2));
    assert_eq!(
        pairs(pp.fields()),
        vec![
            (":scheme".to_string(), "https".to_string()),
            (":method".into(), "GET".into()),
            (":path".into(), "/foo.png".into()),
            (":authority".into(), "example.com".into()),
            ("accept".into(), "image/png".into()),
        ]
    );

    // promised request goes through the same queue
    let promised = requests.try_recv().unwrap();
    assert!(requests.is_empty());
    assert_eq!(promised.stream(), &pushed);
    assert_eq!(promised.method(), Some("GET"));
    assert_eq!(promised.path(), Some("/foo.png"));
    assert_eq!(promised.headers().get("accept"), Some("image/png"));
    assert!(promised.body().is_none());

    promised
        .send_response(Some(Response::ok().set_body("png")))
        .await;
    let frames = rec.take();
    assert_eq!(frames.len(), 2);
    assert!(frames
        .iter()
        .all(|frm| frm.stream_id() == StreamId::from(2)));
    assert_eq!(con.active_streams(), 1);
}

#[test]
fn push_defaults_to_request_origin() {
    let (con, requests, rec) = connection();
    con.recv_headers(headers(1, request_headers(&[]), true));
    let req = requests.try_recv().unwrap();
    // capability is advisory
    assert!(!req.is_push_enabled());

    let first = req.push("/a.css", None, None, None).unwrap();
    let second = req.push("/b.js", None, Some("http"), None).unwrap();
    assert_eq!(first.id(), StreamId::from(2));
    assert_eq!(second.id(), StreamId::from(4));

    let frames = rec.take();
    let pp = get_push_promise(frames[0].clone());
    assert_eq!(pp.fields().get(":scheme"), Some("https"));
    assert_eq!(pp.fields().get(":authority"), Some("example.com"));
    let pp = get_push_promise(frames[1].clone());
    assert_eq!(pp.fields().get(":scheme"), Some("http"));
    assert_eq!(pp.fields().len(), 4);

    assert_eq!(requests.len(), 2);
}

#[test]
fn push_without_authority() {
    let (con, requests, rec) = connection();
    let fields = HeaderList::from([(":scheme", "https"), (":method", "GET"), (":path", "/")]);
    con.recv_headers(headers(1, fields, true));
    let req = requests.try_recv().unwrap();

    assert_eq!(
        req.push("/a.css", None, None, None),
        Err(PushError::MissingAuthority)
    );
    assert_eq!(rec.len(), 0);
    assert!(requests.is_empty());

    assert!(req.push("/a.css", None, None, Some("example.com")).is_ok());
}

#[ntex::test]
async fn push_after_response() {
    let (con, requests, rec) = connection();
    con.recv_headers(headers(1, request_headers(&[]), true));
    let req = requests.try_recv().unwrap();

    req.send_response(Some(Response::ok())).await;
    rec.take();

    assert_eq!(
        req.push("/a.css", None, None, None),
        Err(PushError::StreamClosed)
    );
    assert_eq!(rec.len(), 0);
}

#[test]
fn push_from_promised_stream() {
    let (con, requests, rec) = connection_with_config(Config::default().set_enable_push(true));
    con.recv_headers(headers(1, request_headers(&[]), true));
    let req = requests.try_recv().unwrap();
    req.push("/a.css", None, None, None).unwrap();
    rec.take();

    let promised = requests.try_recv().unwrap();
    assert_eq!(promised.stream().id(), StreamId::from(2));
    assert_eq!(
        promised.push("/b.css", None, None, None),
        Err(PushError::NotClientInitiated)
    );
    assert_eq!(rec.len(), 0);
    assert!(requests.is_empty());
    assert_eq!(con.active_streams(), 2);
}

#[test]
fn push_toggled_by_peer() {
    let (con, _requests, _rec) = connection();
    assert!(!con.is_push_enabled());
    con.set_push_enabled(true);
    assert!(con.is_push_enabled());
}
