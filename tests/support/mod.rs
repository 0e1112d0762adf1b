#![allow(dead_code)]
use std::{cell::RefCell, rc::Rc};

use ntex_bytes::Bytes;
use ntex_h2_request::frame::{self, Frame, StreamId};
use ntex_h2_request::{Config, Connection, HeaderList, Requests, Transport};

/// Transport that keeps every encoded frame
#[derive(Clone, Default)]
pub struct Recorder(Rc<RefCell<Vec<Frame>>>);

impl Recorder {
    pub fn take(&self) -> Vec<Frame> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

impl Transport for Recorder {
    fn encode(&self, frame: Frame) {
        log::trace!("encoded: {:?}", frame);
        self.0.borrow_mut().push(frame);
    }
}

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn connection() -> (Connection, Requests, Recorder) {
    connection_with_config(Config::default())
}

pub fn connection_with_config(config: Config) -> (Connection, Requests, Recorder) {
    init();
    let rec = Recorder::default();
    let (con, requests) = Connection::new(rec.clone(), config);
    (con, requests, rec)
}

pub fn request_headers(extra: &[(&str, &str)]) -> HeaderList {
    let mut hdrs = HeaderList::from([
        (":scheme", "https"),
        (":method", "GET"),
        (":path", "/"),
        (":authority", "example.com"),
    ]);
    for (name, value) in extra {
        hdrs.add(*name, *value);
    }
    hdrs
}

pub fn headers(id: u32, fields: HeaderList, eof: bool) -> frame::Headers {
    frame::Headers::new(StreamId::from(id), fields, eof)
}

pub fn data(id: u32, payload: &'static [u8], eof: bool) -> frame::Data {
    let payload = Bytes::from_static(payload);
    if eof {
        frame::Data::last(StreamId::from(id), payload)
    } else {
        frame::Data::new(StreamId::from(id), payload)
    }
}

pub fn get_headers(frm: Frame) -> frame::Headers {
    match frm {
        Frame::Headers(hdrs) => hdrs,
        _ => panic!("Expect Headers frame: {:?}", frm),
    }
}

pub fn get_data(frm: Frame) -> frame::Data {
    match frm {
        Frame::Data(data) => data,
        _ => panic!("Expect Data frame: {:?}", frm),
    }
}

pub fn get_reset(frm: Frame) -> frame::Reset {
    match frm {
        Frame::Reset(rst) => rst,
        _ => panic!("Expect Reset frame: {:?}", frm),
    }
}

pub fn get_push_promise(frm: Frame) -> frame::PushPromise {
    match frm {
        Frame::PushPromise(pp) => pp,
        _ => panic!("Expect PushPromise frame: {:?}", frm),
    }
}

/// Header fields as owned pairs, for comparisons
pub fn pairs(hdrs: &HeaderList) -> Vec<(String, String)> {
    hdrs.iter()
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect()
}
