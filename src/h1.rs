//! Reader for non-multiplexed, line based requests.
//!
//! Header lines are matched with `Name: value` followed by whitespace, the
//! first line that does not match ends the header section. Values end at
//! the first whitespace.
use std::io::BufRead;
use std::sync::OnceLock;

use ntex_bytes::Bytes;
use ntex_util::HashMap;
use regex::Regex;

use crate::{consts::ENV_HEADER_PREFIX, error::ParseError};

const HTTP_CONTENT_LENGTH: &str = "HTTP_CONTENT_LENGTH";

/// Request read from the legacy wire form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRequest {
    pub method: String,
    pub url: String,
    pub version: String,
    /// Environment style keys, `Content-Type` becomes `HTTP_CONTENT_TYPE`
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
}

fn header_line() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"([a-zA-Z\-]+):\s*(.+?)\s+").expect("header pattern is valid")
    })
}

/// Convert header name to environment style key
pub fn env_key(name: &str) -> String {
    let mut key = String::with_capacity(ENV_HEADER_PREFIX.len() + name.len());
    key.push_str(ENV_HEADER_PREFIX);
    key.extend(
        name.chars()
            .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() }),
    );
    key
}

/// Read one request.
///
/// Body is read only if `Content-Length` header is present, exactly that
/// many bytes.
pub fn read_request<R: BufRead>(io: &mut R) -> Result<LegacyRequest, ParseError> {
    let mut line = String::new();
    if io.read_line(&mut line)? == 0 {
        return Err(ParseError::Eof);
    }

    let mut parts = line.split_whitespace();
    let (method, url, version) = match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(url), Some(version)) => {
            (method.to_string(), url.to_string(), version.to_string())
        }
        _ => return Err(ParseError::RequestLine(line.trim_end().to_string())),
    };

    let mut headers = HashMap::default();
    loop {
        line.clear();
        if io.read_line(&mut line)? == 0 {
            break;
        }
        if let Some(caps) = header_line().captures(&line) {
            headers.insert(env_key(&caps[1]), caps[2].to_string());
        } else {
            break;
        }
    }
    log::trace!("{} {} {} headers: {:?}", method, url, version, headers);

    let body = if let Some(length) = headers.get(HTTP_CONTENT_LENGTH) {
        let length = length
            .parse::<usize>()
            .map_err(|_| ParseError::ContentLength(length.clone()))?;
        let mut buf = vec![0; length];
        io.read_exact(&mut buf)?;
        Some(Bytes::from(buf))
    } else {
        None
    };

    Ok(LegacyRequest {
        method,
        url,
        version,
        headers,
        body,
    })
}
