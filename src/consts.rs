use ntex_http::StatusCode;

// Constants
pub const DEFAULT_BODY_BUFFER_SIZE: usize = 64 * 1024;

/// Status sent when the application produced no response
pub(crate) const NO_RESPONSE_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

pub(crate) const FAILURE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Prefix of legacy environment-style header keys
pub(crate) const ENV_HEADER_PREFIX: &str = "HTTP_";
