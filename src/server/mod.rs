//! Application side of request streams.
mod service;

pub use self::service::{handle, serve};
