//! Telegram integration layer: raw wire objects, response indexing and the
//! upstream gateway adapter.

pub mod entities;
pub mod gateway;
pub mod rate_limit;
pub mod resolve;
pub mod tl;

use thiserror::Error;

/// Failure of a single upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("gateway answered with HTTP status {0}")]
    Status(u16),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i32, message: String },
    #[error("undecodable reply: {0}")]
    Decode(String),
    #[error("request timed out after {0} ms")]
    Timeout(u64),
    #[error("call cancelled")]
    Cancelled,
}
