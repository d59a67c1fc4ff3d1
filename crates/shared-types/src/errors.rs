//! # Error Types
//!
//! Errors delivered through bus replies.

use crate::security::MeltdownReason;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Value delivered to a reply callback.
pub type BusResult = Result<Value, BusError>;

/// Errors that travel back to a caller through its reply.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusError {
    /// The caller's breaker tripped on this call (or earlier).
    #[error("module {module} is in meltdown: {reason}")]
    Meltdown {
        module: String,
        reason: MeltdownReason,
    },

    /// The kernel dropped the call without forwarding it.
    #[error("call dropped by the kernel")]
    Dropped,

    /// The body did not decode into the expected request.
    #[error("malformed body: {0}")]
    MalformedBody(String),

    /// The listener refused the caller's claims.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The record already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The listener failed while handling the call.
    #[error("handler failed: {0}")]
    Handler(String),

    /// The reply was dropped without ever being invoked.
    #[error("reply dropped without a response")]
    ReplyDropped,
}
