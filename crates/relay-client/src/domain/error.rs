use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::connection_state::ConnectionState;
use super::envelope::RequestId;

/// Error object reported by the relay node in an error envelope
///
/// Surfaced to callers unchanged.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("relay error {code}: {message}")]
pub struct RelayError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RelayError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        RelayError {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Error type for transport operations
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Connection could not be established
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Outbound channel or socket is closed
    #[error("channel closed")]
    ChannelClosed,
}

/// Error type for envelope encoding and decoding
#[derive(Error, Debug, Clone)]
pub enum CodecError {
    /// Inbound frame is not a recognizable response envelope
    #[error("malformed envelope: {0}")]
    Envelope(String),

    /// Result payload does not have the shape the method promises
    #[error("unexpected result for {method}: {reason}")]
    Result {
        method: &'static str,
        reason: String,
    },

    /// Outbound value could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Serialization(err.to_string())
    }
}

/// Error returned by every client operation
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("request {id} timed out after {timeout:?}")]
    Timeout { id: RequestId, timeout: Duration },

    /// Connection went away while the request was pending
    #[error("connection closed")]
    ConnectionClosed,

    #[error("not connected (state: {0})")]
    NotConnected(ConnectionState),
}

impl ClientError {
    /// The relay-reported error, if this failure came from the relay node
    pub fn relay_error(&self) -> Option<&RelayError> {
        match self {
            ClientError::Relay(err) => Some(err),
            _ => None,
        }
    }
}
