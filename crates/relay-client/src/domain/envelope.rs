use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::error::RelayError;

/// Identifier correlating a request with its response
pub type RequestId = u64;

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol methods understood by the relay node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    PostMessage,
    GetContentMessages,
    GetMessages,
    SubscribeContent,
    Subscribe,
    Unsubscribe,
    GetStoredMessages,
    GetPeers,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::PostMessage => "post_message",
            Method::GetContentMessages => "get_content_messages",
            Method::GetMessages => "get_messages",
            Method::SubscribeContent => "subscribe_content",
            Method::Subscribe => "subscribe",
            Method::Unsubscribe => "unsubscribe",
            Method::GetStoredMessages => "get_stored_messages",
            Method::GetPeers => "get_peers",
        }
    }

    /// Fire-and-forget methods are sent without waiting for a reply
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Method::PostMessage | Method::Unsubscribe)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl RequestEnvelope {
    pub fn new(id: RequestId, method: Method, params: Vec<Value>) -> Self {
        RequestEnvelope {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.as_str().to_string(),
            params,
        }
    }
}

/// Inbound response envelope - either a result or a relay error
///
/// Error is listed first so that an envelope carrying an `error` object is
/// never mistaken for a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Error {
        id: Option<RequestId>,
        error: RelayError,
    },
    Result {
        id: RequestId,
        #[serde(default)]
        result: Value,
    },
}

impl ResponseEnvelope {
    pub fn result(id: RequestId, result: Value) -> Self {
        ResponseEnvelope::Result { id, result }
    }

    pub fn error(id: RequestId, error: RelayError) -> Self {
        ResponseEnvelope::Error {
            id: Some(id),
            error,
        }
    }

    /// Identifier of the request this envelope answers, if the relay reported one
    pub fn id(&self) -> Option<RequestId> {
        match self {
            ResponseEnvelope::Error { id, .. } => *id,
            ResponseEnvelope::Result { id, .. } => Some(*id),
        }
    }
}
