//! Envelope codec
//!
//! JSON encoding of request envelopes and decoding of inbound response
//! envelopes and their result payloads.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{CodecError, Method, RequestEnvelope, ResponseEnvelope};

/// Serialize a request envelope into a wire frame
pub fn encode_request(envelope: &RequestEnvelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Parse an inbound wire frame into a response envelope
pub fn decode_response(frame: &str) -> Result<ResponseEnvelope, CodecError> {
    serde_json::from_str(frame).map_err(|e| CodecError::Envelope(e.to_string()))
}

/// Decode a result payload into the shape `method` promises
pub fn decode_result<T: DeserializeOwned>(method: Method, result: Value) -> Result<T, CodecError> {
    serde_json::from_value(result).map_err(|e| CodecError::Result {
        method: method.as_str(),
        reason: e.to_string(),
    })
}

/// Decode a list result; a `null` result is an empty list
pub fn decode_list<T: DeserializeOwned>(method: Method, result: Value) -> Result<Vec<T>, CodecError> {
    let list: Option<Vec<T>> = decode_result(method, result)?;
    Ok(list.unwrap_or_default())
}
