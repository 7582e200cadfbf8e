use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Content-topic identifier
///
/// Relays report either a numeric or a named content topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentTopic {
    Numeric(u64),
    Named(String),
}

impl From<u64> for ContentTopic {
    fn from(value: u64) -> Self {
        ContentTopic::Numeric(value)
    }
}

impl From<&str> for ContentTopic {
    fn from(value: &str) -> Self {
        ContentTopic::Named(value.to_string())
    }
}

impl From<String> for ContentTopic {
    fn from(value: String) -> Self {
        ContentTopic::Named(value)
    }
}

impl fmt::Display for ContentTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentTopic::Numeric(n) => write!(f, "{}", n),
            ContentTopic::Named(name) => f.write_str(name),
        }
    }
}

/// Message received from the relay node
///
/// `payload` is lowercase hex without a `0x` prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayMessage {
    #[serde(deserialize_with = "deserialize_payload")]
    pub payload: String,
    pub content_topic: ContentTopic,
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Value>,
}

impl RelayMessage {
    /// Decode the hex payload into raw bytes
    pub fn payload_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.payload)
    }
}

/// Message to publish on a relay topic
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    #[serde(serialize_with = "serialize_payload")]
    pub payload: Vec<u8>,
    pub content_topic: ContentTopic,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl OutgoingMessage {
    pub fn new(payload: impl Into<Vec<u8>>, content_topic: impl Into<ContentTopic>) -> Self {
        OutgoingMessage {
            payload: payload.into(),
            content_topic: content_topic.into(),
            version: None,
        }
    }

    /// Build from a hex payload, with or without `0x` prefix
    pub fn from_hex(
        payload: &str,
        content_topic: impl Into<ContentTopic>,
    ) -> Result<Self, hex::FromHexError> {
        Ok(OutgoingMessage::new(
            hex::decode(strip_hex_prefix(payload))?,
            content_topic,
        ))
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

/// Content filter entry for content-based subscriptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFilter {
    pub content_topic: ContentTopic,
}

impl ContentFilter {
    pub fn new(content_topic: impl Into<ContentTopic>) -> Self {
        ContentFilter {
            content_topic: content_topic.into(),
        }
    }
}

/// Paging options for stored-message queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingOptions {
    pub page_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Value>,
    #[serde(default = "default_forward")]
    pub forward: bool,
}

impl Default for PagingOptions {
    fn default() -> Self {
        PagingOptions {
            page_size: 20,
            cursor: None,
            forward: default_forward(),
        }
    }
}

impl PagingOptions {
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_cursor(mut self, cursor: Value) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn backward(mut self) -> Self {
        self.forward = false;
        self
    }
}

/// Result of a stored-message query
///
/// Relays answer either with a bare message list or with a page object
/// carrying the options for the next page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredMessages {
    pub messages: Vec<RelayMessage>,
    pub paging_options: Option<PagingOptions>,
}

impl<'de> Deserialize<'de> for StoredMessages {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Page {
            #[serde(default)]
            messages: Vec<RelayMessage>,
            #[serde(default)]
            paging_options: Option<PagingOptions>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            List(Vec<RelayMessage>),
            Page(Page),
        }

        Ok(match Option::<Shape>::deserialize(deserializer)? {
            Some(Shape::List(messages)) => StoredMessages {
                messages,
                paging_options: None,
            },
            Some(Shape::Page(page)) => StoredMessages {
                messages: page.messages,
                paging_options: page.paging_options,
            },
            None => StoredMessages::default(),
        })
    }
}

/// Peer reported by the relay node
///
/// The structure is relay-defined; common fields get accessors and the raw
/// JSON stays available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerDescriptor(Value);

impl PeerDescriptor {
    pub fn new(raw: Value) -> Self {
        PeerDescriptor(raw)
    }

    pub fn multiaddr(&self) -> Option<&str> {
        self.0.get("multiaddr").and_then(Value::as_str)
    }

    pub fn protocol(&self) -> Option<&str> {
        self.0.get("protocol").and_then(Value::as_str)
    }

    pub fn connected(&self) -> Option<bool> {
        self.0.get("connected").and_then(Value::as_bool)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }
}

fn default_forward() -> bool {
    true
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Normalize a wire payload to lowercase hex without prefix
///
/// Accepts a `0x`-prefixed or bare hex string, or an array of byte values.
fn deserialize_payload<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WirePayload {
        Hex(String),
        Bytes(Vec<u8>),
    }

    match WirePayload::deserialize(deserializer)? {
        WirePayload::Hex(s) => {
            let bytes = hex::decode(strip_hex_prefix(&s)).map_err(serde::de::Error::custom)?;
            Ok(hex::encode(bytes))
        }
        WirePayload::Bytes(bytes) => Ok(hex::encode(bytes)),
    }
}

fn serialize_payload<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(payload)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relay_message_strips_hex_prefix() {
        let msg: RelayMessage =
            serde_json::from_value(json!({"payload": "0x1234", "contentTopic": 1, "version": 0}))
                .unwrap();
        assert_eq!(msg.payload, "1234");
        assert_eq!(msg.content_topic, ContentTopic::Numeric(1));
        assert_eq!(msg.version, 0);
        assert!(msg.proof.is_none());
    }

    #[test]
    fn test_relay_message_byte_array_payload() {
        let msg: RelayMessage =
            serde_json::from_value(json!({"payload": [171, 205], "contentTopic": "/app/1/chat"}))
                .unwrap();
        assert_eq!(msg.payload, "abcd");
        assert_eq!(msg.payload_bytes().unwrap(), vec![0xab, 0xcd]);
        assert_eq!(msg.content_topic, ContentTopic::from("/app/1/chat"));
    }

    #[test]
    fn test_relay_message_rejects_bad_hex() {
        let result = serde_json::from_value::<RelayMessage>(
            json!({"payload": "0xzz", "contentTopic": 1}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_outgoing_message_wire_format() {
        let msg = OutgoingMessage::from_hex("0xabcd", 1u64).unwrap();
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, json!({"payload": "0xabcd", "contentTopic": 1}));
    }

    #[test]
    fn test_stored_messages_accepts_list_and_page() {
        let list: StoredMessages =
            serde_json::from_value(json!([{"payload": "0x01", "contentTopic": 2}])).unwrap();
        assert_eq!(list.messages.len(), 1);
        assert!(list.paging_options.is_none());

        let page: StoredMessages = serde_json::from_value(json!({
            "messages": [{"payload": "0x02", "contentTopic": 2}],
            "pagingOptions": {"pageSize": 10, "cursor": {"digest": "aa"}, "forward": false}
        }))
        .unwrap();
        assert_eq!(page.messages[0].payload, "02");
        let paging = page.paging_options.unwrap();
        assert_eq!(paging.page_size, 10);
        assert!(!paging.forward);

        let empty: StoredMessages = serde_json::from_value(Value::Null).unwrap();
        assert!(empty.messages.is_empty());
    }

    #[test]
    fn test_peer_descriptor_accessors() {
        let peer: PeerDescriptor = serde_json::from_value(json!({
            "multiaddr": "/ip4/127.0.0.1/tcp/60000/p2p/16U",
            "protocol": "/relay/2.0.0",
            "connected": true,
            "score": 4
        }))
        .unwrap();
        assert_eq!(peer.protocol(), Some("/relay/2.0.0"));
        assert_eq!(peer.connected(), Some(true));
        assert_eq!(peer.raw()["score"], 4);
    }
}
