//! Shared fixtures: an in-process fake relay node answering client requests.

#![allow(dead_code)]

use parking_lot::Mutex;
use relay_client::domain::{RequestEnvelope, ResponseEnvelope};
use relay_client::{ChannelTransport, ClientConfig, RelayClient, RelayError, TransportEvent};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How the fake relay answers one request
pub enum Reply {
    Result(Value),
    Error(RelayError),
    /// Send nothing back
    Silent,
}

type Handler = Box<dyn Fn(&RequestEnvelope) -> Reply + Send + Sync>;

/// Fake relay node driving the relay half of a [`ChannelTransport`]
pub struct FakeRelay {
    requests: Arc<Mutex<Vec<RequestEnvelope>>>,
    events: mpsc::Sender<TransportEvent>,
}

impl FakeRelay {
    /// Start a relay answering every request with `handler`
    pub fn start<H>(handler: H) -> (ChannelTransport, FakeRelay)
    where
        H: Fn(&RequestEnvelope) -> Reply + Send + Sync + 'static,
    {
        let (transport, mut endpoint) = ChannelTransport::pair(256);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let events = endpoint.event_sender();
        let handler: Handler = Box::new(handler);

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Some(frame) = endpoint.recv().await {
                let request: RequestEnvelope =
                    serde_json::from_str(&frame).expect("client sent malformed envelope");
                log.lock().push(request.clone());

                let response = match handler(&request) {
                    Reply::Result(result) => ResponseEnvelope::result(request.id, result),
                    Reply::Error(error) => ResponseEnvelope::error(request.id, error),
                    Reply::Silent => continue,
                };
                let frame = serde_json::to_string(&response).expect("serialize response");
                if endpoint.send_frame(frame).await.is_err() {
                    break;
                }
            }
        });

        (transport, FakeRelay { requests, events })
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RequestEnvelope> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, method: &str) -> Vec<RequestEnvelope> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    /// Wait until at least `count` requests for `method` arrived
    pub async fn wait_for(&self, method: &str, count: usize) -> Vec<RequestEnvelope> {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let matching = self.requests_for(method);
                if matching.len() >= count {
                    return matching;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {count} {method} requests"))
    }

    /// Close the connection from the relay side
    pub async fn disconnect(&self) {
        self.events
            .send(TransportEvent::Disconnected)
            .await
            .expect("client gone");
    }
}

/// Relay behaving like a healthy node with fixed data
pub fn default_handler(request: &RequestEnvelope) -> Reply {
    match request.method.as_str() {
        "subscribe" | "subscribe_content" => Reply::Result(json!(true)),
        "get_messages" | "get_content_messages" => Reply::Result(json!([])),
        "get_peers" => Reply::Result(json!([])),
        "post_message" | "unsubscribe" => Reply::Silent,
        _ => Reply::Error(RelayError::new(-32601, "method not found")),
    }
}

/// Config polling fast enough for tests
pub fn test_config() -> ClientConfig {
    ClientConfig::new()
        .with_poll_interval(Duration::from_millis(5))
        .with_request_timeout(Some(Duration::from_secs(2)))
}

pub async fn connect(transport: &ChannelTransport) -> RelayClient {
    RelayClient::connect(test_config(), transport).await
}

/// Relay message object as the node sends it
pub fn wire_message(payload: &str) -> Value {
    json!({
        "payload": payload,
        "contentTopic": 1,
        "version": 0
    })
}
