use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::config::RelayEndpointConfig;
use crate::domain::{Connection, FrameSender, Transport, TransportError, TransportEvent};

const DEFAULT_OUTBOUND_CAPACITY: usize = 32;
const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// WebSocket transport to a relay node
/// Infrastructure component - handles WebSocket communication
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
    outbound_capacity: usize,
    event_capacity: usize,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        WsTransport {
            url: url.into(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn from_config(config: &RelayEndpointConfig) -> Self {
        WsTransport {
            url: config.url.clone(),
            outbound_capacity: config.outbound_channel_capacity,
            event_capacity: config.event_channel_capacity,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WsTransport {
    /// Connect and return channels for sending frames and receiving events
    async fn connect(&self) -> Result<Connection, TransportError> {
        let (ws_stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        // Channel for frames going to the relay
        let (out_tx, mut out_rx) = mpsc::channel::<String>(self.outbound_capacity.max(1));

        // Channel for events coming from the relay
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(self.event_capacity.max(1));

        // Outgoing frames; ends with a close frame once every sender is dropped
        let event_tx_clone = event_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = write.send(Message::Text(frame.into())).await {
                    let _ = event_tx_clone.send(TransportEvent::Error(e.to_string())).await;
                    return;
                }
            }
            if let Err(e) = write.close().await {
                tracing::debug!("WebSocket close failed: {}", e);
            }
        });

        // Incoming frames
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                let event = match msg {
                    Ok(Message::Text(text)) => TransportEvent::Frame(text.to_string()),
                    Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => TransportEvent::Frame(text),
                        Err(_) => {
                            tracing::warn!("Dropping non-UTF-8 binary frame ({} bytes)", data.len());
                            continue;
                        }
                    },
                    Ok(Message::Close(_)) => {
                        let _ = event_tx.send(TransportEvent::Disconnected).await;
                        return;
                    }
                    Ok(Message::Ping(data)) => {
                        tracing::trace!("Received ping: {:?}", data);
                        continue;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                        return;
                    }
                };

                if event_tx.send(event).await.is_err() {
                    return;
                }
            }
            let _ = event_tx.send(TransportEvent::Disconnected).await;
        });

        Ok(Connection {
            outbound: FrameSender::new(out_tx),
            inbound: event_rx,
        })
    }
}
