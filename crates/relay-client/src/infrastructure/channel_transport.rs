//! Channel Transport Implementation
//!
//! In-process connection via tokio bounded channels. The client side is a
//! [`ChannelTransport`]; the other half, [`RelayEndpoint`], plays the relay
//! node. Used for embedding and for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::{Connection, FrameSender, Transport, TransportError, TransportEvent};

/// Client half of an in-process connection
///
/// Connects at most once; later attempts fail.
pub struct ChannelTransport {
    connection: Mutex<Option<Connection>>,
    refusal: Option<String>,
}

impl ChannelTransport {
    /// Create a connected transport/relay pair
    ///
    /// `capacity` bounds both directions.
    pub fn pair(capacity: usize) -> (ChannelTransport, RelayEndpoint) {
        let capacity = capacity.max(1);
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let transport = ChannelTransport {
            connection: Mutex::new(Some(Connection {
                outbound: FrameSender::new(out_tx),
                inbound: event_rx,
            })),
            refusal: None,
        };
        let endpoint = RelayEndpoint {
            from_client: out_rx,
            to_client: event_tx,
        };
        (transport, endpoint)
    }

    /// Transport whose connect attempt always fails with `reason`
    pub fn refusing(reason: impl Into<String>) -> Self {
        ChannelTransport {
            connection: Mutex::new(None),
            refusal: Some(reason.into()),
        }
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn connect(&self) -> Result<Connection, TransportError> {
        if let Some(reason) = &self.refusal {
            return Err(TransportError::ConnectionFailed(reason.clone()));
        }
        self.connection
            .lock()
            .take()
            .ok_or_else(|| TransportError::ConnectionFailed("already connected".to_string()))
    }
}

/// Relay half of an in-process connection
pub struct RelayEndpoint {
    from_client: mpsc::Receiver<String>,
    to_client: mpsc::Sender<TransportEvent>,
}

impl RelayEndpoint {
    /// Next frame sent by the client; `None` once the client hung up
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Deliver one inbound frame to the client
    pub async fn send_frame(&self, frame: impl Into<String>) -> Result<(), TransportError> {
        self.emit(TransportEvent::Frame(frame.into())).await
    }

    /// Close the connection from the relay side
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.emit(TransportEvent::Disconnected).await
    }

    /// Break the connection with an error
    pub async fn fail(&self, reason: impl Into<String>) -> Result<(), TransportError> {
        self.emit(TransportEvent::Error(reason.into())).await
    }

    /// Cloneable sender for delivering events from several tasks
    pub fn event_sender(&self) -> mpsc::Sender<TransportEvent> {
        self.to_client.clone()
    }

    async fn emit(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.to_client
            .send(event)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}
