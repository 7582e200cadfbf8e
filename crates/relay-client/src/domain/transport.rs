use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::TransportError;

/// Events emitted by a transport for the inbound side of a connection
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// One inbound envelope as received on the wire
    Frame(String),
    /// Relay closed the connection
    Disconnected,
    /// Connection broke
    Error(String),
}

/// Handle for sending outbound frames
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<String>,
}

impl FrameSender {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        FrameSender { tx }
    }

    /// Enqueue an outbound frame
    pub async fn send(&self, frame: String) -> Result<(), TransportError> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// An open connection: outbound sender plus inbound event stream
#[derive(Debug)]
pub struct Connection {
    pub outbound: FrameSender,
    pub inbound: mpsc::Receiver<TransportEvent>,
}

/// Connection to a relay node
///
/// Implementations open the underlying channel and return the outbound
/// sender together with the receiver of inbound events. Dropping every
/// clone of the returned sender closes the connection.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<Connection, TransportError>;
}
