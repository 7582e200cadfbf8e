mod connection_state;
mod envelope;
mod error;
mod message;
mod traits;
mod transport;

pub use connection_state::ConnectionState;
pub use envelope::{JSONRPC_VERSION, Method, RequestEnvelope, RequestId, ResponseEnvelope};
pub use error::{ClientError, CodecError, RelayError, TransportError};
pub use message::{
    ContentFilter, ContentTopic, OutgoingMessage, PagingOptions, PeerDescriptor, RelayMessage,
    StoredMessages,
};
pub use traits::{MessageFetcher, TopicListener};
pub use transport::{Connection, FrameSender, Transport, TransportEvent};
