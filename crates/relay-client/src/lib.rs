//! Relay Client Crate
//!
//! Client adapter for a publish/subscribe relay node reachable over a
//! persistent bidirectional connection.
//!
//! # Architecture
//!
//! The client:
//! - Sends JSON-RPC request envelopes and correlates responses by id
//! - Tracks subscribed topics and their listeners
//! - Polls every subscribed topic on a fixed interval and fans new messages out
//! - Exposes the connection state (`unopened`, `opening`, `open`, `closed`, `failed`)
//!
//! ```text
//!               ┌──────────────────────────────────────────┐
//!   caller ────►│               RelayClient                │
//!               │  publish / subscribe / get_* / on_topic  │
//!               └──────┬──────────────────────────▲────────┘
//!                      │ register + send          │ complete
//!                      ▼                          │
//!               ┌─────────────┐           ┌───────┴────────┐
//!               │  Transport  │──frames──►│ ResponseRouter │
//!               │ (WS/Channel)│           └────────────────┘
//!               └──────▲──────┘
//!                      │ get_messages
//!               ┌──────┴──────┐  deliver  ┌──────────────────────┐
//!               │   Poller    │──────────►│ SubscriptionRegistry │──► listeners
//!               └─────────────┘           └──────────────────────┘
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod telemetry;

// Re-export key types
pub use domain::{
    ClientError, CodecError, ConnectionState, ContentFilter, ContentTopic, MessageFetcher, Method,
    OutgoingMessage, PagingOptions, PeerDescriptor, RelayError, RelayMessage, StoredMessages,
    TopicListener, Transport, TransportError, TransportEvent,
};

pub use application::{ClientConfig, RelayClient};
pub use config::{ConfigError, RelayConfigFile, load_config, load_default_config};
pub use infrastructure::{ChannelTransport, RelayEndpoint, WsTransport};
