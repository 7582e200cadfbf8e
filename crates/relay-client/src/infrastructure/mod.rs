pub mod codec;
mod channel_transport;
mod ws_transport;

pub use channel_transport::{ChannelTransport, RelayEndpoint};
pub use ws_transport::WsTransport;
