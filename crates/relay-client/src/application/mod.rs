pub mod config;
pub mod poller;
pub mod relay_client;
pub mod response_router;
pub mod subscription_registry;

pub use config::ClientConfig;
pub use poller::{Poller, PollerHandle};
pub use relay_client::RelayClient;
pub use response_router::{PendingResponse, ResponseRouter};
pub use subscription_registry::{FetchGuard, SubscriptionRegistry};
