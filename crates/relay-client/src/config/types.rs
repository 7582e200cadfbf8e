use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ClientConfig;

/// Root configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfigFile {
    pub relay: RelayEndpointConfig,
    #[serde(default)]
    pub client: ClientConfigJson,
}

/// Where and how to reach the relay node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEndpointConfig {
    /// WebSocket URL of the relay node
    pub url: String,
    /// Capacity of the outbound frame channel
    #[serde(default = "default_outbound_channel_capacity")]
    pub outbound_channel_capacity: usize,
    /// Capacity of the inbound event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

/// Client behavior (JSON representation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfigJson {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// `null` waits for responses indefinitely
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: Option<u64>,
    /// `0` lets fetches for one topic overlap without bound
    #[serde(default = "default_max_in_flight_per_topic")]
    pub max_in_flight_per_topic: usize,
}

impl Default for ClientConfigJson {
    fn default() -> Self {
        ClientConfigJson {
            poll_interval_ms: default_poll_interval(),
            request_timeout_ms: default_request_timeout(),
            max_in_flight_per_topic: default_max_in_flight_per_topic(),
        }
    }
}

impl ClientConfigJson {
    /// Convert to application-layer ClientConfig
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
            max_in_flight_per_topic: self.max_in_flight_per_topic,
        }
    }
}

// Default value functions for serde
fn default_outbound_channel_capacity() -> usize {
    32
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_poll_interval() -> u64 {
    10
}

fn default_request_timeout() -> Option<u64> {
    Some(30_000)
}

fn default_max_in_flight_per_topic() -> usize {
    1
}
