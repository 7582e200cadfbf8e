use std::time::Duration;

/// Application-level configuration for the relay client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Interval between poll passes over subscribed topics
    pub poll_interval: Duration,
    /// Maximum wait for a response; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    /// Maximum concurrent fetches per topic; `0` is unbounded
    pub max_in_flight_per_topic: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            poll_interval: Duration::from_millis(10),
            request_timeout: Some(Duration::from_secs(30)),
            max_in_flight_per_topic: 1,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_in_flight_per_topic(mut self, limit: usize) -> Self {
        self.max_in_flight_per_topic = limit;
        self
    }
}
