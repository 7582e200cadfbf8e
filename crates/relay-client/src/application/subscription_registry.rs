use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{RelayMessage, TopicListener};

/// Per-topic state
struct TopicState {
    /// Distinguishes this subscription from earlier ones on the same topic
    generation: u64,
    listeners: Vec<TopicListener>,
    /// Fetches issued by the poller and not yet finished
    in_flight: usize,
}

impl TopicState {
    fn new(generation: u64) -> Self {
        TopicState {
            generation,
            listeners: Vec::new(),
            in_flight: 0,
        }
    }
}

/// Tracks subscribed topics and their listeners.
///
/// A topic is present only between a successful subscribe and the matching
/// unsubscribe. Cloning shares the underlying state.
#[derive(Clone)]
pub struct SubscriptionRegistry {
    topics: Arc<RwLock<HashMap<String, TopicState>>>,
    next_generation: Arc<AtomicU64>,
    /// Maximum concurrent fetches per topic, 0 = unbounded
    max_in_flight: usize,
}

impl SubscriptionRegistry {
    pub fn new(max_in_flight: usize) -> Self {
        SubscriptionRegistry {
            topics: Arc::new(RwLock::new(HashMap::new())),
            next_generation: Arc::new(AtomicU64::new(0)),
            max_in_flight,
        }
    }

    /// Track `topic`. Returns false if it was already tracked.
    pub fn insert(&self, topic: &str) -> bool {
        let mut topics = self.topics.write();
        if topics.contains_key(topic) {
            return false;
        }
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        topics.insert(topic.to_string(), TopicState::new(generation));
        true
    }

    /// Stop tracking `topic` and drop its listeners
    pub fn remove(&self, topic: &str) -> bool {
        self.topics.write().remove(topic).is_some()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.read().contains_key(topic)
    }

    /// Snapshot of the tracked topics
    pub fn topics(&self) -> Vec<String> {
        self.topics.read().keys().cloned().collect()
    }

    /// Attach a listener to a tracked topic
    ///
    /// Returns false if the topic is not tracked.
    pub fn add_listener(&self, topic: &str, listener: TopicListener) -> bool {
        match self.topics.write().get_mut(topic) {
            Some(state) => {
                state.listeners.push(listener);
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map(|s| s.listeners.len())
            .unwrap_or(0)
    }

    /// Hand `batch` to every listener of `topic`
    ///
    /// Empty batches and untracked topics reach no one. Listeners run
    /// outside the lock. Returns the number of listeners invoked.
    pub fn deliver(&self, topic: &str, batch: Vec<RelayMessage>) -> usize {
        if batch.is_empty() {
            return 0;
        }

        let listeners = match self.topics.read().get(topic) {
            Some(state) => state.listeners.clone(),
            None => {
                tracing::debug!("Dropping {} messages for untracked topic {}", batch.len(), topic);
                return 0;
            }
        };

        for listener in &listeners {
            listener(batch.clone());
        }
        listeners.len()
    }

    /// Reserve a fetch slot for `topic`
    ///
    /// Returns `None` if the topic is not tracked or its in-flight bound is
    /// reached. The slot is released when the guard drops, unless the topic
    /// was unsubscribed in the meantime.
    pub fn try_begin_fetch(&self, topic: &str) -> Option<FetchGuard> {
        let mut topics = self.topics.write();
        let state = topics.get_mut(topic)?;
        if self.max_in_flight > 0 && state.in_flight >= self.max_in_flight {
            return None;
        }
        state.in_flight += 1;
        Some(FetchGuard {
            topics: Arc::clone(&self.topics),
            topic: topic.to_string(),
            generation: state.generation,
        })
    }

    pub fn in_flight(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map(|s| s.in_flight)
            .unwrap_or(0)
    }
}

/// Releases a topic's fetch slot on drop
pub struct FetchGuard {
    topics: Arc<RwLock<HashMap<String, TopicState>>>,
    topic: String,
    generation: u64,
}

impl FetchGuard {
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        let mut topics = self.topics.write();
        match topics.get_mut(&self.topic) {
            Some(state) if state.generation == self.generation => {
                state.in_flight = state.in_flight.saturating_sub(1);
            }
            _ => {}
        }
    }
}
