use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::domain::MessageFetcher;

use super::subscription_registry::SubscriptionRegistry;

/// Shortest interval between ticks; `tokio::time::interval` rejects zero
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically fetches new messages for every subscribed topic.
///
/// Generic over `F`: MessageFetcher - issues the per-topic fetch.
///
/// Each tick spawns one independent fetch per topic and returns without
/// waiting, so a stalled topic never delays the others or the next tick.
/// Topics at their in-flight bound are skipped for that tick.
pub struct Poller<F>
where
    F: MessageFetcher + 'static,
{
    fetcher: Arc<F>,
    registry: SubscriptionRegistry,
    interval: Duration,
}

impl<F> Poller<F>
where
    F: MessageFetcher + 'static,
{
    /// Intervals below one millisecond are raised to one millisecond
    pub fn new(fetcher: Arc<F>, registry: SubscriptionRegistry, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                "Poll interval {:?} too short, using {:?}",
                interval,
                MIN_POLL_INTERVAL
            );
        }
        Poller {
            fetcher,
            registry,
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the repeating timer on the current runtime
    pub fn spawn(self) -> PollerHandle {
        PollerHandle {
            task: tokio::spawn(self.run()),
        }
    }

    /// Run one poll pass. Returns the number of fetches issued.
    pub fn tick(&self) -> usize {
        let mut issued = 0;

        for topic in self.registry.topics() {
            let Some(guard) = self.registry.try_begin_fetch(&topic) else {
                tracing::trace!("Fetch for {} still in flight, skipping", topic);
                continue;
            };

            let fetcher = Arc::clone(&self.fetcher);
            let registry = self.registry.clone();
            tokio::spawn(async move {
                let outcome = fetcher.fetch_messages(&topic).await;
                // Listeners run after the slot is released so a slow one
                // never holds back the next fetch
                drop(guard);

                match outcome {
                    Ok(batch) if batch.is_empty() => {}
                    Ok(batch) => {
                        let count = batch.len();
                        let listeners = registry.deliver(&topic, batch);
                        tracing::debug!(
                            "Delivered {} messages on {} to {} listeners",
                            count,
                            topic,
                            listeners
                        );
                    }
                    Err(e) => {
                        tracing::warn!("Failed to fetch messages for {}: {}", topic, e);
                    }
                }
            });
            issued += 1;
        }

        issued
    }

    async fn run(self) {
        let mut ticker = interval(self.interval);

        loop {
            ticker.tick().await;
            self.tick();
        }
    }
}

/// Handle to a running poller; stops it on drop
#[derive(Debug)]
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(self) {
        drop(self);
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientError, ContentTopic, RelayError, RelayMessage, TopicListener};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Notify, mpsc};

    fn message(payload: &str) -> RelayMessage {
        RelayMessage {
            payload: payload.to_string(),
            content_topic: ContentTopic::Numeric(1),
            version: 0,
            proof: None,
        }
    }

    /// Scripted fetcher: per-topic outcome, optional gate that holds fetches open
    #[derive(Default)]
    struct MockFetcher {
        outcomes: Mutex<HashMap<String, Result<Vec<RelayMessage>, ClientError>>>,
        calls: Mutex<Vec<String>>,
        gate: Option<Arc<Notify>>,
        started: AtomicUsize,
    }

    impl MockFetcher {
        fn with(outcomes: Vec<(&str, Result<Vec<RelayMessage>, ClientError>)>) -> Self {
            MockFetcher {
                outcomes: Mutex::new(
                    outcomes
                        .into_iter()
                        .map(|(t, o)| (t.to_string(), o))
                        .collect(),
                ),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl MessageFetcher for MockFetcher {
        async fn fetch_messages(&self, topic: &str) -> Result<Vec<RelayMessage>, ClientError> {
            self.calls.lock().push(topic.to_string());
            self.started.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.outcomes
                .lock()
                .get(topic)
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn forwarding_listener(tx: mpsc::UnboundedSender<Vec<RelayMessage>>) -> TopicListener {
        Arc::new(move |batch: Vec<RelayMessage>| {
            let _ = tx.send(batch);
        })
    }

    #[tokio::test]
    async fn test_failing_topic_does_not_block_others() {
        let fetcher = Arc::new(MockFetcher::with(vec![
            ("a", Err(RelayError::new(-32000, "topic a unavailable").into())),
            ("b", Ok(vec![message("0b")])),
        ]));
        let registry = SubscriptionRegistry::new(1);
        registry.insert("a");
        registry.insert("b");

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add_listener("b", forwarding_listener(tx));

        let poller = Poller::new(Arc::clone(&fetcher), registry.clone(), Duration::from_millis(10));
        assert_eq!(poller.tick(), 2);

        let batch = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch, vec![message("0b")]);

        // Topic "a" keeps being polled after its failure
        tokio::time::timeout(Duration::from_secs(1), async {
            while registry.in_flight("a") > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(poller.tick(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_not_delivered() {
        let fetcher = Arc::new(MockFetcher::with(vec![("chat", Ok(Vec::new()))]));
        let registry = SubscriptionRegistry::new(1);
        registry.insert("chat");

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add_listener("chat", forwarding_listener(tx));

        let poller = Poller::new(Arc::clone(&fetcher), registry.clone(), Duration::from_millis(10));
        poller.tick();

        let result = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(result.is_err());
        assert_eq!(*fetcher.calls.lock(), vec!["chat".to_string()]);
    }

    #[tokio::test]
    async fn test_stalled_fetch_skipped_until_done() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(MockFetcher {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        });
        let registry = SubscriptionRegistry::new(1);
        registry.insert("slow");

        let poller = Poller::new(Arc::clone(&fetcher), registry.clone(), Duration::from_millis(10));
        assert_eq!(poller.tick(), 1);
        assert_eq!(poller.tick(), 0);
        assert_eq!(registry.in_flight("slow"), 1);

        // Wait until the fetch is parked on the gate, then release it
        tokio::time::timeout(Duration::from_secs(1), async {
            while fetcher.started.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        gate.notify_one();

        tokio::time::timeout(Duration::from_secs(1), async {
            while registry.in_flight("slow") > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(poller.tick(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_overlap_when_limit_zero() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(MockFetcher {
            gate: Some(gate),
            ..Default::default()
        });
        let registry = SubscriptionRegistry::new(0);
        registry.insert("chat");

        let poller = Poller::new(fetcher, registry.clone(), Duration::from_millis(10));
        assert_eq!(poller.tick(), 1);
        assert_eq!(poller.tick(), 1);
        assert_eq!(registry.in_flight("chat"), 2);
    }

    #[tokio::test]
    async fn test_in_flight_fetch_after_unsubscribe_is_dropped() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(MockFetcher {
            gate: Some(Arc::clone(&gate)),
            ..MockFetcher::with(vec![("chat", Ok(vec![message("01")]))])
        });
        let registry = SubscriptionRegistry::new(1);
        registry.insert("chat");

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add_listener("chat", forwarding_listener(tx));

        let poller = Poller::new(Arc::clone(&fetcher), registry.clone(), Duration::from_millis(10));
        poller.tick();
        tokio::time::timeout(Duration::from_secs(1), async {
            while fetcher.started.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        registry.remove("chat");
        gate.notify_one();

        // The listener was dropped with the topic, so the channel closes empty
        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_slot_released_before_delivery() {
        let fetcher = Arc::new(MockFetcher::with(vec![("chat", Ok(vec![message("01")]))]));
        let registry = SubscriptionRegistry::new(1);
        registry.insert("chat");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer = registry.clone();
        registry.add_listener(
            "chat",
            Arc::new(move |_: Vec<RelayMessage>| {
                let _ = tx.send(observer.in_flight("chat"));
            }),
        );

        let poller = Poller::new(fetcher, registry.clone(), Duration::from_millis(10));
        poller.tick();

        let in_flight_during_delivery = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(in_flight_during_delivery, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let fetcher = Arc::new(MockFetcher::default());
        let registry = SubscriptionRegistry::new(1);
        registry.insert("chat");

        let poller = Poller::new(Arc::clone(&fetcher), registry, Duration::ZERO);
        assert_eq!(poller.interval(), MIN_POLL_INTERVAL);

        let handle = poller.spawn();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.is_running());
        assert!(!fetcher.calls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_poller_ticks_on_schedule() {
        let fetcher = Arc::new(MockFetcher::default());
        let registry = SubscriptionRegistry::new(1);
        registry.insert("chat");

        let handle = Poller::new(Arc::clone(&fetcher), registry, Duration::from_millis(10)).spawn();
        tokio::time::sleep(Duration::from_millis(55)).await;
        assert!(handle.is_running());

        let calls = fetcher.calls.lock().len();
        assert!(calls >= 5, "expected at least 5 fetches, got {calls}");

        handle.stop();
        let after_stop = fetcher.calls.lock().len();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fetcher.calls.lock().len(), after_stop);
    }
}
