use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::domain::{
    ClientError, CodecError, Connection, ConnectionState, ContentFilter, ContentTopic, FrameSender,
    MessageFetcher, Method, OutgoingMessage, PagingOptions, PeerDescriptor, RelayMessage,
    RequestEnvelope, RequestId, StoredMessages, Transport, TransportEvent,
};
use crate::infrastructure::codec;

use super::config::ClientConfig;
use super::poller::{Poller, PollerHandle};
use super::response_router::ResponseRouter;
use super::subscription_registry::SubscriptionRegistry;

/// State shared between the facade, the reader task and the poller
struct ClientInner {
    config: ClientConfig,
    router: ResponseRouter,
    registry: SubscriptionRegistry,
    state: watch::Sender<ConnectionState>,
    outbound: Mutex<Option<FrameSender>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl ClientInner {
    fn sender(&self) -> Result<FrameSender, ClientError> {
        let state = *self.state.borrow();
        if !state.is_open() {
            return Err(ClientError::NotConnected(state));
        }
        self.outbound
            .lock()
            .clone()
            .ok_or(ClientError::NotConnected(state))
    }

    /// Send a request and wait for its correlated response
    async fn request(&self, method: Method, params: Vec<Value>) -> Result<Value, ClientError> {
        debug_assert!(method.expects_reply(), "{method} is fire-and-forget");

        // Register before the state check: a concurrent shutdown either
        // rejects this entry or leaves a state the check refuses
        let pending = self.router.register_next();
        let sender = self.sender()?;
        let frame = codec::encode_request(&RequestEnvelope::new(pending.id(), method, params))?;

        tracing::debug!("Sending {} request {}", method, pending.id());
        sender.send(frame).await?;
        drop(sender);

        pending.wait(self.config.request_timeout).await
    }

    /// Send a request without waiting for a reply
    async fn notify(&self, method: Method, params: Vec<Value>) -> Result<RequestId, ClientError> {
        debug_assert!(!method.expects_reply(), "{method} expects a reply");
        let sender = self.sender()?;
        let id = self.router.next_id();
        let frame = codec::encode_request(&RequestEnvelope::new(id, method, params))?;

        tracing::debug!("Sending {} notification {}", method, id);
        sender.send(frame).await?;
        Ok(id)
    }

    async fn get_messages(&self, topic: &str) -> Result<Vec<RelayMessage>, ClientError> {
        let result = self.request(Method::GetMessages, vec![json!(topic)]).await?;
        Ok(codec::decode_list(Method::GetMessages, result)?)
    }

    /// Release the outbound channel, move to `next` and reject every pending request
    ///
    /// Returns the number of requests rejected.
    fn shut_down(&self, next: ConnectionState) -> usize {
        self.outbound.lock().take();
        transition(&self.state, next);
        self.router.reject_all(ClientError::ConnectionClosed)
    }
}

#[async_trait]
impl MessageFetcher for ClientInner {
    async fn fetch_messages(&self, topic: &str) -> Result<Vec<RelayMessage>, ClientError> {
        self.get_messages(topic).await
    }
}

/// Apply a state transition if it is legal from the current state
fn transition(state: &watch::Sender<ConnectionState>, next: ConnectionState) -> bool {
    state.send_if_modified(|current| {
        if current.can_transition_to(next) {
            tracing::debug!("Connection state {} -> {}", current, next);
            *current = next;
            true
        } else {
            false
        }
    })
}

/// Dispatch inbound frames to the router until the connection ends
///
/// Owns the poller so polling stops with the connection.
async fn read_loop(
    inner: Arc<ClientInner>,
    mut inbound: mpsc::Receiver<TransportEvent>,
    poller: PollerHandle,
) {
    // Inbound stream ending without an explicit event counts as a close
    let mut next = ConnectionState::Closed;

    while let Some(event) = inbound.recv().await {
        match event {
            TransportEvent::Frame(frame) => match codec::decode_response(&frame) {
                Ok(envelope) => {
                    inner.router.dispatch(envelope);
                }
                Err(e) => {
                    tracing::warn!("Discarding inbound frame: {}", e);
                }
            },
            TransportEvent::Disconnected => {
                tracing::warn!("Relay closed the connection");
                break;
            }
            TransportEvent::Error(e) => {
                tracing::error!("Relay connection error: {}", e);
                next = ConnectionState::Failed;
                break;
            }
        }
    }

    poller.stop();
    let rejected = inner.shut_down(next);
    if rejected > 0 {
        tracing::warn!("Rejected {} pending requests on connection loss", rejected);
    }
}

/// Client for a publish/subscribe relay node.
///
/// Every operation builds a request envelope, sends it through the
/// transport and, unless it is fire-and-forget, waits for the correlated
/// response. A background poller fetches new messages for each subscribed
/// topic and fans them out to the listeners registered with
/// [`RelayClient::on_topic_message`].
pub struct RelayClient {
    inner: Arc<ClientInner>,
}

impl RelayClient {
    /// Open a connection through `transport`
    ///
    /// Never fails: a refused open is logged and leaves the client in the
    /// `Failed` state, observable through [`RelayClient::state`]. The open
    /// is not retried.
    pub async fn connect<T>(config: ClientConfig, transport: &T) -> Self
    where
        T: Transport + ?Sized,
    {
        let (state_tx, _) = watch::channel(ConnectionState::Unopened);
        let inner = Arc::new(ClientInner {
            registry: SubscriptionRegistry::new(config.max_in_flight_per_topic),
            config,
            router: ResponseRouter::new(),
            state: state_tx,
            outbound: Mutex::new(None),
            reader: Mutex::new(None),
        });

        transition(&inner.state, ConnectionState::Opening);

        match transport.connect().await {
            Ok(Connection { outbound, inbound }) => {
                *inner.outbound.lock() = Some(outbound);
                transition(&inner.state, ConnectionState::Open);
                tracing::info!("Connected to relay");

                let poller = Poller::new(
                    Arc::clone(&inner),
                    inner.registry.clone(),
                    inner.config.poll_interval,
                )
                .spawn();
                let reader = tokio::spawn(read_loop(Arc::clone(&inner), inbound, poller));
                *inner.reader.lock() = Some(reader);
            }
            Err(e) => {
                tracing::error!("Failed to open relay connection: {}", e);
                transition(&inner.state, ConnectionState::Failed);
            }
        }

        RelayClient { inner }
    }

    /// Publish a message on `topic` (fire-and-forget)
    pub async fn publish(&self, topic: &str, message: &OutgoingMessage) -> Result<(), ClientError> {
        let message = serde_json::to_value(message).map_err(CodecError::from)?;
        self.inner
            .notify(Method::PostMessage, vec![json!(topic), message])
            .await?;
        Ok(())
    }

    /// Subscribe to relay topics; tracked once the relay acknowledges
    pub async fn subscribe<S: AsRef<str>>(&self, topics: &[S]) -> Result<(), ClientError> {
        let names: Vec<&str> = topics.iter().map(AsRef::as_ref).collect();
        self.inner
            .request(Method::Subscribe, vec![json!(names)])
            .await?;

        for topic in names {
            if self.inner.registry.insert(topic) {
                tracing::info!("Subscribed to {}", topic);
            }
        }
        Ok(())
    }

    /// Stop tracking `topic` and tell the relay (fire-and-forget)
    ///
    /// The topic is removed before the notification is sent; fetches
    /// already in flight for it complete without delivery.
    pub async fn unsubscribe(&self, topic: &str) -> Result<(), ClientError> {
        if self.inner.registry.remove(topic) {
            tracing::info!("Unsubscribed from {}", topic);
        }
        self.inner
            .notify(Method::Unsubscribe, vec![json!(topic)])
            .await?;
        Ok(())
    }

    /// Subscribe to content topics, optionally within a namespace
    pub async fn subscribe_content(
        &self,
        filters: &[ContentFilter],
        namespace: Option<&str>,
    ) -> Result<(), ClientError> {
        let filters = serde_json::to_value(filters).map_err(CodecError::from)?;
        self.inner
            .request(Method::SubscribeContent, vec![filters, json!(namespace)])
            .await?;
        Ok(())
    }

    /// Messages received on a content-topic subscription
    pub async fn get_content_messages(
        &self,
        content_topic: &ContentTopic,
    ) -> Result<Vec<RelayMessage>, ClientError> {
        let result = self
            .inner
            .request(Method::GetContentMessages, vec![json!(content_topic)])
            .await?;
        Ok(codec::decode_list(Method::GetContentMessages, result)?)
    }

    /// New messages on a relay topic since the last fetch
    pub async fn get_messages(&self, topic: &str) -> Result<Vec<RelayMessage>, ClientError> {
        self.inner.get_messages(topic).await
    }

    /// Query the relay's message store
    pub async fn get_stored_messages(
        &self,
        paging: &PagingOptions,
    ) -> Result<StoredMessages, ClientError> {
        let paging = serde_json::to_value(paging).map_err(CodecError::from)?;
        let result = self
            .inner
            .request(Method::GetStoredMessages, vec![paging])
            .await?;
        Ok(codec::decode_result(Method::GetStoredMessages, result)?)
    }

    /// Peers the relay node is connected to
    pub async fn get_peers(&self) -> Result<Vec<PeerDescriptor>, ClientError> {
        let result = self.inner.request(Method::GetPeers, Vec::new()).await?;
        Ok(codec::decode_list(Method::GetPeers, result)?)
    }

    /// Invoke `callback` with every non-empty batch of new messages on `topic`
    ///
    /// Subscribes first if the topic is not tracked yet.
    pub async fn on_topic_message<F>(&self, topic: &str, callback: F) -> Result<(), ClientError>
    where
        F: Fn(Vec<RelayMessage>) + Send + Sync + 'static,
    {
        if !self.inner.registry.contains(topic) {
            self.subscribe(&[topic]).await?;
        }
        if !self.inner.registry.add_listener(topic, Arc::new(callback)) {
            tracing::warn!("{} was unsubscribed before its listener was attached", topic);
        }
        Ok(())
    }

    /// Close the connection
    ///
    /// Stops polling, rejects pending requests and moves to `Closed`.
    pub fn close(&self) {
        let rejected = self.inner.shut_down(ConnectionState::Closed);
        self.stop_reader();
        if rejected > 0 {
            tracing::debug!("Rejected {} pending requests on close", rejected);
        }
    }

    /// Aborting the reader also drops the poller it owns
    fn stop_reader(&self) {
        if let Some(reader) = self.inner.reader.lock().take() {
            reader.abort();
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Receiver notified on every connection state change
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Currently tracked topics
    pub fn topics(&self) -> Vec<String> {
        self.inner.registry.topics()
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.inner.registry.contains(topic)
    }

    /// Number of requests waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.inner.router.pending_count()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        // Fetches already spawned by the poller hold the shared state
        self.close();
    }
}
