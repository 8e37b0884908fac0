//! WebSocket Connection Hub
//!
//! Tracks connections and their topic subscriptions, and fans replay frames
//! and Sankey replacements out to subscribers. The hub is the
//! [`FrameSink`] the replay player renders into.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::messages::{ServerMessage, WsEvent, REPLAY_TOPIC, SANKEY_TOPIC};
use crate::replay::{FrameSink, ReplayError, ReplayFrame};
use crate::selection::SelectedSankey;

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Manages all WebSocket connections and subscriptions
pub struct ConnectionHub {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    /// Topic → subscribed connection ids
    subscriptions: RwLock<HashMap<String, HashSet<ConnectionId>>>,
    config: HubConfig,
}

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
        }
    }
}

/// Handle for sending messages to a specific connection
pub struct ConnectionHandle {
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    pub subscriptions: HashSet<String>,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register a new WebSocket connection
    ///
    /// Fails once `max_connections` connections are registered.
    pub async fn register(
        &self,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(
            id.clone(),
            ConnectionHandle {
                sender,
                subscriptions: HashSet::new(),
            },
        );

        tracing::info!(connection_id = %id, "WebSocket connected");
        Ok(id)
    }

    /// Unregister a connection and clean up its subscriptions
    pub async fn unregister(&self, id: &str) {
        let handle = self.connections.write().await.remove(id);

        if let Some(handle) = handle {
            let mut subs = self.subscriptions.write().await;
            for topic in handle.subscriptions {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
            }
        }

        tracing::info!(connection_id = %id, "WebSocket disconnected");
    }

    /// Subscribe a connection to topics; unknown topics are skipped
    pub async fn subscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut subscribed = Vec::new();

        for topic in topics {
            if !is_valid_topic(&topic) {
                tracing::warn!(topic = %topic, "Invalid topic ignored");
                continue;
            }

            handle.subscriptions.insert(topic.clone());
            subs.entry(topic.clone())
                .or_default()
                .insert(id.to_string());
            subscribed.push(topic);
        }

        tracing::debug!(connection_id = %id, topics = ?subscribed, "Subscribed to topics");
        Ok(subscribed)
    }

    pub async fn unsubscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut unsubscribed = Vec::new();

        for topic in topics {
            if handle.subscriptions.remove(&topic) {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
                unsubscribed.push(topic);
            }
        }

        tracing::debug!(connection_id = %id, topics = ?unsubscribed, "Unsubscribed from topics");
        Ok(unsubscribed)
    }

    /// Deliver an event to every subscriber of its topic
    ///
    /// Returns the number of connections the message was queued for.
    pub async fn broadcast(&self, event: &WsEvent) -> usize {
        // Never hold `subscriptions` while waiting on `connections`;
        // subscribe and unsubscribe lock connections first.
        let subscriber_ids = match self.subscriptions.read().await.get(&event.topic) {
            Some(ids) => ids.clone(),
            None => return 0,
        };
        let connections = self.connections.read().await;

        let mut sent_count = 0;
        for id in &subscriber_ids {
            if let Some(handle) = connections.get(id) {
                if handle.sender.send(event.message.clone()).is_ok() {
                    sent_count += 1;
                }
            }
        }

        tracing::trace!(topic = %event.topic, subscribers = sent_count, "Broadcast event");
        sent_count
    }

    /// Send a message directly to a specific connection
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.connections.read().await;
        let handle = connections.get(id).ok_or(HubError::ConnectionNotFound)?;

        handle
            .sender
            .send(message)
            .map_err(|_| HubError::SendFailed)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(topic)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

fn is_valid_topic(topic: &str) -> bool {
    topic == REPLAY_TOPIC || topic == SANKEY_TOPIC
}

#[async_trait]
impl FrameSink for ConnectionHub {
    /// Zero subscribers is not an error; the race keeps running unobserved.
    async fn render(&self, frame: ReplayFrame) -> Result<(), ReplayError> {
        self.broadcast(&WsEvent::replay(frame)).await;
        Ok(())
    }
}

/// Push every Sankey replacement to "sankey" subscribers
///
/// The task ends when the view is dropped.
pub fn spawn_sankey_forwarder(
    mut updates: watch::Receiver<Option<SelectedSankey>>,
    hub: Arc<ConnectionHub>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let current = updates.borrow_and_update().clone();
            if let Some(selection) = current {
                let delivered = hub.broadcast(&WsEvent::sankey(selection)).await;
                tracing::debug!(subscribers = delivered, "Forwarded Sankey update");
            }
        }
    })
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SankeyGraph;
    use std::time::Duration;

    #[test]
    fn test_valid_topics() {
        assert!(is_valid_topic("replay"));
        assert!(is_valid_topic("sankey"));

        assert!(!is_valid_topic(""));
        assert!(!is_valid_topic("metrics.*"));
        assert!(!is_valid_topic("Replay"));
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = hub.register(tx).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_skips_unknown_topics() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        let subscribed = hub
            .subscribe(&id, vec!["replay".to_string(), "weather".to_string()])
            .await
            .unwrap();
        assert_eq!(subscribed, vec!["replay"]);
        assert_eq!(hub.subscription_count("replay").await, 1);

        let unsubscribed = hub.unsubscribe(&id, vec!["replay".to_string()]).await.unwrap();
        assert_eq!(unsubscribed, vec!["replay"]);
        assert_eq!(hub.subscription_count("replay").await, 0);
    }

    #[tokio::test]
    async fn test_unregister_cleans_subscriptions() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();
        hub.subscribe(&id, vec!["sankey".to_string()]).await.unwrap();

        hub.unregister(&id).await;
        assert_eq!(hub.subscription_count("sankey").await, 0);
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let hub = ConnectionHub::new(HubConfig { max_connections: 2 });

        let (tx1, _) = mpsc::unbounded_channel();
        let (tx2, _) = mpsc::unbounded_channel();
        let (tx3, _) = mpsc::unbounded_channel();

        hub.register(tx1).await.unwrap();
        hub.register(tx2).await.unwrap();
        let result = hub.register(tx3).await;

        assert!(matches!(result, Err(HubError::TooManyConnections(2))));
    }

    #[tokio::test]
    async fn test_frames_reach_replay_subscribers_only() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        let id1 = hub.register(tx1).await.unwrap();
        let id2 = hub.register(tx2).await.unwrap();
        hub.subscribe(&id1, vec!["replay".to_string()]).await.unwrap();
        hub.subscribe(&id2, vec!["sankey".to_string()]).await.unwrap();

        hub.render(ReplayFrame::Reset { run: 1, dates: 3 }).await.unwrap();

        match rx1.try_recv().unwrap() {
            ServerMessage::Replay { frame } => assert_eq!(frame.run(), 1),
            other => panic!("Expected Replay, got {:?}", other),
        }
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_waiting_on_connections_releases_subscriptions() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();
        hub.subscribe(&id, vec!["replay".to_string()]).await.unwrap();

        // Held the way subscribe holds it before reaching for subscriptions
        let connections = hub.connections.write().await;

        let broadcaster = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move { hub.render(ReplayFrame::Reset { run: 1, dates: 2 }).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let subscriptions =
            tokio::time::timeout(Duration::from_secs(1), hub.subscriptions.write()).await;
        assert!(subscriptions.is_ok(), "broadcast kept subscriptions locked");
        drop(subscriptions);
        drop(connections);

        broadcaster.await.unwrap().unwrap();
        assert!(matches!(rx.recv().await, Some(ServerMessage::Replay { .. })));
    }

    #[tokio::test]
    async fn test_subscribe_concurrent_with_frames() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        let frames = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move {
                for run in 0..200 {
                    hub.render(ReplayFrame::Reset { run, dates: 0 }).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };
        for _ in 0..200 {
            hub.subscribe(&id, vec!["replay".to_string()]).await.unwrap();
            hub.unsubscribe(&id, vec!["replay".to_string()]).await.unwrap();
            tokio::task::yield_now().await;
        }

        tokio::time::timeout(Duration::from_secs(5), frames)
            .await
            .expect("frames stalled")
            .unwrap();
    }

    #[tokio::test]
    async fn test_render_without_subscribers_succeeds() {
        let hub = ConnectionHub::new(HubConfig::default());
        let result = hub.render(ReplayFrame::Reset { run: 1, dates: 0 }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_sankey_forwarder() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();
        hub.subscribe(&id, vec!["sankey".to_string()]).await.unwrap();

        let (updates_tx, updates_rx) = watch::channel(None);
        let forwarder = spawn_sankey_forwarder(updates_rx, Arc::clone(&hub));

        updates_tx
            .send(Some(SelectedSankey {
                country: "Kenya".to_string(),
                graph: SankeyGraph::default(),
            }))
            .unwrap();

        match rx.recv().await.unwrap() {
            ServerMessage::Sankey { selection } => assert_eq!(selection.country, "Kenya"),
            other => panic!("Expected Sankey, got {:?}", other),
        }

        drop(updates_tx);
        forwarder.await.unwrap();
    }
}
