//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! dashboard clients and the Medalboard server.

use serde::{Deserialize, Serialize};

use crate::replay::ReplayFrame;
use crate::selection::SelectedSankey;

/// Topic carrying replay frames
pub const REPLAY_TOPIC: &str = "replay";
/// Topic carrying Sankey graph replacements
pub const SANKEY_TOPIC: &str = "sankey";

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics for real-time updates
    Subscribe {
        /// Topics to subscribe to ("replay", "sankey")
        topics: Vec<String>,
    },
    /// Unsubscribe from topics
    Unsubscribe { topics: Vec<String> },
    /// Select a country for the Sankey chart
    Select { country: String },
    /// Restart the medal race
    Restart,
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// One replay frame
    Replay { frame: ReplayFrame },
    /// The Sankey graph was replaced
    Sankey { selection: SelectedSankey },
    /// Subscription confirmed
    Subscribed { topics: Vec<String> },
    /// Unsubscription confirmed
    Unsubscribed { topics: Vec<String> },
    /// A selection was published; the graph follows on "sankey"
    Selected { country: String },
    /// A restart was accepted
    Restarted { run: u64 },
    /// Pong response to ping
    Pong,
    /// Error message
    Error { message: String },
    /// Connection established
    Connected { connection_id: String },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to
    pub topic: String,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

impl WsEvent {
    pub fn replay(frame: ReplayFrame) -> Self {
        Self {
            topic: REPLAY_TOPIC.to_string(),
            message: ServerMessage::Replay { frame },
        }
    }

    pub fn sankey(selection: SelectedSankey) -> Self {
        Self {
            topic: SANKEY_TOPIC.to_string(),
            message: ServerMessage::Sankey { selection },
        }
    }
}
