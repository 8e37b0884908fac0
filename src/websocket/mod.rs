//! WebSocket Real-Time Streaming
//!
//! Pushes replay frames and Sankey updates to dashboard clients.
//!
//! ## Topics
//!
//! - `replay` - Reset, tick and finished frames of the medal race
//! - `sankey` - The Sankey graph each time the selection replaces it
//!
//! Clients may also send `select` and `restart` commands over the socket.
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8090/api/v1/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'subscribe', topics: ['replay', 'sankey']}));
//!   ws.send(JSON.stringify({type: 'select', country: 'Kenya'}));
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{spawn_sankey_forwarder, ConnectionHub, ConnectionId, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage, WsEvent, REPLAY_TOPIC, SANKEY_TOPIC};
