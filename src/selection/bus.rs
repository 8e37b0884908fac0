//! Selection Bus
//!
//! Typed publish/subscribe channel for cross-chart selection. Built on a
//! tokio broadcast channel; every subscriber sees every selection once.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A country picked in one chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEvent {
    pub country: String,
}

impl SelectionEvent {
    pub const NAME: &'static str = "country_selected";

    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
        }
    }
}

/// Default buffered selections per subscriber
const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct SelectionBus {
    tx: broadcast::Sender<SelectionEvent>,
}

impl SelectionBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a selection; returns how many subscribers received it
    pub fn publish(&self, event: SelectionEvent) -> usize {
        tracing::debug!(event = SelectionEvent::NAME, country = %event.country, "Selection published");
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!("Selection published with no subscribers");
                0
            }
        }
    }

    pub fn select(&self, country: impl Into<String>) -> usize {
        self.publish(SelectionEvent::new(country))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SelectionEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SelectionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
