//! Sankey View
//!
//! Selection-driven state for the Sankey chart. Each accepted selection
//! rebuilds the graph for that country alone and replaces the previous
//! one; a country missing from the data leaves the view untouched.

use super::bus::SelectionEvent;
use crate::aggregate::{Aggregate, SankeyGraph};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// The graph currently shown and the country it was built for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedSankey {
    pub country: String,
    pub graph: SankeyGraph,
}

/// Result of applying one selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Graph rebuilt for the selected country
    Replaced,
    /// Country absent from the aggregate; nothing changed
    MissingData,
}

pub struct SankeyView {
    aggregate: Arc<Aggregate>,
    current: watch::Sender<Option<SelectedSankey>>,
    recomputes: AtomicU64,
}

impl SankeyView {
    pub fn new(aggregate: Arc<Aggregate>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            aggregate,
            current,
            recomputes: AtomicU64::new(0),
        }
    }

    /// Rebuild the graph for the selected country
    pub fn apply(&self, event: &SelectionEvent) -> ApplyOutcome {
        let Some(graph) = SankeyGraph::for_country(&self.aggregate, &event.country) else {
            tracing::warn!(country = %event.country, "No data found for country");
            return ApplyOutcome::MissingData;
        };

        if graph.links.is_empty() {
            tracing::debug!(country = %event.country, "Selected country has no categories");
        }

        self.recomputes.fetch_add(1, Ordering::SeqCst);
        self.current.send_replace(Some(SelectedSankey {
            country: event.country.clone(),
            graph,
        }));

        tracing::info!(country = %event.country, "Sankey updated");
        ApplyOutcome::Replaced
    }

    pub fn current(&self) -> Option<SelectedSankey> {
        self.current.borrow().clone()
    }

    /// Receiver notified on every replacement
    pub fn watch(&self) -> watch::Receiver<Option<SelectedSankey>> {
        self.current.subscribe()
    }

    /// Number of graphs built so far
    pub fn recompute_count(&self) -> u64 {
        self.recomputes.load(Ordering::SeqCst)
    }

    /// Apply selections from `rx` until the bus closes
    pub fn spawn_listener(
        self: Arc<Self>,
        mut rx: broadcast::Receiver<SelectionEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        self.apply(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Sankey listener lagged behind selections");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("Sankey listener stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Record;
    use crate::selection::SelectionBus;

    fn view() -> Arc<SankeyView> {
        let aggregate = Aggregate::from_records(&vec![
            Record::undated("FR", "Judo"),
            Record::undated("US", "Swimming"),
            Record::undated("US", "Athletics"),
        ]);
        Arc::new(SankeyView::new(Arc::new(aggregate)))
    }

    #[test]
    fn test_selection_replaces_previous_state() {
        let view = view();

        assert_eq!(view.apply(&SelectionEvent::new("FR")), ApplyOutcome::Replaced);
        assert_eq!(view.apply(&SelectionEvent::new("US")), ApplyOutcome::Replaced);

        let current = view.current().unwrap();
        assert_eq!(current.country, "US");
        assert!(current.graph.nodes.iter().all(|n| n.name != "FR" && n.name != "Judo"));
        assert_eq!(current.graph.total_flow(), 2);
        assert_eq!(view.recompute_count(), 2);
    }

    #[test]
    fn test_missing_country_is_noop() {
        let view = view();
        view.apply(&SelectionEvent::new("FR"));

        assert_eq!(view.apply(&SelectionEvent::new("XX")), ApplyOutcome::MissingData);
        assert_eq!(view.current().unwrap().country, "FR");
        assert_eq!(view.recompute_count(), 1);
    }

    #[tokio::test]
    async fn test_listener_recomputes_once_per_selection() {
        let view = view();
        let bus = SelectionBus::default();
        let mut updates = view.watch();
        let listener = Arc::clone(&view).spawn_listener(bus.subscribe());

        bus.select("FR");
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().as_ref().unwrap().country, "FR");

        bus.select("US");
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().as_ref().unwrap().country, "US");

        drop(bus);
        listener.await.unwrap();
        assert_eq!(view.recompute_count(), 2);
        assert_eq!(view.current().unwrap().country, "US");
    }
}
