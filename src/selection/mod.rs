//! Cross-Chart Selection
//!
//! Selecting a country in the bar chart recomputes the Sankey chart for
//! that country. The two sides only share a [`SelectionBus`].

mod bus;
mod view;

pub use bus::{SelectionBus, SelectionEvent};
pub use view::{ApplyOutcome, SankeyView, SelectedSankey};
