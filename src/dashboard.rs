//! Dashboard
//!
//! One dashboard instance owns every chart's state: the athlete aggregate
//! behind the bar chart, the selection-driven Sankey view and the medal
//! race player. Nothing is shared between instances.

use crate::aggregate::{Aggregate, BarChartModel, CountryAggregate};
use crate::config::Config;
use crate::data::{ColumnMapping, CsvLoader, DataError, Record};
use crate::replay::{FrameSink, ReplayError, ReplayPlayer, ReplaySequencer};
use crate::selection::{SankeyView, SelectedSankey, SelectionBus, SelectionEvent};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors raised while building a dashboard
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Data load failed: {0}")]
    Data(#[from] DataError),

    #[error("Replay setup failed: {0}")]
    Replay(#[from] ReplayError),

    /// Selected country has no records
    #[error("No data for country: {0}")]
    MissingData(String),
}

/// All chart state for one dashboard
pub struct Dashboard {
    athletes: Arc<Aggregate>,
    bar: BarChartModel,
    selection: SelectionBus,
    sankey: Arc<SankeyView>,
    replay: ReplayPlayer,
}

impl Dashboard {
    /// Load both sources named in `config` and wire the charts
    pub fn load(config: &Config, sink: Arc<dyn FrameSink>) -> Result<Self, DashboardError> {
        let delimiter = config.data.delimiter as u8;

        let athletes = CsvLoader::new(ColumnMapping::athletes())?
            .with_delimiter(delimiter)
            .load_path(&config.data.athletes_path)?;
        let medals = CsvLoader::new(ColumnMapping::medallists())?
            .with_delimiter(delimiter)
            .load_path(&config.data.medallists_path)?;

        Self::from_records(athletes.records, medals.records, config, sink)
    }

    /// Build from already loaded records
    pub fn from_records(
        athletes: Vec<Record>,
        medals: Vec<Record>,
        config: &Config,
        sink: Arc<dyn FrameSink>,
    ) -> Result<Self, DashboardError> {
        let aggregate = Arc::new(Aggregate::from_records(&athletes));
        let bar = BarChartModel::build(&aggregate, config.charts.pinned_country.as_deref());

        let sequencer = ReplaySequencer::new(medals, config.replay.sequencer_settings());
        let replay = ReplayPlayer::new(sequencer, sink, config.replay.cadence())?;

        tracing::info!(
            countries = aggregate.len(),
            athletes = aggregate.total_records(),
            replay_dates = replay.sequencer().len(),
            "Dashboard ready"
        );

        Ok(Self {
            sankey: Arc::new(SankeyView::new(Arc::clone(&aggregate))),
            athletes: aggregate,
            bar,
            selection: SelectionBus::default(),
            replay,
        })
    }

    /// Subscribe the Sankey view to selections
    pub fn spawn_selection_listener(&self) -> JoinHandle<()> {
        Arc::clone(&self.sankey).spawn_listener(self.selection.subscribe())
    }

    /// Publish a selection for a known country
    pub fn select(&self, country: &str) -> Result<(), DashboardError> {
        if !self.athletes.contains(country) {
            tracing::warn!(country = %country, "Selection ignored, no data for country");
            return Err(DashboardError::MissingData(country.to_string()));
        }
        self.selection.publish(SelectionEvent::new(country));
        Ok(())
    }

    pub fn athletes(&self) -> &Aggregate {
        &self.athletes
    }

    pub fn country(&self, country: &str) -> Option<&CountryAggregate> {
        self.athletes.get(country)
    }

    pub fn bar_chart(&self) -> &BarChartModel {
        &self.bar
    }

    pub fn selection(&self) -> &SelectionBus {
        &self.selection
    }

    pub fn sankey(&self) -> &Arc<SankeyView> {
        &self.sankey
    }

    pub fn current_sankey(&self) -> Option<SelectedSankey> {
        self.sankey.current()
    }

    pub fn replay(&self) -> &ReplayPlayer {
        &self.replay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{ChannelSink, ReplayFrame};
    use std::io::Write;

    fn records() -> (Vec<Record>, Vec<Record>) {
        let athletes = vec![
            Record::undated("France", "Judo"),
            Record::undated("United States", "Swimming"),
            Record::undated("France", "Fencing"),
        ];
        let medals = vec![
            Record::new("France", "Judo", "2024-07-27"),
            Record::new("United States", "Swimming", "2024-07-28"),
        ];
        (athletes, medals)
    }

    #[tokio::test]
    async fn test_selection_drives_sankey() {
        let (athletes, medals) = records();
        let (sink, _rx) = ChannelSink::new();
        let dashboard =
            Dashboard::from_records(athletes, medals, &Config::default(), Arc::new(sink)).unwrap();

        let listener = dashboard.spawn_selection_listener();
        let mut updates = dashboard.sankey().watch();

        dashboard.select("France").unwrap();
        updates.changed().await.unwrap();
        dashboard.select("United States").unwrap();
        updates.changed().await.unwrap();

        let current = dashboard.current_sankey().unwrap();
        assert_eq!(current.country, "United States");
        assert_eq!(current.graph.nodes.len(), 2);
        assert_eq!(dashboard.sankey().recompute_count(), 2);

        listener.abort();
    }

    #[test]
    fn test_select_unknown_country() {
        let (athletes, medals) = records();
        let (sink, _rx) = ChannelSink::new();
        let dashboard =
            Dashboard::from_records(athletes, medals, &Config::default(), Arc::new(sink)).unwrap();

        let err = dashboard.select("Atlantis").unwrap_err();
        assert!(matches!(err, DashboardError::MissingData(_)));
        assert!(dashboard.current_sankey().is_none());
    }

    #[test]
    fn test_bar_chart_pins_united_states() {
        let (athletes, medals) = records();
        let (sink, _rx) = ChannelSink::new();
        let dashboard =
            Dashboard::from_records(athletes, medals, &Config::default(), Arc::new(sink)).unwrap();

        let order: Vec<&str> = dashboard.bar_chart().countries().collect();
        assert_eq!(order, vec!["United States", "France"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_from_files_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let athletes_path = dir.path().join("athletes.csv");
        let medallists_path = dir.path().join("medallists.csv");

        let mut file = std::fs::File::create(&athletes_path).unwrap();
        writeln!(file, "name,country,disciplines").unwrap();
        writeln!(file, "A,Kenya,['Athletics']").unwrap();

        let mut file = std::fs::File::create(&medallists_path).unwrap();
        writeln!(file, "medal_date,country_long,discipline").unwrap();
        writeln!(file, "2024-08-10,Kenya,Athletics").unwrap();

        let mut config = Config::default();
        config.data.athletes_path = athletes_path;
        config.data.medallists_path = medallists_path;

        let (sink, mut rx) = ChannelSink::new();
        let dashboard = Dashboard::load(&config, Arc::new(sink)).unwrap();
        assert_eq!(dashboard.athletes().total_records(), 1);

        dashboard.replay().start().await;
        assert!(matches!(rx.recv().await, Some(ReplayFrame::Reset { .. })));
        match rx.recv().await {
            Some(ReplayFrame::Tick { snapshot, .. }) => {
                assert_eq!(snapshot.date, "2024-08-10");
                assert_eq!(snapshot.leader().unwrap().country, "Kenya");
            }
            other => panic!("Expected Tick, got {:?}", other),
        }
    }

    #[test]
    fn test_load_failure_propagates() {
        let mut config = Config::default();
        config.data.athletes_path = "/nonexistent/athletes.csv".into();

        let (sink, _rx) = ChannelSink::new();
        let result = Dashboard::load(&config, Arc::new(sink));
        assert!(matches!(result, Err(DashboardError::Data(DataError::NotFound(_)))));
    }
}
