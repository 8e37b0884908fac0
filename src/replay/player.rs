//! Replay Player
//!
//! Emits snapshots to a [`FrameSink`] on a fixed cadence. Only one replay
//! task is alive at a time: starting a run cancels and awaits the previous
//! one before spawning the next.
//!
//! Frames of a run, in order:
//!
//! ```text
//! Reset{run} → Tick{run, snapshot} × dates → Finished{run, table}
//! ```
//!
//! Ticks fire `cadence` apart, the first one `cadence` after the reset.
//! The player keeps ownership of the run in flight at all times; callers
//! observe progress through the status channel only.

use super::sequencer::ReplaySequencer;
use super::snapshot::{Snapshot, Standing};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

/// One message from a replay run to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayFrame {
    /// Clear the previous run's output
    Reset { run: u64, dates: usize },
    /// Standings at the next date
    Tick { run: u64, snapshot: Snapshot },
    /// Full final table once every date has been shown
    Finished { run: u64, table: Vec<Standing> },
}

impl ReplayFrame {
    pub fn run(&self) -> u64 {
        match self {
            ReplayFrame::Reset { run, .. }
            | ReplayFrame::Tick { run, .. }
            | ReplayFrame::Finished { run, .. } => *run,
        }
    }
}

/// Renderer seam for replay frames
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn render(&self, frame: ReplayFrame) -> Result<(), ReplayError>;
}

/// Sink forwarding frames into an unbounded channel
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ReplayFrame>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReplayFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn render(&self, frame: ReplayFrame) -> Result<(), ReplayError> {
        self.tx.send(frame).map_err(|_| ReplayError::SinkClosed)
    }
}

/// Lifecycle of the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayState {
    Idle,
    Running,
    Finished,
    Stopped,
    Failed,
}

/// Progress report for the current run
#[derive(Debug, Clone, Serialize)]
pub struct ReplayStatus {
    pub run: u64,
    pub state: ReplayState,
    /// Snapshots emitted so far
    pub position: usize,
    pub total_dates: usize,
    pub started_at: Option<DateTime<Utc>>,
}

/// Errors raised by the replay layer
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Replay cadence must be greater than zero")]
    InvalidCadence,

    #[error("Frame sink is closed")]
    SinkClosed,

    #[error("Replay run {0} was cancelled")]
    Cancelled(u64),

    #[error("Replay task failed: {0}")]
    Task(String),
}

/// Handle to one spawned replay run
pub struct ReplayHandle {
    run: u64,
    task: JoinHandle<()>,
}

impl ReplayHandle {
    pub fn run(&self) -> u64 {
        self.run
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the run and wait until its task is gone
    pub async fn cancel(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

/// Decrements the live-task counter when a run task ends or is aborted
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Drives timed replays of a sequencer into a sink
pub struct ReplayPlayer {
    sequencer: ReplaySequencer,
    sink: Arc<dyn FrameSink>,
    cadence: Duration,
    current: Mutex<Option<ReplayHandle>>,
    next_run: AtomicU64,
    active: Arc<AtomicUsize>,
    status: Arc<watch::Sender<ReplayStatus>>,
}

impl ReplayPlayer {
    pub fn new(
        sequencer: ReplaySequencer,
        sink: Arc<dyn FrameSink>,
        cadence: Duration,
    ) -> Result<Self, ReplayError> {
        if cadence.is_zero() {
            return Err(ReplayError::InvalidCadence);
        }

        let status = ReplayStatus {
            run: 0,
            state: ReplayState::Idle,
            position: 0,
            total_dates: sequencer.len(),
            started_at: None,
        };

        Ok(Self {
            sequencer,
            sink,
            cadence,
            current: Mutex::new(None),
            next_run: AtomicU64::new(1),
            active: Arc::new(AtomicUsize::new(0)),
            status: Arc::new(watch::channel(status).0),
        })
    }

    pub fn sequencer(&self) -> &ReplaySequencer {
        &self.sequencer
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Start a run, cancelling any run in flight. Returns the new run id.
    pub async fn start(&self) -> u64 {
        let mut current = self.current.lock().await;

        if let Some(previous) = current.take() {
            let previous_run = previous.run();
            previous.cancel().await;
            tracing::debug!(run = previous_run, "Cancelled previous replay");
        }

        let run = self.next_run.fetch_add(1, Ordering::SeqCst);
        let total_dates = self.sequencer.len();
        self.status.send_modify(|status| {
            status.run = run;
            status.state = ReplayState::Running;
            status.position = 0;
            status.total_dates = total_dates;
            status.started_at = Some(Utc::now());
        });

        let guard = ActiveGuard::enter(&self.active);
        let task = tokio::spawn(run_replay(
            run,
            self.sequencer.clone(),
            Arc::clone(&self.sink),
            self.cadence,
            Arc::clone(&self.status),
            guard,
        ));

        tracing::info!(
            run,
            dates = self.sequencer.len(),
            cadence_ms = self.cadence.as_millis() as u64,
            "Replay started"
        );

        *current = Some(ReplayHandle { run, task });
        run
    }

    /// Restart from the first date
    pub async fn restart(&self) -> u64 {
        tracing::info!("Restarting replay");
        self.start().await
    }

    /// Cancel the run in flight, if any
    pub async fn stop(&self) {
        let previous = self.current.lock().await.take();
        if let Some(handle) = previous {
            let run = handle.run();
            handle.cancel().await;

            self.status.send_if_modified(|status| {
                let stopping = status.run == run && status.state == ReplayState::Running;
                if stopping {
                    status.state = ReplayState::Stopped;
                }
                stopping
            });
            tracing::info!(run, "Replay stopped");
        }
    }

    /// Wait for the current run to end on its own, `Finished` or `Failed`
    ///
    /// The run stays owned by the player: a restart or stop while waiting
    /// cancels it and this returns [`ReplayError::Cancelled`].
    pub async fn wait(&self) -> Result<ReplayStatus, ReplayError> {
        let mut updates = self.status.subscribe();
        let run = updates.borrow_and_update().run;

        let ended = updates
            .wait_for(|status| status.run != run || status.state != ReplayState::Running)
            .await
            .map_err(|_| ReplayError::Cancelled(run))?
            .clone();

        if ended.run != run || ended.state == ReplayState::Stopped {
            return Err(ReplayError::Cancelled(run));
        }
        Ok(ended)
    }

    pub async fn status(&self) -> ReplayStatus {
        self.status.borrow().clone()
    }

    /// Replay tasks currently alive
    pub fn active_tasks(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

async fn run_replay(
    run: u64,
    sequencer: ReplaySequencer,
    sink: Arc<dyn FrameSink>,
    cadence: Duration,
    status: Arc<watch::Sender<ReplayStatus>>,
    guard: ActiveGuard,
) {
    let result = emit_frames(run, &sequencer, sink.as_ref(), cadence, &status).await;
    // Released before waiters are woken
    drop(guard);

    status.send_if_modified(|status| {
        if status.run != run {
            return false;
        }
        match &result {
            Ok(()) => {
                status.state = ReplayState::Finished;
                tracing::info!(run, "Replay finished");
            }
            Err(e) => {
                status.state = ReplayState::Failed;
                tracing::warn!(run, error = %e, "Replay halted");
            }
        }
        true
    });
}

async fn emit_frames(
    run: u64,
    sequencer: &ReplaySequencer,
    sink: &dyn FrameSink,
    cadence: Duration,
    status: &watch::Sender<ReplayStatus>,
) -> Result<(), ReplayError> {
    sink.render(ReplayFrame::Reset {
        run,
        dates: sequencer.len(),
    })
    .await?;

    let mut interval = tokio::time::interval(cadence);
    // First tick completes immediately
    interval.tick().await;

    for snapshot in sequencer.iter() {
        interval.tick().await;

        let position = snapshot.index + 1;
        tracing::trace!(run, date = %snapshot.date, "Replay tick");
        sink.render(ReplayFrame::Tick { run, snapshot }).await?;

        status.send_if_modified(|status| {
            let current = status.run == run;
            if current {
                status.position = position;
            }
            current
        });
    }

    interval.tick().await;
    sink.render(ReplayFrame::Finished {
        run,
        table: sequencer.final_table(),
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Record;
    use crate::replay::SequencerSettings;
    use tokio::time::Instant;

    const CADENCE: Duration = Duration::from_millis(2000);

    fn sequencer() -> ReplaySequencer {
        ReplaySequencer::new(
            vec![
                Record::new("US", "Swimming", "2024-07-27"),
                Record::new("US", "Rowing", "2024-07-28"),
                Record::new("FR", "Judo", "2024-07-27"),
                Record::new("CN", "Diving", "2024-07-29"),
            ],
            SequencerSettings::default(),
        )
    }

    fn player() -> (ReplayPlayer, mpsc::UnboundedReceiver<ReplayFrame>) {
        let (sink, rx) = ChannelSink::new();
        let player = ReplayPlayer::new(sequencer(), Arc::new(sink), CADENCE).unwrap();
        (player, rx)
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let (sink, _rx) = ChannelSink::new();
        let result = ReplayPlayer::new(sequencer(), Arc::new(sink), Duration::ZERO);
        assert!(matches!(result, Err(ReplayError::InvalidCadence)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_frame_order_and_timing() {
        let (player, mut rx) = player();
        let started = Instant::now();
        let run = player.start().await;

        let reset = rx.recv().await.unwrap();
        assert_eq!(reset, ReplayFrame::Reset { run, dates: 3 });

        let mut dates = Vec::new();
        for i in 1..=3u32 {
            match rx.recv().await.unwrap() {
                ReplayFrame::Tick { snapshot, .. } => {
                    assert_eq!(started.elapsed(), CADENCE * i);
                    dates.push(snapshot.date);
                }
                other => panic!("Expected Tick, got {:?}", other),
            }
        }
        assert_eq!(dates, vec!["2024-07-27", "2024-07-28", "2024-07-29"]);

        match rx.recv().await.unwrap() {
            ReplayFrame::Finished { table, .. } => {
                assert_eq!(started.elapsed(), CADENCE * 4);
                assert_eq!(table[0], Standing::new("US", 2));
                assert_eq!(table.len(), 3);
            }
            other => panic!("Expected Finished, got {:?}", other),
        }

        let status = player.wait().await.unwrap();
        assert_eq!(status.run, run);
        assert_eq!(status.state, ReplayState::Finished);
        assert_eq!(status.position, 3);
        assert_eq!(player.active_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous_run() {
        let (player, mut rx) = player();

        let first = player.start().await;
        assert!(matches!(rx.recv().await, Some(ReplayFrame::Reset { .. })));
        assert!(matches!(rx.recv().await, Some(ReplayFrame::Tick { .. })));

        let second = player.restart().await;
        assert_ne!(first, second);
        assert_eq!(player.active_tasks(), 1);

        // Nothing from the first run arrives after the restart
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            let done = matches!(frame, ReplayFrame::Finished { .. });
            frames.push(frame);
            if done {
                break;
            }
        }

        assert!(frames.iter().all(|f| f.run() == second));
        assert!(matches!(frames[0], ReplayFrame::Reset { .. }));
        match &frames[1] {
            ReplayFrame::Tick { snapshot, .. } => assert_eq!(snapshot.index, 0),
            other => panic!("Expected Tick, got {:?}", other),
        }
        assert_eq!(frames.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_restarts_keep_one_task() {
        let (player, _rx) = player();

        for _ in 0..5 {
            player.restart().await;
            assert_eq!(player.active_tasks(), 1);
        }
        assert_eq!(player.status().await.run, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarted_runs_emit_identical_snapshots() {
        let (player, mut rx) = player();

        let mut runs: Vec<Vec<Snapshot>> = Vec::new();
        for _ in 0..2 {
            player.restart().await;
            let mut snapshots = Vec::new();
            while let Some(frame) = rx.recv().await {
                match frame {
                    ReplayFrame::Tick { snapshot, .. } => snapshots.push(snapshot),
                    ReplayFrame::Finished { .. } => break,
                    ReplayFrame::Reset { .. } => {}
                }
            }
            runs.push(snapshots);
        }

        assert_eq!(runs[0], runs[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_while_waiting_keeps_one_task() {
        let (player, mut rx) = player();
        let player = Arc::new(player);

        let first = player.start().await;
        assert!(matches!(rx.recv().await, Some(ReplayFrame::Reset { .. })));

        let waiter = {
            let player = Arc::clone(&player);
            tokio::spawn(async move { player.wait().await })
        };
        tokio::task::yield_now().await;

        let second = player.restart().await;
        assert_ne!(first, second);
        assert_eq!(player.active_tasks(), 1);

        // The restarted run is still owned by the player
        player.stop().await;
        assert_eq!(player.active_tasks(), 0);
        assert!(matches!(
            waiter.await.unwrap(),
            Err(ReplayError::Cancelled(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_without_run_returns_idle() {
        let (player, _rx) = player();
        let status = player.wait().await.unwrap();
        assert_eq!(status.state, ReplayState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop() {
        let (player, mut rx) = player();
        player.start().await;
        rx.recv().await.unwrap();

        player.stop().await;
        assert_eq!(player.active_tasks(), 0);
        assert_eq!(player.status().await.state, ReplayState::Stopped);

        tokio::time::sleep(CADENCE * 10).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_sink_fails_run() {
        let (player, rx) = player();
        drop(rx);

        player.start().await;
        let status = player.wait().await.unwrap();

        assert_eq!(status.state, ReplayState::Failed);
        assert_eq!(player.active_tasks(), 0);
    }

    #[test]
    fn test_frame_serialization() {
        let frame = ReplayFrame::Reset { run: 3, dates: 17 };
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"kind":"reset","run":3,"dates":17}"#);
    }
}
