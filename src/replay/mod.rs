//! Medal Race Replay
//!
//! Time-indexed replay feeding the animated race chart:
//!
//! - **cumulative**: forward scan producing running totals per record
//! - **snapshot**: ranking rules and the `Snapshot` type
//! - **sequencer**: lazy, restartable snapshot sequence over distinct dates
//! - **player**: cancellable timed emission of snapshots to a renderer
//!
//! # Architecture
//!
//! ```text
//! Records → scan → observations ─┐
//!                                ├→ per date: max total ≤ date → top-K → Snapshot
//! Records → distinct dates ──────┘
//!
//! ReplayPlayer: interval tick → Snapshot → FrameSink
//! ```

pub mod cumulative;
pub mod player;
pub mod sequencer;
pub mod snapshot;

pub use cumulative::{scan, CumulativeObservation, CumulativeScan, FinalTotals};
pub use player::{
    ChannelSink, FrameSink, ReplayError, ReplayFrame, ReplayHandle, ReplayPlayer, ReplayState,
    ReplayStatus,
};
pub use sequencer::{ReplaySequencer, SequencerSettings, Snapshots, DEFAULT_TOP_K};
pub use snapshot::{rank, Snapshot, Standing, TieBreak};
