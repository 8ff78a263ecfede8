//! Crawlwatch core: pure synchronization state machine and view-model helpers.
mod connection;
mod effect;
mod generation;
mod msg;
mod poll;
mod reconcile;
mod snapshot;
mod state;
mod update;
mod view_model;

pub use connection::{
    transition, ConnEvent, ConnSignal, ConnectionManager, ConnectionState, DropReason, RetryPolicy,
    RetryState, RetryTimer, Step, BASE_RETRY_DELAY, MAX_RETRIES, MAX_RETRY_DELAY,
};
pub use effect::{Effect, SyncReport};
pub use generation::{Generation, GenerationCounter};
pub use msg::{Msg, PullFailure, PullPayload};
pub use poll::{PollIntervals, PollKind, PollScheduler, ViewTab};
pub use reconcile::{SnapshotSource, StateReconciler};
pub use snapshot::{
    CrawlId, CrawlStats, CrawlStatus, GraphData, GraphEdge, GraphNode, GraphSummary,
    ProgressSnapshot, StatusCounts,
};
pub use state::SyncState;
pub use update::update;
pub use view_model::CrawlViewModel;
