use crate::{
    ConnectionState, CrawlId, CrawlStats, GraphSummary, ProgressSnapshot, SnapshotSource,
    SyncState, ViewTab,
};

/// Everything the host needs to render the crawl detail view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrawlViewModel {
    pub crawl_id: Option<CrawlId>,
    pub tab: ViewTab,
    pub connection: ConnectionState,
    pub retry_attempt: u32,
    pub retry_pending: bool,
    /// Push channel is open and delivering.
    pub live: bool,
    pub progress: Option<ProgressSnapshot>,
    pub source: Option<SnapshotSource>,
    pub stats: Option<CrawlStats>,
    pub graph: Option<GraphSummary>,
    /// Why the latest pull failed, until a pull succeeds again.
    pub pull_error: Option<String>,
    pub dirty: bool,
}

impl CrawlViewModel {
    pub(crate) fn from_state(state: &SyncState) -> Self {
        let Some(view) = state.view.as_ref() else {
            return Self {
                tab: state.tab,
                dirty: state.is_dirty(),
                ..Self::default()
            };
        };

        let displayed = view.reconciler.displayed();
        let retry = view.connection.retry();
        Self {
            crawl_id: Some(view.crawl_id.clone()),
            tab: view.tab,
            connection: view.connection.state(),
            retry_attempt: retry.attempt(),
            retry_pending: retry.pending_timer().is_some(),
            live: view.reconciler.connected(),
            progress: displayed.map(|(snapshot, _)| snapshot.clone()),
            source: displayed.map(|(_, source)| source),
            stats: view.stats.clone(),
            graph: view.graph.as_ref().map(|graph| graph.summary()),
            pull_error: view.pull_error.clone(),
            dirty: state.is_dirty(),
        }
    }

    /// True once the displayed crawl has reached a terminal status.
    pub fn is_finished(&self) -> bool {
        self.progress
            .as_ref()
            .is_some_and(|progress| progress.status.is_terminal())
    }
}
