use crate::view_model::CrawlViewModel;
use crate::{
    ConnectionManager, CrawlId, CrawlStats, GenerationCounter, GraphData, PollIntervals,
    PollScheduler, RetryPolicy, StateReconciler, ViewTab,
};

/// Everything owned by one mounted crawl detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CrawlView {
    pub(crate) crawl_id: CrawlId,
    pub(crate) tab: ViewTab,
    pub(crate) connection: ConnectionManager,
    pub(crate) polls: PollScheduler,
    pub(crate) reconciler: StateReconciler,
    pub(crate) stats: Option<CrawlStats>,
    pub(crate) graph: Option<GraphData>,
    /// Message of the most recent failed pull, cleared by the next success.
    pub(crate) pull_error: Option<String>,
}

impl CrawlView {
    pub(crate) fn new(crawl_id: CrawlId, tab: ViewTab) -> Self {
        Self {
            connection: ConnectionManager::new(crawl_id.clone()),
            polls: PollScheduler::new(crawl_id.clone()),
            crawl_id,
            tab,
            reconciler: StateReconciler::new(),
            stats: None,
            graph: None,
            pull_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncState {
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) poll_intervals: PollIntervals,
    pub(crate) generations: GenerationCounter,
    pub(crate) view: Option<CrawlView>,
    /// Tab to use for the next mount; kept across remounts.
    pub(crate) tab: ViewTab,
    dirty: bool,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(retry_policy: RetryPolicy, poll_intervals: PollIntervals) -> Self {
        Self {
            retry_policy,
            poll_intervals,
            ..Self::default()
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn poll_intervals(&self) -> &PollIntervals {
        &self.poll_intervals
    }

    pub fn mounted_crawl(&self) -> Option<&str> {
        self.view.as_ref().map(|view| view.crawl_id.as_str())
    }

    pub fn connection(&self) -> Option<&ConnectionManager> {
        self.view.as_ref().map(|view| &view.connection)
    }

    pub fn polls(&self) -> Option<&PollScheduler> {
        self.view.as_ref().map(|view| &view.polls)
    }

    pub fn view(&self) -> CrawlViewModel {
        CrawlViewModel::from_state(self)
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
