use crate::{CrawlId, CrawlStats, Generation, GraphData, PollKind, ProgressSnapshot, ViewTab};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullPayload {
    Progress(ProgressSnapshot),
    Stats(CrawlStats),
    Graph(GraphData),
}

impl PullPayload {
    pub fn kind(&self) -> PollKind {
        match self {
            PullPayload::Progress(_) => PollKind::Progress,
            PullPayload::Stats(_) => PollKind::Stats,
            PullPayload::Graph(_) => PollKind::Graph,
        }
    }
}

/// A pull that did not produce a payload. Retried on the next tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullFailure {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The crawl detail view was mounted for a crawl.
    ViewMounted { crawl_id: CrawlId },
    /// The crawl detail view went away (navigation, shutdown).
    ViewUnmounted,
    /// User switched the detail view tab.
    TabSelected(ViewTab),
    /// Push channel handshake completed.
    ChannelOpened { generation: Generation },
    /// One frame arrived on the push channel.
    FrameReceived { generation: Generation, text: String },
    /// Push channel closed or failed.
    ChannelClosed { generation: Generation },
    /// Reconnect delay elapsed.
    RetryElapsed { generation: Generation },
    /// A periodic pull finished.
    PullCompleted {
        kind: PollKind,
        generation: Generation,
        result: Result<PullPayload, PullFailure>,
    },
    /// Render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
