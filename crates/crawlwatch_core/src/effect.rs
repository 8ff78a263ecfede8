use std::time::Duration;

use crate::{CrawlId, DropReason, Generation, PollKind};

/// Side effects requested by `update`, executed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenChannel {
        crawl_id: CrawlId,
        generation: Generation,
    },
    CloseChannel {
        generation: Generation,
    },
    ScheduleRetry {
        generation: Generation,
        delay: Duration,
    },
    CancelRetry {
        generation: Generation,
    },
    StartPoll {
        kind: PollKind,
        crawl_id: CrawlId,
        interval: Duration,
        generation: Generation,
    },
    StopPoll {
        kind: PollKind,
        generation: Generation,
    },
    /// Nothing to execute; the host only records it.
    Report {
        generation: Generation,
        report: SyncReport,
    },
}

/// Connection events worth telling the host about that change nothing on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    GaveUp { attempts: u32 },
    FrameDropped(DropReason),
}

impl Effect {
    pub fn generation(&self) -> Generation {
        match self {
            Effect::OpenChannel { generation, .. }
            | Effect::CloseChannel { generation }
            | Effect::ScheduleRetry { generation, .. }
            | Effect::CancelRetry { generation }
            | Effect::StartPoll { generation, .. }
            | Effect::StopPoll { generation, .. }
            | Effect::Report { generation, .. } => *generation,
        }
    }
}
