use std::fmt;
use std::io;

use crawlwatch_core::{CrawlId, CrawlStatus, Generation, PollKind, PullPayload};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Callbacks produced by engine tasks. Every event carries the generation of
/// the task that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ChannelOpened {
        generation: Generation,
    },
    FrameReceived {
        generation: Generation,
        text: String,
    },
    ChannelClosed {
        generation: Generation,
    },
    RetryElapsed {
        generation: Generation,
    },
    Pulled {
        kind: PollKind,
        generation: Generation,
        result: Result<PullPayload, ApiError>,
    },
}

impl EngineEvent {
    pub fn generation(&self) -> Generation {
        match self {
            EngineEvent::ChannelOpened { generation }
            | EngineEvent::FrameReceived { generation, .. }
            | EngineEvent::ChannelClosed { generation }
            | EngineEvent::RetryElapsed { generation }
            | EngineEvent::Pulled { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    /// Server-provided `error` text when there was one.
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Decode => write!(f, "invalid response body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("push channel connect failed: {0}")]
    Connect(String),
    #[error("push channel connect timed out")]
    Timeout,
    #[error("push channel transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to build async runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("failed to spawn engine thread: {0}")]
    Thread(#[source] io::Error),
}

/// Filter and page for `GET /crawls`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<CrawlStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlListItem {
    pub crawl_id: CrawlId,
    pub root_url: String,
    pub requested_depth: u32,
    pub status: CrawlStatus,
    pub total: u64,
    pub completed: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub cancelled: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlListResponse {
    pub crawls: Vec<CrawlListItem>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCrawlRequest {
    pub url: String,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlCreated {
    pub crawl_id: CrawlId,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlCancelled {
    pub status: String,
    pub crawl_id: CrawlId,
}
