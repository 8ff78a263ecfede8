//! Crawlwatch engine: REST client, push channel transport and effect execution.
mod api;
mod engine;
mod push;
mod types;

pub use api::{push_url, ApiSettings, CrawlApi, ReqwestCrawlApi, DEFAULT_API_BASE};
pub use engine::{ChannelEventSink, EngineConfig, EngineHandle, EventSink};
pub use push::{split_frames, PushChannel, PushConnector, WsConnector};
pub use types::{
    ApiError, CrawlCancelled, CrawlCreated, CrawlListItem, CrawlListResponse, CreateCrawlRequest,
    EngineError, EngineEvent, FailureKind, ListQuery, PushError,
};
