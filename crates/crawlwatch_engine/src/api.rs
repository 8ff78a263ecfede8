use std::time::Duration;

use crawlwatch_core::{CrawlStats, GraphData, ProgressSnapshot};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::{
    ApiError, CrawlCancelled, CrawlCreated, CrawlListResponse, CreateCrawlRequest, FailureKind,
    ListQuery,
};

pub const DEFAULT_API_BASE: &str = "http://localhost:8080/api/v1";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// The crawl manager's REST interface.
#[async_trait::async_trait]
pub trait CrawlApi: Send + Sync {
    async fn get_crawl(&self, crawl_id: &str) -> Result<ProgressSnapshot, ApiError>;

    async fn get_stats(&self, crawl_id: &str) -> Result<CrawlStats, ApiError>;

    async fn get_graph(&self, crawl_id: &str) -> Result<GraphData, ApiError>;

    async fn list_crawls(&self, query: &ListQuery) -> Result<CrawlListResponse, ApiError>;

    async fn create_crawl(&self, request: &CreateCrawlRequest) -> Result<CrawlCreated, ApiError>;

    async fn delete_crawl(&self, crawl_id: &str) -> Result<CrawlCancelled, ApiError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestCrawlApi {
    client: reqwest::Client,
    base: Url,
}

impl ReqwestCrawlApi {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(FailureKind::InvalidUrl, "api base cannot hold a path"));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        join_segments(&self.base, segments)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(ApiError::new(FailureKind::HttpStatus(status.as_u16()), message));
        }

        response.json::<T>().await.map_err(map_reqwest_error)
    }
}

#[async_trait::async_trait]
impl CrawlApi for ReqwestCrawlApi {
    async fn get_crawl(&self, crawl_id: &str) -> Result<ProgressSnapshot, ApiError> {
        let url = self.endpoint(&["crawls", crawl_id])?;
        self.send(self.client.get(url)).await
    }

    async fn get_stats(&self, crawl_id: &str) -> Result<CrawlStats, ApiError> {
        let url = self.endpoint(&["crawls", crawl_id, "stats"])?;
        self.send(self.client.get(url)).await
    }

    async fn get_graph(&self, crawl_id: &str) -> Result<GraphData, ApiError> {
        let url = self.endpoint(&["crawls", crawl_id, "graph"])?;
        self.send(self.client.get(url)).await
    }

    async fn list_crawls(&self, query: &ListQuery) -> Result<CrawlListResponse, ApiError> {
        let mut url = self.endpoint(&["crawls"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(status) = query.status {
                pairs.append_pair("status", status.as_str());
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = query.offset {
                pairs.append_pair("offset", &offset.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.send(self.client.get(url)).await
    }

    async fn create_crawl(&self, request: &CreateCrawlRequest) -> Result<CrawlCreated, ApiError> {
        let url = self.endpoint(&["crawls"])?;
        self.send(self.client.post(url).json(request)).await
    }

    async fn delete_crawl(&self, crawl_id: &str) -> Result<CrawlCancelled, ApiError> {
        let url = self.endpoint(&["crawls", crawl_id])?;
        self.send(self.client.delete(url)).await
    }
}

/// Push channel address for a crawl: the api base with a websocket scheme.
pub fn push_url(base: &Url, crawl_id: &str) -> Result<Url, ApiError> {
    let mut url = base.clone();
    let scheme = match base.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("unsupported scheme {other}"),
            ))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "cannot switch to websocket scheme"))?;
    join_segments(&url, &["crawls", crawl_id, "ws"])
}

fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "api base cannot hold a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
