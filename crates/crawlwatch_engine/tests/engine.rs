use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crawlwatch_core::{CrawlStatus, Generation, PollKind, PullPayload};
use crawlwatch_engine::{
    ApiSettings, EngineConfig, EngineEvent, EngineHandle, EventSink, FailureKind, PushChannel,
    PushConnector, PushError, ReqwestCrawlApi,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(250);

struct TestSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Server side of a fake push channel.
struct FakeServer {
    frames: mpsc::UnboundedSender<String>,
    closed_by_client: Arc<AtomicBool>,
}

struct FakeChannel {
    frames: mpsc::UnboundedReceiver<String>,
    closed_by_client: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl PushChannel for FakeChannel {
    async fn next_frame(&mut self) -> Option<Result<String, PushError>> {
        self.frames.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.closed_by_client.store(true, Ordering::SeqCst);
    }
}

/// Hands out queued channels in order; refuses once the queue is empty.
#[derive(Default)]
struct FakeConnector {
    channels: Mutex<VecDeque<FakeChannel>>,
    urls: Mutex<Vec<String>>,
    /// Log context seen by each connect call.
    contexts: Mutex<Vec<Option<String>>>,
}

impl FakeConnector {
    fn queue_channel(&self) -> FakeServer {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        self.channels.lock().unwrap().push_back(FakeChannel {
            frames: rx,
            closed_by_client: closed.clone(),
        });
        FakeServer {
            frames: tx,
            closed_by_client: closed,
        }
    }
}

#[async_trait::async_trait]
impl PushConnector for FakeConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn PushChannel>, PushError> {
        self.urls.lock().unwrap().push(url.to_string());
        self.contexts
            .lock()
            .unwrap()
            .push(crawlwatch_logging::crawl_context());
        match self.channels.lock().unwrap().pop_front() {
            Some(channel) => Ok(Box::new(channel)),
            None => Err(PushError::Connect("refused".to_string())),
        }
    }
}

struct Harness {
    engine: EngineHandle,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    connector: Arc<FakeConnector>,
}

impl Harness {
    fn start(api_base: &str) -> Self {
        let connector = Arc::new(FakeConnector::default());
        let api = ReqwestCrawlApi::new(&ApiSettings {
            base_url: api_base.to_string(),
            ..ApiSettings::default()
        })
        .unwrap();
        let (tx, events) = mpsc::unbounded_channel();
        let engine = EngineHandle::spawn(
            EngineConfig {
                api: Arc::new(api),
                connector: connector.clone(),
                push_base: Url::parse(api_base).unwrap(),
            },
            Arc::new(TestSink { tx }),
        )
        .unwrap();
        Self {
            engine,
            events,
            connector,
        }
    }

    async fn next(&mut self) -> EngineEvent {
        tokio::time::timeout(WAIT, self.events.recv())
            .await
            .expect("engine event in time")
            .expect("engine still running")
    }

    async fn assert_quiet(&mut self) {
        let outcome = tokio::time::timeout(QUIET, self.events.recv()).await;
        assert!(outcome.is_err(), "unexpected event: {:?}", outcome);
    }

    fn drain(&mut self) {
        while self.events.try_recv().is_ok() {}
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}

fn snapshot_body(status: &str) -> serde_json::Value {
    json!({
        "crawl_id": "c1",
        "status": status,
        "total": 4,
        "completed": 1,
        "pending": 3,
        "in_progress": 0,
        "failed": 0,
        "root_url": "https://example.com",
        "requested_depth": 1
    })
}

#[tokio::test]
async fn channel_reports_open_frames_and_server_close() {
    let mut harness = Harness::start("http://localhost:8080/api/v1");
    let server = harness.connector.queue_channel();
    let g = Generation::new(1);

    harness.engine.open_channel("c1", g);
    assert_eq!(harness.next().await, EngineEvent::ChannelOpened { generation: g });
    assert_eq!(
        harness.connector.urls.lock().unwrap().clone(),
        vec!["ws://localhost:8080/api/v1/crawls/c1/ws".to_string()]
    );

    server.frames.send("{\"n\":1}\n{\"n\":2}".to_string()).unwrap();
    assert_eq!(
        harness.next().await,
        EngineEvent::FrameReceived {
            generation: g,
            text: "{\"n\":1}".to_string()
        }
    );
    assert_eq!(
        harness.next().await,
        EngineEvent::FrameReceived {
            generation: g,
            text: "{\"n\":2}".to_string()
        }
    );

    drop(server.frames);
    assert_eq!(harness.next().await, EngineEvent::ChannelClosed { generation: g });
    assert!(!server.closed_by_client.load(Ordering::SeqCst));
}

#[tokio::test]
async fn channel_task_logs_under_its_crawl() {
    let mut harness = Harness::start("http://localhost:8080/api/v1");
    let _server = harness.connector.queue_channel();
    let g = Generation::new(1);

    harness.engine.open_channel("c7", g);
    assert_eq!(harness.next().await, EngineEvent::ChannelOpened { generation: g });
    assert_eq!(
        harness.connector.contexts.lock().unwrap().clone(),
        vec![Some("c7".to_string())]
    );
}

#[tokio::test]
async fn refused_connect_reports_close() {
    let mut harness = Harness::start("http://localhost:8080/api/v1");
    let g = Generation::new(3);

    harness.engine.open_channel("c1", g);
    assert_eq!(harness.next().await, EngineEvent::ChannelClosed { generation: g });
}

#[tokio::test]
async fn client_close_is_silent() {
    let mut harness = Harness::start("http://localhost:8080/api/v1");
    let server = harness.connector.queue_channel();
    let g = Generation::new(1);

    harness.engine.open_channel("c1", g);
    assert_eq!(harness.next().await, EngineEvent::ChannelOpened { generation: g });

    harness.engine.close_channel(g);
    harness.assert_quiet().await;
    assert!(server.closed_by_client.load(Ordering::SeqCst));

    // Frames after close go nowhere.
    let _ = server.frames.send("{\"n\":1}".to_string());
    harness.assert_quiet().await;
}

#[tokio::test]
async fn close_for_other_generation_leaves_channel_open() {
    let mut harness = Harness::start("http://localhost:8080/api/v1");
    let server = harness.connector.queue_channel();
    let g = Generation::new(2);

    harness.engine.open_channel("c1", g);
    assert_eq!(harness.next().await, EngineEvent::ChannelOpened { generation: g });

    harness.engine.close_channel(Generation::new(1));
    server.frames.send("{}".to_string()).unwrap();
    assert_eq!(
        harness.next().await,
        EngineEvent::FrameReceived {
            generation: g,
            text: "{}".to_string()
        }
    );
}

#[tokio::test]
async fn retry_timer_fires_once() {
    let mut harness = Harness::start("http://localhost:8080/api/v1");
    let g = Generation::new(4);

    harness.engine.schedule_retry(g, Duration::from_millis(20));
    assert_eq!(harness.next().await, EngineEvent::RetryElapsed { generation: g });
    harness.assert_quiet().await;
}

#[tokio::test]
async fn cancelled_retry_never_fires() {
    let mut harness = Harness::start("http://localhost:8080/api/v1");
    let g = Generation::new(4);

    harness.engine.schedule_retry(g, Duration::from_millis(100));
    harness.engine.cancel_retry(g);
    harness.assert_quiet().await;
}

#[tokio::test]
async fn poll_pulls_immediately_then_on_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/crawls/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body("running")))
        .mount(&server)
        .await;
    let mut harness = Harness::start(&format!("{}/api/v1", server.uri()));
    let g = Generation::new(7);

    harness
        .engine
        .start_poll(PollKind::Progress, "c1", Duration::from_millis(50), g);

    for _ in 0..2 {
        match harness.next().await {
            EngineEvent::Pulled {
                kind,
                generation,
                result: Ok(PullPayload::Progress(snapshot)),
            } => {
                assert_eq!(kind, PollKind::Progress);
                assert_eq!(generation, g);
                assert_eq!(snapshot.status, CrawlStatus::Running);
            }
            other => panic!("expected progress pull, got {:?}", other),
        }
    }

    harness.engine.stop_poll(g);
    tokio::time::sleep(Duration::from_millis(100)).await;
    harness.drain();
    harness.assert_quiet().await;
}

#[tokio::test]
async fn failed_pull_is_reported_and_polling_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/crawls/c1/stats"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .mount(&server)
        .await;
    let mut harness = Harness::start(&format!("{}/api/v1", server.uri()));
    let g = Generation::new(9);

    harness
        .engine
        .start_poll(PollKind::Stats, "c1", Duration::from_millis(30), g);

    for _ in 0..2 {
        match harness.next().await {
            EngineEvent::Pulled {
                kind: PollKind::Stats,
                result: Err(err),
                ..
            } => {
                assert_eq!(err.kind, FailureKind::HttpStatus(500));
                assert_eq!(err.message, "boom");
            }
            other => panic!("expected failed stats pull, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn shutdown_cancels_everything() {
    let mut harness = Harness::start("http://localhost:8080/api/v1");
    let server = harness.connector.queue_channel();
    let g = Generation::new(1);

    harness.engine.open_channel("c1", g);
    assert_eq!(harness.next().await, EngineEvent::ChannelOpened { generation: g });
    harness
        .engine
        .schedule_retry(Generation::new(2), Duration::from_millis(100));

    harness.engine.shutdown();
    let rest = tokio::time::timeout(WAIT, async {
        let mut rest = Vec::new();
        while let Some(event) = harness.events.recv().await {
            rest.push(event);
        }
        rest
    })
    .await
    .expect("engine stops and drops its sink");
    assert_eq!(rest, Vec::new());
    assert!(server.closed_by_client.load(Ordering::SeqCst));
}
