use std::collections::HashMap;
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use std::time::Duration;

use crawlwatch_core::{CrawlId, Generation, PollKind, PullPayload};
use crawlwatch_logging::{
    in_crawl_context, set_crawl_context, watch_debug, watch_info, watch_trace, watch_warn,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::api::push_url;
use crate::push::split_frames;
use crate::{ApiError, CrawlApi, EngineError, EngineEvent, PushConnector};

/// How long shutdown waits for channels to say goodbye.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Receives engine callbacks. Called from the engine thread.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: std_mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std_mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

pub struct EngineConfig {
    pub api: Arc<dyn CrawlApi>,
    pub connector: Arc<dyn PushConnector>,
    /// Base the push channel address is derived from.
    pub push_base: Url,
}

enum EngineCommand {
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
        generation: Generation,
    },
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TaskKey {
    Channel(Generation),
    Retry(Generation),
    Poll(Generation),
}

struct TaskEntry {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Handle to the engine thread. Cheap to clone; commands are fire-and-forget.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    pub fn spawn(config: EngineConfig, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(EngineError::Runtime)?;

        thread::Builder::new()
            .name("crawlwatch-engine".to_string())
            .spawn(move || runtime.block_on(run(config, sink, cmd_rx)))
            .map_err(EngineError::Thread)?;

        Ok(Self { cmd_tx })
    }

    pub fn open_channel(&self, crawl_id: impl Into<CrawlId>, generation: Generation) {
        self.send(EngineCommand::OpenChannel {
            crawl_id: crawl_id.into(),
            generation,
        });
    }

    pub fn close_channel(&self, generation: Generation) {
        self.send(EngineCommand::CloseChannel { generation });
    }

    pub fn schedule_retry(&self, generation: Generation, delay: Duration) {
        self.send(EngineCommand::ScheduleRetry { generation, delay });
    }

    pub fn cancel_retry(&self, generation: Generation) {
        self.send(EngineCommand::CancelRetry { generation });
    }

    pub fn start_poll(
        &self,
        kind: PollKind,
        crawl_id: impl Into<CrawlId>,
        interval: Duration,
        generation: Generation,
    ) {
        self.send(EngineCommand::StartPoll {
            kind,
            crawl_id: crawl_id.into(),
            interval,
            generation,
        });
    }

    pub fn stop_poll(&self, generation: Generation) {
        self.send(EngineCommand::StopPoll { generation });
    }

    /// Cancels every task and stops the engine thread.
    pub fn shutdown(&self) {
        self.send(EngineCommand::Shutdown);
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

async fn run(
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
    mut cmd_rx: mpsc::UnboundedReceiver<EngineCommand>,
) {
    let mut tasks: HashMap<TaskKey, TaskEntry> = HashMap::new();

    while let Some(command) = cmd_rx.recv().await {
        tasks.retain(|_, entry| !entry.handle.is_finished());

        match command {
            EngineCommand::OpenChannel {
                crawl_id,
                generation,
            } => {
                set_crawl_context(Some(&crawl_id));
                cancel(&mut tasks, TaskKey::Channel(generation));
                let url = match push_url(&config.push_base, &crawl_id) {
                    Ok(url) => url,
                    Err(err) => {
                        watch_warn!("cannot address push channel {}: {}", generation, err);
                        sink.emit(EngineEvent::ChannelClosed { generation });
                        continue;
                    }
                };
                let token = CancellationToken::new();
                let handle = tokio::spawn(in_crawl_context(
                    crawl_id,
                    run_channel(
                        config.connector.clone(),
                        url,
                        generation,
                        sink.clone(),
                        token.clone(),
                    ),
                ));
                tasks.insert(TaskKey::Channel(generation), TaskEntry { token, handle });
            }
            EngineCommand::CloseChannel { generation } => {
                cancel(&mut tasks, TaskKey::Channel(generation));
            }
            EngineCommand::ScheduleRetry { generation, delay } => {
                cancel(&mut tasks, TaskKey::Retry(generation));
                watch_debug!("retry {} scheduled in {:?}", generation, delay);
                let token = CancellationToken::new();
                let handle = tokio::spawn(run_retry_timer(
                    delay,
                    generation,
                    sink.clone(),
                    token.clone(),
                ));
                tasks.insert(TaskKey::Retry(generation), TaskEntry { token, handle });
            }
            EngineCommand::CancelRetry { generation } => {
                cancel(&mut tasks, TaskKey::Retry(generation));
            }
            EngineCommand::StartPoll {
                kind,
                crawl_id,
                interval,
                generation,
            } => {
                set_crawl_context(Some(&crawl_id));
                cancel(&mut tasks, TaskKey::Poll(generation));
                let token = CancellationToken::new();
                let handle = tokio::spawn(in_crawl_context(
                    crawl_id.clone(),
                    run_poll(
                        config.api.clone(),
                        kind,
                        crawl_id,
                        interval,
                        generation,
                        sink.clone(),
                        token.clone(),
                    ),
                ));
                tasks.insert(TaskKey::Poll(generation), TaskEntry { token, handle });
            }
            EngineCommand::StopPoll { generation } => {
                cancel(&mut tasks, TaskKey::Poll(generation));
            }
            EngineCommand::Shutdown => break,
        }
    }

    let handles: Vec<JoinHandle<()>> = tasks
        .into_values()
        .map(|entry| {
            entry.token.cancel();
            entry.handle
        })
        .collect();
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, futures_util::future::join_all(handles)).await;
    watch_debug!("engine stopped");
}

fn cancel(tasks: &mut HashMap<TaskKey, TaskEntry>, key: TaskKey) {
    if let Some(entry) = tasks.remove(&key) {
        entry.token.cancel();
    }
}

async fn run_channel(
    connector: Arc<dyn PushConnector>,
    url: Url,
    generation: Generation,
    sink: Arc<dyn EventSink>,
    token: CancellationToken,
) {
    let connected = tokio::select! {
        _ = token.cancelled() => return,
        result = connector.connect(&url) => result,
    };
    let mut channel = match connected {
        Ok(channel) => channel,
        Err(err) => {
            watch_warn!("push channel {} to {} failed: {}", generation, url, err);
            sink.emit(EngineEvent::ChannelClosed { generation });
            return;
        }
    };

    watch_info!("push channel {} open", generation);
    sink.emit(EngineEvent::ChannelOpened { generation });

    loop {
        let next = tokio::select! {
            _ = token.cancelled() => {
                channel.close().await;
                watch_info!("push channel {} closed by client", generation);
                return;
            }
            next = channel.next_frame() => next,
        };
        match next {
            Some(Ok(text)) => {
                for frame in split_frames(&text) {
                    watch_trace!("push channel {} frame of {} bytes", generation, frame.len());
                    sink.emit(EngineEvent::FrameReceived {
                        generation,
                        text: frame,
                    });
                }
            }
            Some(Err(err)) => {
                watch_warn!("push channel {} error: {}", generation, err);
                break;
            }
            None => break,
        }
    }

    watch_info!("push channel {} closed by server", generation);
    sink.emit(EngineEvent::ChannelClosed { generation });
}

async fn run_retry_timer(
    delay: Duration,
    generation: Generation,
    sink: Arc<dyn EventSink>,
    token: CancellationToken,
) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(delay) => {
            sink.emit(EngineEvent::RetryElapsed { generation });
        }
    }
}

async fn run_poll(
    api: Arc<dyn CrawlApi>,
    kind: PollKind,
    crawl_id: CrawlId,
    interval: Duration,
    generation: Generation,
    sink: Arc<dyn EventSink>,
    token: CancellationToken,
) {
    // First tick completes immediately so the view fills without waiting.
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }
        let result = tokio::select! {
            _ = token.cancelled() => return,
            result = pull(api.as_ref(), kind, &crawl_id) => result,
        };
        if let Err(err) = &result {
            watch_warn!("{:?} pull {} failed: {}", kind, generation, err);
        }
        sink.emit(EngineEvent::Pulled {
            kind,
            generation,
            result,
        });
    }
}

async fn pull(api: &dyn CrawlApi, kind: PollKind, crawl_id: &str) -> Result<PullPayload, ApiError> {
    match kind {
        PollKind::Progress => api.get_crawl(crawl_id).await.map(PullPayload::Progress),
        PollKind::Stats => api.get_stats(crawl_id).await.map(PullPayload::Stats),
        PollKind::Graph => api.get_graph(crawl_id).await.map(PullPayload::Graph),
    }
}
