use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::Context;
use crawlwatch_core::{DropReason, Effect, Generation, Msg, PullFailure, SyncReport};
use crawlwatch_engine::{
    ChannelEventSink, EngineConfig, EngineEvent, EngineHandle, ReqwestCrawlApi, WsConnector,
};
use crawlwatch_logging::{watch_debug, watch_info, watch_warn};

use super::config::AppConfig;

pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(config: &AppConfig, msg_tx: mpsc::Sender<Msg>) -> anyhow::Result<Self> {
        let api = ReqwestCrawlApi::new(&config.api_settings())
            .with_context(|| format!("invalid api base {:?}", config.api_base))?;
        let push_base = api.base_url().clone();

        let (event_tx, event_rx) = mpsc::channel();
        let engine = EngineHandle::spawn(
            EngineConfig {
                api: Arc::new(api),
                connector: Arc::new(WsConnector::new(config.connect_timeout())),
                push_base,
            },
            Arc::new(ChannelEventSink::new(event_tx)),
        )
        .context("failed to start engine")?;

        spawn_event_loop(event_rx, msg_tx).context("failed to start event forwarder")?;
        Ok(Self { engine })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            watch_debug!("effect {:?}", effect);
            match effect {
                Effect::OpenChannel {
                    crawl_id,
                    generation,
                } => {
                    watch_info!("opening push channel {}", generation);
                    self.engine.open_channel(crawl_id, generation);
                }
                Effect::CloseChannel { generation } => {
                    watch_info!("closing push channel {}", generation);
                    self.engine.close_channel(generation);
                }
                Effect::ScheduleRetry { generation, delay } => {
                    watch_info!("reconnecting {} in {} ms", generation, delay.as_millis());
                    self.engine.schedule_retry(generation, delay);
                }
                Effect::CancelRetry { generation } => self.engine.cancel_retry(generation),
                Effect::StartPoll {
                    kind,
                    crawl_id,
                    interval,
                    generation,
                } => self.engine.start_poll(kind, crawl_id, interval, generation),
                Effect::StopPoll { generation, .. } => self.engine.stop_poll(generation),
                Effect::Report { generation, report } => log_report(generation, &report),
            }
        }
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}

fn log_report(generation: Generation, report: &SyncReport) {
    match report {
        SyncReport::GaveUp { .. } => watch_warn!("push channel {}: {}", generation, describe(report)),
        SyncReport::FrameDropped(_) => {
            watch_debug!("push channel {}: {}", generation, describe(report))
        }
    }
}

fn describe(report: &SyncReport) -> String {
    match report {
        SyncReport::GaveUp { attempts } => {
            format!("gave up after {attempts} reconnect attempts, polling only")
        }
        SyncReport::FrameDropped(DropReason::Malformed) => "dropped malformed frame".to_string(),
        SyncReport::FrameDropped(DropReason::OtherCrawl(crawl_id)) => {
            format!("dropped frame for crawl {crawl_id}")
        }
    }
}

fn spawn_event_loop(
    event_rx: mpsc::Receiver<EngineEvent>,
    msg_tx: mpsc::Sender<Msg>,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name("crawlwatch-events".to_string())
        .spawn(move || {
            for event in event_rx {
                if msg_tx.send(to_msg(event)).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}

fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::ChannelOpened { generation } => Msg::ChannelOpened { generation },
        EngineEvent::FrameReceived { generation, text } => Msg::FrameReceived { generation, text },
        EngineEvent::ChannelClosed { generation } => Msg::ChannelClosed { generation },
        EngineEvent::RetryElapsed { generation } => Msg::RetryElapsed { generation },
        EngineEvent::Pulled {
            kind,
            generation,
            result,
        } => Msg::PullCompleted {
            kind,
            generation,
            result: result.map_err(|err| PullFailure {
                message: err.to_string(),
            }),
        },
    }
}
