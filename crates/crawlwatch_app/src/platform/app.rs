use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use crawlwatch_core::{update, CrawlId, Msg, SyncState, ViewTab};
use crawlwatch_logging::{set_crawl_context, watch_info, watch_warn};

use super::config::AppConfig;
use super::effects::EffectRunner;
use super::render::render;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

pub struct WatchOptions {
    pub crawl_id: CrawlId,
    pub tab: ViewTab,
    pub until_done: bool,
}

/// Runs the synchronization loop for one crawl until the user quits or,
/// with `until_done`, the crawl reaches a terminal status.
pub fn run_watch(config: &AppConfig, options: WatchOptions) -> anyhow::Result<()> {
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(config, msg_tx.clone())?;

    spawn_stdin_reader(msg_tx.clone()).context("failed to start input reader")?;
    spawn_ticker(msg_tx).context("failed to start render ticker")?;

    set_crawl_context(Some(&options.crawl_id));
    watch_info!("watching crawl");

    let mut state = SyncState::with_settings(config.retry_policy(), config.poll_intervals());
    state = dispatch(state, Msg::TabSelected(options.tab), &runner);
    state = dispatch(
        state,
        Msg::ViewMounted {
            crawl_id: options.crawl_id.clone(),
        },
        &runner,
    );

    while let Ok(msg) = msg_rx.recv() {
        let is_tick = matches!(msg, Msg::Tick);
        state = dispatch(state, msg, &runner);
        if state.mounted_crawl().is_none() {
            break;
        }
        if !is_tick {
            continue;
        }

        let view = state.view();
        if state.consume_dirty() {
            let timestamp = Local::now().format("%H:%M:%S").to_string();
            for line in render(&view, &timestamp) {
                println!("{line}");
            }
            if options.until_done && view.is_finished() {
                watch_info!("crawl finished with status {:?}", view.progress.map(|p| p.status));
                break;
            }
        }
    }

    if state.mounted_crawl().is_some() {
        dispatch(state, Msg::ViewUnmounted, &runner);
    }
    runner.shutdown();
    watch_info!("stopped watching");
    set_crawl_context(None);
    Ok(())
}

fn dispatch(state: SyncState, msg: Msg, runner: &EffectRunner) -> SyncState {
    let (state, effects) = update(state, msg);
    runner.enqueue(effects);
    state
}

fn spawn_stdin_reader(msg_tx: mpsc::Sender<Msg>) -> io::Result<()> {
    thread::Builder::new()
        .name("crawlwatch-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Some(msg) => {
                        if msg_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    None => watch_warn!(
                        "unknown command {:?}; use progress, stats, graph or quit",
                        line.trim()
                    ),
                }
            }
        })?;
    Ok(())
}

/// Background tick to throttle rendering.
fn spawn_ticker(msg_tx: mpsc::Sender<Msg>) -> io::Result<()> {
    thread::Builder::new()
        .name("crawlwatch-tick".to_string())
        .spawn(move || {
            while msg_tx.send(Msg::Tick).is_ok() {
                thread::sleep(TICK_INTERVAL);
            }
        })?;
    Ok(())
}

fn parse_command(line: &str) -> Option<Msg> {
    match line.trim().to_ascii_lowercase().as_str() {
        "progress" | "p" => Some(Msg::TabSelected(ViewTab::Progress)),
        "stats" | "s" => Some(Msg::TabSelected(ViewTab::Stats)),
        "graph" | "g" => Some(Msg::TabSelected(ViewTab::Graph)),
        "quit" | "q" | "exit" => Some(Msg::ViewUnmounted),
        _ => None,
    }
}
