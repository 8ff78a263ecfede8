use crate::state::CrawlView;
use crate::{
    transition, ConnEvent, ConnSignal, ConnectionState, CrawlId, Effect, Generation, Msg,
    PollKind, PullFailure, PullPayload, SyncReport, SyncState, ViewTab,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: SyncState, msg: Msg) -> (SyncState, Vec<Effect>) {
    let effects = match msg {
        Msg::ViewMounted { crawl_id } => mount(&mut state, crawl_id),
        Msg::ViewUnmounted => unmount(&mut state),
        Msg::TabSelected(tab) => select_tab(&mut state, tab),
        Msg::ChannelOpened { generation } => {
            drive_connection(&mut state, ConnEvent::Opened { generation })
        }
        Msg::FrameReceived { generation, text } => {
            drive_connection(&mut state, ConnEvent::Frame { generation, text })
        }
        Msg::ChannelClosed { generation } => {
            drive_connection(&mut state, ConnEvent::Closed { generation })
        }
        Msg::RetryElapsed { generation } => {
            drive_connection(&mut state, ConnEvent::RetryElapsed { generation })
        }
        Msg::PullCompleted {
            kind,
            generation,
            result,
        } => apply_pull(&mut state, kind, generation, result),
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn mount(state: &mut SyncState, crawl_id: CrawlId) -> Vec<Effect> {
    if state.mounted_crawl() == Some(crawl_id.as_str()) {
        return Vec::new();
    }

    // The previous owner must be gone before the new one exists.
    let mut effects = unmount(state);

    let mut view = CrawlView::new(crawl_id, state.tab);
    effects.extend(view.polls.subscribe(
        &view.tab.subscriptions(),
        &state.poll_intervals,
        &mut state.generations,
    ));
    state.view = Some(view);
    state.mark_dirty();
    effects
}

fn unmount(state: &mut SyncState) -> Vec<Effect> {
    if state.view.is_none() {
        return Vec::new();
    }
    let mut effects = drive_connection(state, ConnEvent::Teardown);
    if let Some(mut view) = state.view.take() {
        effects.extend(view.polls.stop_all());
    }
    state.mark_dirty();
    effects
}

fn select_tab(state: &mut SyncState, tab: ViewTab) -> Vec<Effect> {
    if state.tab != tab {
        state.tab = tab;
        state.mark_dirty();
    }
    let Some(view) = state.view.as_mut() else {
        return Vec::new();
    };
    if view.tab == tab {
        return Vec::new();
    }
    view.tab = tab;
    view.polls.subscribe(
        &tab.subscriptions(),
        &state.poll_intervals,
        &mut state.generations,
    )
}

fn drive_connection(state: &mut SyncState, event: ConnEvent) -> Vec<Effect> {
    let Some(view) = state.view.as_mut() else {
        return Vec::new();
    };

    let is_teardown = event == ConnEvent::Teardown;
    let before = (view.connection.state(), view.connection.retry());
    let (connection, step) = transition(view.connection.clone(), event, &state.retry_policy);
    view.connection = connection;
    let changed = before != (view.connection.state(), view.connection.retry());

    let generation = view.connection.generation();
    let mut effects = step.effects;
    let mut visible = true;
    let mut finished = false;
    match step.signal {
        Some(ConnSignal::Connected) => view.reconciler.set_connected(true),
        Some(ConnSignal::Disconnected) => view.reconciler.set_connected(false),
        Some(ConnSignal::GaveUp { attempts }) => {
            // No reconnect is coming, so pulls must be able to replace the last push.
            view.reconciler.retire_push();
            effects.push(Effect::Report {
                generation,
                report: SyncReport::GaveUp { attempts },
            });
        }
        Some(ConnSignal::Snapshot(snapshot)) => {
            finished = snapshot.status.is_terminal();
            view.reconciler.accept_push(snapshot);
        }
        Some(ConnSignal::FrameDropped(reason)) => {
            visible = false;
            effects.push(Effect::Report {
                generation,
                report: SyncReport::FrameDropped(reason),
            });
        }
        None => visible = false,
    }
    if is_teardown {
        view.reconciler.end_activation();
    }

    if changed || visible || is_teardown {
        state.mark_dirty();
    }

    // The server closes the channel after a terminal frame; close it first so
    // the close is not mistaken for a failure worth retrying.
    if finished {
        if let Some(view) = state.view.as_mut() {
            view.reconciler.retire_push();
        }
        effects.extend(drive_connection(state, ConnEvent::Teardown));
    }
    effects
}

fn apply_pull(
    state: &mut SyncState,
    kind: PollKind,
    generation: Generation,
    result: Result<PullPayload, PullFailure>,
) -> Vec<Effect> {
    let Some(view) = state.view.as_mut() else {
        return Vec::new();
    };
    if !view.polls.owns(kind, generation) {
        return Vec::new();
    }
    // Failed pulls are retried by the next tick of the same poll.
    let payload = match result {
        Ok(payload) => payload,
        Err(failure) => {
            view.pull_error = Some(failure.message);
            state.mark_dirty();
            return Vec::new();
        }
    };
    if payload.kind() != kind {
        return Vec::new();
    }

    match payload {
        PullPayload::Progress(snapshot) => {
            if snapshot.crawl_id != view.crawl_id {
                return Vec::new();
            }
            view.pull_error = None;
            let active = snapshot.status.is_active();
            let connection = view.connection.state();
            view.reconciler.accept_pull(snapshot);
            state.mark_dirty();

            if active && connection == ConnectionState::Disconnected {
                let generation = state.generations.issue();
                drive_connection(state, ConnEvent::Activate { generation })
            } else if !active && connection != ConnectionState::Disconnected {
                drive_connection(state, ConnEvent::Teardown)
            } else {
                Vec::new()
            }
        }
        PullPayload::Stats(stats) => {
            view.stats = Some(stats);
            view.pull_error = None;
            state.mark_dirty();
            Vec::new()
        }
        PullPayload::Graph(graph) => {
            view.graph = Some(graph);
            view.pull_error = None;
            state.mark_dirty();
            Vec::new()
        }
    }
}
