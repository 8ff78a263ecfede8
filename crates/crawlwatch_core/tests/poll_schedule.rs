use std::time::Duration;

use crawlwatch_core::{
    update, CrawlStats, Effect, Generation, GraphData, GraphEdge, GraphNode, GraphSummary, Msg,
    PollIntervals, PollKind, PullPayload, RetryPolicy, StatusCounts, SyncState, ViewTab,
};
use pretty_assertions::assert_eq;

fn mount(state: SyncState) -> (SyncState, Vec<Effect>) {
    update(
        state,
        Msg::ViewMounted {
            crawl_id: "c1".to_string(),
        },
    )
}

fn started(effects: &[Effect]) -> Vec<(PollKind, Duration)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::StartPoll { kind, interval, .. } => Some((*kind, *interval)),
            _ => None,
        })
        .collect()
}

fn stopped(effects: &[Effect]) -> Vec<PollKind> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::StopPoll { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

fn stats() -> CrawlStats {
    CrawlStats {
        crawl_id: "c1".to_string(),
        total_urls: 12,
        unique_domains: 3,
        max_depth_reached: 2,
        status_counts: StatusCounts {
            pending: 2,
            in_progress: 1,
            completed: 8,
            failed: 1,
            cancelled: 0,
        },
    }
}

fn node(id: &str, domain: &str, depth: u32) -> GraphNode {
    GraphNode {
        id: id.to_string(),
        label: id.to_string(),
        domain: domain.to_string(),
        depth,
        status: "completed".to_string(),
        node_type: "url".to_string(),
    }
}

#[test]
fn stats_tab_adds_stats_poll() {
    let (state, _) = mount(SyncState::new());
    let (state, effects) = update(state, Msg::TabSelected(ViewTab::Stats));

    assert_eq!(started(&effects), vec![(PollKind::Stats, Duration::from_secs(10))]);
    assert!(stopped(&effects).is_empty());
    let polls = state.polls().unwrap();
    assert!(polls.is_armed(PollKind::Progress));
    assert!(polls.is_armed(PollKind::Stats));
    assert!(!polls.is_armed(PollKind::Graph));
}

#[test]
fn switching_tabs_swaps_polls() {
    let (state, _) = mount(SyncState::new());
    let (state, _) = update(state, Msg::TabSelected(ViewTab::Stats));
    let (state, effects) = update(state, Msg::TabSelected(ViewTab::Graph));

    assert_eq!(stopped(&effects), vec![PollKind::Stats]);
    assert_eq!(started(&effects), vec![(PollKind::Graph, Duration::from_secs(15))]);

    let (state, effects) = update(state, Msg::TabSelected(ViewTab::Progress));
    assert_eq!(stopped(&effects), vec![PollKind::Graph]);
    assert!(started(&effects).is_empty());
    assert_eq!(
        state.polls().unwrap().armed().map(|(kind, _)| kind).collect::<Vec<_>>(),
        vec![PollKind::Progress]
    );
}

#[test]
fn reselecting_tab_is_noop() {
    let (state, _) = mount(SyncState::new());
    let (state, _) = update(state, Msg::TabSelected(ViewTab::Graph));
    let (_state, effects) = update(state, Msg::TabSelected(ViewTab::Graph));

    assert!(effects.is_empty());
}

#[test]
fn tab_chosen_before_mount_applies_on_mount() {
    let (state, effects) = update(SyncState::new(), Msg::TabSelected(ViewTab::Stats));
    assert!(effects.is_empty());

    let (state, effects) = mount(state);
    assert_eq!(
        started(&effects),
        vec![
            (PollKind::Progress, Duration::from_secs(5)),
            (PollKind::Stats, Duration::from_secs(10)),
        ]
    );
    assert_eq!(state.view().tab, ViewTab::Stats);
}

#[test]
fn custom_intervals_are_used() {
    let intervals = PollIntervals {
        progress: Duration::from_millis(500),
        stats: Duration::from_secs(1),
        graph: Duration::from_secs(2),
    };
    let state = SyncState::with_settings(RetryPolicy::default(), intervals);
    let (_state, effects) = mount(state);

    assert_eq!(started(&effects), vec![(PollKind::Progress, Duration::from_millis(500))]);
}

#[test]
fn stats_and_graph_pulls_reach_the_view() {
    let (state, _) = mount(SyncState::new());
    let (state, effects) = update(state, Msg::TabSelected(ViewTab::Stats));
    let stats_generation = effects[0].generation();

    let (state, _) = update(
        state,
        Msg::PullCompleted {
            kind: PollKind::Stats,
            generation: stats_generation,
            result: Ok(PullPayload::Stats(stats())),
        },
    );
    assert_eq!(state.view().stats, Some(stats()));

    let (state, effects) = update(state, Msg::TabSelected(ViewTab::Graph));
    let graph_generation = effects
        .iter()
        .find(|effect| matches!(effect, Effect::StartPoll { .. }))
        .map(Effect::generation)
        .unwrap();
    let graph = GraphData {
        nodes: vec![
            node("a", "example.com", 0),
            node("b", "example.com", 1),
            node("c", "other.org", 2),
        ],
        edges: vec![
            GraphEdge {
                source: "a".to_string(),
                target: "b".to_string(),
            },
            GraphEdge {
                source: "a".to_string(),
                target: "c".to_string(),
            },
        ],
    };
    let (state, _) = update(
        state,
        Msg::PullCompleted {
            kind: PollKind::Graph,
            generation: graph_generation,
            result: Ok(PullPayload::Graph(graph)),
        },
    );
    assert_eq!(
        state.view().graph,
        Some(GraphSummary {
            nodes: 3,
            edges: 2,
            domains: 2,
            max_depth: 2,
        })
    );
}

#[test]
fn pull_from_stopped_poll_is_ignored() {
    let (state, _) = mount(SyncState::new());
    let (state, effects) = update(state, Msg::TabSelected(ViewTab::Stats));
    let stats_generation = effects[0].generation();
    let (mut state, _) = update(state, Msg::TabSelected(ViewTab::Progress));
    state.consume_dirty();

    let (mut state, effects) = update(
        state,
        Msg::PullCompleted {
            kind: PollKind::Stats,
            generation: stats_generation,
            result: Ok(PullPayload::Stats(stats())),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().stats, None);
    assert!(!state.consume_dirty());
}

#[test]
fn mismatched_payload_kind_is_ignored() {
    let (state, effects) = mount(SyncState::new());
    let progress = effects[0].generation();

    let (state, _) = update(
        state,
        Msg::PullCompleted {
            kind: PollKind::Progress,
            generation: progress,
            result: Ok(PullPayload::Stats(stats())),
        },
    );
    assert_eq!(state.view().stats, None);
    assert_eq!(state.view().progress, None);
}

#[test]
fn unmount_stops_every_armed_poll() {
    let (state, _) = mount(SyncState::new());
    let (state, _) = update(state, Msg::TabSelected(ViewTab::Graph));
    let (state, effects) = update(state, Msg::ViewUnmounted);

    assert_eq!(stopped(&effects), vec![PollKind::Progress, PollKind::Graph]);
    assert!(state.polls().is_none());
    assert!(effects.iter().all(|effect| effect.generation() > Generation::new(0)));
}
