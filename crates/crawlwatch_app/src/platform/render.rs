use crawlwatch_core::{
    ConnectionState, CrawlStats, CrawlViewModel, GraphSummary, ProgressSnapshot, SnapshotSource,
    ViewTab,
};
use crawlwatch_engine::{CrawlListItem, CrawlListResponse};

const BAR_WIDTH: usize = 30;

/// Renders the crawl detail view as terminal lines. `timestamp` heads the block.
pub fn render(view: &CrawlViewModel, timestamp: &str) -> Vec<String> {
    let Some(crawl_id) = view.crawl_id.as_deref() else {
        return vec![format!("[{timestamp}] no crawl selected")];
    };

    let mut lines = vec![format!(
        "[{timestamp}] crawl {crawl_id} | tab: {} | {}",
        tab_label(view.tab),
        connection_label(view)
    )];

    match &view.progress {
        Some(progress) => lines.extend(progress_lines(progress, view.source)),
        None => lines.push("  waiting for first snapshot...".to_string()),
    }
    if let Some(error) = &view.pull_error {
        lines.push(format!("  last refresh failed: {error}"));
    }

    match view.tab {
        ViewTab::Progress => {}
        ViewTab::Stats => match &view.stats {
            Some(stats) => lines.extend(stats_lines(stats)),
            None => lines.push("  loading statistics...".to_string()),
        },
        ViewTab::Graph => match &view.graph {
            Some(graph) => lines.push(graph_line(graph)),
            None => lines.push("  loading graph...".to_string()),
        },
    }

    lines
}

pub fn render_list(page: &CrawlListResponse) -> Vec<String> {
    let mut lines: Vec<String> = page.crawls.iter().map(format_list_row).collect();
    let shown_to = page.offset + page.crawls.len() as u64;
    lines.push(format!(
        "{}-{} of {} crawls",
        if page.crawls.is_empty() { page.offset } else { page.offset + 1 },
        shown_to,
        format_with_commas(page.total)
    ));
    lines
}

fn format_list_row(item: &CrawlListItem) -> String {
    format!(
        "{id}  {status:<9}  {done}/{total}  depth {depth}  {url}",
        id = item.crawl_id,
        status = item.status.as_str(),
        done = format_with_commas(item.completed),
        total = format_with_commas(item.total),
        depth = item.requested_depth,
        url = item.root_url
    )
}

fn progress_lines(progress: &ProgressSnapshot, source: Option<SnapshotSource>) -> Vec<String> {
    let percent = progress.percent_complete();
    let filled = BAR_WIDTH * usize::from(percent.min(100)) / 100;
    let source = match source {
        Some(SnapshotSource::Push) => "live",
        Some(SnapshotSource::Pull) | None => "polled",
    };
    vec![
        format!(
            "  {} | {} depth {} | {}",
            progress.status.as_str(),
            progress.root_url,
            progress.requested_depth,
            source
        ),
        format!(
            "  [{}{}] {:>3}% ({} / {})",
            "#".repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
            percent,
            format_with_commas(progress.completed),
            format_with_commas(progress.total)
        ),
        format!(
            "  pending {} | in progress {} | failed {} ({}%) | cancelled {}",
            format_with_commas(progress.pending),
            format_with_commas(progress.in_progress),
            format_with_commas(progress.failed),
            progress.percent_failed(),
            format_with_commas(progress.cancelled)
        ),
    ]
}

fn stats_lines(stats: &CrawlStats) -> Vec<String> {
    let counts = &stats.status_counts;
    vec![
        format!(
            "  urls {} | domains {} | max depth {}",
            format_with_commas(stats.total_urls),
            format_with_commas(stats.unique_domains),
            stats.max_depth_reached
        ),
        format!(
            "  completed {} | pending {} | in progress {} | failed {} | cancelled {}",
            format_with_commas(counts.completed),
            format_with_commas(counts.pending),
            format_with_commas(counts.in_progress),
            format_with_commas(counts.failed),
            format_with_commas(counts.cancelled)
        ),
    ]
}

fn graph_line(graph: &GraphSummary) -> String {
    format!(
        "  graph: {} nodes, {} edges, {} domains, depth {}",
        format_with_commas(graph.nodes as u64),
        format_with_commas(graph.edges as u64),
        format_with_commas(graph.domains as u64),
        graph.max_depth
    )
}

fn tab_label(tab: ViewTab) -> &'static str {
    match tab {
        ViewTab::Progress => "progress",
        ViewTab::Stats => "stats",
        ViewTab::Graph => "graph",
    }
}

fn connection_label(view: &CrawlViewModel) -> String {
    match view.connection {
        ConnectionState::Disconnected => "offline".to_string(),
        ConnectionState::Connecting => "connecting".to_string(),
        ConnectionState::Open => "live".to_string(),
        ConnectionState::ClosedRetrying => format!("reconnecting (attempt {})", view.retry_attempt),
        ConnectionState::ClosedGivenUp => "live updates unavailable".to_string(),
    }
}

fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}
