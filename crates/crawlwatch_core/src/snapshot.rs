use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub type CrawlId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    /// Any status string this client does not know about.
    #[serde(other)]
    Unknown,
}

impl CrawlStatus {
    /// Only a running crawl is worth a push channel.
    pub fn is_active(self) -> bool {
        self == CrawlStatus::Running
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CrawlStatus::Completed | CrawlStatus::Failed | CrawlStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CrawlStatus::Pending => "pending",
            CrawlStatus::Running => "running",
            CrawlStatus::Completed => "completed",
            CrawlStatus::Failed => "failed",
            CrawlStatus::Cancelled => "cancelled",
            CrawlStatus::Unknown => "unknown",
        }
    }
}

/// Complete progress of one crawl as observed at one instant.
///
/// Snapshots are never merged: a newer one replaces the older one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub crawl_id: CrawlId,
    pub status: CrawlStatus,
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub failed: u64,
    #[serde(default)]
    pub cancelled: u64,
    pub root_url: String,
    pub requested_depth: u32,
}

impl ProgressSnapshot {
    /// Parses one push frame. Returns `None` for anything that is not a
    /// well-formed snapshot.
    pub fn from_frame(text: &str) -> Option<Self> {
        serde_json::from_str(text.trim()).ok()
    }

    pub fn percent_complete(&self) -> u8 {
        percent(self.completed, self.total)
    }

    pub fn percent_failed(&self) -> u8 {
        percent(self.failed, self.total)
    }
}

fn percent(part: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (part as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub failed: u64,
    #[serde(default)]
    pub cancelled: u64,
}

/// Aggregate statistics for one crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub crawl_id: CrawlId,
    pub total_urls: u64,
    pub unique_domains: u64,
    pub max_depth_reached: u32,
    pub status_counts: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub domain: String,
    pub depth: u32,
    pub status: String,
    pub node_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// Link graph of a crawl, as served for visualization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub domains: usize,
    pub max_depth: u32,
}

impl GraphData {
    pub fn summary(&self) -> GraphSummary {
        let domains: BTreeSet<&str> = self.nodes.iter().map(|n| n.domain.as_str()).collect();
        GraphSummary {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            domains: domains.len(),
            max_depth: self.nodes.iter().map(|n| n.depth).max().unwrap_or(0),
        }
    }
}
