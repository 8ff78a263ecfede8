//! Periodic pull scheduling, gated by which views are subscribed.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::{CrawlId, Effect, Generation, GenerationCounter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PollKind {
    Progress,
    Stats,
    Graph,
}

/// Tab of the crawl detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewTab {
    #[default]
    Progress,
    Stats,
    Graph,
}

impl ViewTab {
    /// Pulls the detail view needs while this tab is selected. Progress is
    /// always included because the header shows it on every tab.
    pub fn subscriptions(self) -> BTreeSet<PollKind> {
        let mut kinds = BTreeSet::from([PollKind::Progress]);
        match self {
            ViewTab::Progress => {}
            ViewTab::Stats => {
                kinds.insert(PollKind::Stats);
            }
            ViewTab::Graph => {
                kinds.insert(PollKind::Graph);
            }
        }
        kinds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub progress: Duration,
    pub stats: Duration,
    pub graph: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            progress: Duration::from_secs(5),
            stats: Duration::from_secs(10),
            graph: Duration::from_secs(15),
        }
    }
}

impl PollIntervals {
    pub fn interval(&self, kind: PollKind) -> Duration {
        match kind {
            PollKind::Progress => self.progress,
            PollKind::Stats => self.stats,
            PollKind::Graph => self.graph,
        }
    }
}

/// Tracks which pulls are armed for one crawl and the token each was armed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollScheduler {
    crawl_id: CrawlId,
    armed: BTreeMap<PollKind, Generation>,
}

impl PollScheduler {
    pub fn new(crawl_id: impl Into<CrawlId>) -> Self {
        Self {
            crawl_id: crawl_id.into(),
            armed: BTreeMap::new(),
        }
    }

    pub fn is_armed(&self, kind: PollKind) -> bool {
        self.armed.contains_key(&kind)
    }

    pub fn armed(&self) -> impl Iterator<Item = (PollKind, Generation)> + '_ {
        self.armed.iter().map(|(kind, generation)| (*kind, *generation))
    }

    /// True when `generation` is the live token for `kind`.
    pub fn owns(&self, kind: PollKind, generation: Generation) -> bool {
        self.armed.get(&kind) == Some(&generation)
    }

    /// Stops pulls no longer wanted, then starts newly wanted ones.
    pub(crate) fn subscribe(
        &mut self,
        wanted: &BTreeSet<PollKind>,
        intervals: &PollIntervals,
        generations: &mut GenerationCounter,
    ) -> Vec<Effect> {
        let stale: Vec<PollKind> = self
            .armed
            .keys()
            .filter(|kind| !wanted.contains(kind))
            .copied()
            .collect();
        let mut effects: Vec<Effect> = stale
            .into_iter()
            .filter_map(|kind| self.disarm(kind))
            .collect();

        for kind in wanted {
            if self.armed.contains_key(kind) {
                continue;
            }
            let generation = generations.issue();
            self.armed.insert(*kind, generation);
            effects.push(Effect::StartPoll {
                kind: *kind,
                crawl_id: self.crawl_id.clone(),
                interval: intervals.interval(*kind),
                generation,
            });
        }
        effects
    }

    pub(crate) fn stop_all(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.armed)
            .into_iter()
            .map(|(kind, generation)| Effect::StopPoll { kind, generation })
            .collect()
    }

    fn disarm(&mut self, kind: PollKind) -> Option<Effect> {
        self.armed
            .remove(&kind)
            .map(|generation| Effect::StopPoll { kind, generation })
    }
}
