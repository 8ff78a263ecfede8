use crate::ProgressSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Push,
    Pull,
}

/// Chooses the progress value to display from the two delivery channels.
///
/// A push snapshot, once one has arrived for the current activation, always
/// wins over pulled ones. Within a channel the most recent arrival wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateReconciler {
    push: Option<ProgressSnapshot>,
    pull: Option<ProgressSnapshot>,
    connected: bool,
}

impl StateReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_push(&mut self, snapshot: ProgressSnapshot) {
        self.push = Some(snapshot);
    }

    pub fn accept_pull(&mut self, snapshot: ProgressSnapshot) {
        self.pull = Some(snapshot);
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Ends the current activation: live snapshots no longer apply.
    pub fn end_activation(&mut self) {
        self.push = None;
        self.connected = false;
    }

    /// The channel is gone for good: its last snapshot becomes the fallback
    /// value, which the next pull replaces.
    pub fn retire_push(&mut self) {
        if let Some(push) = self.push.take() {
            self.pull = Some(push);
        }
        self.connected = false;
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn displayed(&self) -> Option<(&ProgressSnapshot, SnapshotSource)> {
        match (&self.push, &self.pull) {
            (Some(push), _) => Some((push, SnapshotSource::Push)),
            (None, Some(pull)) => Some((pull, SnapshotSource::Pull)),
            (None, None) => None,
        }
    }
}
