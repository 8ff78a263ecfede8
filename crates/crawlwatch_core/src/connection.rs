//! Push-channel connection manager for one crawl.
//!
//! The manager is a plain value driven by [`transition`]. It never touches a
//! transport or a clock; it asks for those through [`Effect`]s.

use std::time::Duration;

use crate::{CrawlId, Effect, Generation, ProgressSnapshot};

pub const MAX_RETRIES: u32 = 5;
pub const BASE_RETRY_DELAY: Duration = Duration::from_millis(1_000);
pub const MAX_RETRY_DELAY: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    ClosedRetrying,
    ClosedGivenUp,
}

impl ConnectionState {
    /// States in which a channel exists or is being established.
    pub fn is_live(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: BASE_RETRY_DELAY,
            max_delay: MAX_RETRY_DELAY,
            max_retries: MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// `min(base * 2^attempt, max_delay)`, saturating instead of overflowing.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTimer {
    pub generation: Generation,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryState {
    attempt: u32,
    pending_timer: Option<RetryTimer>,
}

impl RetryState {
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn pending_timer(&self) -> Option<RetryTimer> {
        self.pending_timer
    }
}

/// Inputs to the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnEvent {
    /// The crawl became active; `generation` is the token for the new instance.
    Activate { generation: Generation },
    Opened { generation: Generation },
    Frame { generation: Generation, text: String },
    /// Close and error are the same event.
    Closed { generation: Generation },
    RetryElapsed { generation: Generation },
    Teardown,
}

/// Why a frame from the live channel was not used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Malformed,
    OtherCrawl(CrawlId),
}

/// Notifications for the reconciler produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnSignal {
    Connected,
    Disconnected,
    /// Closed with the retry budget spent; no further reconnects.
    GaveUp { attempts: u32 },
    Snapshot(ProgressSnapshot),
    FrameDropped(DropReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Step {
    pub effects: Vec<Effect>,
    pub signal: Option<ConnSignal>,
}

impl Step {
    fn none() -> Self {
        Self::default()
    }

    fn effects(effects: Vec<Effect>, signal: Option<ConnSignal>) -> Self {
        Self { effects, signal }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionManager {
    crawl_id: CrawlId,
    generation: Generation,
    state: ConnectionState,
    retry: RetryState,
}

impl ConnectionManager {
    pub fn new(crawl_id: impl Into<CrawlId>) -> Self {
        Self {
            crawl_id: crawl_id.into(),
            generation: Generation::default(),
            state: ConnectionState::Disconnected,
            retry: RetryState::default(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retry(&self) -> RetryState {
        self.retry
    }

    fn owns(&self, generation: Generation) -> bool {
        self.state != ConnectionState::Disconnected && self.generation == generation
    }

    fn open_channel(&self) -> Effect {
        Effect::OpenChannel {
            crawl_id: self.crawl_id.clone(),
            generation: self.generation,
        }
    }
}

/// Applies one event to a connection manager.
///
/// Callbacks whose generation does not match the live instance, or that arrive
/// in a state where they mean nothing, leave the manager unchanged.
pub fn transition(
    mut conn: ConnectionManager,
    event: ConnEvent,
    policy: &RetryPolicy,
) -> (ConnectionManager, Step) {
    let step = match event {
        ConnEvent::Activate { generation } => {
            if conn.state != ConnectionState::Disconnected {
                return (conn, Step::none());
            }
            conn.generation = generation;
            conn.state = ConnectionState::Connecting;
            conn.retry = RetryState::default();
            Step::effects(vec![conn.open_channel()], None)
        }
        ConnEvent::Opened { generation } => {
            if !conn.owns(generation) || conn.state != ConnectionState::Connecting {
                return (conn, Step::none());
            }
            conn.state = ConnectionState::Open;
            conn.retry = RetryState::default();
            Step::effects(Vec::new(), Some(ConnSignal::Connected))
        }
        ConnEvent::Frame { generation, text } => {
            if !conn.owns(generation) || !conn.state.is_live() {
                return (conn, Step::none());
            }
            let signal = match ProgressSnapshot::from_frame(&text) {
                Some(snapshot) if snapshot.crawl_id == conn.crawl_id => {
                    ConnSignal::Snapshot(snapshot)
                }
                Some(snapshot) => {
                    ConnSignal::FrameDropped(DropReason::OtherCrawl(snapshot.crawl_id))
                }
                None => ConnSignal::FrameDropped(DropReason::Malformed),
            };
            Step::effects(Vec::new(), Some(signal))
        }
        ConnEvent::Closed { generation } => {
            if !conn.owns(generation) || !conn.state.is_live() {
                return (conn, Step::none());
            }
            let attempt = conn.retry.attempt;
            if attempt >= policy.max_retries {
                conn.state = ConnectionState::ClosedGivenUp;
                conn.retry.pending_timer = None;
                Step::effects(Vec::new(), Some(ConnSignal::GaveUp { attempts: attempt }))
            } else {
                let delay = policy.delay(attempt);
                conn.state = ConnectionState::ClosedRetrying;
                conn.retry = RetryState {
                    attempt: attempt + 1,
                    pending_timer: Some(RetryTimer {
                        generation: conn.generation,
                        delay,
                    }),
                };
                Step::effects(
                    vec![Effect::ScheduleRetry {
                        generation: conn.generation,
                        delay,
                    }],
                    Some(ConnSignal::Disconnected),
                )
            }
        }
        ConnEvent::RetryElapsed { generation } => {
            if !conn.owns(generation) || conn.state != ConnectionState::ClosedRetrying {
                return (conn, Step::none());
            }
            conn.state = ConnectionState::Connecting;
            conn.retry.pending_timer = None;
            Step::effects(vec![conn.open_channel()], None)
        }
        ConnEvent::Teardown => {
            if conn.state == ConnectionState::Disconnected {
                return (conn, Step::none());
            }
            let generation = conn.generation;
            let mut effects = Vec::with_capacity(2);
            if conn.retry.pending_timer.is_some() {
                effects.push(Effect::CancelRetry { generation });
            }
            let was_live = conn.state.is_live();
            if was_live {
                effects.push(Effect::CloseChannel { generation });
            }
            conn.state = ConnectionState::Disconnected;
            conn.retry = RetryState::default();
            Step::effects(effects, was_live.then_some(ConnSignal::Disconnected))
        }
    };

    (conn, step)
}
