use std::time::{Duration, Instant};

/// Full poll cadence while nothing else is going on.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// How long after a command the actuator is polled for its settling state.
pub const SETTLE_WINDOW: Duration = Duration::from_secs(30);

/// Quiet period at the start of the settle window; polling earlier only
/// returns mid-travel state.
pub const SETTLE_QUIET: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    /// Periodic full refresh.
    Scheduled,
    /// Poll inside the post-command settle window.
    AfterAction,
}

/// Decides on every idle tick whether to poll the gateway. Owns the two
/// wall-clock trackers; the worker loop is the only caller, commands reach
/// it over a channel, so no locking is needed.
#[derive(Debug)]
pub struct PollScheduler {
    last_refresh: Option<Instant>,
    last_action: Option<Instant>,
}

impl PollScheduler {
    /// Starts with no refresh on record, so the first idle tick polls
    /// immediately.
    pub fn new() -> Self {
        Self { last_refresh: None, last_action: None }
    }

    /// A state-changing command went out.
    pub fn note_action(&mut self, now: Instant) {
        self.last_action = Some(now);
    }

    /// Called on ticks with no datagram pending.
    pub fn on_tick(&mut self, now: Instant) -> Option<PollKind> {
        if self
            .last_refresh
            .map_or(true, |at| now.duration_since(at) >= REFRESH_INTERVAL)
        {
            self.last_refresh = Some(now);
            return Some(PollKind::Scheduled);
        }

        let action = self.last_action?;
        let since = now.duration_since(action);
        if since < SETTLE_QUIET {
            return None;
        }
        if since >= SETTLE_WINDOW {
            self.last_action = None;
        }
        Some(PollKind::AfterAction)
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new()
    }
}
