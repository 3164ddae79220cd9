//! Wait Mechanisms
//!
//! Playwright-style bounded waits. Every wait polls the live page at a fixed
//! interval until its condition holds or the deadline passes, then fails with
//! [`ProbeError::Timeout`] naming what was awaited and the budget. Waits
//! never retry past their deadline.

use crate::driver::{ElementSnapshot, NetworkSnapshot, PageDriver, ReadyState};
use crate::result::{ProbeError, ProbeResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default timeout for locator actions such as `click` (5 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;

/// Network idle threshold (500ms without new requests)
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

// =============================================================================
// LOAD STATE
// =============================================================================

/// Page load states (Playwright parity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadState {
    /// Wait for the `load` event to fire
    #[default]
    Load,
    /// Wait for `DOMContentLoaded` event
    DomContentLoaded,
    /// Wait for network to be idle
    NetworkIdle,
}

impl LoadState {
    /// Playwright name of this load state
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "domcontentloaded",
            Self::NetworkIdle => "networkidle",
        }
    }

    /// Whether the document has reached the ready state this load state needs
    #[must_use]
    pub const fn ready_state_reached(&self, ready: ReadyState) -> bool {
        match self {
            Self::DomContentLoaded => {
                matches!(ready, ReadyState::Interactive | ReadyState::Complete)
            }
            Self::Load | Self::NetworkIdle => matches!(ready, ReadyState::Complete),
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ELEMENT STATE
// =============================================================================

/// Element states a locator can wait for (Playwright parity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementState {
    /// At least one node matches
    Attached,
    /// No node matches
    Detached,
    /// First match is visible
    Visible,
    /// No match, or first match not visible
    Hidden,
}

impl ElementState {
    /// Get the state name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }

    /// Check the state against freshly resolved nodes
    #[must_use]
    pub fn is_satisfied(&self, nodes: &[ElementSnapshot]) -> bool {
        let first = nodes.first();
        match self {
            Self::Attached => first.is_some(),
            Self::Detached => first.is_none(),
            Self::Visible => first.is_some_and(|e| e.visible),
            Self::Hidden => !first.is_some_and(|e| e.visible),
        }
    }
}

impl std::fmt::Display for ElementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// WAIT POLICY
// =============================================================================

/// Polling and settling parameters shared by all waits on one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay between polls
    pub poll_interval: Duration,
    /// Budget for auto-waiting locator actions
    pub action_timeout: Duration,
    /// How long the resource count must stay flat to count as network idle
    pub network_quiet: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            action_timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            network_quiet: Duration::from_millis(NETWORK_IDLE_THRESHOLD_MS),
        }
    }
}

// =============================================================================
// POLLING
// =============================================================================

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Poll `check` until it yields `Some`, or fail with a timeout naming `label`
/// and `condition`.
///
/// The check always runs at least once, even with a zero budget. Errors from
/// `check` abort the wait immediately.
pub async fn poll_until<T, F, Fut>(
    label: &str,
    condition: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut check: F,
) -> ProbeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = check().await? {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(ProbeError::timeout(label, condition, millis(timeout)));
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}

/// Tracks how long the page's network has been quiet across polls
#[derive(Debug, Default)]
struct QuietTracker {
    last_resources: Option<u64>,
    quiet_since: Option<Instant>,
}

impl QuietTracker {
    fn observe(&mut self, snapshot: NetworkSnapshot, now: Instant, window: Duration) -> bool {
        let busy = snapshot.in_flight > 0
            || !LoadState::NetworkIdle.ready_state_reached(snapshot.ready_state)
            || self.last_resources != Some(snapshot.resources);
        self.last_resources = Some(snapshot.resources);
        if busy {
            self.quiet_since = Some(now);
            return window.is_zero() && snapshot.in_flight == 0
                && LoadState::NetworkIdle.ready_state_reached(snapshot.ready_state);
        }
        let since = *self.quiet_since.get_or_insert(now);
        now.duration_since(since) >= window
    }
}

/// Wait until the page reaches `state` within `timeout`.
pub async fn wait_for_load_state(
    driver: &dyn PageDriver,
    state: LoadState,
    timeout: Duration,
    policy: &WaitPolicy,
) -> ProbeResult<()> {
    tracing::debug!(%state, ?timeout, "wait_for_load_state");
    match state {
        LoadState::Load | LoadState::DomContentLoaded => {
            poll_until("page", state.as_str(), timeout, policy.poll_interval, || async move {
                let snapshot = driver.network().await?;
                Ok(state.ready_state_reached(snapshot.ready_state).then_some(()))
            })
            .await
        }
        LoadState::NetworkIdle => {
            let mut tracker = QuietTracker::default();
            let window = policy.network_quiet;
            let deadline = Instant::now() + timeout;
            loop {
                let snapshot = driver.network().await?;
                let now = Instant::now();
                if tracker.observe(snapshot, now, window) {
                    return Ok(());
                }
                if now >= deadline {
                    return Err(ProbeError::timeout("page", state.as_str(), millis(timeout)));
                }
                tokio::time::sleep(policy.poll_interval.min(deadline - now)).await;
            }
        }
    }
}
