//! Locator abstraction for element selection and interaction.
//!
//! # Design Philosophy
//!
//! - **Lazy**: a locator is only a query; it re-resolves against the live
//!   page on every operation and never holds a DOM snapshot
//! - **Scoped chains**: `locator.locator(child)` matches `child` inside the
//!   parent's matches
//! - **Auto-waiting clicks**: `click` waits until the target is visible and
//!   enabled before acting

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::driver::{ElementSnapshot, PageDriver};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, ElementState, WaitPolicy};

/// One CSS step of a selector chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    /// CSS selector evaluated inside the previous step's matches
    pub css: String,
    /// Keep only the n-th match of this step
    pub nth: Option<usize>,
}

/// Chain of CSS segments, each scoped to the matches of the one before
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    segments: Vec<Segment>,
}

impl Selector {
    /// Create a single-segment CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment {
                css: selector.into(),
                nth: None,
            }],
        }
    }

    /// Append a scoped child segment
    #[must_use]
    pub fn child(mut self, selector: impl Into<String>) -> Self {
        self.segments.push(Segment {
            css: selector.into(),
            nth: None,
        });
        self
    }

    /// Restrict the last segment to its n-th match
    #[must_use]
    pub fn with_nth(mut self, index: usize) -> Self {
        if let Some(last) = self.segments.last_mut() {
            last.nth = Some(index);
        }
        self
    }

    /// Same chain with the last segment's index filter removed
    #[must_use]
    pub fn without_last_nth(&self) -> Self {
        let mut copy = self.clone();
        if let Some(last) = copy.segments.last_mut() {
            last.nth = None;
        }
        copy
    }

    /// Index filter on the last segment
    #[must_use]
    pub fn last_nth(&self) -> Option<usize> {
        self.segments.last().and_then(|s| s.nth)
    }

    /// The chain's segments
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(" >> ")?;
            }
            f.write_str(&segment.css)?;
            if let Some(n) = segment.nth {
                write!(f, " >> nth={n}")?;
            }
        }
        Ok(())
    }
}

/// A re-resolvable reference to the nodes a selector chain matches.
#[derive(Debug, Clone)]
pub struct Locator {
    driver: Arc<dyn PageDriver>,
    selector: Selector,
    policy: WaitPolicy,
}

impl Locator {
    /// Create a page-scoped locator
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, css: impl Into<String>, policy: WaitPolicy) -> Self {
        Self {
            driver,
            selector: Selector::css(css),
            policy,
        }
    }

    /// Locator for `css` scoped inside this locator's matches
    #[must_use]
    pub fn locator(&self, css: impl Into<String>) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            selector: self.selector.clone().child(css),
            policy: self.policy,
        }
    }

    /// First match only
    #[must_use]
    pub fn first(&self) -> Self {
        self.nth(0)
    }

    /// The n-th match only
    #[must_use]
    pub fn nth(&self, index: usize) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            selector: self.selector.clone().with_nth(index),
            policy: self.policy,
        }
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the wait policy
    #[must_use]
    pub const fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    async fn resolve(&self) -> ProbeResult<Vec<ElementSnapshot>> {
        self.driver.query(&self.selector).await
    }

    /// Number of nodes matched right now
    pub async fn count(&self) -> ProbeResult<usize> {
        Ok(self.resolve().await?.len())
    }

    /// Whether the first match is visible right now
    pub async fn is_visible(&self) -> ProbeResult<bool> {
        Ok(self.resolve().await?.first().is_some_and(|e| e.visible))
    }

    /// Whether the first match is enabled right now
    pub async fn is_enabled(&self) -> ProbeResult<bool> {
        Ok(self.resolve().await?.first().is_some_and(|e| e.enabled))
    }

    /// One locator per current match, each addressing its node by index.
    ///
    /// The returned locators stay lazy: if the page re-renders they resolve
    /// against the new nodes.
    pub async fn all(&self) -> ProbeResult<Vec<Self>> {
        let count = self.count().await?;
        Ok((0..count).map(|i| self.nth(i)).collect())
    }

    /// `innerText` of the first match, waiting for it to attach within the
    /// policy's action timeout
    pub async fn inner_text(&self) -> ProbeResult<String> {
        let timeout = self.policy.action_timeout;
        let label = self.selector.to_string();
        let this = self;
        poll_until(&label, "attached", timeout, self.policy.poll_interval, || async move {
            Ok(this.resolve().await?.into_iter().next().map(|e| e.text))
        })
        .await
    }

    /// Wait until the first match reaches `state`
    pub async fn wait_for(&self, state: ElementState, timeout: Duration) -> ProbeResult<()> {
        let label = self.selector.to_string();
        tracing::trace!(selector = %label, %state, ?timeout, "wait_for");
        let this = self;
        poll_until(&label, state.as_str(), timeout, self.policy.poll_interval, || async move {
            let nodes = this.resolve().await?;
            Ok(state.is_satisfied(&nodes).then_some(()))
        })
        .await
    }

    /// Click the first match once it is visible and enabled, waiting at most
    /// the policy's action timeout
    pub async fn click(&self) -> ProbeResult<()> {
        self.click_within(self.policy.action_timeout).await
    }

    /// Click the first match once it is visible and enabled, waiting at most
    /// `timeout`
    pub async fn click_within(&self, timeout: Duration) -> ProbeResult<()> {
        let target = if self.selector.last_nth().is_some() {
            self.clone()
        } else {
            self.first()
        };
        let label = target.selector.to_string();
        let probe = &target;
        poll_until(&label, "visible and enabled", timeout, self.policy.poll_interval, || async move {
            let nodes = probe.resolve().await?;
            Ok(nodes
                .first()
                .is_some_and(|e| e.visible && e.enabled)
                .then_some(()))
        })
        .await?;
        tracing::debug!(selector = %label, "click");
        self.driver.click(&target.selector).await.map_err(|e| match e {
            ProbeError::Driver { message } => ProbeError::driver(format!("click `{label}`: {message}")),
            other => other,
        })
    }
}
