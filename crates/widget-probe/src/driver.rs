//! Page driver seam between locators and the browser.
//!
//! Locators and waits only ever talk to a [`PageDriver`]. The CDP-backed
//! [`crate::CdpPage`] drives a real Chromium; [`MockPage`] replays a scripted
//! in-memory DOM so page objects and scenarios can be tested without one.
//!
//! ```text
//! WidgetPage ──► Locator ──► PageDriver ──┬── CdpPage  (chromiumoxide)
//!                                         └── MockPage (scripted DOM)
//! ```

use crate::locator::Selector;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// What the driver observed for one matched node at query time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Node has a non-empty box and is not `visibility: hidden`
    pub visible: bool,
    /// Node is not disabled
    pub enabled: bool,
    /// `innerText` of the node
    pub text: String,
}

/// Document `readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    /// Document is still loading
    Loading,
    /// DOM parsed, subresources pending
    Interactive,
    /// Load event fired
    #[default]
    Complete,
}

/// Network activity observed on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    /// Document ready state
    pub ready_state: ReadyState,
    /// Requests started but not yet finished
    pub in_flight: u32,
    /// Resource timing entries recorded so far
    pub resources: u64,
}

impl NetworkSnapshot {
    /// A settled page with the given resource count
    #[must_use]
    pub const fn settled(resources: u64) -> Self {
        Self {
            ready_state: ReadyState::Complete,
            in_flight: 0,
            resources,
        }
    }

    /// A page with requests in flight
    #[must_use]
    pub const fn busy(in_flight: u32, resources: u64) -> Self {
        Self {
            ready_state: ReadyState::Complete,
            in_flight,
            resources,
        }
    }
}

/// Abstract page driver used by locators and waits.
///
/// Every call re-evaluates against the live page; implementations must not
/// cache query results.
#[async_trait]
pub trait PageDriver: Send + Sync + fmt::Debug {
    /// Start navigating to URL.
    ///
    /// Resolves once the new document is committed. Load events are not
    /// awaited here; callers wait for the ready state they need.
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Resolve a selector chain to the nodes it matches right now
    async fn query(&self, selector: &Selector) -> ProbeResult<Vec<ElementSnapshot>>;

    /// Click the first node the selector chain matches
    async fn click(&self, selector: &Selector) -> ProbeResult<()>;

    /// Report current network activity
    async fn network(&self) -> ProbeResult<NetworkSnapshot>;

    /// Current URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Close the page
    async fn close(&self) -> ProbeResult<()>;
}

/// Opens fresh pages, one per scenario
#[async_trait]
pub trait PageFactory: Send + Sync {
    /// Open a new blank page
    async fn open_page(&self) -> ProbeResult<Arc<dyn PageDriver>>;
}

// ============================================================================
// Mock driver
// ============================================================================

/// A node in the scripted DOM
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Inner text
    pub text: String,
    /// Whether the node renders
    pub visible: bool,
    /// Whether the node is enabled
    pub enabled: bool,
    /// Node only becomes visible after this instant
    pub reveal_at: Option<Instant>,
}

impl MockElement {
    /// A visible, enabled node
    #[must_use]
    pub fn visible(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visible: true,
            enabled: true,
            reveal_at: None,
        }
    }

    /// An attached but hidden node
    #[must_use]
    pub fn hidden(text: impl Into<String>) -> Self {
        Self {
            visible: false,
            ..Self::visible(text)
        }
    }

    /// Mark as disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Become visible only after `delay` has elapsed from now
    #[must_use]
    pub fn revealed_after(mut self, delay: Duration) -> Self {
        self.reveal_at = Some(Instant::now() + delay);
        self
    }

    fn snapshot(&self) -> ElementSnapshot {
        let revealed = self.reveal_at.map_or(true, |at| Instant::now() >= at);
        ElementSnapshot {
            visible: self.visible && revealed,
            enabled: self.enabled,
            text: self.text.clone(),
        }
    }
}

/// A mutation applied to the scripted DOM when something is clicked
#[derive(Debug, Clone)]
pub enum DomChange {
    /// Replace all nodes under a selector
    Set(Selector, Vec<MockElement>),
    /// Remove all nodes under a selector
    Remove(Selector),
    /// Hide every node under a selector
    Hide(Selector),
    /// Show every node under a selector
    Show(Selector),
    /// Queue network snapshots returned by subsequent polls
    Network(Vec<NetworkSnapshot>),
}

#[derive(Debug, Default)]
struct MockDom {
    url: String,
    elements: HashMap<String, Vec<MockElement>>,
    on_click: HashMap<String, Vec<DomChange>>,
    network: VecDeque<NetworkSnapshot>,
    goto_failure: Option<String>,
    goto_delay: Duration,
    query_failures: HashMap<String, String>,
    history: Vec<String>,
}

impl MockDom {
    fn apply(&mut self, change: DomChange) {
        match change {
            DomChange::Set(selector, nodes) => {
                let _ = self.elements.insert(selector.to_string(), nodes);
            }
            DomChange::Remove(selector) => {
                let _ = self.elements.remove(&selector.to_string());
            }
            DomChange::Hide(selector) => {
                if let Some(nodes) = self.elements.get_mut(&selector.to_string()) {
                    nodes.iter_mut().for_each(|n| n.visible = false);
                }
            }
            DomChange::Show(selector) => {
                if let Some(nodes) = self.elements.get_mut(&selector.to_string()) {
                    nodes.iter_mut().for_each(|n| {
                        n.visible = true;
                        n.reveal_at = None;
                    });
                }
            }
            DomChange::Network(snapshots) => self.network = snapshots.into(),
        }
    }

    fn matching(&self, selector: &Selector) -> Vec<MockElement> {
        let nodes = self
            .elements
            .get(&selector.without_last_nth().to_string())
            .cloned()
            .unwrap_or_default();
        match selector.last_nth() {
            Some(n) => nodes.into_iter().nth(n).into_iter().collect(),
            None => nodes,
        }
    }
}

/// Mock page driver for unit testing.
///
/// Nodes are keyed by the display form of their selector chain (without a
/// trailing index filter), so a test registers `wrapper >> li` once and both
/// `.first()` and `.nth(2)` resolve against it.
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    dom: Arc<Mutex<MockDom>>,
}

impl MockPage {
    /// Create an empty mock page
    #[must_use]
    pub fn new() -> Self {
        let page = Self::default();
        page.set_network(NetworkSnapshot::settled(0));
        page
    }

    fn with_dom<T>(&self, f: impl FnOnce(&mut MockDom) -> T) -> T {
        let mut dom = self
            .dom
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut dom)
    }

    /// Register nodes under a selector
    pub fn insert(&self, selector: &Selector, nodes: Vec<MockElement>) {
        self.with_dom(|dom| dom.apply(DomChange::Set(selector.clone(), nodes)));
    }

    /// Apply a change immediately
    pub fn apply(&self, change: DomChange) {
        self.with_dom(|dom| dom.apply(change));
    }

    /// Script what happens when the first node under `selector` is clicked
    pub fn on_click(&self, selector: &Selector, changes: Vec<DomChange>) {
        self.with_dom(|dom| {
            let _ = dom.on_click.insert(selector.to_string(), changes);
        });
    }

    /// Return this snapshot on every network poll
    pub fn set_network(&self, snapshot: NetworkSnapshot) {
        self.with_dom(|dom| dom.network = VecDeque::from([snapshot]));
    }

    /// Make the next navigation fail
    pub fn fail_navigation(&self, message: impl Into<String>) {
        let message = message.into();
        self.with_dom(|dom| dom.goto_failure = Some(message));
    }

    /// Commit navigations only after `delay`
    pub fn delay_navigation(&self, delay: Duration) {
        self.with_dom(|dom| dom.goto_delay = delay);
    }

    /// Make every query under `selector` fail with a driver error
    pub fn fail_queries(&self, selector: &Selector, message: impl Into<String>) {
        let message = message.into();
        self.with_dom(|dom| {
            let _ = dom.query_failures.insert(selector.to_string(), message);
        });
    }

    /// Calls made against this page, e.g. `goto:https://...`, `click:...`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.with_dom(|dom| dom.history.clone())
    }

    /// Check if a call with this prefix was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.with_dom(|dom| dom.history.iter().any(|c| c.starts_with(prefix)))
    }

    /// Number of calls with this prefix
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.with_dom(|dom| dom.history.iter().filter(|c| c.starts_with(prefix)).count())
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        let delay = self.with_dom(|dom| {
            dom.history.push(format!("goto:{url}"));
            dom.goto_delay
        });
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.with_dom(|dom| {
            if let Some(message) = dom.goto_failure.take() {
                return Err(ProbeError::NavigationError {
                    url: url.to_string(),
                    message,
                });
            }
            dom.url = url.to_string();
            Ok(())
        })
    }

    async fn query(&self, selector: &Selector) -> ProbeResult<Vec<ElementSnapshot>> {
        self.with_dom(|dom| {
            dom.history.push(format!("query:{selector}"));
            if let Some(message) = dom
                .query_failures
                .get(&selector.without_last_nth().to_string())
            {
                return Err(ProbeError::driver(message.clone()));
            }
            Ok(dom.matching(selector).iter().map(MockElement::snapshot).collect())
        })
    }

    async fn click(&self, selector: &Selector) -> ProbeResult<()> {
        self.with_dom(|dom| {
            dom.history.push(format!("click:{selector}"));
            if dom.matching(selector).is_empty() {
                return Err(ProbeError::driver(format!("no element matches `{selector}`")));
            }
            let changes = dom
                .on_click
                .get(&selector.to_string())
                .or_else(|| dom.on_click.get(&selector.without_last_nth().to_string()))
                .cloned()
                .unwrap_or_default();
            for change in changes {
                dom.apply(change);
            }
            Ok(())
        })
    }

    async fn network(&self) -> ProbeResult<NetworkSnapshot> {
        self.with_dom(|dom| {
            let snapshot = if dom.network.len() > 1 {
                dom.network.pop_front()
            } else {
                dom.network.front().copied()
            };
            Ok(snapshot.unwrap_or_default())
        })
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.with_dom(|dom| {
            dom.history.push("url".to_string());
            dom.url.clone()
        }))
    }

    async fn close(&self) -> ProbeResult<()> {
        self.with_dom(|dom| dom.history.push("close".to_string()));
        Ok(())
    }
}

/// Factory handing out pre-built mock pages in order
#[derive(Debug, Default)]
pub struct MockPageFactory {
    pages: Mutex<VecDeque<MockPage>>,
}

impl MockPageFactory {
    /// Create a factory that serves these pages
    #[must_use]
    pub fn new(pages: Vec<MockPage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
        }
    }
}

#[async_trait]
impl PageFactory for MockPageFactory {
    async fn open_page(&self) -> ProbeResult<Arc<dyn PageDriver>> {
        let page = self
            .pages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| ProbeError::PageError {
                message: "mock factory has no pages left".to_string(),
            })?;
        Ok(Arc::new(page))
    }
}
