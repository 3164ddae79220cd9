//! widget-probe: page objects and end-to-end scenarios for the support widget
//! embedded on uchi.ru.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      widget-probe                                │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐    ┌────────────┐    ┌────────────┐              │
//! │  │ Scenarios  │───►│ WidgetPage │───►│ Locator +  │              │
//! │  │ (steps)    │    │ (page obj) │    │ waits      │              │
//! │  └────────────┘    └────────────┘    └─────┬──────┘              │
//! │                                            ▼                     │
//! │                            ┌──────────────────────────┐          │
//! │                            │ PageDriver               │          │
//! │                            │  CdpPage  │  MockPage    │          │
//! │                            └──────────────────────────┘          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scenarios never touch selectors: everything goes through [`WidgetPage`],
//! whose locators re-resolve against the live page on every call.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod article;
mod assertion;
#[cfg(feature = "browser")]
mod browser;
mod config;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
mod driver;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod locator;
mod page_object;
mod result;
#[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
mod scenario;
pub mod selectors;
#[allow(clippy::missing_errors_doc)]
mod wait;
#[allow(clippy::missing_errors_doc)]
mod widget;

pub use article::{validate_title, Article, TITLE_ALLOW_LIST};
pub use assertion::Expect;
#[cfg(feature = "browser")]
pub use browser::{Browser, CdpPage};
pub use config::{BrowserSettings, SuiteConfig, Timeouts, DEFAULT_BASE_URL, DEFAULT_CONTACT_TITLE};
pub use driver::{
    DomChange, ElementSnapshot, MockElement, MockPage, MockPageFactory, NetworkSnapshot,
    PageDriver, PageFactory, ReadyState,
};
pub use locator::{Locator, Segment, Selector};
pub use page_object::{url_matches, PageObject};
pub use result::{AssertionFailure, AssertionKind, ProbeError, ProbeResult};
pub use scenario::{
    dismiss_cookie_dialog, prepare_page, run_scenario, run_suite, CookieDialog, Outcome,
    RunOptions, Scenario, ScenarioContext, ScenarioFailure, ScenarioReport, StepRecord,
    SuiteReport,
};
pub use wait::{
    poll_until, wait_for_load_state, ElementState, LoadState, WaitPolicy,
    DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, NETWORK_IDLE_THRESHOLD_MS,
};
pub use widget::WidgetPage;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::assertion::*;
    #[cfg(feature = "browser")]
    pub use super::browser::*;
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::locator::*;
    pub use super::page_object::*;
    pub use super::result::*;
    pub use super::scenario::*;
    pub use super::wait::*;
    pub use super::widget::*;
}
