//! Named user journeys over the widget, and the runner that executes them.
//!
//! Every scenario gets its own page from a [`PageFactory`], navigates to the
//! target, clears the cookie banner and then runs its steps. A step failure
//! ends the scenario and is reported with the step's name.

use crate::article::Article;
use crate::assertion::Expect;
use crate::config::SuiteConfig;
use crate::driver::{PageDriver, PageFactory};
use crate::locator::Locator;
use crate::page_object::PageObject;
use crate::result::{AssertionFailure, AssertionKind, ProbeError, ProbeResult};
use crate::wait::{wait_for_load_state, ElementState, LoadState};
use crate::widget::WidgetPage;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// PAGE PREPARATION
// =============================================================================

/// What happened to the cookie consent dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieDialog {
    /// The dialog showed up and was accepted
    Dismissed,
    /// The dialog never showed up
    Absent,
}

/// Accept the cookie dialog if it shows within half the visibility budget.
///
/// Only a timeout waiting for the button counts as "absent"; any other
/// failure, including the dialog refusing to go away, is returned.
pub async fn dismiss_cookie_dialog(
    driver: &Arc<dyn PageDriver>,
    config: &SuiteConfig,
) -> ProbeResult<CookieDialog> {
    let timeouts = &config.timeouts;
    let button = Locator::new(
        Arc::clone(driver),
        config.cookie_button_selector.as_str(),
        timeouts.policy(),
    )
    .first();

    match button
        .wait_for(ElementState::Visible, timeouts.element_visible() / 2)
        .await
    {
        Ok(()) => {}
        Err(e) if e.is_timeout() => {
            info!(selector = %config.cookie_button_selector, "cookie dialog not shown");
            return Ok(CookieDialog::Absent);
        }
        Err(e) => return Err(e),
    }

    button.click().await?;
    button
        .wait_for(ElementState::Hidden, timeouts.element_hidden())
        .await?;
    info!("cookie dialog dismissed");
    Ok(CookieDialog::Dismissed)
}

/// Navigate to the base URL, wait for `DOMContentLoaded` and clear the
/// cookie dialog
pub async fn prepare_page(
    driver: &Arc<dyn PageDriver>,
    config: &SuiteConfig,
) -> ProbeResult<CookieDialog> {
    let url = config.base_url.as_str();
    let budget = config.timeouts.navigation();
    debug!(url, ?budget, "navigating");

    let start = Instant::now();
    tokio::time::timeout(budget, driver.goto(url))
        .await
        .map_err(|_| ProbeError::NavigationError {
            url: url.to_string(),
            message: format!("document not committed within {}ms", millis(budget)),
        })??;

    wait_for_load_state(
        driver.as_ref(),
        LoadState::DomContentLoaded,
        budget.saturating_sub(start.elapsed()),
        &config.timeouts.policy(),
    )
    .await
    .map_err(|e| ProbeError::NavigationError {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    dismiss_cookie_dialog(driver, config).await
}

// =============================================================================
// STEPS
// =============================================================================

/// A scenario step that failed
#[derive(Debug, thiserror::Error)]
#[error("{scenario}: step `{step}` failed: {error}")]
pub struct ScenarioFailure {
    /// Scenario name
    pub scenario: &'static str,
    /// Step name
    pub step: &'static str,
    /// Underlying cause
    #[source]
    pub error: ProbeError,
}

/// Timing and outcome of one executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Step name
    pub name: &'static str,
    /// Wall time spent in the step
    pub duration_ms: u64,
    /// Whether the step succeeded
    pub passed: bool,
}

/// Collects step records while a scenario runs
#[derive(Debug)]
pub struct ScenarioContext {
    scenario: &'static str,
    steps: Vec<StepRecord>,
}

impl ScenarioContext {
    /// Start recording for a scenario
    #[must_use]
    pub const fn new(scenario: &'static str) -> Self {
        Self {
            scenario,
            steps: Vec::new(),
        }
    }

    /// Run one named step, recording how long it took and whether it passed
    pub async fn step<T, F>(&mut self, name: &'static str, fut: F) -> Result<T, ScenarioFailure>
    where
        F: Future<Output = ProbeResult<T>>,
    {
        let start = Instant::now();
        let outcome = fut.await;
        let duration_ms = millis(start.elapsed());
        self.steps.push(StepRecord {
            name,
            duration_ms,
            passed: outcome.is_ok(),
        });
        match outcome {
            Ok(value) => {
                debug!(scenario = self.scenario, step = name, duration_ms, "step passed");
                Ok(value)
            }
            Err(error) => {
                warn!(scenario = self.scenario, step = name, %error, "step failed");
                Err(ScenarioFailure {
                    scenario: self.scenario,
                    step: name,
                    error,
                })
            }
        }
    }

    /// Steps recorded so far
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }
}

// =============================================================================
// SCENARIOS
// =============================================================================

/// The user journeys the suite knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Opening the widget shows its body
    WidgetOpens,
    /// Popular articles are present, readable and navigable
    PopularArticlesHaveValidContent,
    /// The contact form shows the support title
    ContactFormShowsSupportTitle,
}

impl Scenario {
    /// All scenarios in execution order
    pub const ALL: [Self; 3] = [
        Self::WidgetOpens,
        Self::PopularArticlesHaveValidContent,
        Self::ContactFormShowsSupportTitle,
    ];

    /// Stable name used for filtering and reports
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WidgetOpens => "widget_opens",
            Self::PopularArticlesHaveValidContent => "popular_articles_have_valid_content",
            Self::ContactFormShowsSupportTitle => "contact_form_shows_support_title",
        }
    }

    /// One-line description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::WidgetOpens => "opening the widget shows the widget body",
            Self::PopularArticlesHaveValidContent => {
                "popular articles are listed, titled, openable, and the list comes back"
            }
            Self::ContactFormShowsSupportTitle => {
                "\"write to us\" opens the contact form with the support title"
            }
        }
    }

    /// Case-insensitive substring match on the name
    #[must_use]
    pub fn matches(self, filter: &str) -> bool {
        self.name().contains(&filter.to_lowercase())
    }

    /// Scenarios whose names match `filter`, or all of them
    #[must_use]
    pub fn select(filter: Option<&str>) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|s| filter.map_or(true, |f| s.matches(f)))
            .collect()
    }

    async fn execute(
        self,
        widget: &WidgetPage,
        config: &SuiteConfig,
        ctx: &mut ScenarioContext,
    ) -> Result<(), ScenarioFailure> {
        match self {
            Self::WidgetOpens => widget_opens(widget, config, ctx).await,
            Self::PopularArticlesHaveValidContent => popular_articles(widget, config, ctx).await,
            Self::ContactFormShowsSupportTitle => contact_form(widget, config, ctx).await,
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

async fn widget_opens(
    widget: &WidgetPage,
    config: &SuiteConfig,
    ctx: &mut ScenarioContext,
) -> Result<(), ScenarioFailure> {
    ctx.step("open widget", widget.open_widget()).await?;
    let body = widget.widget_body();
    ctx.step(
        "widget body visible",
        Expect::to_be_visible(&body, config.timeouts.assertion(), "widget body"),
    )
    .await
}

async fn popular_articles(
    widget: &WidgetPage,
    config: &SuiteConfig,
    ctx: &mut ScenarioContext,
) -> Result<(), ScenarioFailure> {
    let timeouts = &config.timeouts;
    ctx.step("open widget", widget.open_widget()).await?;
    let handles = ctx
        .step("list popular articles", widget.popular_articles())
        .await?;

    ctx.step(
        "article count",
        Expect::to_have_count_at_least(
            widget.popular_articles_locator(),
            config.min_articles,
            timeouts.assertion(),
            "popular articles",
        ),
    )
    .await?;

    let titles = ctx
        .step("article titles valid", async {
            let mut titles = Vec::with_capacity(handles.len());
            for (index, handle) in handles.iter().enumerate() {
                let label = format!("article #{}", index + 1);
                Expect::to_be_visible(handle, timeouts.element_visible(), &label).await?;
                Expect::to_be_enabled(handle, timeouts.element_visible(), &label).await?;
                let article = Article::new(index, handle.inner_text().await?);
                article.validate()?;
                titles.push(article.title);
            }
            Ok::<_, ProbeError>(titles)
        })
        .await?;

    ctx.step("titles stable across reads", async {
        let again: Vec<String> = widget
            .popular_article_titles()
            .await?
            .into_iter()
            .map(|a| a.title)
            .collect();
        if again != titles {
            return Err(AssertionFailure::new(
                AssertionKind::TextMismatch,
                format!("popular articles changed between reads: {titles:?} then {again:?}"),
            )
            .into());
        }
        Ok::<_, ProbeError>(())
    })
    .await?;

    let first_title = titles.first().cloned().unwrap_or_default();

    ctx.step("open first article", widget.open_first_article())
        .await?;
    ctx.step(
        "article content visible",
        Expect::to_be_visible(widget.article_content(), timeouts.content_load(), "article content"),
    )
    .await?;
    ctx.step("article title matches list", async {
        let active = widget.active_article_title().await?;
        Expect::text_eq(&active, first_title.trim(), "active article title")?;
        Ok::<_, ProbeError>(())
    })
    .await?;

    ctx.step("back to list", widget.go_back_to_articles_list())
        .await?;
    ctx.step("list restored", async {
        let first = widget.popular_articles_locator().first();
        Expect::to_be_visible(&first, timeouts.element_visible(), "first article after going back")
            .await?;
        let text = first.inner_text().await?;
        Expect::text_eq(&text, &first_title, "first article after going back")?;
        Ok::<_, ProbeError>(())
    })
    .await
}

async fn contact_form(
    widget: &WidgetPage,
    config: &SuiteConfig,
    ctx: &mut ScenarioContext,
) -> Result<(), ScenarioFailure> {
    ctx.step("open widget", widget.open_widget()).await?;
    ctx.step("articles loaded", async {
        let count = widget.popular_articles().await?.len();
        Expect::count_at_least(count, 1, "popular articles")?;
        Ok::<_, ProbeError>(())
    })
    .await?;
    ctx.step("open first article", widget.open_first_article())
        .await?;
    ctx.step("open contact form", widget.open_contact_form())
        .await?;
    ctx.step("contact form title", async {
        let pattern = config.contact_title()?;
        let title = widget.title().await?.to_lowercase();
        Expect::text_matches(&title, &pattern, "contact form header")?;
        Ok::<_, ProbeError>(())
    })
    .await
}

// =============================================================================
// REPORTS
// =============================================================================

/// Final state of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Every step passed
    Passed,
    /// A step failed
    Failed,
    /// Not run because an earlier scenario failed under fail-fast
    Skipped,
}

/// Result of one scenario, as printed by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: &'static str,
    /// Final state
    pub outcome: Outcome,
    /// Wall time
    pub duration_ms: u64,
    /// Steps in execution order
    pub steps: Vec<StepRecord>,
    /// Name of the failed step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<&'static str>,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScenarioReport {
    fn finished(ctx: ScenarioContext, outcome: Result<(), ScenarioFailure>, elapsed: Duration) -> Self {
        let (outcome, failed_step, error) = match outcome {
            Ok(()) => (Outcome::Passed, None, None),
            Err(failure) => (
                Outcome::Failed,
                Some(failure.step),
                Some(failure.error.to_string()),
            ),
        };
        Self {
            name: ctx.scenario,
            outcome,
            duration_ms: millis(elapsed),
            steps: ctx.steps,
            failed_step,
            error,
        }
    }

    fn skipped(scenario: Scenario) -> Self {
        Self {
            name: scenario.name(),
            outcome: Outcome::Skipped,
            duration_ms: 0,
            steps: Vec::new(),
            failed_step: None,
            error: None,
        }
    }

    /// Whether the scenario passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }
}

/// Results of a whole suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// Per-scenario results in registry order
    pub scenarios: Vec<ScenarioReport>,
    /// Wall time
    pub duration_ms: u64,
}

impl SuiteReport {
    fn count(&self, outcome: Outcome) -> usize {
        self.scenarios.iter().filter(|s| s.outcome == outcome).count()
    }

    /// Number passed
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(Outcome::Passed)
    }

    /// Number failed
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }

    /// Number skipped
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    /// True when nothing failed
    #[must_use]
    pub fn success(&self) -> bool {
        self.failed() == 0
    }
}

// =============================================================================
// RUNNER
// =============================================================================

/// How a suite is scheduled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Only run scenarios whose name contains this
    pub filter: Option<String>,
    /// Scenarios allowed in flight at once
    pub jobs: usize,
    /// Skip remaining scenarios after the first failure
    pub fail_fast: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            filter: None,
            jobs: 1,
            fail_fast: false,
        }
    }
}

/// Log where navigation actually landed against the page object's pattern
async fn check_landing(widget: &WidgetPage) -> ProbeResult<String> {
    let url = widget.driver().current_url().await?;
    if widget.matches_url(&url) {
        debug!(page = widget.page_name(), %url, "landed on expected page");
    } else {
        warn!(
            page = widget.page_name(),
            pattern = widget.url_pattern(),
            %url,
            "landed outside the expected URL pattern"
        );
    }
    Ok(url)
}

async fn drive(
    scenario: Scenario,
    driver: Arc<dyn PageDriver>,
    config: &SuiteConfig,
    ctx: &mut ScenarioContext,
) -> Result<(), ScenarioFailure> {
    let cookie = ctx.step("navigate", prepare_page(&driver, config)).await?;
    let widget = WidgetPage::new(driver, &config.timeouts);
    let url = ctx.step("landing page", check_landing(&widget)).await?;
    debug!(scenario = scenario.name(), page = widget.page_name(), %url, ?cookie, "page ready");
    scenario.execute(&widget, config, ctx).await
}

/// Run one scenario on a fresh page, closing the page afterwards
pub async fn run_scenario(
    scenario: Scenario,
    factory: &dyn PageFactory,
    config: &SuiteConfig,
) -> ScenarioReport {
    info!(scenario = scenario.name(), "starting");
    let start = Instant::now();
    let mut ctx = ScenarioContext::new(scenario.name());
    let outcome = match ctx.step("open page", factory.open_page()).await {
        Ok(driver) => {
            let outcome = drive(scenario, Arc::clone(&driver), config, &mut ctx).await;
            if let Err(error) = driver.close().await {
                warn!(scenario = scenario.name(), %error, "page did not close cleanly");
            }
            outcome
        }
        Err(failure) => Err(failure),
    };
    let report = ScenarioReport::finished(ctx, outcome, start.elapsed());
    info!(
        scenario = report.name,
        outcome = ?report.outcome,
        duration_ms = report.duration_ms,
        "finished"
    );
    report
}

/// Run the selected scenarios, up to `options.jobs` at a time
pub async fn run_suite(
    factory: &dyn PageFactory,
    config: &SuiteConfig,
    options: &RunOptions,
) -> SuiteReport {
    let start = Instant::now();
    let selected = Scenario::select(options.filter.as_deref());
    let stop = AtomicBool::new(false);
    let stop = &stop;
    let fail_fast = options.fail_fast;

    let scenarios = stream::iter(selected)
        .map(|scenario| async move {
            if stop.load(Ordering::SeqCst) {
                debug!(scenario = scenario.name(), "skipped after earlier failure");
                return ScenarioReport::skipped(scenario);
            }
            let report = run_scenario(scenario, factory, config).await;
            if fail_fast && !report.passed() {
                stop.store(true, Ordering::SeqCst);
            }
            report
        })
        .buffered(options.jobs.max(1))
        .collect::<Vec<_>>()
        .await;

    SuiteReport {
        scenarios,
        duration_ms: millis(start.elapsed()),
    }
}
