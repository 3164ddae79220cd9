//! Suite configuration
//!
//! Defaults match the live target. A YAML file may override any subset of
//! fields; the CLI applies flag and environment overrides on top.

use crate::result::{ProbeError, ProbeResult};
use crate::selectors;
use crate::wait::{WaitPolicy, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, NETWORK_IDLE_THRESHOLD_MS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default target page
pub const DEFAULT_BASE_URL: &str = "https://uchi.ru/";

/// Default header text of the contact form
pub const DEFAULT_CONTACT_TITLE: &str = "(?i)Связь с поддержкой";

/// Named wait budgets in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Initial navigation
    pub navigation_ms: u64,
    /// Network quiescence after opening the widget or the contact form
    pub network_idle_ms: u64,
    /// Generic element visibility
    pub element_visible_ms: u64,
    /// Element disappearance (cookie dialog)
    pub element_hidden_ms: u64,
    /// Article content, which may lazy-load
    pub content_load_ms: u64,
    /// Retrying assertions in scenarios
    pub assertion_ms: u64,
    /// Auto-wait budget for locator actions
    pub action_ms: u64,
    /// Interval between polls
    pub poll_interval_ms: u64,
    /// Quiet window that counts as network idle
    pub network_quiet_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 15_000,
            network_idle_ms: 5_000,
            element_visible_ms: 10_000,
            element_hidden_ms: 5_000,
            content_load_ms: 8_000,
            assertion_ms: 15_000,
            action_ms: DEFAULT_ACTION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            network_quiet_ms: NETWORK_IDLE_THRESHOLD_MS,
        }
    }
}

impl Timeouts {
    /// Navigation budget
    #[must_use]
    pub const fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    /// Network idle budget
    #[must_use]
    pub const fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }

    /// Element visible budget
    #[must_use]
    pub const fn element_visible(&self) -> Duration {
        Duration::from_millis(self.element_visible_ms)
    }

    /// Element hidden budget
    #[must_use]
    pub const fn element_hidden(&self) -> Duration {
        Duration::from_millis(self.element_hidden_ms)
    }

    /// Content load budget
    #[must_use]
    pub const fn content_load(&self) -> Duration {
        Duration::from_millis(self.content_load_ms)
    }

    /// Assertion budget
    #[must_use]
    pub const fn assertion(&self) -> Duration {
        Duration::from_millis(self.assertion_ms)
    }

    /// Polling and settling policy derived from these budgets
    #[must_use]
    pub const fn policy(&self) -> WaitPolicy {
        WaitPolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            action_timeout: Duration::from_millis(self.action_ms),
            network_quiet: Duration::from_millis(self.network_quiet_ms),
        }
    }

    fn named(&self) -> [(&'static str, u64); 7] {
        [
            ("navigation_ms", self.navigation_ms),
            ("network_idle_ms", self.network_idle_ms),
            ("element_visible_ms", self.element_visible_ms),
            ("element_hidden_ms", self.element_hidden_ms),
            ("content_load_ms", self.content_load_ms),
            ("assertion_ms", self.assertion_ms),
            ("action_ms", self.action_ms),
        ]
    }
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
        }
    }
}

/// Everything a suite run can be tuned with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Page the widget is embedded on
    pub base_url: String,
    /// Minimum number of popular articles
    pub min_articles: usize,
    /// Regex the contact-form header must match
    pub contact_title_pattern: String,
    /// Cookie consent button
    pub cookie_button_selector: String,
    /// Wait budgets
    pub timeouts: Timeouts,
    /// Browser launch settings
    pub browser: BrowserSettings,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            min_articles: 3,
            contact_title_pattern: DEFAULT_CONTACT_TITLE.to_string(),
            cookie_button_selector: selectors::COOKIE_BUTTON.to_string(),
            timeouts: Timeouts::default(),
            browser: BrowserSettings::default(),
        }
    }
}

impl SuiteConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML; missing fields keep their defaults
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set minimum article count
    #[must_use]
    pub const fn with_min_articles(mut self, min: usize) -> Self {
        self.min_articles = min;
        self
    }

    /// Set timeouts
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Compiled contact title pattern
    pub fn contact_title(&self) -> ProbeResult<Regex> {
        Regex::new(&self.contact_title_pattern).map_err(|e| {
            ProbeError::config(format!(
                "contact_title_pattern `{}` is not a valid regex: {e}",
                self.contact_title_pattern
            ))
        })
    }

    /// Reject configurations no run could pass with
    pub fn validate(&self) -> ProbeResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ProbeError::config("base_url must not be empty"));
        }
        if !selectors::is_well_formed(&self.cookie_button_selector) {
            return Err(ProbeError::config(format!(
                "cookie_button_selector `{}` is not a valid selector",
                self.cookie_button_selector
            )));
        }
        if let Some((name, _)) = self.timeouts.named().into_iter().find(|(_, ms)| *ms == 0) {
            return Err(ProbeError::config(format!("timeouts.{name} must be greater than 0")));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(ProbeError::config("timeouts.poll_interval_ms must be greater than 0"));
        }
        self.contact_title()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_target() {
        let config = SuiteConfig::default();
        assert_eq!(config.base_url, "https://uchi.ru/");
        assert_eq!(config.min_articles, 3);
        assert_eq!(config.timeouts.content_load_ms, 8_000);
        assert_eq!(config.timeouts.network_idle_ms, 5_000);
        assert_eq!(config.cookie_button_selector, "._UCHI_COOKIE__button");
        config.validate().unwrap();
    }

    #[test]
    fn test_contact_title_is_case_insensitive() {
        let re = SuiteConfig::default().contact_title().unwrap();
        assert!(re.is_match("связь с поддержкой"));
        assert!(re.is_match("СВЯЗЬ С ПОДДЕРЖКОЙ"));
        assert!(!re.is_match("популярные статьи"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "base_url: http://localhost:8080/\ntimeouts:\n  content_load_ms: 20000\n";
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/");
        assert_eq!(config.timeouts.content_load_ms, 20_000);
        assert_eq!(config.timeouts.network_idle_ms, 5_000);
        assert_eq!(config.min_articles, 3);
    }

    #[test]
    fn test_zero_budget_rejected() {
        let yaml = "timeouts:\n  assertion_ms: 0\n";
        let err = SuiteConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("timeouts.assertion_ms"));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let mut config = SuiteConfig::default();
        config.contact_title_pattern = "(unclosed".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let config = SuiteConfig::default().with_base_url("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_and_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_articles: 5\nbrowser:\n  headless: false").unwrap();
        let config = SuiteConfig::load(file.path()).unwrap();
        assert_eq!(config.min_articles, 5);
        assert!(!config.browser.headless);
        assert!(config.browser.sandbox);

        let again = SuiteConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_policy_from_timeouts() {
        let policy = Timeouts::default().policy();
        assert_eq!(policy.poll_interval, Duration::from_millis(50));
        assert_eq!(policy.network_quiet, Duration::from_millis(500));
    }
}
