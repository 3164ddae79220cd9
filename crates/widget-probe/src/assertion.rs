//! Assertions for scenario validation.
//!
//! Locator expectations retry until their budget runs out, like Playwright's
//! `expect(locator)`, and then fail with an [`AssertionFailure`] rather than a
//! timeout: the wait was the assertion. Value expectations check once.

use crate::locator::Locator;
use crate::result::{AssertionFailure, AssertionKind, ProbeError, ProbeResult};
use crate::wait::poll_until;
use regex::Regex;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Probe {
    Visible,
    Enabled,
}

impl Probe {
    const fn condition(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Enabled => "enabled",
        }
    }

    const fn kind(self) -> AssertionKind {
        match self {
            Self::Visible => AssertionKind::NotVisible,
            Self::Enabled => AssertionKind::NotEnabled,
        }
    }
}

/// Assertion helpers for scenarios
#[derive(Debug)]
pub struct Expect;

impl Expect {
    async fn retry(locator: &Locator, timeout: Duration, probe: Probe, message: &str) -> ProbeResult<()> {
        let label = locator.selector().to_string();
        let poll = locator.policy().poll_interval;
        let outcome = poll_until(&label, probe.condition(), timeout, poll, || async move {
            let holds = match probe {
                Probe::Visible => locator.is_visible().await?,
                Probe::Enabled => locator.is_enabled().await?,
            };
            Ok(holds.then_some(()))
        })
        .await;
        match outcome {
            Err(ProbeError::Timeout { timeout_ms, .. }) => Err(AssertionFailure::new(
                probe.kind(),
                format!(
                    "{message}: `{label}` was not {} within {timeout_ms}ms",
                    probe.condition()
                ),
            )
            .into()),
            other => other,
        }
    }

    /// The locator's first match becomes visible within `timeout`
    pub async fn to_be_visible(locator: &Locator, timeout: Duration, message: &str) -> ProbeResult<()> {
        Self::retry(locator, timeout, Probe::Visible, message).await
    }

    /// The locator's first match becomes enabled within `timeout`
    pub async fn to_be_enabled(locator: &Locator, timeout: Duration, message: &str) -> ProbeResult<()> {
        Self::retry(locator, timeout, Probe::Enabled, message).await
    }

    /// The locator matches at least `min` nodes within `timeout`
    pub async fn to_have_count_at_least(
        locator: &Locator,
        min: usize,
        timeout: Duration,
        message: &str,
    ) -> ProbeResult<()> {
        let label = locator.selector().to_string();
        let poll = locator.policy().poll_interval;
        let outcome = poll_until(&label, "counted", timeout, poll, || async move {
            let count = locator.count().await?;
            Ok((count >= min).then_some(()))
        })
        .await;
        match outcome {
            Err(ProbeError::Timeout { .. }) => {
                let actual = locator.count().await?;
                Err(AssertionFailure::new(
                    AssertionKind::CountTooLow,
                    format!("{message}: expected at least {min} matches for `{label}`, found {actual}"),
                )
                .into())
            }
            other => other,
        }
    }

    /// A count meets a minimum
    pub fn count_at_least(actual: usize, min: usize, message: &str) -> Result<(), AssertionFailure> {
        if actual >= min {
            Ok(())
        } else {
            Err(AssertionFailure::new(
                AssertionKind::CountTooLow,
                format!("{message}: expected at least {min}, found {actual}"),
            ))
        }
    }

    /// Two texts are equal
    pub fn text_eq(actual: &str, expected: &str, message: &str) -> Result<(), AssertionFailure> {
        if actual == expected {
            Ok(())
        } else {
            Err(AssertionFailure::new(
                AssertionKind::TextMismatch,
                format!("{message}: expected {expected:?}, got {actual:?}"),
            ))
        }
    }

    /// A text matches a pattern
    pub fn text_matches(actual: &str, pattern: &Regex, message: &str) -> Result<(), AssertionFailure> {
        if pattern.is_match(actual) {
            Ok(())
        } else {
            Err(AssertionFailure::new(
                AssertionKind::PatternMismatch,
                format!("{message}: {actual:?} does not match /{}/", pattern.as_str()),
            ))
        }
    }

    /// A text is not blank
    pub fn not_empty(actual: &str, message: &str) -> Result<(), AssertionFailure> {
        if actual.trim().is_empty() {
            Err(AssertionFailure::new(AssertionKind::EmptyText, message.to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockElement, MockPage, PageDriver};
    use crate::wait::WaitPolicy;
    use std::sync::Arc;

    fn locator(page: &MockPage) -> Locator {
        let driver: Arc<dyn PageDriver> = Arc::new(page.clone());
        let policy = WaitPolicy {
            poll_interval: Duration::from_millis(5),
            action_timeout: Duration::from_millis(50),
            network_quiet: Duration::ZERO,
        };
        Locator::new(driver, "li", policy)
    }

    fn kind(err: ProbeError) -> AssertionKind {
        match err {
            ProbeError::Assertion(failure) => failure.kind,
            other => panic!("expected assertion, got {other}"),
        }
    }

    mod locator_expectations {
        use super::*;

        #[tokio::test]
        async fn test_visible_passes_after_reveal() {
            let page = MockPage::new();
            let li = locator(&page);
            page.insert(
                li.selector(),
                vec![MockElement::visible("a").revealed_after(Duration::from_millis(15))],
            );
            Expect::to_be_visible(&li, Duration::from_millis(300), "item shows")
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_not_visible_is_assertion_not_timeout() {
            let page = MockPage::new();
            let li = locator(&page);
            page.insert(li.selector(), vec![MockElement::hidden("a")]);
            let err = Expect::to_be_visible(&li, Duration::from_millis(20), "item shows")
                .await
                .unwrap_err();
            assert_eq!(kind(err), AssertionKind::NotVisible);
        }

        #[tokio::test]
        async fn test_not_enabled() {
            let page = MockPage::new();
            let li = locator(&page);
            page.insert(li.selector(), vec![MockElement::visible("a").disabled()]);
            let err = Expect::to_be_enabled(&li, Duration::from_millis(20), "clickable")
                .await
                .unwrap_err();
            assert_eq!(kind(err), AssertionKind::NotEnabled);
        }

        #[tokio::test]
        async fn test_count_message_cites_minimum() {
            let page = MockPage::new();
            let li = locator(&page);
            page.insert(li.selector(), vec![MockElement::visible("a")]);
            let err = Expect::to_have_count_at_least(&li, 3, Duration::from_millis(20), "articles")
                .await
                .unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("at least 3"));
            assert!(msg.contains("found 1"));
        }
    }

    mod value_expectations {
        use super::*;

        #[test]
        fn test_text_eq() {
            assert!(Expect::text_eq("a", "a", "same").is_ok());
            let failure = Expect::text_eq("a", "b", "title").unwrap_err();
            assert_eq!(failure.kind, AssertionKind::TextMismatch);
        }

        #[test]
        fn test_text_matches() {
            let re = Regex::new("(?i)связь").unwrap();
            assert!(Expect::text_matches("Связь с поддержкой", &re, "title").is_ok());
            let failure = Expect::text_matches("Статьи", &re, "title").unwrap_err();
            assert_eq!(failure.kind, AssertionKind::PatternMismatch);
        }

        #[test]
        fn test_not_empty() {
            assert!(Expect::not_empty("x", "t").is_ok());
            assert_eq!(
                Expect::not_empty(" \n", "t").unwrap_err().kind,
                AssertionKind::EmptyText
            );
        }

        #[test]
        fn test_count_at_least() {
            assert!(Expect::count_at_least(3, 3, "n").is_ok());
            assert_eq!(
                Expect::count_at_least(0, 1, "n").unwrap_err().kind,
                AssertionKind::CountTooLow
            );
        }
    }
}
