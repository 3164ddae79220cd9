//! Popular-article titles and their allow-list.

use crate::assertion::Expect;
use crate::result::{AssertionFailure, AssertionKind};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// ASCII word characters, Cyrillic letters, whitespace, and `- ? ! , .`
///
/// `\w` is spelled out as `0-9a-z_` so non-ASCII Latin letters (often a sign
/// of a mis-decoded page) are rejected.
pub const TITLE_ALLOW_LIST: &str = r"(?i)^[0-9a-z_а-яё\s\-?!,.]+$";

fn allow_list() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TITLE_ALLOW_LIST).expect("title allow-list is a valid regex"))
}

/// An article as seen in the list at one moment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    /// Zero-based position in the list
    pub index: usize,
    /// Visible title text
    pub title: String,
}

impl Article {
    /// Create from list position and raw inner text
    #[must_use]
    pub fn new(index: usize, title: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
        }
    }

    /// One-based label used in failure messages
    #[must_use]
    pub fn label(&self) -> String {
        format!("article #{}", self.index + 1)
    }

    /// Title must be non-empty and only contain allow-listed characters
    pub fn validate(&self) -> Result<(), AssertionFailure> {
        validate_title(&self.title, &self.label())
    }
}

/// Check a title against the allow-list
pub fn validate_title(title: &str, label: &str) -> Result<(), AssertionFailure> {
    Expect::not_empty(title, &format!("{label} title must not be empty"))?;
    if allow_list().is_match(title) {
        Ok(())
    } else {
        let offending: String = title
            .chars()
            .filter(|c| !allow_list().is_match(&c.to_string()))
            .collect();
        Err(AssertionFailure::new(
            AssertionKind::PatternMismatch,
            format!("{label} title {title:?} contains disallowed characters {offending:?}"),
        ))
    }
}
