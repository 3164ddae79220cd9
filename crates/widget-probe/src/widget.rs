//! Page object for the embedded support widget.
//!
//! ```text
//! Closed ──open_widget──► List ──open_first_article──► Article
//!                          ▲                              │
//!                          └──go_back_to_articles_list────┘
//!                          List/Article ──open_contact_form──► ContactForm
//! ```
//!
//! Transitions only happen through these calls. A failed wait leaves the
//! page wherever it actually is and returns the error; nothing is retried.

use crate::article::Article;
use crate::config::Timeouts;
use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::page_object::PageObject;
use crate::result::ProbeResult;
use crate::selectors;
use crate::wait::{wait_for_load_state, ElementState, LoadState};
use std::sync::{Arc, OnceLock};
use tracing::instrument;

/// Semantic operations over the widget UI, bound to one page session.
///
/// Locators are built on first use and reused for the life of the object;
/// every operation still re-resolves them against the live page.
#[derive(Debug)]
pub struct WidgetPage {
    driver: Arc<dyn PageDriver>,
    timeouts: Timeouts,
    wrapper: Locator,
    open_button: OnceLock<Locator>,
    write_to_us_button: OnceLock<Locator>,
    header_text: OnceLock<Locator>,
    popular_articles: OnceLock<Locator>,
    article_content: OnceLock<Locator>,
    article_title: OnceLock<Locator>,
    back_button: OnceLock<Locator>,
}

impl WidgetPage {
    /// Bind a page object to a page session
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, timeouts: &Timeouts) -> Self {
        let wrapper = Locator::new(Arc::clone(&driver), selectors::WIDGET_WRAPPER, timeouts.policy());
        Self {
            driver,
            timeouts: timeouts.clone(),
            wrapper,
            open_button: OnceLock::new(),
            write_to_us_button: OnceLock::new(),
            header_text: OnceLock::new(),
            popular_articles: OnceLock::new(),
            article_content: OnceLock::new(),
            article_title: OnceLock::new(),
            back_button: OnceLock::new(),
        }
    }

    fn scoped<'a>(&'a self, cell: &'a OnceLock<Locator>, css: &str) -> &'a Locator {
        cell.get_or_init(|| self.wrapper.locator(css))
    }

    fn open_button(&self) -> &Locator {
        self.scoped(&self.open_button, selectors::BUTTON_OPEN)
    }

    fn write_to_us_button(&self) -> &Locator {
        self.scoped(&self.write_to_us_button, selectors::BUTTON_WRITE_TO_US)
    }

    fn header_text(&self) -> &Locator {
        self.scoped(&self.header_text, selectors::HEADER_TEXT)
    }

    fn article_title(&self) -> &Locator {
        self.scoped(&self.article_title, selectors::ARTICLE_TITLE)
    }

    fn back_button(&self) -> &Locator {
        self.scoped(&self.back_button, selectors::BUTTON_BACK)
    }

    /// Un-indexed locator over the popular articles list items
    pub fn popular_articles_locator(&self) -> &Locator {
        self.scoped(&self.popular_articles, selectors::ARTICLE_POPULAR_LIST_ITEM)
    }

    /// Content pane of the article view; no wait
    pub fn article_content(&self) -> &Locator {
        self.scoped(&self.article_content, selectors::ARTICLE_CONTENT)
    }

    /// Root content container of the widget; no wait
    #[must_use]
    pub fn widget_body(&self) -> Locator {
        Locator::new(
            Arc::clone(&self.driver),
            selectors::WIDGET_BODY,
            self.timeouts.policy(),
        )
    }

    /// Underlying page session
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    async fn wait_network_idle(&self) -> ProbeResult<()> {
        wait_for_load_state(
            self.driver.as_ref(),
            LoadState::NetworkIdle,
            self.timeouts.network_idle(),
            &self.timeouts.policy(),
        )
        .await
    }

    /// Click the open control, then wait for the network to settle
    #[instrument(level = "debug", skip(self))]
    pub async fn open_widget(&self) -> ProbeResult<()> {
        self.open_button()
            .click_within(self.timeouts.element_visible())
            .await?;
        self.wait_network_idle().await
    }

    /// Wait for the first article to show, then return a handle per item.
    ///
    /// Handles are lazy; calling again re-reads the live list.
    #[instrument(level = "debug", skip(self))]
    pub async fn popular_articles(&self) -> ProbeResult<Vec<Locator>> {
        let items = self.popular_articles_locator();
        items
            .first()
            .wait_for(ElementState::Visible, self.timeouts.element_visible())
            .await?;
        items.all().await
    }

    /// Current titles of the popular articles, in list order
    pub async fn popular_article_titles(&self) -> ProbeResult<Vec<Article>> {
        let mut articles = Vec::new();
        for (index, handle) in self.popular_articles().await?.iter().enumerate() {
            articles.push(Article::new(index, handle.inner_text().await?));
        }
        Ok(articles)
    }

    /// Click the first article and wait for its content to load
    #[instrument(level = "debug", skip(self))]
    pub async fn open_first_article(&self) -> ProbeResult<()> {
        self.popular_articles_locator()
            .first()
            .click_within(self.timeouts.element_visible())
            .await?;
        self.article_content()
            .wait_for(ElementState::Visible, self.timeouts.content_load())
            .await
    }

    /// Trimmed title of the article being shown
    #[instrument(level = "debug", skip(self))]
    pub async fn active_article_title(&self) -> ProbeResult<String> {
        let title = self.article_title();
        title
            .wait_for(ElementState::Visible, self.timeouts.element_visible())
            .await?;
        Ok(title.inner_text().await?.trim().to_string())
    }

    /// Leave the article view and wait for the list to be visible again
    #[instrument(level = "debug", skip(self))]
    pub async fn go_back_to_articles_list(&self) -> ProbeResult<()> {
        self.back_button()
            .click_within(self.timeouts.element_visible())
            .await?;
        self.popular_articles_locator()
            .first()
            .wait_for(ElementState::Visible, self.timeouts.element_visible())
            .await
    }

    /// Click "write to us" and wait for the network to settle
    #[instrument(level = "debug", skip(self))]
    pub async fn open_contact_form(&self) -> ProbeResult<()> {
        let button = self.write_to_us_button().first();
        button
            .wait_for(ElementState::Visible, self.timeouts.element_visible())
            .await?;
        button.click().await?;
        self.wait_network_idle().await
    }

    /// Same as [`Self::open_contact_form`]
    pub async fn click_write_to_us(&self) -> ProbeResult<()> {
        self.open_contact_form().await
    }

    /// Trimmed header text of the current widget view
    #[instrument(level = "debug", skip(self))]
    pub async fn title(&self) -> ProbeResult<String> {
        let header = self.header_text();
        header
            .wait_for(ElementState::Visible, self.timeouts.element_visible())
            .await?;
        Ok(header.inner_text().await?.trim().to_string())
    }
}

impl PageObject for WidgetPage {
    fn url_pattern(&self) -> &str {
        "/"
    }

    fn page_name(&self) -> &str {
        "WidgetPage"
    }
}

/// Scripted widget DOM for tests of the page object and scenarios
#[cfg(test)]
pub(crate) mod fixture {
    use crate::driver::{DomChange, MockElement, MockPage, NetworkSnapshot};
    use crate::locator::Selector;
    use crate::selectors;
    use std::time::Duration;

    pub const TITLES: [&str; 4] = [
        "Как начать заниматься?",
        "Оплата и тарифы",
        "Вход для родителей",
        "Олимпиады, конкурсы",
    ];

    pub fn scoped(css: &str) -> Selector {
        Selector::css(selectors::WIDGET_WRAPPER).child(css)
    }

    pub fn page_scoped(css: &str) -> Selector {
        Selector::css(css)
    }

    pub fn timeouts() -> crate::config::Timeouts {
        crate::config::Timeouts {
            navigation_ms: 200,
            network_idle_ms: 200,
            element_visible_ms: 100,
            element_hidden_ms: 100,
            content_load_ms: 150,
            assertion_ms: 150,
            action_ms: 100,
            poll_interval_ms: 5,
            network_quiet_ms: 10,
        }
    }

    /// A closed widget that behaves like the live one when driven
    pub fn widget(titles: &[&str]) -> MockPage {
        let page = MockPage::new();
        let items = scoped(selectors::ARTICLE_POPULAR_LIST_ITEM);
        let content = scoped(selectors::ARTICLE_CONTENT);
        let title = scoped(selectors::ARTICLE_TITLE);
        let header = scoped(selectors::HEADER_TEXT);
        let body = page_scoped(selectors::WIDGET_BODY);
        let first = titles.first().copied().unwrap_or_default();

        page.insert(&scoped(selectors::BUTTON_OPEN), vec![MockElement::visible("?")]);
        page.on_click(
            &scoped(selectors::BUTTON_OPEN),
            vec![
                DomChange::Set(body.clone(), vec![MockElement::visible("")]),
                DomChange::Set(
                    items.clone(),
                    titles
                        .iter()
                        .map(|t| MockElement::visible(*t).revealed_after(Duration::from_millis(10)))
                        .collect(),
                ),
                DomChange::Set(header.clone(), vec![MockElement::visible("Помощь")]),
                DomChange::Set(scoped(selectors::BUTTON_WRITE_TO_US), vec![MockElement::visible("Написать нам")]),
                DomChange::Network(vec![
                    NetworkSnapshot::busy(2, 30),
                    NetworkSnapshot::settled(34),
                ]),
            ],
        );
        page.on_click(
            &items,
            vec![
                DomChange::Hide(items.clone()),
                DomChange::Set(
                    content.clone(),
                    vec![MockElement::visible("Текст статьи").revealed_after(Duration::from_millis(20))],
                ),
                DomChange::Set(title.clone(), vec![MockElement::visible(format!("  {first} "))]),
                DomChange::Set(scoped(selectors::BUTTON_BACK), vec![MockElement::visible("<")]),
            ],
        );
        page.on_click(
            &scoped(selectors::BUTTON_BACK),
            vec![
                DomChange::Remove(content),
                DomChange::Remove(title),
                DomChange::Show(items),
            ],
        );
        page.on_click(
            &scoped(selectors::BUTTON_WRITE_TO_US),
            vec![
                DomChange::Set(header, vec![MockElement::visible(" Связь с поддержкой ")]),
                DomChange::Network(vec![NetworkSnapshot::busy(1, 40), NetworkSnapshot::settled(41)]),
            ],
        );
        page
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::fixture::{self, scoped, TITLES};
    use super::*;
    use crate::driver::{MockElement, MockPage};
    use crate::result::ProbeError;

    fn widget_page(page: &MockPage) -> WidgetPage {
        WidgetPage::new(Arc::new(page.clone()), &fixture::timeouts())
    }

    mod open_tests {
        use super::*;

        #[tokio::test]
        async fn test_open_widget_shows_body() {
            let page = fixture::widget(&TITLES);
            let widget = widget_page(&page);
            assert!(!widget.widget_body().is_visible().await.unwrap());
            widget.open_widget().await.unwrap();
            assert!(widget.widget_body().is_visible().await.unwrap());
            assert!(page.was_called(&format!("click:{}", scoped(selectors::BUTTON_OPEN).with_nth(0))));
        }

        #[tokio::test]
        async fn test_open_widget_times_out_without_control() {
            let page = MockPage::new();
            let widget = widget_page(&page);
            match widget.open_widget().await.unwrap_err() {
                ProbeError::Timeout {
                    selector,
                    timeout_ms,
                    ..
                } => {
                    assert!(selector.contains(selectors::BUTTON_OPEN));
                    assert_eq!(timeout_ms, 100);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_open_widget_times_out_on_busy_network() {
            let page = fixture::widget(&TITLES);
            page.on_click(
                &scoped(selectors::BUTTON_OPEN),
                vec![crate::driver::DomChange::Network(vec![
                    crate::driver::NetworkSnapshot::busy(5, 1),
                ])],
            );
            let widget = widget_page(&page);
            let err = widget.open_widget().await.unwrap_err();
            assert!(err.to_string().contains("networkidle"));
        }
    }

    mod article_tests {
        use super::*;

        #[tokio::test]
        async fn test_popular_articles_waits_and_returns_all() {
            let page = fixture::widget(&TITLES);
            let widget = widget_page(&page);
            widget.open_widget().await.unwrap();
            let handles = widget.popular_articles().await.unwrap();
            assert_eq!(handles.len(), 4);
            assert_eq!(handles[2].inner_text().await.unwrap(), TITLES[2]);
        }

        #[tokio::test]
        async fn test_popular_articles_times_out_when_closed() {
            let page = fixture::widget(&TITLES);
            let widget = widget_page(&page);
            assert!(widget.popular_articles().await.unwrap_err().is_timeout());
        }

        #[tokio::test]
        async fn test_titles_idempotent() {
            let page = fixture::widget(&TITLES);
            let widget = widget_page(&page);
            widget.open_widget().await.unwrap();
            let first = widget.popular_article_titles().await.unwrap();
            let second = widget.popular_article_titles().await.unwrap();
            assert_eq!(first, second);
        }

        #[tokio::test]
        async fn test_list_rerender_is_seen() {
            let page = fixture::widget(&TITLES);
            let widget = widget_page(&page);
            widget.open_widget().await.unwrap();
            let before = widget.popular_articles().await.unwrap();
            page.insert(
                &scoped(selectors::ARTICLE_POPULAR_LIST_ITEM),
                vec![MockElement::visible("Новая статья")],
            );
            assert_eq!(widget.popular_articles().await.unwrap().len(), 1);
            assert_eq!(before[0].inner_text().await.unwrap(), "Новая статья");
        }

        #[tokio::test]
        async fn test_open_article_round_trip() {
            let page = fixture::widget(&TITLES);
            let widget = widget_page(&page);
            widget.open_widget().await.unwrap();
            let first = widget.popular_articles().await.unwrap()[0].inner_text().await.unwrap();

            widget.open_first_article().await.unwrap();
            assert!(widget.article_content().is_visible().await.unwrap());
            assert_eq!(widget.active_article_title().await.unwrap(), first.trim());

            widget.go_back_to_articles_list().await.unwrap();
            let handles = widget.popular_articles().await.unwrap();
            assert!(handles[0].is_visible().await.unwrap());
            assert_eq!(handles[0].inner_text().await.unwrap(), first);
        }

        #[tokio::test]
        async fn test_slow_content_exceeds_content_budget() {
            let page = fixture::widget(&TITLES);
            page.on_click(
                &scoped(selectors::ARTICLE_POPULAR_LIST_ITEM),
                vec![crate::driver::DomChange::Set(
                    scoped(selectors::ARTICLE_CONTENT),
                    vec![MockElement::visible("x").revealed_after(std::time::Duration::from_secs(5))],
                )],
            );
            let widget = widget_page(&page);
            widget.open_widget().await.unwrap();
            match widget.open_first_article().await.unwrap_err() {
                ProbeError::Timeout { timeout_ms, .. } => assert_eq!(timeout_ms, 150),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    mod contact_form_tests {
        use super::*;

        #[tokio::test]
        async fn test_contact_form_title() {
            let page = fixture::widget(&TITLES);
            let widget = widget_page(&page);
            widget.open_widget().await.unwrap();
            assert_eq!(widget.title().await.unwrap(), "Помощь");
            widget.open_first_article().await.unwrap();
            widget.click_write_to_us().await.unwrap();
            assert_eq!(widget.title().await.unwrap(), "Связь с поддержкой");
        }
    }

    mod lazy_locator_tests {
        use super::*;

        #[tokio::test]
        async fn test_locators_built_once_results_never_cached() {
            let page = fixture::widget(&TITLES);
            let widget = widget_page(&page);
            let a: *const Locator = widget.popular_articles_locator();
            let b: *const Locator = widget.popular_articles_locator();
            assert_eq!(a, b);

            widget.open_widget().await.unwrap();
            let queries_before = page.call_count("query:");
            let _ = widget.popular_articles_locator().count().await.unwrap();
            let _ = widget.popular_articles_locator().count().await.unwrap();
            assert_eq!(page.call_count("query:"), queries_before + 2);
        }

        #[test]
        fn test_page_object_identity() {
            let page = MockPage::new();
            let widget = widget_page(&page);
            assert_eq!(widget.page_name(), "WidgetPage");
            assert!(widget.matches_url("https://uchi.ru/"));
        }
    }
}
