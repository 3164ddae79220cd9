//! Real browser control over the Chrome `DevTools` Protocol.
//!
//! Queries and click targets are resolved by small scripts evaluated in the
//! page, so a selector chain is scoped exactly like a chained Playwright
//! locator. Clicks are dispatched as real mouse input at the element's centre.

#[allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_possible_truncation
)]
mod cdp {
    use crate::config::BrowserSettings;
    use crate::driver::{ElementSnapshot, NetworkSnapshot, PageDriver, PageFactory};
    use crate::locator::Selector;
    use crate::result::{ProbeError, ProbeResult};
    use crate::wait::DEFAULT_POLL_INTERVAL_MS;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
    use chromiumoxide::layout::Point;
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use serde::Deserialize;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Resolves a segment chain to the matched elements.
    const RESOLVE_JS: &str = r"(segments) => {
        let scope = [document];
        for (const seg of segments) {
            const found = [];
            for (const root of scope) {
                for (const el of root.querySelectorAll(seg.css)) {
                    if (!found.includes(el)) found.push(el);
                }
            }
            scope = seg.nth === null ? found : (found[seg.nth] ? [found[seg.nth]] : []);
        }
        return scope;
    }";

    /// Counts requests started by `fetch` and XHR that have not finished.
    const NETWORK_TRACKER_JS: &str = r"(() => {
        if (window.__widgetProbeNet) return;
        const net = { inFlight: 0 };
        window.__widgetProbeNet = net;
        const done = () => { net.inFlight = Math.max(0, net.inFlight - 1); };
        if (window.fetch) {
            const fetch = window.fetch;
            window.fetch = function (...args) {
                net.inFlight += 1;
                return fetch.apply(this, args).finally(done);
            };
        }
        const send = XMLHttpRequest.prototype.send;
        XMLHttpRequest.prototype.send = function (...args) {
            net.inFlight += 1;
            this.addEventListener('loadend', done, { once: true });
            return send.apply(this, args);
        };
    })()";

    /// Reports whether the document seen by the last navigation is still live.
    const NAVIGATION_STATE_JS: &str = r"(() => ({
        stale: window.__widgetProbeStale === true,
        url: location.href,
    }))()";

    const NETWORK_JS: &str = r"(() => ({
        readyState: document.readyState,
        inFlight: window.__widgetProbeNet ? window.__widgetProbeNet.inFlight : 0,
        resources: performance.getEntriesByType('resource').length,
    }))()";

    fn segments_json(selector: &Selector) -> ProbeResult<String> {
        Ok(serde_json::to_string(selector.segments())?)
    }

    pub(super) fn query_expression(selector: &Selector) -> ProbeResult<String> {
        Ok(format!(
            "(({RESOLVE_JS})({segments})).map((el) => {{
                const style = getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                return {{
                    visible: rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden',
                    enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
                    text: el.innerText ?? el.textContent ?? '',
                }};
            }})",
            segments = segments_json(selector)?
        ))
    }

    pub(super) fn click_point_expression(selector: &Selector) -> ProbeResult<String> {
        Ok(format!(
            "(() => {{
                const el = (({RESOLVE_JS})({segments}))[0];
                if (!el) return null;
                el.scrollIntoView({{ block: 'center', inline: 'center' }});
                const rect = el.getBoundingClientRect();
                return {{ x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 }};
            }})()",
            segments = segments_json(selector)?
        ))
    }

    /// Marks the current document as stale, then navigates once the
    /// evaluation has returned.
    pub(super) fn navigate_expression(url: &str) -> ProbeResult<String> {
        Ok(format!(
            "(() => {{
                window.__widgetProbeStale = true;
                setTimeout(() => location.assign({url}), 0);
                return true;
            }})()",
            url = serde_json::to_string(url)?
        ))
    }

    #[derive(Debug, Deserialize)]
    struct NavigationState {
        stale: bool,
        url: String,
    }

    #[derive(Debug, Deserialize)]
    struct ClickPoint {
        x: f64,
        y: f64,
    }

    /// Chromium instance with a live CDP connection
    #[derive(Debug)]
    pub struct Browser {
        inner: Arc<Mutex<CdpBrowser>>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch Chromium with the given settings
        pub async fn launch(settings: &BrowserSettings) -> ProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(settings.viewport_width, settings.viewport_height);

            if !settings.headless {
                builder = builder.with_head();
            }

            if !settings.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = settings.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| ProbeError::BrowserLaunchError { message })?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
                ProbeError::BrowserLaunchError {
                    message: e.to_string(),
                }
            })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        tracing::debug!(error = %e, "CDP handler stopped");
                        break;
                    }
                }
            });

            tracing::info!(
                headless = settings.headless,
                width = settings.viewport_width,
                height = settings.viewport_height,
                "browser launched"
            );

            Ok(Self {
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Open a blank page with the network tracker installed
        pub async fn new_page(&self) -> ProbeResult<CdpPage> {
            let browser = self.inner.lock().await;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| ProbeError::PageError {
                    message: e.to_string(),
                })?;
            page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
                NETWORK_TRACKER_JS,
            ))
            .await
            .map_err(|e| ProbeError::PageError {
                message: e.to_string(),
            })?;
            Ok(CdpPage {
                inner: Arc::new(Mutex::new(page)),
            })
        }

        /// Close the browser and stop the handler task
        pub async fn close(self) -> ProbeResult<()> {
            {
                let mut browser = self.inner.lock().await;
                let _ = browser
                    .close()
                    .await
                    .map_err(|e| ProbeError::BrowserLaunchError {
                        message: e.to_string(),
                    })?;
            }
            self.handle.abort();
            Ok(())
        }
    }

    #[async_trait]
    impl PageFactory for Browser {
        async fn open_page(&self) -> ProbeResult<Arc<dyn PageDriver>> {
            Ok(Arc::new(self.new_page().await?))
        }
    }

    /// A page driven over CDP
    #[derive(Debug, Clone)]
    pub struct CdpPage {
        inner: Arc<Mutex<Page>>,
    }

    impl CdpPage {
        async fn eval<T: DeserializeOwned>(&self, expression: String) -> ProbeResult<T> {
            let page = self.inner.lock().await;
            let result = page
                .evaluate(expression)
                .await
                .map_err(|e| ProbeError::driver(e.to_string()))?;
            result
                .into_value()
                .map_err(|e| ProbeError::driver(e.to_string()))
        }
    }

    #[async_trait]
    impl PageDriver for CdpPage {
        // `Page::goto` only resolves on the `load` event, so navigation is
        // started from script and only the document commit is awaited.
        async fn goto(&self, url: &str) -> ProbeResult<()> {
            let nav_error = |message: String| ProbeError::NavigationError {
                url: url.to_string(),
                message,
            };
            let _: bool = self
                .eval(navigate_expression(url)?)
                .await
                .map_err(|e| nav_error(e.to_string()))?;

            let poll = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
            loop {
                // Evaluation fails while the old context is torn down
                match self.eval::<NavigationState>(NAVIGATION_STATE_JS.to_string()).await {
                    Ok(state) if !state.stale => {
                        if state.url.starts_with("chrome-error://") {
                            return Err(nav_error("navigation failed".to_string()));
                        }
                        tracing::debug!(url = %state.url, "document committed");
                        return Ok(());
                    }
                    Ok(_) => {}
                    Err(e) => tracing::trace!(error = %e, "waiting for new document"),
                }
                tokio::time::sleep(poll).await;
            }
        }

        async fn query(&self, selector: &Selector) -> ProbeResult<Vec<ElementSnapshot>> {
            self.eval(query_expression(selector)?).await
        }

        async fn click(&self, selector: &Selector) -> ProbeResult<()> {
            let point: Option<ClickPoint> = self.eval(click_point_expression(selector)?).await?;
            let point = point
                .ok_or_else(|| ProbeError::driver(format!("no element matches `{selector}`")))?;
            let page = self.inner.lock().await;
            let _ = page
                .click(Point {
                    x: point.x,
                    y: point.y,
                })
                .await
                .map_err(|e| ProbeError::driver(e.to_string()))?;
            Ok(())
        }

        async fn network(&self) -> ProbeResult<NetworkSnapshot> {
            self.eval(NETWORK_JS.to_string()).await
        }

        async fn current_url(&self) -> ProbeResult<String> {
            let page = self.inner.lock().await;
            let url = page
                .url()
                .await
                .map_err(|e| ProbeError::driver(e.to_string()))?;
            Ok(url.unwrap_or_default())
        }

        async fn close(&self) -> ProbeResult<()> {
            let page = self.inner.lock().await.clone();
            page.close()
                .await
                .map_err(|e| ProbeError::PageError {
                    message: e.to_string(),
                })
        }
    }
}

pub use cdp::{Browser, CdpPage};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::cdp::{click_point_expression, navigate_expression, query_expression};
    use crate::locator::Selector;
    use crate::selectors;

    #[test]
    fn test_query_expression_embeds_segments() {
        let selector = Selector::css(selectors::WIDGET_WRAPPER)
            .child(selectors::ARTICLE_POPULAR_LIST_ITEM)
            .with_nth(1);
        let js = query_expression(&selector).unwrap();
        assert!(js.contains(r#""css":".sc-dino-typography-h > [class^=widget__]","nth":null"#));
        assert!(js.contains(r#""nth":1"#));
        assert!(js.contains("getBoundingClientRect"));
    }

    #[test]
    fn test_click_expression_quotes_selectors() {
        let selector = Selector::css("[data-test=\"open\"]");
        let js = click_point_expression(&selector).unwrap();
        assert!(js.contains(r#"[data-test=\"open\"]"#));
        assert!(js.contains("scrollIntoView"));
    }

    #[test]
    fn test_navigate_expression_defers_and_marks_stale() {
        let js = navigate_expression("https://uchi.ru/?q=\"x\"").unwrap();
        assert!(js.contains("__widgetProbeStale = true"));
        assert!(js.contains(r#"location.assign("https://uchi.ru/?q=\"x\"")"#));
        assert!(js.contains("setTimeout"));
    }
}
