//! Feed loading: navigate, wait for the result feed, scroll until its height
//! stops growing, then capture every card in one evaluation.

use {
    async_trait::async_trait,
    chromiumoxide::Page,
    serde_json::Value,
    tokio::time::{Duration, Instant, sleep},
    tracing::{debug, info},
};

use crate::{
    error::BrowserError,
    node::{CardSnapshot, Lookup},
    types::{FeedRequest, ScrollOutcome, ScrollPolicy},
};

/// Poll interval while waiting for the feed container.
const FEED_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captures `[{ index, values: { lookupKey: [match, ...] } }]` for every card.
const CAPTURE_CARDS_JS: &str = r#"
((cardSelector, lookups) => {
    const cards = Array.from(document.querySelectorAll(cardSelector));
    return cards.map((card, index) => {
        const values = {};
        for (const lookup of lookups) {
            let matches;
            try {
                matches = Array.from(card.querySelectorAll(lookup.selector));
            } catch (e) {
                values[lookup.key] = null;
                continue;
            }
            values[lookup.key] = matches.map((el) => {
                if (!lookup.attribute) {
                    return (el.innerText || el.textContent || '').trim();
                }
                if (lookup.attribute === 'href' && el.href) {
                    return String(el.href);
                }
                return el.getAttribute(lookup.attribute);
            });
        }
        return { index, values };
    });
})
"#;

/// The result of loading one feed.
#[derive(Debug, Clone)]
pub struct LoadedFeed {
    pub scroll: ScrollOutcome,
    pub cards: Vec<CardSnapshot>,
}

/// A container whose rendered height grows as it is scrolled.
#[async_trait]
pub trait ScrollableFeed: Send {
    /// Whether the container is in the document yet.
    async fn present(&mut self) -> Result<bool, BrowserError>;

    /// Current rendered height (`scrollHeight`).
    async fn height(&mut self) -> Result<u64, BrowserError>;

    /// Scroll the container to its current maximum extent.
    async fn scroll_to_end(&mut self) -> Result<(), BrowserError>;
}

/// Scroll until the height stops changing or `policy.budget` scrolls are spent.
///
/// Never performs more than `policy.budget` scrolls; a zero budget only
/// measures the initial height.
pub async fn stabilize<F>(feed: &mut F, policy: ScrollPolicy) -> Result<ScrollOutcome, BrowserError>
where
    F: ScrollableFeed + ?Sized,
{
    let mut last_height = feed.height().await?;
    let mut iterations = 0;
    let mut stabilized = false;

    while iterations < policy.budget {
        iterations += 1;
        feed.scroll_to_end().await?;
        sleep(policy.wait).await;

        let height = feed.height().await?;
        debug!(
            iteration = iterations,
            budget = policy.budget,
            height,
            "scrolled feed"
        );
        if height == last_height {
            stabilized = true;
            break;
        }
        last_height = height;
    }

    Ok(ScrollOutcome {
        iterations,
        final_height: last_height,
        stabilized,
    })
}

/// The feed container of a live page.
struct PageFeed<'a> {
    page: &'a Page,
    selector_js: String,
}

impl<'a> PageFeed<'a> {
    fn new(page: &'a Page, selector: &str) -> Result<Self, BrowserError> {
        Ok(Self {
            page,
            selector_js: js_string(selector)?,
        })
    }
}

#[async_trait]
impl ScrollableFeed for PageFeed<'_> {
    async fn present(&mut self) -> Result<bool, BrowserError> {
        let js = format!("document.querySelector({}) !== null", self.selector_js);
        evaluate(self.page, &js).await
    }

    async fn height(&mut self) -> Result<u64, BrowserError> {
        let js = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.scrollHeight : null; }})()",
            self.selector_js
        );
        let height: Option<u64> = evaluate(self.page, &js).await?;
        height.ok_or_else(|| BrowserError::JsEvalFailed("feed container disappeared".into()))
    }

    async fn scroll_to_end(&mut self) -> Result<(), BrowserError> {
        let js = format!(
            "(() => {{ const el = document.querySelector({}); if (el) el.scrollTop = el.scrollHeight; return !!el; }})()",
            self.selector_js
        );
        let found: bool = evaluate(self.page, &js).await?;
        if found {
            Ok(())
        } else {
            Err(BrowserError::JsEvalFailed("feed container disappeared".into()))
        }
    }
}

/// Navigate to `request.url` and capture the stabilized feed.
pub async fn load_feed(page: &Page, request: &FeedRequest) -> Result<LoadedFeed, BrowserError> {
    let started = Instant::now();

    page.goto(request.url.as_str())
        .await
        .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

    sleep(request.settle).await;

    let mut feed = PageFeed::new(page, &request.feed_selector)?;
    wait_for_feed(&mut feed, request.feed_timeout).await.map_err(|e| match e {
        BrowserError::Timeout(_) => BrowserError::Timeout(format!(
            "feed `{}` not found after {}ms",
            request.feed_selector,
            request.feed_timeout.as_millis()
        )),
        other => other,
    })?;

    let scroll = stabilize(&mut feed, request.scroll).await?;

    let cards = capture_cards(page, &request.card_selector, &request.lookups).await?;

    info!(
        url = %request.url,
        cards = cards.len(),
        scrolls = scroll.iterations,
        stabilized = scroll.stabilized,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "loaded result feed"
    );

    Ok(LoadedFeed { scroll, cards })
}

/// Poll until the feed container exists, failing with [`BrowserError::Timeout`].
///
/// A failed check counts as "not yet": the page may still be replacing its
/// document while it loads.
pub async fn wait_for_feed<F>(feed: &mut F, timeout: Duration) -> Result<(), BrowserError>
where
    F: ScrollableFeed + ?Sized,
{
    let deadline = Instant::now() + timeout;
    let mut polls = 0u32;

    loop {
        polls += 1;
        match feed.present().await {
            Ok(true) => return Ok(()),
            Ok(false) => {},
            Err(e) => debug!(poll = polls, error = %e, "feed presence check failed"),
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout(format!(
                "feed not found after {}ms ({polls} checks)",
                timeout.as_millis()
            )));
        }
        sleep(FEED_POLL_INTERVAL).await;
    }
}

/// Capture every card matching `card_selector`, in document order.
pub async fn capture_cards(
    page: &Page,
    card_selector: &str,
    lookups: &[Lookup],
) -> Result<Vec<CardSnapshot>, BrowserError> {
    let lookups_js =
        serde_json::to_string(lookups).map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?;
    let js = format!(
        "({CAPTURE_CARDS_JS})({}, {lookups_js})",
        js_string(card_selector)?
    );

    let raw: Value = evaluate(page, &js).await?;
    parse_cards(raw)
}

fn parse_cards(raw: Value) -> Result<Vec<CardSnapshot>, BrowserError> {
    serde_json::from_value(raw)
        .map_err(|e| BrowserError::JsEvalFailed(format!("unexpected card capture shape: {e}")))
}

async fn evaluate<T: serde::de::DeserializeOwned>(page: &Page, js: &str) -> Result<T, BrowserError> {
    page.evaluate(js)
        .await
        .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?
        .into_value()
        .map_err(|e| BrowserError::JsEvalFailed(format!("failed to get result: {e:?}")))
}

fn js_string(s: &str) -> Result<String, BrowserError> {
    serde_json::to_string(s).map_err(|e| BrowserError::JsEvalFailed(e.to_string()))
}
