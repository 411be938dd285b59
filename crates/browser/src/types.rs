//! Session configuration and feed request types.

use std::time::Duration;

use serde::Serialize;

use crate::node::Lookup;

/// Remote session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HTTP base URL of the DevTools endpoint (e.g. `http://127.0.0.1:9222`).
    pub endpoint: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub block_images: bool,
    pub user_agent: String,
    pub chrome_args: Vec<String>,
    pub connect_timeout: Duration,
    pub connect_attempts: u32,
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&medscout_config::BrowserConfig::default())
    }
}

impl From<&medscout_config::BrowserConfig> for SessionConfig {
    fn from(cfg: &medscout_config::BrowserConfig) -> Self {
        Self {
            endpoint: cfg.endpoint_url(),
            headless: cfg.headless,
            viewport_width: cfg.viewport_width,
            viewport_height: cfg.viewport_height,
            block_images: cfg.block_images,
            user_agent: cfg.user_agent.clone(),
            chrome_args: cfg.chrome_args.clone(),
            connect_timeout: Duration::from_millis(cfg.connect_timeout_ms),
            connect_attempts: cfg.connect_attempts.max(1),
            request_timeout: Duration::from_millis(cfg.navigation_timeout_ms),
        }
    }
}

/// Bounds for the scroll-until-stable loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPolicy {
    /// Maximum number of scrolls.
    pub budget: u32,
    /// Pause after each scroll before re-measuring.
    pub wait: Duration,
}

/// What the scroll loop observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollOutcome {
    /// Scrolls performed.
    pub iterations: u32,
    /// Rendered height after the last scroll.
    pub final_height: u64,
    /// Whether the height stopped growing before the budget ran out.
    pub stabilized: bool,
}

/// Everything needed to load one feed and capture its cards.
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub url: String,
    pub feed_selector: String,
    pub card_selector: String,
    pub lookups: Vec<Lookup>,
    pub scroll: ScrollPolicy,
    /// Delay after navigation for the page's scripts to run.
    pub settle: Duration,
    /// How long to wait for the feed container.
    pub feed_timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_follows_browser_config() {
        let cfg = medscout_config::BrowserConfig {
            host: "chrome".into(),
            port: 3000,
            connect_attempts: 0,
            ..Default::default()
        };
        let session = SessionConfig::from(&cfg);
        assert_eq!(session.endpoint, "http://chrome:3000");
        assert_eq!(session.connect_attempts, 1);
        assert_eq!(session.viewport_width, 1920);
    }
}
