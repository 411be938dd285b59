/// Config schema types (server, remote browser, discovery tuning, selectors).
use serde::{Deserialize, Serialize};

/// Default user agent presented to the search surface.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedscoutConfig {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub discovery: DiscoveryConfig,
    pub selectors: SelectorsConfig,
}

/// HTTP responder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

/// Remote browser (CDP endpoint) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Host of the remote DevTools endpoint.
    pub host: String,
    /// Port of the remote DevTools endpoint.
    pub port: u16,
    /// Whether the remote browser is expected to run headless.
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Block image requests to cut bandwidth while scrolling.
    pub block_images: bool,
    /// User agent override applied to every page.
    pub user_agent: String,
    /// Extra Chrome arguments, reported to the endpoint operator in logs.
    pub chrome_args: Vec<String>,
    /// Timeout for the endpoint handshake, per attempt.
    pub connect_timeout_ms: u64,
    /// How many times to try resolving the DevTools endpoint.
    pub connect_attempts: u32,
    /// CDP request timeout, which also bounds page navigation.
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9222,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            block_images: true,
            user_agent: DEFAULT_USER_AGENT.into(),
            chrome_args: Vec::new(),
            connect_timeout_ms: 10_000,
            connect_attempts: 3,
            navigation_timeout_ms: 30_000,
        }
    }
}

impl BrowserConfig {
    /// HTTP base URL of the DevTools endpoint.
    pub fn endpoint_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Discovery tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Base search URL; the encoded query is appended.
    pub search_url: String,
    /// Default number of scroll attempts per query variant.
    pub scroll_budget: u32,
    /// Default pause after each scroll, in seconds.
    pub wait_seconds: f64,
    /// Pause after navigation before looking for the feed, in seconds.
    pub settle_seconds: f64,
    /// How long to wait for the feed container to appear.
    pub feed_timeout_secs: u64,
    /// Capacity of the record channel between producer and responder.
    pub channel_capacity: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.google.com/maps/search/".into(),
            scroll_budget: 5,
            wait_seconds: 2.0,
            settle_seconds: 5.0,
            feed_timeout_secs: 15,
            channel_capacity: 16,
        }
    }
}

/// CSS selectors binding the extractor to the rendered result feed.
///
/// These track the search surface's current markup and are the first thing to
/// update when extraction starts coming back empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorsConfig {
    pub feed: String,
    pub card: String,
    pub sponsored: String,
    pub name: String,
    pub rating: String,
    pub review_count: String,
    pub star_label: String,
    pub meta_span: String,
    pub meta_row: String,
    pub phone: String,
    pub hours: String,
    pub website: String,
    pub snippet: String,
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            feed: r#"[role="feed"]"#.into(),
            card: r#"[role="feed"] > div > div"#.into(),
            sponsored: r#"[aria-label="Sponsored"]"#.into(),
            name: ".qBF1Pd, .fontHeadlineSmall".into(),
            rating: ".MW4etd".into(),
            review_count: ".UY7F9".into(),
            star_label: r#"[role="img"][aria-label*="star"]"#.into(),
            meta_span: ".W4Efsd span".into(),
            meta_row: ".W4Efsd".into(),
            phone: ".UsdlK".into(),
            hours: r#"[style*="color: rgba(25,134,57"], [style*="color: rgba(220,54,46"]"#.into(),
            website: r#"a[data-value="Website"]"#.into(),
            snippet: ".ah5Ghc span".into(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_endpoint() {
        let cfg = MedscoutConfig::default();
        assert_eq!(cfg.browser.endpoint_url(), "http://127.0.0.1:9222");
        assert_eq!(cfg.discovery.scroll_budget, 5);
        assert!(cfg.discovery.wait_seconds > 0.0);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: MedscoutConfig = toml::from_str(
            r#"
            [browser]
            host = "chrome"

            [selectors]
            phone = ".phone"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.browser.host, "chrome");
        assert_eq!(cfg.browser.port, 9222);
        assert_eq!(cfg.selectors.phone, ".phone");
        assert_eq!(cfg.selectors.feed, SelectorsConfig::default().feed);
    }

    #[test]
    fn toml_roundtrip_preserves_selectors() {
        let cfg = MedscoutConfig::default();
        let raw = toml::to_string_pretty(&cfg).unwrap();
        let back: MedscoutConfig = toml::from_str(&raw).unwrap();
        assert_eq!(back.selectors, cfg.selectors);
        assert_eq!(back.server.port, cfg.server.port);
    }
}
