//! Remote browser sessions.
//!
//! One session per discovery request: a CDP connection to the configured
//! DevTools endpoint and a single prepared page. A session is released on
//! every exit path; [`FeedSession::release`] may be called any number of times.

use std::time::Duration;

use {
    async_trait::async_trait,
    chromiumoxide::{
        Browser, Page,
        cdp::browser_protocol::{
            emulation::{SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams},
            network::{EnableParams as NetworkEnableParams, SetBlockedUrLsParams},
            page::AddScriptToEvaluateOnNewDocumentParams,
        },
        handler::{HandlerConfig, viewport::Viewport},
    },
    futures::StreamExt,
    tokio::{task::JoinHandle, time::timeout},
    tracing::{debug, info, warn},
};

use crate::{
    error::BrowserError,
    feed::{LoadedFeed, load_feed},
    types::{FeedRequest, SessionConfig},
};

/// Hides the automation flag from page scripts.
const STEALTH_JS: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
"#;

/// URL patterns blocked when image loading is disabled.
const IMAGE_URL_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico", "*.avif",
];

/// Pause between attempts to reach the DevTools endpoint.
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Establishes browser sessions.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Open a new session. Failure is fatal for the request that asked.
    async fn acquire(&self) -> Result<Box<dyn FeedSession>, BrowserError>;
}

/// A live session able to load result feeds.
#[async_trait]
pub trait FeedSession: Send {
    /// Load `request.url` and capture the stabilized feed.
    async fn load_feed(&mut self, request: &FeedRequest) -> Result<LoadedFeed, BrowserError>;

    /// Release the session. Idempotent.
    async fn release(&mut self);
}

/// Connects to a remote Chrome over the DevTools protocol.
pub struct CdpSessionManager {
    config: SessionConfig,
    http: reqwest::Client,
}

impl CdpSessionManager {
    pub fn new(config: SessionConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.connect_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build DevTools HTTP client, falling back to one without a timeout"
                );
                reqwest::Client::new()
            });
        Self { config, http }
    }

    /// Resolve the browser websocket URL from `/json/version`, retrying.
    async fn resolve_websocket_url(&self) -> Result<String, BrowserError> {
        if self.config.endpoint.starts_with("ws://") || self.config.endpoint.starts_with("wss://")
        {
            return Ok(self.config.endpoint.clone());
        }

        let version_url = format!("{}/json/version", self.config.endpoint.trim_end_matches('/'));
        let mut last_error = None;

        for attempt in 1..=self.config.connect_attempts {
            match self.fetch_websocket_url(&version_url).await {
                Ok(ws_url) => return rebase_websocket_url(&ws_url, &self.config.endpoint),
                Err(e) => {
                    warn!(
                        attempt,
                        attempts = self.config.connect_attempts,
                        endpoint = %self.config.endpoint,
                        error = %e,
                        "DevTools endpoint not reachable"
                    );
                    last_error = Some(e);
                },
            }
            if attempt < self.config.connect_attempts {
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }

        Err(last_error.unwrap_or_else(|| BrowserError::Endpoint("no connection attempts".into())))
    }

    async fn fetch_websocket_url(&self, version_url: &str) -> Result<String, BrowserError> {
        let json: serde_json::Value = self
            .http
            .get(version_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        json["webSocketDebuggerUrl"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| BrowserError::Endpoint("no webSocketDebuggerUrl in response".into()))
    }
}

#[async_trait]
impl SessionManager for CdpSessionManager {
    async fn acquire(&self) -> Result<Box<dyn FeedSession>, BrowserError> {
        let session_id = generate_session_id();
        info!(
            session_id = %session_id,
            endpoint = %self.config.endpoint,
            headless = self.config.headless,
            chrome_args = ?self.config.chrome_args,
            "connecting to remote browser"
        );

        let ws_url = self
            .resolve_websocket_url()
            .await
            .map_err(|e| BrowserError::Session(e.to_string()))?;

        let handler_config = HandlerConfig {
            request_timeout: self.config.request_timeout,
            viewport: Some(viewport(&self.config)),
            ..Default::default()
        };

        let (browser, mut handler) = timeout(
            self.config.connect_timeout,
            Browser::connect_with_config(ws_url.as_str(), handler_config),
        )
        .await
        .map_err(|_| {
            BrowserError::Session(format!(
                "handshake with {ws_url} timed out after {}ms",
                self.config.connect_timeout.as_millis()
            ))
        })?
        .map_err(|e| BrowserError::Session(format!("failed to connect to {ws_url}: {e}")))?;

        let handler_session = session_id.clone();
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!(session_id = %handler_session, ?event, "browser event");
            }
            debug!(session_id = %handler_session, "browser event handler exited");
        });

        let mut session = CdpSession {
            id: session_id,
            browser: Some(browser),
            page: None,
            handler_task: Some(handler_task),
        };

        if let Err(e) = session.prepare(&self.config).await {
            session.release().await;
            return Err(BrowserError::Session(format!("page setup failed: {e}")));
        }

        info!(session_id = %session.id, "browser session ready");
        Ok(Box::new(session))
    }
}

/// A CDP connection with one prepared page.
pub struct CdpSession {
    id: String,
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
}

impl CdpSession {
    /// Open the working page and apply viewport, user agent, image blocking
    /// and the automation-flag patch.
    async fn prepare(&mut self, config: &SessionConfig) -> Result<(), BrowserError> {
        let browser = self.browser.as_ref().ok_or(BrowserError::Released)?;
        let page = browser.new_page("about:blank").await?;

        let viewport_cmd = SetDeviceMetricsOverrideParams::builder()
            .width(config.viewport_width)
            .height(config.viewport_height)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(BrowserError::Cdp)?;
        if let Err(e) = page.execute(viewport_cmd).await {
            warn!(session_id = %self.id, error = %e, "failed to set page viewport");
        }

        page.execute(SetUserAgentOverrideParams::new(config.user_agent.clone()))
            .await?;

        if config.block_images {
            let patterns = IMAGE_URL_PATTERNS.iter().map(|p| p.to_string()).collect();
            let blocked = async {
                page.execute(NetworkEnableParams::default()).await?;
                page.execute(SetBlockedUrLsParams::new(patterns)).await
            };
            if let Err(e) = blocked.await {
                warn!(session_id = %self.id, error = %e, "failed to block image loading");
            }
        }

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_JS))
            .await?;
        page.evaluate(STEALTH_JS)
            .await
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?;

        self.page = Some(page);
        Ok(())
    }
}

#[async_trait]
impl FeedSession for CdpSession {
    async fn load_feed(&mut self, request: &FeedRequest) -> Result<LoadedFeed, BrowserError> {
        let page = self.page.as_ref().ok_or(BrowserError::Released)?;
        load_feed(page, request).await
    }

    async fn release(&mut self) {
        let had_connection = self.browser.is_some();

        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            debug!(session_id = %self.id, error = %e, "failed to close page");
        }
        // Dropping the browser closes the websocket; the remote process stays up.
        drop(self.browser.take());
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }

        if had_connection {
            info!(session_id = %self.id, "released browser session");
        }
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        if let Some(task) = self.handler_task.take() {
            warn!(session_id = %self.id, "browser session dropped without release");
            task.abort();
        }
    }
}

fn viewport(config: &SessionConfig) -> Viewport {
    Viewport {
        width: config.viewport_width,
        height: config.viewport_height,
        device_scale_factor: Some(1.0),
        emulating_mobile: false,
        is_landscape: true,
        has_touch: false,
    }
}

/// Point a websocket URL reported by the endpoint back at the configured host.
///
/// Chrome reports its own bind address (often `127.0.0.1`), which is wrong
/// when the endpoint sits on another host or behind a port mapping.
fn rebase_websocket_url(ws_url: &str, endpoint: &str) -> Result<String, BrowserError> {
    let mut ws = url::Url::parse(ws_url)
        .map_err(|e| BrowserError::Endpoint(format!("invalid websocket URL {ws_url}: {e}")))?;
    let endpoint = url::Url::parse(endpoint)
        .map_err(|e| BrowserError::Endpoint(format!("invalid endpoint {endpoint}: {e}")))?;

    ws.set_host(endpoint.host_str())
        .map_err(|e| BrowserError::Endpoint(e.to_string()))?;
    ws.set_port(endpoint.port_or_known_default())
        .map_err(|_| BrowserError::Endpoint(format!("cannot set port on {ws_url}")))?;
    Ok(ws.to_string())
}

fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let id: u64 = rng.random();
    format!("session-{id:016x}")
}
