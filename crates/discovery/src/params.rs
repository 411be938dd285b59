//! Per-request tuning and the settings a [`crate::Discovery`] is built with.

use std::time::Duration;

use {
    medscout_browser::ScrollPolicy,
    serde::{Deserialize, Serialize},
    tracing::warn,
};

use crate::{error::DiscoveryError, rules::SelectorSet};

/// Largest scroll budget a request may ask for.
pub const MAX_SCROLL_BUDGET: u32 = 100;

/// Longest per-scroll pause a request may ask for, in seconds.
pub const MAX_WAIT_SECONDS: f64 = 60.0;

/// Tuning for one discovery request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryParams {
    /// Maximum scrolls per query variant.
    pub scroll_budget: u32,
    /// Pause after each scroll, in seconds.
    pub wait_seconds: f64,
}

impl Default for DiscoveryParams {
    fn default() -> Self {
        Self {
            scroll_budget: 5,
            wait_seconds: 2.0,
        }
    }
}

impl DiscoveryParams {
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if self.scroll_budget > MAX_SCROLL_BUDGET {
            return Err(DiscoveryError::InvalidParams(format!(
                "scroll_budget must be at most {MAX_SCROLL_BUDGET}, got {}",
                self.scroll_budget
            )));
        }
        if !self.wait_seconds.is_finite()
            || self.wait_seconds <= 0.0
            || self.wait_seconds > MAX_WAIT_SECONDS
        {
            return Err(DiscoveryError::InvalidParams(format!(
                "wait_seconds must be greater than 0 and at most {MAX_WAIT_SECONDS}, got {}",
                self.wait_seconds
            )));
        }
        Ok(())
    }

    /// The scroll policy these parameters describe. Call after [`Self::validate`].
    pub fn scroll_policy(&self) -> ScrollPolicy {
        ScrollPolicy {
            budget: self.scroll_budget,
            wait: Duration::try_from_secs_f64(self.wait_seconds).unwrap_or(Duration::ZERO),
        }
    }
}

/// Service-wide discovery settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Base search URL; the encoded query is appended.
    pub search_url: String,
    /// Defaults for requests that leave tuning unset.
    pub defaults: DiscoveryParams,
    pub settle: Duration,
    pub feed_timeout: Duration,
    pub channel_capacity: usize,
    pub selectors: SelectorSet,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self::from(&medscout_config::MedscoutConfig::default())
    }
}

impl From<&medscout_config::MedscoutConfig> for DiscoverySettings {
    fn from(cfg: &medscout_config::MedscoutConfig) -> Self {
        let discovery = &cfg.discovery;
        let settle = Duration::try_from_secs_f64(discovery.settle_seconds).unwrap_or_else(|e| {
            warn!(
                settle_seconds = discovery.settle_seconds,
                error = %e,
                "invalid settle delay, not settling"
            );
            Duration::ZERO
        });
        Self {
            search_url: discovery.search_url.clone(),
            defaults: DiscoveryParams {
                scroll_budget: discovery.scroll_budget,
                wait_seconds: discovery.wait_seconds,
            },
            settle,
            feed_timeout: Duration::from_secs(discovery.feed_timeout_secs),
            channel_capacity: discovery.channel_capacity.max(1),
            selectors: SelectorSet::from(&cfg.selectors),
        }
    }
}

impl DiscoverySettings {
    /// Fill unset request fields from the configured defaults.
    pub fn params(&self, scroll_budget: Option<u32>, wait_seconds: Option<f64>) -> DiscoveryParams {
        DiscoveryParams {
            scroll_budget: scroll_budget.unwrap_or(self.defaults.scroll_budget),
            wait_seconds: wait_seconds.unwrap_or(self.defaults.wait_seconds),
        }
    }
}
