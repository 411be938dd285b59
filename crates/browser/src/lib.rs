//! Remote Chrome sessions over CDP, and result-feed loading.
//!
//! Used by the discovery pipeline to open one session per request, load a
//! search surface, scroll its lazily rendered feed until it stops growing, and
//! capture every result card for extraction.
//!
//! # Example
//!
//! ```ignore
//! use medscout_browser::{CdpSessionManager, SessionConfig, SessionManager};
//!
//! let manager = CdpSessionManager::new(SessionConfig::default());
//! let mut session = manager.acquire().await?;
//! let feed = session.load_feed(&request).await;
//! session.release().await;
//! ```

pub mod error;
pub mod feed;
pub mod node;
pub mod session;
pub mod types;

pub use {
    error::{BrowserError, NodeError},
    feed::{LoadedFeed, ScrollableFeed, stabilize, wait_for_feed},
    node::{CardSnapshot, Lookup, ResultNode},
    session::{CdpSession, CdpSessionManager, FeedSession, SessionManager},
    types::{FeedRequest, ScrollOutcome, ScrollPolicy, SessionConfig},
};
