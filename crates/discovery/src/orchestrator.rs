//! Query orchestration: one browser session per request, one feed per query
//! variant, records streamed as they are extracted.

use std::sync::Arc;

use {
    medscout_browser::{BrowserError, FeedRequest, FeedSession, ScrollPolicy, SessionManager},
    tokio_stream::wrappers::ReceiverStream,
    tracing::{info, warn},
    url::form_urlencoded,
};

use crate::{
    emitter::Emitter,
    error::{DiscoveryError, StreamError},
    extract::Extractor,
    params::{DiscoveryParams, DiscoverySettings},
    record::StreamLine,
};

/// Facility kinds searched for every location, in order.
pub const FACILITY_SYNONYMS: [&str; 4] = ["hospitals", "doctors", "clinics", "medical centers"];

/// The queries run for `location`, in order.
pub fn query_variants(location: &str) -> Vec<String> {
    FACILITY_SYNONYMS
        .iter()
        .map(|kind| format!("{location} {kind}"))
        .collect()
}

/// Append the form-encoded `query` to `base`.
pub fn search_url(base: &str, query: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("{base}{encoded}")
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every variant was attempted; `count` records were emitted.
    Completed { count: u64 },
    /// The session could not be used; a failure line was sent.
    Failed { error: String },
    /// The consumer went away before the run finished.
    Cancelled { emitted: u64 },
}

/// Entry point for discovery requests.
#[derive(Clone)]
pub struct Discovery {
    sessions: Arc<dyn SessionManager>,
    settings: Arc<DiscoverySettings>,
    extractor: Arc<Extractor>,
}

impl Discovery {
    pub fn new(sessions: Arc<dyn SessionManager>, settings: DiscoverySettings) -> Self {
        let extractor = Extractor::new(settings.selectors.clone());
        Self {
            sessions,
            settings: Arc::new(settings),
            extractor: Arc::new(extractor),
        }
    }

    /// Request parameters with unset fields taken from the settings.
    pub fn params(&self, scroll_budget: Option<u32>, wait_seconds: Option<f64>) -> DiscoveryParams {
        self.settings.params(scroll_budget, wait_seconds)
    }

    /// Validate the request and start producing lines in the background.
    ///
    /// Dropping the returned stream cancels the run and releases its session.
    pub fn stream(
        &self,
        location: &str,
        params: DiscoveryParams,
    ) -> Result<ReceiverStream<StreamLine>, DiscoveryError> {
        let location = checked_location(location)?;
        params.validate()?;

        let (emitter, stream) = Emitter::channel(self.settings.channel_capacity);
        let this = self.clone();
        tokio::spawn(async move {
            this.produce(&location, params, emitter).await;
        });
        Ok(stream)
    }

    /// Run a request to completion, writing to `emitter`.
    pub async fn run(
        &self,
        location: &str,
        params: DiscoveryParams,
        emitter: Emitter,
    ) -> Result<RunOutcome, DiscoveryError> {
        let location = checked_location(location)?;
        params.validate()?;
        Ok(self.produce(&location, params, emitter).await)
    }

    async fn produce(&self, location: &str, params: DiscoveryParams, emitter: Emitter) -> RunOutcome {
        info!(
            location,
            scroll_budget = params.scroll_budget,
            wait_seconds = params.wait_seconds,
            "discovery started"
        );

        let mut session = match self.sessions.acquire().await {
            Ok(session) => session,
            Err(e) => {
                warn!(location, error = %e, "could not acquire browser session");
                let error = e.to_string();
                return match emitter.fail(error.clone()).await {
                    Ok(()) => RunOutcome::Failed { error },
                    Err(StreamError::Disconnected) => RunOutcome::Cancelled { emitted: 0 },
                };
            },
        };

        let mut run = QuerySession {
            discovery: self,
            session: session.as_mut(),
            emitter,
            policy: params.scroll_policy(),
        };
        let scanned = run.scan(location).await;
        let QuerySession { emitter, .. } = run;
        session.release().await;

        let outcome = match scanned {
            Ok(()) => {
                let count = emitter.count();
                match emitter.finish().await {
                    Ok(count) => RunOutcome::Completed { count },
                    Err(StreamError::Disconnected) => RunOutcome::Cancelled { emitted: count },
                }
            },
            Err(Stop::Cancelled) => RunOutcome::Cancelled {
                emitted: emitter.count(),
            },
            Err(Stop::Fatal(e)) => {
                let error = e.to_string();
                let emitted = emitter.count();
                match emitter.fail(error.clone()).await {
                    Ok(()) => RunOutcome::Failed { error },
                    Err(StreamError::Disconnected) => RunOutcome::Cancelled { emitted },
                }
            },
        };
        log_outcome(&outcome, location);
        outcome
    }

    fn feed_request(&self, query: &str, policy: ScrollPolicy) -> FeedRequest {
        let selectors = self.extractor.selectors();
        FeedRequest {
            url: search_url(&self.settings.search_url, query),
            feed_selector: selectors.feed.clone(),
            card_selector: selectors.card.clone(),
            lookups: self.extractor.lookups(),
            scroll: policy,
            settle: self.settings.settle,
            feed_timeout: self.settings.feed_timeout,
        }
    }
}

fn checked_location(location: &str) -> Result<String, DiscoveryError> {
    let location = location.trim();
    if location.is_empty() {
        return Err(DiscoveryError::MissingLocation);
    }
    Ok(location.to_string())
}

fn log_outcome(outcome: &RunOutcome, location: &str) {
    match outcome {
        RunOutcome::Completed { count } => info!(location, count, "discovery completed"),
        RunOutcome::Failed { error } => warn!(location, error = %error, "discovery failed"),
        RunOutcome::Cancelled { emitted } => {
            info!(location, emitted, "discovery cancelled by consumer")
        },
    }
}

/// Why a scan ended early.
enum Stop {
    Cancelled,
    Fatal(BrowserError),
}

impl From<StreamError> for Stop {
    fn from(_: StreamError) -> Self {
        Stop::Cancelled
    }
}

/// One request's walk over the query variants on a single session.
struct QuerySession<'a> {
    discovery: &'a Discovery,
    session: &'a mut dyn FeedSession,
    emitter: Emitter,
    policy: ScrollPolicy,
}

impl QuerySession<'_> {
    async fn scan(&mut self, location: &str) -> Result<(), Stop> {
        for query in query_variants(location) {
            if self.emitter.is_closed() {
                return Err(Stop::Cancelled);
            }
            info!(query = %query, "searching variant");

            let request = self.discovery.feed_request(&query, self.policy);
            let loaded = tokio::select! {
                loaded = self.session.load_feed(&request) => loaded,
                () = self.emitter.closed() => return Err(Stop::Cancelled),
            };

            let feed = match loaded {
                Ok(feed) => feed,
                Err(e) if e.is_fatal() => return Err(Stop::Fatal(e)),
                Err(e) => {
                    warn!(query = %query, url = %request.url, error = %e, "skipping variant");
                    continue;
                },
            };

            for record in self.discovery.extractor.extract(&feed.cards, &query) {
                self.emitter.emit(record).await?;
            }
        }
        Ok(())
    }
}
