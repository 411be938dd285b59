//! Medical facility discovery.
//!
//! Expands a location into facility queries, loads each query's result feed
//! through a [`medscout_browser::SessionManager`], extracts records from the
//! rendered cards and streams them as NDJSON lines.

pub mod emitter;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod params;
pub mod record;
pub mod rules;

pub use {
    emitter::{Emitter, NO_RESULTS_MESSAGE},
    error::{DiscoveryError, StreamError},
    extract::Extractor,
    orchestrator::{Discovery, FACILITY_SYNONYMS, RunOutcome, query_variants, search_url},
    params::{DiscoveryParams, DiscoverySettings, MAX_SCROLL_BUDGET, MAX_WAIT_SECONDS},
    record::{DiscoveryRecord, StreamLine},
    rules::{RuleSet, SelectorSet, StarLabel},
};
