//! HTTP surface for medical facility discovery.
//!
//! Routes:
//! - `GET /health`
//! - `POST /send_location`: streams discovery results as NDJSON.
//!   `scroll_budget` is capped at 100 (`MAX_SCROLL_BUDGET`) and `wait_seconds`
//!   must be in (0, 60]. Anything outside those bounds is rejected with 400
//!   before a browser session is acquired.

pub mod server;

pub use server::{AppState, NDJSON, build_app, start_server};
