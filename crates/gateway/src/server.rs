use std::{convert::Infallible, net::SocketAddr};

use {
    axum::{
        Router,
        body::Body,
        extract::State,
        http::{StatusCode, header},
        response::{IntoResponse, Json, Response},
        routing::{get, post},
    },
    bytes::Bytes,
    futures::StreamExt,
    medscout_discovery::{Discovery, StreamLine},
    serde::Deserialize,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

/// Content type of the discovery stream.
pub const NDJSON: &str = "application/x-ndjson";

#[derive(Clone)]
pub struct AppState {
    pub discovery: Discovery,
    pub version: &'static str,
}

/// Body of `POST /send_location`.
#[derive(Debug, Default, Deserialize)]
struct SendLocationRequest {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    scroll_budget: Option<u32>,
    #[serde(default)]
    wait_seconds: Option<f64>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the router (shared between production startup and tests).
pub fn build_app(discovery: Discovery) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/send_location", post(send_location_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            discovery,
            version: env!("CARGO_PKG_VERSION"),
        })
}

/// Bind and serve until the process is stopped.
pub async fn start_server(bind: &str, port: u16, discovery: Discovery) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let app = build_app(discovery);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "medscout listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
    }))
}

/// Body: `{ "location", "scroll_budget"?, "wait_seconds"? }`. A `scroll_budget`
/// above 100 or a `wait_seconds` outside (0, 60] is a 400.
async fn send_location_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        SendLocationRequest::default()
    } else {
        match serde_json::from_slice::<SendLocationRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "rejecting malformed discovery request");
                return failure(StatusCode::BAD_REQUEST, format!("invalid request body: {e}"));
            },
        }
    };

    let location = request.location.unwrap_or_default();
    let params = state
        .discovery
        .params(request.scroll_budget, request.wait_seconds);

    let lines = match state.discovery.stream(&location, params) {
        Ok(lines) => lines,
        Err(e) => {
            info!(error = %e, "rejecting discovery request");
            return failure(StatusCode::BAD_REQUEST, e.to_string());
        },
    };
    info!(location = location.trim(), "streaming discovery results");

    let body = Body::from_stream(lines.map(|line| Ok::<_, Infallible>(line.to_ndjson())));
    ([(header::CONTENT_TYPE, NDJSON)], body).into_response()
}

fn failure(status: StatusCode, error: String) -> Response {
    (status, Json(StreamLine::failure(error))).into_response()
}
