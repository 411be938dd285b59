use {
    anyhow::Result,
    medscout_discovery::{Discovery, StreamLine},
    tokio::io::{AsyncWriteExt, stdout},
    tokio_stream::StreamExt,
    tracing::info,
};

/// Run one discovery and write its NDJSON lines to stdout as they arrive.
pub async fn handle_search(
    discovery: Discovery,
    location: &str,
    scroll_budget: Option<u32>,
    wait_seconds: Option<f64>,
) -> Result<()> {
    let params = discovery.params(scroll_budget, wait_seconds);
    let mut lines = discovery.stream(location, params)?;

    let mut out = stdout();
    let mut records = 0u64;
    while let Some(line) = lines.next().await {
        if matches!(line, StreamLine::Record(_)) {
            records += 1;
        }
        out.write_all(line.to_ndjson().as_bytes()).await?;
        out.flush().await?;
    }
    info!(location, records, "search finished");
    Ok(())
}
