mod config_commands;
mod search_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    medscout_browser::{CdpSessionManager, SessionConfig},
    medscout_discovery::{Discovery, DiscoverySettings},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "medscout",
    version,
    about = "Medscout: stream nearby medical facilities from a map search"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides the default search in ./ and ~/.config/medscout/).
    #[arg(long, global = true, env = "MEDSCOUT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default when no subcommand is provided).
    Serve {
        /// Address to bind to (overrides config value).
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides config value).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one discovery and print NDJSON to stdout.
    Search {
        /// Free-text location, e.g. "Springfield".
        location: String,
        /// Maximum scrolls per query variant.
        #[arg(long)]
        scroll_budget: Option<u32>,
        /// Pause after each scroll, in seconds.
        #[arg(long)]
        wait_seconds: Option<f64>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

/// Initialise tracing. Logs go to stderr so `search` output stays clean NDJSON.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn build_discovery(config: &medscout_config::MedscoutConfig) -> Discovery {
    let sessions = CdpSessionManager::new(SessionConfig::from(&config.browser));
    Discovery::new(Arc::new(sessions), DiscoverySettings::from(config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    let config = medscout_config::resolve_config(cli.config.as_deref())?;

    match cli.command {
        // Default: start the server when no subcommand is provided
        None => serve(&config, None, None).await,
        Some(Commands::Serve { bind, port }) => serve(&config, bind, port).await,
        Some(Commands::Search {
            location,
            scroll_budget,
            wait_seconds,
        }) => {
            search_commands::handle_search(
                build_discovery(&config),
                &location,
                scroll_budget,
                wait_seconds,
            )
            .await
        },
        Some(Commands::Config) => config_commands::handle_config(&config),
    }
}

async fn serve(
    config: &medscout_config::MedscoutConfig,
    bind: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "medscout starting");

    // CLI args override config values
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let port = port.unwrap_or(config.server.port);
    info!(
        endpoint = %config.browser.endpoint_url(),
        "using remote browser"
    );

    medscout_gateway::start_server(&bind, port, build_discovery(config)).await
}
