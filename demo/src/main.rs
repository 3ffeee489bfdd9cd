//! Resilink demo client
//!
//! Connects to a JSON stream, prints every update, and polls `<api>/health`
//! through a timeout, retry and cache stack until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use serde_json::{Map, Value};
use tracing::{info, warn};

use resilink::request::{ApiResponse, Request, RequestError, RequestExt, request_fn};
use resilink::{ClientConfig, ClientContext};

/// Stream updates and poll an API health endpoint
#[derive(Debug, Parser)]
#[command(name = "resilink-demo", version, about)]
struct Cli {
    /// Configuration file (.toml, .yaml or .json)
    #[arg(short, long, env = "RESILINK_CONFIG")]
    config: Option<PathBuf>,

    /// Stream endpoint, overriding the configuration
    #[arg(long)]
    url: Option<String>,

    /// HTTP API base URL
    #[arg(long, default_value = "http://localhost:8000/api")]
    api: String,

    /// Seconds between health checks
    #[arg(long, default_value_t = 15)]
    interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::from_env().context("loading configuration from environment")?,
    };
    if let Some(url) = cli.url {
        config.stream.url = Some(url);
    }

    let _telemetry = config
        .telemetry
        .to_telemetry_config("resilink-demo")
        .init()?;

    let context = ClientContext::start(config)?;
    context.reporter().install_panic_hook();

    if let Some(stream) = context.stream() {
        stream.on_message(Arc::new(|message: &Value| {
            println!("{message}");
        }));
        stream.on_connection_change(Arc::new(|connected: bool| {
            info!(connected, "Stream connection changed");
        }));
        stream.on_error(Arc::new(|error: &resilink::stream::StreamError| {
            warn!(%error, "Stream error");
        }));
    }

    let http = reqwest::Client::new();
    let health_url = format!("{}/health", cli.api.trim_end_matches('/'));
    let health = request_fn(move |url: String| {
        let http = http.clone();
        async move {
            let response: ApiResponse<Value> = http
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok::<_, RequestError>(response.into_result()?.unwrap_or(Value::Null))
        }
    })
    .with_timeout(context.timeout())
    .with_retry(context.retry_config())
    .with_cache(context.cache_config());

    let mut ticker = tokio::time::interval(Duration::from_secs(cli.interval.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => match health.call(health_url.clone()).await {
                Ok(status) => info!(%status, "Health check"),
                Err(error) => {
                    let mut details = Map::new();
                    details.insert("endpoint".to_string(), Value::from(health_url.as_str()));
                    context.reporter().handle_request_error(&error, details);
                }
            },
        }
    }

    info!("Shutting down");
    let flushed = context.shutdown().await;
    info!(flushed, "Pending errors flushed");
    Ok(())
}
