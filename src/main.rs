mod config;
mod handler;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use axum::handler::Handler;
use axum::middleware;
use clap::Parser;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ProxyConfig, Settings};
use crate::handler::credentials::CredentialCache;
use crate::handler::middleware as handler_middleware;
use crate::handler::proxy::proxy;
use crate::handler::state::ProxyState;

#[derive(Parser, Debug)]
#[command(version, about)]
pub(crate) struct Args {
    /// Amazon ElasticSearch endpoint (e.g: https://dummy-host.eu-west-1.es.amazonaws.com)
    #[arg(long)]
    endpoint: Option<String>,

    /// Local TCP address to listen on [default: 127.0.0.1:9200]
    #[arg(long)]
    listen: Option<String>,

    /// Print user requests
    #[arg(long, action)]
    verbose: bool,

    /// Prettify verbose output
    #[arg(long, action)]
    pretty: bool,

    /// Refresh AWS credentials every N seconds [default: 120]
    #[arg(long)]
    refresh: Option<f64>,

    /// Serve Prometheus metrics on this loopback port
    #[arg(long)]
    metrics_port: Option<u16>,

    /// TOML file with the same settings; flags take precedence
    #[arg(long)]
    config_file: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, action)]
    json: bool,
}

impl From<&Args> for Settings {
    fn from(args: &Args) -> Self {
        Settings {
            endpoint: args.endpoint.clone(),
            listen: args.listen.clone(),
            verbose: args.verbose.then_some(true),
            pretty: args.pretty.then_some(true),
            refresh: args.refresh,
            metrics_port: args.metrics_port,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(&args)?;

    let file_settings = match &args.config_file {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    let config = ProxyConfig::try_from(file_settings.overlay(Settings::from(&args)))?;

    if let Some(metrics_port) = config.metrics_port {
        let loopback_address = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
        metrics::init(SocketAddr::new(loopback_address, metrics_port))?;
    }

    let credentials =
        CredentialCache::from_environment(&config.endpoint.region, config.refresh_interval).await;

    let state: ProxyState = ProxyState {
        http_client: http_client(&config)?,
        credentials: Arc::new(credentials),
        config: Arc::new(config.clone()),
    };

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Couldn't listen on {}", config.listen))?;

    tracing::info!(
        endpoint = %format!("{}://{}", config.endpoint.scheme, config.endpoint.authority),
        region = %config.endpoint.region,
        service = %config.endpoint.service,
        "Listening on {}...",
        config.listen
    );

    let make_service = proxy
        .layer(middleware::from_fn(handler_middleware::metrics))
        .with_state(state)
        .into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await?;

    Ok(())
}

fn http_client(config: &ProxyConfig) -> Result<reqwest::Client> {
    let http_client = reqwest::Client::builder()
        .https_only(config.endpoint.is_https())
        .build()?;
    Ok(http_client)
}
