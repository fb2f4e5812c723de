use super::aws;
use super::errors::ProxyError;
use super::forward::{forward, ProxyResponse};
use super::state::ProxyState;
use super::summary::{self, RequestSummary};
use super::transform::transform;
use crate::config::ProxyConfig;
use crate::metrics::consts as crate_metrics;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{request, StatusCode},
};
use chrono::{Local, Utc};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::instrument;

fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[instrument(skip_all, err(Display), level = tracing::Level::DEBUG, fields(request_id=uuid()))]
pub(crate) async fn proxy(
    State(state): State<ProxyState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    client_request: Request<Body>,
) -> Result<ProxyResponse, ProxyError> {
    let request_start = Instant::now();

    let (client_request, client_request_body) = client_request.into_parts();
    let client_request_body_bytes =
        axum::body::to_bytes(client_request_body, aws::REQUEST_SIZE_BYTES_UPPERBOUND)
            .await
            .map_err(ProxyError::RequestBody)?;
    metrics::histogram!(crate_metrics::HTTP_REQUEST_SIZE_BYTES)
        .record(client_request_body_bytes.len() as f64);

    let endpoint = &state.config.endpoint;
    // Bytes clones share the buffer; the dump below reads the original.
    let proxy_request = transform(&client_request, client_request_body_bytes.clone(), endpoint)?;

    let signer = state.credentials.signer_for(Instant::now()).await?;
    let signed_request =
        signer.sign(proxy_request, &endpoint.region, &endpoint.service, Utc::now())?;

    let upstream_start = Instant::now();
    let server_response = forward(&state.http_client, signed_request)
        .await
        .inspect_err(|error| tracing::error!(%error, "Upstream request failed"))?;
    let upstream_duration = upstream_start.elapsed();
    metrics::histogram!(crate_metrics::UPSTREAM_REQUEST_DURATION_SECS)
        .record(upstream_duration.as_secs_f64());
    metrics::histogram!(crate_metrics::HTTP_RESPONSE_SIZE_BYTES)
        .record(server_response.body.len() as f64);

    let request_duration = request_start.elapsed();
    tracing::debug!(
        status = %server_response.status,
        method = %client_request.method,
        uri = %client_request.uri,
    );

    metrics::histogram!(crate_metrics::PROXY_PROCESSING_DURATION_SECS)
        .record(request_duration.saturating_sub(upstream_duration).as_secs_f64());

    if state.config.verbose {
        let config = state.config.clone();
        let status = server_response.status;
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            log_summary(
                &config,
                &client_request,
                &client_request_body_bytes,
                remote_addr,
                status,
                request_duration,
            )
        });
    }

    Ok(server_response)
}

fn log_summary(
    config: &ProxyConfig,
    client_request: &request::Parts,
    client_request_body: &[u8],
    remote_addr: SocketAddr,
    status: StatusCode,
    elapsed: Duration,
) {
    let dump = summary::dump_request(client_request, client_request_body);
    let request_summary = RequestSummary {
        timestamp: Local::now(),
        remote_addr,
        request_uri: client_request
            .uri
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_else(|| "/".to_string()),
        method: client_request.method.to_string(),
        status,
        elapsed,
        query: summary::extract_query(&dump),
    };

    if config.prettify {
        tracing::info!(target: "access", "{}", request_summary.pretty());
    } else {
        tracing::info!(target: "access", "{}", request_summary.compact());
    }
}
