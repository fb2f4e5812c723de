use axum::{
    body::Bytes,
    http::{self, request, HeaderMap, HeaderValue},
};
use reqwest::Url;

use super::aws;
use super::errors::ProxyError;
use crate::config::Endpoint;

/// The caller's request re-targeted at the upstream domain.
#[derive(Debug)]
pub(crate) struct OutboundRequest {
    pub(crate) method: http::Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    /// Buffered once: hashed by the signer, then sent as-is.
    pub(crate) body: Bytes,
}

pub(crate) fn transform(
    client_request: &request::Parts,
    body: Bytes,
    endpoint: &Endpoint,
) -> Result<OutboundRequest, ProxyError> {
    let path_and_query = client_request
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        // Asterisk-form ("OPTIONS *") targets the whole server.
        .filter(|pq| pq.starts_with('/'))
        .unwrap_or("/");
    let url = Url::parse(&format!(
        "{scheme}://{authority}{path_and_query}",
        scheme = endpoint.scheme,
        authority = endpoint.authority,
    ))
    .map_err(|error| ProxyError::RequestConstruction(error.to_string()))?;

    let mut headers = client_request
        .headers
        .iter()
        .filter(|(key, _)| forwarded(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect::<HeaderMap>();

    // Set explicitly so the signed host matches the one sent, port included.
    headers.insert(
        http::header::HOST,
        HeaderValue::from_str(&endpoint.authority)
            .map_err(|error| ProxyError::RequestConstruction(error.to_string()))?,
    );

    // Kibana 5.1.1 against ES 5.1 requires this to survive the rewrite.
    if let Some(kibana_version) = client_request.headers.get(aws::KIBANA_VERSION_HEADER_KEY) {
        headers.insert(aws::KIBANA_VERSION_HEADER_KEY, kibana_version.clone());
    }

    Ok(OutboundRequest {
        method: client_request.method.clone(),
        url,
        headers,
        body,
    })
}

fn forwarded(key: &http::HeaderName) -> bool {
    let key = key.as_str();
    !(aws::HOP_BY_HOP_HEADER_KEYS.contains(&key)
        || key == http::header::HOST.as_str()
        || key == http::header::CONTENT_LENGTH.as_str()
        || key == http::header::AUTHORIZATION.as_str())
}
