use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use super::errors::ProxyError;
use super::signer::SignedRequest;

// Describe the upstream connection, not the buffered body we relay.
const RESPONSE_FRAMING_HEADER_KEYS: [&str; 3] = ["connection", "keep-alive", "transfer-encoding"];

/// The upstream response, fully buffered.
#[derive(Debug)]
pub(crate) struct ProxyResponse {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// One attempt, no retries: whatever the upstream says is relayed.
#[instrument(skip_all, level = tracing::Level::DEBUG, fields(url = %signed_request.0.url))]
pub(crate) async fn forward(
    http_client: &reqwest::Client,
    signed_request: SignedRequest,
) -> Result<ProxyResponse, ProxyError> {
    let SignedRequest(request) = signed_request;
    let server_response = http_client
        .request(request.method, request.url)
        .headers(request.headers)
        .body(request.body)
        .send()
        .await
        .map_err(ProxyError::UpstreamTransport)?;

    let status = server_response.status();
    let mut headers = server_response.headers().clone();
    for key in RESPONSE_FRAMING_HEADER_KEYS {
        headers.remove(key);
    }

    let body = server_response
        .bytes()
        .await
        .map_err(ProxyError::ResponseRelay)?;

    Ok(ProxyResponse {
        status,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::http::HeaderValue;

    #[test]
    fn relay_status_headers_and_body() -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.append("warning", HeaderValue::from_static("299 Elasticsearch \"a\""));
        headers.append("warning", HeaderValue::from_static("299 Elasticsearch \"b\""));

        let response = ProxyResponse {
            status: StatusCode::NOT_FOUND,
            headers,
            body: Bytes::from_static(b"{\"found\":false}"),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get_all("warning").iter().count(), 2);
        Ok(())
    }
}
