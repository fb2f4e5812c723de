use aws_credential_types::provider::error::CredentialsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use std::error::Error as _;

/// Failures scoped to a single proxied request. Each one is answered with
/// its own text as the response body; none of them stop the server.
#[derive(thiserror::Error, Debug)]
pub(crate) enum ProxyError {
    #[error("Couldn't read request body: {0}")]
    RequestBody(#[source] axum::Error),
    #[error("Couldn't build upstream request: {0}")]
    RequestConstruction(String),
    #[error("Couldn't sign upstream request: {0}")]
    Signing(#[source] anyhow::Error),
    #[error("Couldn't load AWS credentials: {0}")]
    Credentials(#[from] CredentialsError),
    #[error("{}", error_chain(.0))]
    UpstreamTransport(#[source] reqwest::Error),
    #[error("Couldn't read upstream response body: {}", error_chain(.0))]
    ResponseRelay(#[source] reqwest::Error),
}

impl ProxyError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            ProxyError::RequestBody(error)
                if error
                    .source()
                    .is_some_and(|source| source.is::<LengthLimitError>()) =>
            {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ProxyError::RequestBody(_)
            | ProxyError::RequestConstruction(_)
            | ProxyError::Signing(_) => StatusCode::BAD_REQUEST,
            // The caller did nothing wrong here: the hop to AWS failed.
            ProxyError::Credentials(_)
            | ProxyError::UpstreamTransport(_)
            | ProxyError::ResponseRelay(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

// reqwest's top-level message omits the cause ("connection refused" etc).
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_side_failures_are_bad_requests() {
        assert_eq!(
            ProxyError::RequestConstruction("relative URL without a base".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::Signing(anyhow::Error::msg("invalid key length")).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn oversized_body_is_payload_too_large() {
        let error = axum::body::to_bytes(axum::body::Body::from(vec![0u8; 16]), 8)
            .await
            .map_err(ProxyError::RequestBody)
            .unwrap_err();

        assert_eq!(error.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn credential_failures_are_bad_gateway() {
        let error = ProxyError::from(CredentialsError::not_loaded("no providers in chain"));

        assert_eq!(error.status(), StatusCode::BAD_GATEWAY);
        assert!(error.to_string().starts_with("Couldn't load AWS credentials"));
    }
}
