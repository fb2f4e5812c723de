use aws_credential_types::Credentials;
use axum::http::HeaderValue;
use chrono::{DateTime, Utc};

use super::aws;
use super::errors::ProxyError;
use super::sigv4::{SigV4Request, SigV4Signature};
use super::transform::OutboundRequest;

/// An outbound request carrying its SigV4 headers, ready to send.
#[derive(Debug)]
pub(crate) struct SignedRequest(pub(crate) OutboundRequest);

/// Signs with one fixed credential set. Region and service come per call.
#[derive(Clone, Debug)]
pub(crate) struct RequestSigner {
    credentials: Credentials,
}

impl RequestSigner {
    pub(crate) fn new(credentials: Credentials) -> Self {
        RequestSigner { credentials }
    }

    pub(crate) fn sign(
        &self,
        mut request: OutboundRequest,
        region: &str,
        service: &str,
        datetime: DateTime<Utc>,
    ) -> Result<SignedRequest, ProxyError> {
        let SigV4Signature {
            authorization,
            amz_date,
            signed_headers,
        } = SigV4Request {
            credentials: &self.credentials,
            datetime,
            region,
            service,
            method: &request.method,
            path: request.url.path(),
            query: request.url.query().unwrap_or(""),
            headers: &request.headers,
            body: &request.body,
        }
        .sign()
        .map_err(ProxyError::Signing)?;
        tracing::debug!(%signed_headers, region, service);

        let headers = &mut request.headers;
        headers.insert(
            aws::DATE_HEADER_KEY,
            HeaderValue::from_str(&amz_date).map_err(|e| ProxyError::Signing(e.into()))?,
        );
        headers.remove(aws::SECURITY_TOKEN_HEADER_KEY);
        if let Some(session_token) = self.credentials.session_token() {
            headers.insert(
                aws::SECURITY_TOKEN_HEADER_KEY,
                HeaderValue::from_str(session_token).map_err(|e| ProxyError::Signing(e.into()))?,
            );
        }
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&authorization).map_err(|e| ProxyError::Signing(e.into()))?,
        );

        Ok(SignedRequest(request))
    }
}
