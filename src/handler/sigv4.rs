use anyhow::Result;
use aws_credential_types::Credentials;
use axum::http::{self, HeaderMap};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use itertools::Itertools;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::instrument;

use super::aws;

// Everything but the RFC 3986 unreserved characters.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');
const PATH_ENCODE_SET: &AsciiSet = &URI_ENCODE_SET.remove(b'/');

pub(crate) struct SigV4Signature {
    pub(crate) authorization: String,
    pub(crate) amz_date: String,
    pub(crate) signed_headers: String,
}

pub(crate) struct SigV4Request<'a> {
    pub(crate) credentials: &'a Credentials,
    pub(crate) datetime: DateTime<Utc>,
    pub(crate) region: &'a str,
    pub(crate) service: &'a str,
    pub(crate) method: &'a http::Method,
    pub(crate) path: &'a str,
    pub(crate) query: &'a str,
    /// Headers as they will be sent, `host` included.
    pub(crate) headers: &'a HeaderMap,
    // Only borrowed: bodies can be large.
    pub(crate) body: &'a [u8],
}

impl SigV4Request<'_> {
    #[instrument(skip_all, level = tracing::Level::DEBUG)]
    pub(crate) fn sign(&self) -> Result<SigV4Signature> {
        let amz_date = self.datetime.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = self.datetime.format("%Y%m%d").to_string();

        let mut canonical_headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in self.headers {
            let key = key.as_str();
            if aws::UNSIGNED_HEADER_KEYS.contains(&key)
                || key == aws::DATE_HEADER_KEY
                || key == aws::SECURITY_TOKEN_HEADER_KEY
            {
                continue;
            }
            canonical_headers
                .entry(key.to_string())
                .or_default()
                .push(value.to_str()?.split_whitespace().join(" "));
        }
        canonical_headers.insert(aws::DATE_HEADER_KEY.to_string(), vec![amz_date.clone()]);
        if let Some(session_token) = self.credentials.session_token() {
            canonical_headers.insert(
                aws::SECURITY_TOKEN_HEADER_KEY.to_string(),
                vec![session_token.to_string()],
            );
        }
        anyhow::ensure!(
            canonical_headers.contains_key(http::header::HOST.as_str()),
            "Request has no host header to sign"
        );

        let signed_headers = canonical_headers.keys().join(";");

        // BTreeMap keeps them sorted by name.
        let canonical_headers_string = canonical_headers
            .iter()
            .map(|(k, v)| format!("{k}:{}", v.join(",")))
            .join("\n");

        let payload_hash = hex::encode(Sha256::digest(self.body));

        // Structure must be exactly as per https://docs.aws.amazon.com/IAM/latest/UserGuide/create-signed-request.html
        let canonical_request = [
            self.method.to_string(),
            canonical_uri(self.path),
            canonical_query_string(self.query),
            canonical_headers_string + "\n", // Newline after headers to denote their end.
            signed_headers.clone(),
            payload_hash,
        ]
        .join("\n");

        tracing::debug!(?canonical_request);

        let credential_scope = format!(
            "{date_stamp}/{region}/{service}/{signature_type}",
            region = self.region,
            service = self.service,
            signature_type = aws::V4_SIGNATURE_REQUEST_TYPE
        );

        let string_to_sign = format!(
            "{algorithm}\n{amz_date}\n{credential_scope}\n{canonical_request_sha256_hex}",
            algorithm = aws::V4_SIGNATURE_ALGORITHM,
            canonical_request_sha256_hex =
                hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        tracing::debug!(?string_to_sign);

        let date_key = hmac_sha256(
            format!(
                "{v4_signature_hmac_prefix}{secret_access_key}",
                v4_signature_hmac_prefix = aws::V4_SIGNATURE_HMAC_PREFIX,
                secret_access_key = self.credentials.secret_access_key()
            )
            .as_bytes(),
            date_stamp.as_bytes(),
        )?;
        let date_region_key = hmac_sha256(&date_key, self.region.as_bytes())?;
        let date_region_service_key = hmac_sha256(&date_region_key, self.service.as_bytes())?;
        let signing_key = hmac_sha256(
            &date_region_service_key,
            aws::V4_SIGNATURE_REQUEST_TYPE.as_bytes(),
        )?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let credential = format!(
            "{access_key_id}/{credential_scope}",
            access_key_id = self.credentials.access_key_id()
        );
        let authorization = format!(
            "{algorithm} Credential={credential}, SignedHeaders={signed_headers}, Signature={signature}",
            algorithm = aws::V4_SIGNATURE_ALGORITHM
        );

        Ok(SigV4Signature {
            authorization,
            amz_date,
            signed_headers,
        })
    }
}

// Non-S3 services expect the already-escaped path to be escaped again.
fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

fn canonical_query_string(query: &str) -> String {
    // Form rules: '+' is a space, as AWS reads it.
    let encode = |component: &str| {
        let component = component.replace('+', " ");
        utf8_percent_encode(&percent_decode_str(&component).decode_utf8_lossy(), URI_ENCODE_SET)
            .to_string()
    };
    query
        .split('&')
        .filter(|param| !param.is_empty())
        .map(|param| {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            (encode(key), encode(value))
        })
        .sorted()
        .map(|(key, value)| format!("{key}={value}"))
        .join("&")
}

fn hmac_sha256(key: &[u8], msg: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)?;
    mac.update(msg);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    fn example_credentials(session_token: Option<&str>) -> Credentials {
        Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            session_token.map(str::to_string),
            None,
            "test",
        )
    }

    fn example_datetime() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    fn host_headers(host: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::HOST, HeaderValue::from_static(host));
        headers
    }

    // "get-vanilla" from the AWS SigV4 test suite.
    #[test]
    fn sigv4_get_vanilla() -> Result<()> {
        let credentials = example_credentials(None);
        let headers = host_headers("example.amazonaws.com");
        let SigV4Signature {
            authorization,
            amz_date,
            signed_headers,
        } = SigV4Request {
            credentials: &credentials,
            datetime: example_datetime(),
            region: "us-east-1",
            service: "service",
            method: &http::Method::GET,
            path: "/",
            query: "",
            headers: &headers,
            body: &[],
        }
        .sign()?;

        assert_eq!(amz_date, "20150830T123600Z");
        assert_eq!(signed_headers, "host;x-amz-date");
        assert_eq!(authorization, "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, SignedHeaders=host;x-amz-date, Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31");
        Ok(())
    }

    #[test]
    fn sigv4_is_deterministic() -> Result<()> {
        let credentials = example_credentials(None);
        let mut headers = host_headers("foo.eu-west-1.es.amazonaws.com");
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let request = SigV4Request {
            credentials: &credentials,
            datetime: example_datetime(),
            region: "eu-west-1",
            service: "es",
            method: &http::Method::POST,
            path: "/logs/_search",
            query: "size=10",
            headers: &headers,
            body: br#"{"query":{"match_all":{}}}"#,
        };

        assert_eq!(request.sign()?.authorization, request.sign()?.authorization);
        Ok(())
    }

    #[test]
    fn sigv4_body_changes_signature() -> Result<()> {
        let credentials = example_credentials(None);
        let headers = host_headers("foo.eu-west-1.es.amazonaws.com");
        let sign = |body: &[u8]| {
            SigV4Request {
                credentials: &credentials,
                datetime: example_datetime(),
                region: "eu-west-1",
                service: "es",
                method: &http::Method::POST,
                path: "/_search",
                query: "",
                headers: &headers,
                body,
            }
            .sign()
        };

        assert_ne!(
            sign(b"{}".as_slice())?.authorization,
            sign(b"{ }".as_slice())?.authorization
        );
        Ok(())
    }

    #[test]
    fn sigv4_signs_session_token_and_forwarded_headers() -> Result<()> {
        let credentials = example_credentials(Some("session-token"));
        let mut headers = host_headers("foo.eu-west-1.es.amazonaws.com");
        headers.insert("kbn-version", HeaderValue::from_static("5.1.1"));
        headers.insert(http::header::USER_AGENT, HeaderValue::from_static("curl/8.0"));
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        headers.insert(aws::DATE_HEADER_KEY, HeaderValue::from_static("19700101T000000Z"));

        let signature = SigV4Request {
            credentials: &credentials,
            datetime: example_datetime(),
            region: "eu-west-1",
            service: "es",
            method: &http::Method::GET,
            path: "/",
            query: "",
            headers: &headers,
            body: &[],
        }
        .sign()?;

        assert_eq!(
            signature.signed_headers,
            "host;kbn-version;x-amz-date;x-amz-security-token"
        );
        assert_eq!(signature.amz_date, "20150830T123600Z");
        Ok(())
    }

    #[test]
    fn error_on_missing_host() {
        let credentials = example_credentials(None);
        let headers = HeaderMap::new();
        let result = SigV4Request {
            credentials: &credentials,
            datetime: example_datetime(),
            region: "eu-west-1",
            service: "es",
            method: &http::Method::GET,
            path: "/",
            query: "",
            headers: &headers,
            body: &[],
        }
        .sign();

        assert!(result.is_err());
    }

    #[test]
    fn canonical_uri_double_encodes() {
        assert_eq!(canonical_uri(""), "/");
        assert_eq!(canonical_uri("/"), "/");
        assert_eq!(canonical_uri("/_cluster/health"), "/_cluster/health");
        assert_eq!(canonical_uri("/my%20index/_doc/a:b"), "/my%2520index/_doc/a%3Ab");
    }

    #[test]
    fn canonical_query_string_sorts_and_encodes() {
        assert_eq!(canonical_query_string(""), "");
        assert_eq!(canonical_query_string("b=2&a=1&a=0&pretty"), "a=0&a=1&b=2&pretty=");
        assert_eq!(canonical_query_string("q=title%3A*&size=5"), "q=title%3A%2A&size=5");
        assert_eq!(canonical_query_string("q=a%20b"), "q=a%20b");
    }

    #[test]
    fn canonical_query_string_reads_plus_as_space() {
        assert_eq!(canonical_query_string("q=a+b"), "q=a%20b");
        assert_eq!(
            canonical_query_string("q=level:error+AND+host:web"),
            "q=level%3Aerror%20AND%20host%3Aweb"
        );
        assert_eq!(canonical_query_string("q=1%2B1"), "q=1%2B1");
    }
}
