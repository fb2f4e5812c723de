pub(crate) const V4_SIGNATURE_ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub(crate) const V4_SIGNATURE_REQUEST_TYPE: &str = "aws4_request";
pub(crate) const V4_SIGNATURE_HMAC_PREFIX: &str = "AWS4";

pub(crate) const DATE_HEADER_KEY: &str = "x-amz-date";
pub(crate) const SECURITY_TOKEN_HEADER_KEY: &str = "x-amz-security-token";

// Set by Kibana/OpenSearch Dashboards; ES 5.1 rejects requests without it.
pub(crate) const KIBANA_VERSION_HEADER_KEY: &str = "kbn-version";

// Never part of the signature: rewritten or appended along the way.
pub(crate) const UNSIGNED_HEADER_KEYS: [&str; 4] =
    ["authorization", "user-agent", "expect", "x-amzn-trace-id"];

pub(crate) const HOP_BY_HOP_HEADER_KEYS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

// Upper bound for a single buffered request body. The largest
// instance types accept 100MB HTTP payloads.
pub(crate) const REQUEST_SIZE_BYTES_UPPERBOUND: usize = 100 * 1024 * 1024;
