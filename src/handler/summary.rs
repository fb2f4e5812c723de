//! Human-readable access log for `--verbose`.
//!
//! The "query" shown for a request is found by pattern matching over a raw
//! dump of it, not by parsing: the greedy `{.*}` span also swallows anything
//! between two separate JSON documents and any braces that happen to appear in
//! headers. Bulk and multi-search bodies (newline-delimited JSON) are skipped
//! entirely. None of this runs before the response is built.

use axum::http::{request, StatusCode};
use chrono::{DateTime, Local};
use regex::Regex;
use std::fmt;
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;

static QUERY_BODY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{.*\}").unwrap());
static MULTI_DOCUMENT_OPERATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_msearch|_bulk").unwrap());

const PRETTY_SEPARATOR: &str = "========================";

/// Bodies past this are cut short in the dump.
pub(crate) const DUMPED_BODY_BYTES_UPPERBOUND: usize = 64 * 1024;

/// Wire-format rendering of the caller's request: request line, headers and
/// at most `DUMPED_BODY_BYTES_UPPERBOUND` bytes of body.
pub(crate) fn dump_request(parts: &request::Parts, body: &[u8]) -> String {
    let body = &body[..body.len().min(DUMPED_BODY_BYTES_UPPERBOUND)];
    let mut dump = format!("{} {} {:?}\r\n", parts.method, parts.uri, parts.version);
    for (key, value) in &parts.headers {
        dump.push_str(&format!(
            "{key}: {}\r\n",
            String::from_utf8_lossy(value.as_bytes())
        ));
    }
    dump.push_str("\r\n");
    dump.push_str(&String::from_utf8_lossy(body));
    dump
}

pub(crate) fn extract_query(dump: &str) -> String {
    let dump = dump.replace('\n', " ");
    if MULTI_DOCUMENT_OPERATION.is_match(&dump) {
        return String::new();
    }
    QUERY_BODY
        .find(&dump)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Two-space indented JSON, or nothing if `query` isn't JSON.
pub(crate) fn prettify(query: &str) -> String {
    serde_json::from_str::<serde_json::Value>(query)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_default()
}

#[derive(Debug)]
pub(crate) struct RequestSummary {
    pub(crate) timestamp: DateTime<Local>,
    pub(crate) remote_addr: SocketAddr,
    pub(crate) request_uri: String,
    pub(crate) method: String,
    pub(crate) status: StatusCode,
    pub(crate) elapsed: Duration,
    pub(crate) query: String,
}

impl RequestSummary {
    pub(crate) fn compact(&self) -> String {
        format!(
            " -> {}; {}; {}; {}; {}; {:.3}s",
            self.method,
            self.remote_addr,
            self.request_uri,
            self.query,
            self.status.as_u16(),
            self.elapsed.as_secs_f64()
        )
    }

    pub(crate) fn pretty(&self) -> PrettySummary<'_> {
        PrettySummary(self)
    }
}

pub(crate) struct PrettySummary<'a>(&'a RequestSummary);

impl fmt::Display for PrettySummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        writeln!(f)?;
        writeln!(f, "{PRETTY_SEPARATOR}")?;
        writeln!(f, "{}", summary.timestamp.format("%Y/%m/%d %H:%M:%S"))?;
        writeln!(f, "Remote Address:  {}", summary.remote_addr)?;
        writeln!(f, "Request URI:  {}", summary.request_uri)?;
        writeln!(f, "Method:  {}", summary.method)?;
        writeln!(f, "Status:  {}", summary.status.as_u16())?;
        writeln!(f, "Took: {:.3}s", summary.elapsed.as_secs_f64())?;
        writeln!(f, "Body: ")?;
        writeln!(f, "{}", prettify(&summary.query))?;
        write!(f, "{PRETTY_SEPARATOR}")
    }
}
