//! libcurl-backed transport adapter.
//!
//! Each call runs a blocking `curl::easy::Easy` transfer on tokio's blocking
//! pool. Deadlines are enforced by libcurl itself; the scheduler only sees the
//! resulting error code.

use async_trait::async_trait;
use std::str;
use std::time::Duration;

use super::{decode_body, ResolvedCall, Transport, TransportError, TransportResponse};
use crate::method::Method;

/// Production [`Transport`] built on the `curl` crate.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    /// Connect-phase deadline, independent of the per-call timeout.
    pub connect_timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirections: u32,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            follow_redirects: true,
            max_redirections: 10,
        }
    }
}

impl CurlTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for CurlTransport {
    async fn execute(&self, call: ResolvedCall) -> Result<TransportResponse, TransportError> {
        let opts = self.clone();
        tokio::task::spawn_blocking(move || perform(&opts, &call))
            .await
            .map_err(|e| TransportError::other(format!("transport task join: {}", e)))?
    }
}

/// Appends query parameters to `url`. Fails on URLs libcurl could not use anyway.
fn url_with_query(url: &str, query: &[(String, String)]) -> Result<String, TransportError> {
    let mut parsed = url::Url::parse(url)
        .map_err(|e| TransportError::other(format!("invalid URL {:?}: {}", url, e)))?;
    if !query.is_empty() {
        let mut pairs = parsed.query_pairs_mut();
        for (k, v) in query {
            pairs.append_pair(k, v);
        }
    }
    Ok(parsed.into())
}

fn map_curl_error(e: curl::Error) -> TransportError {
    if e.is_operation_timedout() {
        return TransportError::timed_out(format!("timeout: {}", e));
    }
    if e.is_aborted_by_callback() {
        return TransportError::aborted(e.to_string());
    }
    TransportError::other(e.to_string())
}

fn perform(opts: &CurlTransport, call: &ResolvedCall) -> Result<TransportResponse, TransportError> {
    let url = url_with_query(&call.url, &call.query)?;
    let body = match &call.body {
        Some(v) if !call.method.is_read() && call.method != Method::Head => Some(
            serde_json::to_vec(v)
                .map_err(|e| TransportError::other(format!("encode body: {}", e)))?,
        ),
        _ => None,
    };

    let mut easy = curl::easy::Easy::new();
    configure(&mut easy, opts, call, &url, body.as_deref()).map_err(map_curl_error)?;

    let mut header_lines: Vec<String> = Vec::new();
    let mut raw: Vec<u8> = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(map_curl_error)?;
        transfer
            .write_function(|data| {
                raw.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(map_curl_error)?;
        transfer.perform().map_err(map_curl_error)?;
    }

    let status = easy.response_code().map_err(map_curl_error)?;
    Ok(TransportResponse {
        status: u16::try_from(status).unwrap_or(u16::MAX),
        headers: parse_header_lines(&header_lines),
        body: decode_body(&raw),
    })
}

fn configure(
    easy: &mut curl::easy::Easy,
    opts: &CurlTransport,
    call: &ResolvedCall,
    url: &str,
    body: Option<&[u8]>,
) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.follow_location(opts.follow_redirects)?;
    easy.max_redirections(opts.max_redirections)?;
    easy.connect_timeout(opts.connect_timeout)?;
    if let Some(t) = call.timeout {
        easy.timeout(t)?;
    }

    match call.method {
        Method::Get => easy.get(true)?,
        Method::Head => easy.nobody(true)?,
        Method::Post => easy.post(true)?,
        other => easy.custom_request(other.as_str())?,
    }
    if let Some(bytes) = body {
        easy.post_fields_copy(bytes)?;
    }

    let mut list = curl::easy::List::new();
    for (k, v) in &call.headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if !call.headers.is_empty() {
        easy.http_headers(list)?;
    }
    Ok(())
}

/// Collect `Name: value` lines from the final response, skipping status lines.
/// Redirect hops reset the list so only the last response's headers survive.
fn parse_header_lines(lines: &[String]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.starts_with("HTTP/") {
            out.clear();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            out.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    out
}
