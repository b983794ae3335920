//! Upstream Proxy (C6): forwards the inbound request to the origin,
//! preserving method, headers, and body; strips the origin's `Server`
//! header from the response before it is either cached or replayed.

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, Method, StatusCode};

use crate::error::PipelineError;

/// A captured upstream response, ready to be replayed to the client and
/// optionally written into the cache.
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxiedResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Forwards requests to a single configured origin over a shared,
/// connection-pooled `reqwest::Client`.
pub struct Proxy {
    client: reqwest::Client,
    origin_url: String,
}

impl Proxy {
    /// Builds a proxy targeting `origin_url` (trailing slash already
    /// stripped by config loading), with the given per-request timeout.
    pub fn new(origin_url: String, timeout: Duration) -> reqwest::Result<Proxy> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Proxy { client, origin_url })
    }

    /// Forwards one request and captures the upstream response. The
    /// `Server` header is stripped here so neither the client nor the
    /// cache ever see the origin's identity.
    pub async fn forward(
        &self,
        method: Method,
        request_target: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<ProxiedResponse, PipelineError> {
        let url = format!("{}{}", self.origin_url, request_target);

        let response = self
            .client
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    PipelineError::UpstreamTimeout
                } else {
                    PipelineError::UpstreamUnreachable(err)
                }
            })?;

        let status = response.status();
        let mut headers = response.headers().clone();
        headers.remove(HeaderName::from_static("server"));
        let body = response
            .bytes()
            .await
            .map_err(PipelineError::UpstreamUnreachable)?;

        Ok(ProxiedResponse {
            status,
            headers,
            body,
        })
    }
}
