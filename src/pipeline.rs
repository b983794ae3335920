//! Request Pipeline (C5): per-route handler chains built once at startup
//! from configuration and dispatched per request. Re-expressed as explicit
//! axum handlers rather than the source's implicit middleware `next()`
//! chain, per the design note against hidden control flow.

use std::collections::HashMap as StdHashMap;
use std::sync::Arc;

use axum::body::Bytes as AxumBytes;
use axum::extract::State;
use axum::http::{HeaderMap as AxumHeaderMap, HeaderName as AxumHeaderName, HeaderValue as AxumHeaderValue, Method as AxumMethod, StatusCode as AxumStatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::cache::Cache;
use crate::config::Config;
use crate::key::build_key;
use crate::proxy::Proxy;

const CACHE_HEADER: &str = "x-lru-cache";

/// Shared state every handler closes over; owned by the top-level process,
/// not a process-wide global.
pub struct AppState {
    pub cache: Cache,
    pub proxy: Proxy,
    pub config: Config,
}

pub type SharedState = Arc<AppState>;

/// Converts an axum header map (http 1.x) into the http-0.2 map reqwest
/// expects. axum 0.7 and reqwest 0.11 straddle the http-crate major version
/// bump, so every header crossing the proxy boundary passes through here.
fn to_reqwest_headers(headers: &AxumHeaderMap) -> http::HeaderMap {
    let mut out = http::HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_str().as_bytes()),
            http::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            out.append(name, value);
        }
    }
    out
}

fn to_axum_headers(headers: &http::HeaderMap) -> AxumHeaderMap {
    let mut out = AxumHeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if let (Ok(name), Ok(value)) = (
            AxumHeaderName::from_bytes(name.as_str().as_bytes()),
            AxumHeaderValue::from_bytes(value.as_bytes()),
        ) {
            out.append(name, value);
        }
    }
    out
}

fn to_reqwest_method(method: &AxumMethod) -> http::Method {
    http::Method::from_bytes(method.as_str().as_bytes()).unwrap_or(http::Method::GET)
}

fn to_axum_status(status: http::StatusCode) -> AxumStatusCode {
    AxumStatusCode::from_u16(status.as_u16()).unwrap_or(AxumStatusCode::BAD_GATEWAY)
}

fn request_target(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

fn headers_to_pairs(headers: &http::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// Plain proxy: no cache interaction at all. The fallback for any route not
/// listed under `cache` or `bust`.
pub async fn proxy_only(
    State(state): State<SharedState>,
    method: AxumMethod,
    uri: Uri,
    headers: AxumHeaderMap,
    body: AxumBytes,
) -> Response {
    proxy_passthrough(&state, &method, &uri, &headers, body, "MISS").await
}

async fn proxy_passthrough(
    state: &SharedState,
    method: &AxumMethod,
    uri: &Uri,
    headers: &AxumHeaderMap,
    body: AxumBytes,
    cache_header: &'static str,
) -> Response {
    let target = request_target(uri);
    match state
        .proxy
        .forward(
            to_reqwest_method(method),
            &target,
            to_reqwest_headers(headers),
            Bytes::from(body),
        )
        .await
    {
        Ok(resp) => {
            let mut out_headers = to_axum_headers(&resp.headers);
            out_headers.insert(CACHE_HEADER, AxumHeaderValue::from_static(cache_header));
            (to_axum_status(resp.status), out_headers, resp.body.to_vec()).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Cached-read route: `ReadCache -> ProxyIfMiss -> WriteCache`.
pub async fn cached_read(
    State(state): State<SharedState>,
    method: AxumMethod,
    uri: Uri,
    headers: AxumHeaderMap,
    body: AxumBytes,
) -> Response {
    read_cache_or_proxy(&state, &method, &uri, &headers, body).await
}

async fn read_cache_or_proxy(
    state: &SharedState,
    method: &AxumMethod,
    uri: &Uri,
    headers: &AxumHeaderMap,
    body: AxumBytes,
) -> Response {
    let key = build_key(method.as_str(), &request_target(uri));

    if let Some(cached) = state.cache.get(&key) {
        let mut out_headers = AxumHeaderMap::new();
        for (name, value) in cached.headers() {
            if let (Ok(name), Ok(value)) = (
                AxumHeaderName::from_bytes(name.as_bytes()),
                AxumHeaderValue::from_str(value),
            ) {
                out_headers.append(name, value);
            }
        }
        out_headers.insert(CACHE_HEADER, AxumHeaderValue::from_static("HIT"));
        return (AxumStatusCode::OK, out_headers, cached.body().to_vec()).into_response();
    }

    let target = request_target(uri);
    let forwarded = state
        .proxy
        .forward(
            to_reqwest_method(method),
            &target,
            to_reqwest_headers(headers),
            Bytes::from(body),
        )
        .await;

    match forwarded {
        Ok(resp) => {
            if resp.is_success() {
                let response = crate::entry::CachedResponse::new(
                    headers_to_pairs(&resp.headers),
                    resp.body.to_vec(),
                );
                state.cache.set(key, response);
            } else {
                tracing::debug!(category = "SKIP", key = %key, status = %resp.status, "non-2xx, not cached");
            }
            let mut out_headers = to_axum_headers(&resp.headers);
            out_headers.insert(CACHE_HEADER, AxumHeaderValue::from_static("MISS"));
            (to_axum_status(resp.status), out_headers, resp.body.to_vec()).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Hydrates `patterns` against the request's path parameters, matches them
/// against the current key set, and busts every match. Matching an empty
/// set is a no-op, not a bust-everything.
fn bust_matching(state: &SharedState, patterns: &[String], path_params: &StdHashMap<String, String>) {
    let params: Vec<(String, String)> = path_params.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    let matched = state.cache.match_keys(patterns, &params);
    if !matched.is_empty() {
        state.cache.bust(matched);
    }
}

/// A bust-only configured route: `MatchAndBust -> Proxy`, no cache read.
///
/// Not an axum handler itself — `patterns` isn't an extractor. Routes are
/// registered in `server.rs` as a closure over a per-route `Arc<Vec<String>>`
/// that calls straight through to this function.
pub async fn bust_route_impl(
    state: SharedState,
    method: AxumMethod,
    uri: Uri,
    headers: AxumHeaderMap,
    path_params: StdHashMap<String, String>,
    patterns: Arc<Vec<String>>,
    body: AxumBytes,
) -> Response {
    bust_matching(&state, &patterns, &path_params);
    proxy_passthrough(&state, &method, &uri, &headers, body, "MISS").await
}

/// A route configured as both a cache route and a bust route for the same
/// method: `MatchAndBust -> ReadCache -> ProxyIfMiss -> WriteCache`. The
/// bust runs first so a mutating request that also matches its own cached
/// GET/HEAD key (as `DELETE /posts/:id => ^GET:/posts/:id$` typically does)
/// never serves the stale entry it just invalidated.
pub async fn bust_then_cached_read_impl(
    state: SharedState,
    method: AxumMethod,
    uri: Uri,
    headers: AxumHeaderMap,
    path_params: StdHashMap<String, String>,
    patterns: Arc<Vec<String>>,
    body: AxumBytes,
) -> Response {
    bust_matching(&state, &patterns, &path_params);
    read_cache_or_proxy(&state, &method, &uri, &headers, body).await
}
