//! Server Assembly (A5): builds the axum `Router` from a validated
//! [`Config`], wiring each configured route to the right pipeline handler
//! per §4.5 — `ReadCache -> ProxyIfMiss -> WriteCache` for `cache` routes,
//! `MatchAndBust -> Proxy` for `bust` routes, bare `Proxy` for everything
//! else.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Path as AxumPath;
use axum::http::{HeaderMap, Method, Uri};
use axum::routing::{any, on, MethodFilter, MethodRouter};
use axum::{body::Bytes, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::cache::Cache;
use crate::config::Config;
use crate::pipeline::{
    bust_route_impl, bust_then_cached_read_impl, cached_read, proxy_only, AppState, SharedState,
};
use crate::proxy::Proxy;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the shared application state: cache, proxy client, and config.
pub fn build_state(config: Config) -> Result<SharedState, reqwest::Error> {
    let capacity = config.capacity;
    let proxy = Proxy::new(config.api_url.clone(), UPSTREAM_TIMEOUT)?;
    let cache = Cache::new(capacity).expect("capacity already validated by config loading");
    Ok(Arc::new(AppState { cache, proxy, config }))
}

/// Assembles the router: bust routes (merged with any cache route on the
/// same method+path per §4.5's `MatchAndBust -> ReadCache` ordering), then
/// the remaining plain cache routes, then a catch-all proxy.
pub fn build_router(state: SharedState) -> Router {
    let mut router = Router::new();

    let mut cache_keys: HashSet<(String, String)> = HashSet::new();
    for (method, routes) in &state.config.cache_routes {
        for route in routes {
            cache_keys.insert((method.to_ascii_uppercase(), route.clone()));
        }
    }

    let mut registered: HashSet<(String, String)> = HashSet::new();

    for (method, routes) in &state.config.bust_routes {
        let method = method.to_ascii_uppercase();
        for (route, patterns) in routes {
            let key = (method.clone(), route.clone());
            let combined = cache_keys.contains(&key);
            registered.insert(key);

            let patterns = Arc::new(patterns.clone());
            let state_for_route = state.clone();
            let handler = move |AxumPath(path_params): AxumPath<HashMap<String, String>>,
                                 method: Method,
                                 uri: Uri,
                                 headers: HeaderMap,
                                 body: Bytes| {
                let state_for_route = state_for_route.clone();
                let patterns = patterns.clone();
                async move {
                    if combined {
                        bust_then_cached_read_impl(state_for_route, method, uri, headers, path_params, patterns, body).await
                    } else {
                        bust_route_impl(state_for_route, method, uri, headers, path_params, patterns, body).await
                    }
                }
            };

            match method_router_on(&method, handler) {
                Some(method_router) => router = router.route(route, method_router),
                None => warn!(%method, %route, "bust method has no axum routable equivalent, route not registered"),
            }
        }
    }

    for (method, routes) in &state.config.cache_routes {
        let method_upper = method.to_ascii_uppercase();
        for route in routes {
            if registered.contains(&(method_upper.clone(), route.clone())) {
                continue; // already wired into the combined bust+cache handler above
            }
            router = router.route(route, cache_method_router(&method_upper));
        }
    }

    router.fallback(any(proxy_only)).with_state(state)
}

fn cache_method_router(method: &str) -> MethodRouter<SharedState> {
    match method {
        "HEAD" => axum::routing::head(cached_read),
        _ => axum::routing::get(cached_read),
    }
}

/// Maps a configured method string onto axum's actual `MethodFilter`, so a
/// bust route fires only for the method it was configured under. Returns
/// `None` for methods axum's router cannot dispatch on directly (`CONNECT`
/// is intercepted before routing, never reaching a handler).
fn method_router_on<H, T>(method: &str, handler: H) -> Option<MethodRouter<SharedState>>
where
    H: axum::handler::Handler<T, SharedState> + Clone + Send + Sync + 'static,
    T: 'static,
{
    let method = Method::from_bytes(method.as_bytes()).ok()?;
    let filter = MethodFilter::try_from(method).ok()?;
    Some(on(filter, handler))
}

/// Runs the server until a shutdown signal (SIGINT/SIGTERM) is received.
pub async fn serve(state: SharedState) -> std::io::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.hostname, state.config.port)
        .parse()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
    let router = build_router(state).layer(crate::telemetry::http_trace_layer());

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl_c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
