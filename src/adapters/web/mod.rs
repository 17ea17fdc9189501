//! Web server adapter.
//!
//! Serves the JSON API (`/health`, `/tickers/search`, `/history`, `/signals`,
//! `/forecast`, `/backtest`) and an HTMX dashboard for running backtests from
//! a browser. Fetch and compute work is synchronous and runs on the blocking
//! pool.

mod api;
pub mod chart_svg;
mod dto;
mod error;
mod handlers;
mod templates;

pub use dto::*;
pub use error::{ApiError, WebError, status_from_error};

use axum::{
    Router,
    http::{HeaderMap, HeaderValue, Method},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::domain::error::TradecastError;
use crate::domain::fetcher::DataFetcher;
use crate::domain::settings::Settings;
use crate::domain::universe::SymbolDirectory;

pub struct AppState {
    pub fetcher: DataFetcher,
    pub symbols: Arc<SymbolDirectory>,
    pub settings: Arc<Settings>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.web.cors_origins);
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/dashboard/backtest", post(handlers::run_backtest))
        .route("/health", get(api::health))
        .route("/tickers/search", get(api::search_tickers))
        .route("/history", get(api::history))
        .route("/signals", get(api::signals))
        .route("/forecast", get(api::forecast))
        .route("/backtest", get(api::backtest))
        .fallback(api::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

fn is_htmx_request(headers: &HeaderMap) -> bool {
    headers.get("HX-Request").is_some()
}

/// Run blocking fetch/compute work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, TradecastError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TradecastError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TradecastError::Io(std::io::Error::other(e)))?
}
