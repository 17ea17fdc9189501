//! HTTP error responses for the web adapter.

use askama::Template;
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::domain::error::TradecastError;

use super::templates::{BasePage, ErrorTemplate};

pub fn status_from_error(err: &TradecastError) -> StatusCode {
    match err {
        TradecastError::InvalidInput { .. }
        | TradecastError::InvalidTicker { .. }
        | TradecastError::InsufficientData { .. } => StatusCode::BAD_REQUEST,
        TradecastError::NoData { .. } | TradecastError::TickerNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        TradecastError::Provider { .. } => StatusCode::BAD_GATEWAY,
        TradecastError::Database { .. }
        | TradecastError::DatabaseQuery { .. }
        | TradecastError::ConfigParse { .. }
        | TradecastError::ConfigMissing { .. }
        | TradecastError::ConfigInvalid { .. }
        | TradecastError::Backtest { .. }
        | TradecastError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error body: `{"detail": ..., "status": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
    status: u16,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }
}

impl From<TradecastError> for ApiError {
    fn from(err: TradecastError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: &self.detail,
            status: self.status.as_u16(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// HTML error for dashboard routes; a bare fragment for HTMX swaps.
#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
    pub fragment: bool,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>, fragment: bool) -> Self {
        Self {
            status,
            message: message.into(),
            fragment,
        }
    }

    pub fn from_domain(err: TradecastError, fragment: bool) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            error!(error = %err, "dashboard request failed");
        }
        Self::new(status, err.to_string(), fragment)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let template = ErrorTemplate {
            message: &self.message,
            status: self.status.as_u16(),
        };
        let content = match template.render() {
            Ok(html) => html,
            Err(_) => return (self.status, self.message).into_response(),
        };
        if self.fragment {
            return (self.status, Html(content)).into_response();
        }
        let page = BasePage {
            title: "Error",
            content: &content,
        };
        match page.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, Html(content)).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_by_error_kind() {
        assert_eq!(
            status_from_error(&TradecastError::invalid_input("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_from_error(&TradecastError::TickerNotFound {
                tried: vec!["ZZZZ".into()]
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_from_error(&TradecastError::Provider {
                reason: "timeout".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_from_error(&TradecastError::Database {
                reason: "locked".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
