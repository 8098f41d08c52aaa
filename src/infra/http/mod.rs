//! HTTP surface for the batch widget protocol.

pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use tracing::{error, warn};

use crate::config::HttpSettings;
use crate::domain::widget::CacheControl;
use crate::router::BatchRouter;

use super::error::InfraError;

/// Shared state for the widget endpoints.
#[derive(Clone)]
pub struct WidgetState {
    pub router: Arc<BatchRouter>,
    pub default_cache_control: Option<CacheControl>,
    pub cors_allow_origin: Option<HeaderValue>,
}

impl WidgetState {
    /// Validates header-shaped settings once at startup.
    pub fn new(router: Arc<BatchRouter>, http: &HttpSettings) -> Result<Self, InfraError> {
        let cors_allow_origin = http
            .cors_allow_origin
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|err| {
                InfraError::configuration(format!("invalid http.cors_allow_origin: {err}"))
            })?;

        if let Some(value) = http.default_cache_control.as_deref() {
            HeaderValue::from_str(value).map_err(|err| {
                InfraError::configuration(format!("invalid http.default_cache_control: {err}"))
            })?;
        }

        Ok(Self {
            router,
            default_cache_control: http.default_cache_control.clone().map(CacheControl::new),
            cors_allow_origin,
        })
    }
}

pub fn build_router(state: WidgetState) -> Router {
    Router::new()
        .route("/widgets", get(handlers::widget_batch))
        .route("/widgets/{name}", get(handlers::widget_show))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
}

/// Structured diagnostics attached to error responses for the logging layer.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub message: String,
}

impl ErrorReport {
    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            message: message.into(),
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, message) = match report {
            Some(report) => (report.source, report.message),
            None => ("unknown", String::new()),
        };

        if status.is_server_error() {
            error!(
                %method,
                %uri,
                status = status.as_u16(),
                source,
                message,
                elapsed_ms,
                "request failed"
            );
        } else {
            warn!(
                %method,
                %uri,
                status = status.as_u16(),
                source,
                message,
                elapsed_ms,
                "request rejected"
            );
        }
    }

    response
}
