//! Widget endpoint handlers.

use axum::extract::{Path, Query, State};
use axum::http::{
    HeaderMap, HeaderValue, StatusCode,
    header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE},
};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::warn;

use crate::domain::widget::{CacheControl, WidgetRequest};
use crate::widget::{RequestContext, WidgetCall};

use super::{ApiError, WidgetState};

const JSON_CONTENT_TYPE: &str = "application/json";
const JSONP_CONTENT_TYPE: &str = "text/javascript";

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    /// JSON-encoded array of widget requests.
    pub bulk: Option<String>,
    pub format: Option<String>,
    pub callback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShowQuery {
    /// JSON-encoded `{args, kwargs}` object.
    pub data: Option<String>,
    pub format: Option<String>,
    pub callback: Option<String>,
}

/// `GET /widgets?bulk=[...]` — the batch entry point.
pub async fn widget_batch(
    State(state): State<WidgetState>,
    headers: HeaderMap,
    Query(query): Query<BatchQuery>,
) -> Result<Response, ApiError> {
    let raw = query
        .bulk
        .as_deref()
        .ok_or_else(|| ApiError::not_found("missing bulk parameter", None))?;

    let bulk: Vec<WidgetRequest> = serde_json::from_str(raw)
        .map_err(|err| ApiError::not_found("malformed bulk parameter", Some(err.to_string())))?;

    let ctx = RequestContext { headers };
    let outcome = state.router.route(&ctx, bulk).await;

    let payload = serde_json::to_string(&outcome.results)
        .map_err(|err| ApiError::internal(Some(err.to_string())))?;

    Ok(build_response(
        &state,
        jsonp_callback(query.format.as_deref(), query.callback.as_deref()),
        payload,
        outcome.cache_control,
    ))
}

/// `GET /widgets/{name}?data={...}` — direct single-widget invocation.
///
/// A debugging convenience mirroring the batch pipeline for one handler;
/// errors surface as a 500 rather than through `on_error`.
pub async fn widget_show(
    State(state): State<WidgetState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Query(query): Query<ShowQuery>,
) -> Result<Response, ApiError> {
    let call: WidgetCall = match query.data.as_deref() {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|err| ApiError::not_found("malformed data parameter", Some(err.to_string())))?,
        None => WidgetCall::default(),
    };

    let ctx = RequestContext { headers };
    let output = state
        .router
        .invoke_single(&ctx, &name, call.args, call.kwargs)
        .await
        .ok_or_else(|| ApiError::not_found("widget not found", None))?
        .map_err(|err| ApiError::internal(Some(err.to_string())))?;

    let payload = serde_json::to_string(&output.envelope)
        .map_err(|err| ApiError::internal(Some(err.to_string())))?;

    Ok(build_response(
        &state,
        jsonp_callback(query.format.as_deref(), query.callback.as_deref()),
        payload,
        output.cache_control,
    ))
}

fn jsonp_callback<'a>(format: Option<&str>, callback: Option<&'a str>) -> Option<&'a str> {
    match (format, callback) {
        (Some("jsonp"), Some(callback)) if !callback.is_empty() => Some(callback),
        _ => None,
    }
}

fn build_response(
    state: &WidgetState,
    callback: Option<&str>,
    payload: String,
    cache_control: Option<CacheControl>,
) -> Response {
    let (body, content_type) = match callback {
        Some(callback) => (format!("{callback}({payload});"), JSONP_CONTENT_TYPE),
        None => (payload, JSON_CONTENT_TYPE),
    };

    let mut response = (
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static(content_type))],
        body,
    )
        .into_response();

    let directive = cache_control.or_else(|| state.default_cache_control.clone());
    if let Some(directive) = directive {
        match HeaderValue::from_str(directive.as_str()) {
            Ok(value) => {
                response.headers_mut().insert(CACHE_CONTROL, value);
            }
            Err(err) => {
                warn!(
                    directive = directive.as_str(),
                    error = %err,
                    "dropping unrepresentable cache-control directive"
                );
            }
        }
    }

    if let Some(origin) = state.cors_allow_origin.as_ref() {
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    }

    response
}
