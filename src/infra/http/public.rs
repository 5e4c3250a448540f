use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::info;

use crate::{
    application::{
        error::HttpError,
        score::{ScoreRequest, ScoreService},
    },
    domain::format::OutputFormat,
    presentation::{Rendered, ResponseRenderer},
};

use super::middleware::{cors_layer, log_responses, set_request_context};
use super::store_health_response;

const SOURCE: &str = "infra::http::public";
const ENDPOINT_PREFIX: &str = "score.";
const SVG_CACHE_CONTROL: &str = "no-cache, private";

#[derive(Clone)]
pub struct AppState {
    pub scores: ScoreService,
    pub renderer: Arc<ResponseRenderer>,
}

impl AppState {
    pub fn new(scores: ScoreService, renderer: ResponseRenderer) -> Self {
        Self {
            scores,
            renderer: Arc::new(renderer),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/score", get(score))
        .route("/{endpoint}", get(score_with_format))
        .route("/_health/store", get(store_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
        .layer(cors_layer())
}

type QueryPairs = Vec<(String, String)>;

async fn score(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QueryPairs>,
) -> Response {
    respond(&state, OutputFormat::Json, &params, &headers).await
}

async fn score_with_format(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    Query(params): Query<QueryPairs>,
) -> Response {
    let Some(suffix) = endpoint.strip_prefix(ENDPOINT_PREFIX) else {
        return HttpError::new(
            "infra::http::public::score_with_format",
            StatusCode::NOT_FOUND,
            "Not found",
            format!("no route for `/{endpoint}`"),
        )
        .into_response();
    };

    respond(&state, OutputFormat::from_suffix(Some(suffix)), &params, &headers).await
}

async fn store_health(State(state): State<AppState>) -> Response {
    store_health_response(state.scores.cache().store().ping().await)
}

/// Parse query parameters into a [`ScoreRequest`].
///
/// `url` and `github` are aliases; `human_breakdown` must be exactly `true`;
/// `force` is enabled by presence alone.
fn score_request(params: &[(String, String)]) -> ScoreRequest {
    let first = |name: &str| {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };

    ScoreRequest::new(
        [first("url"), first("github")],
        first("human_breakdown") == Some("true"),
        params.iter().any(|(key, _)| key == "force"),
    )
}

async fn respond(
    state: &AppState,
    format: OutputFormat,
    params: &[(String, String)],
    headers: &HeaderMap,
) -> Response {
    let request = score_request(params);
    let outcome = state.scores.lookup(&request).await;

    let score = match &outcome {
        Ok(score) => Some(score),
        Err(err) => {
            info!(
                target = SOURCE,
                op = "score",
                identifier = request.identifier_or_empty(),
                format = format.as_str(),
                result = err.kind(),
                error = %err,
                "Serving error body"
            );
            None
        }
    };

    let rendered = state
        .renderer
        .render(score, format, request.identifier_or_empty())
        .await;
    rendered_response(rendered, headers)
}

fn rendered_response(rendered: Rendered, headers: &HeaderMap) -> Response {
    let Rendered {
        content_type,
        body,
        etag,
    } = rendered;

    let Some(etag) = etag else {
        return Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
    };

    let (status, body) = if etag_matches(headers, &etag) {
        (StatusCode::NOT_MODIFIED, Body::empty())
    } else {
        (StatusCode::OK, Body::from(body))
    };

    let mut response = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
    set_revalidate(&mut response, &etag);
    response
}

fn set_revalidate(response: &mut Response, etag: &str) {
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(SVG_CACHE_CONTROL));
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert(ETAG, value);
    }
}

/// Weak comparison of `If-None-Match` against the current tag.
fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|candidate| {
            let candidate = candidate.trim();
            candidate.strip_prefix("W/").unwrap_or(candidate)
        })
        .any(|candidate| candidate == "*" || candidate == etag)
}
