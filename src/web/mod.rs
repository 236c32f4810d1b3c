// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! HTTP surface: the badge route with its caching contract, the JSON API, and the
//! mutation endpoints that invalidate cached badges.

pub mod conditional;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::cache::BadgeCache;
use crate::render::render_error_badge;
use crate::store::{SqliteStore, StoreError};
use conditional::{etag_for, http_date, not_modified};

const SVG_CONTENT_TYPE: &str = "image/svg+xml; charset=utf-8";
const CACHE_TTL_SECONDS: u64 = 300;

const CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("cdn-cache-control");
const SURROGATE_CONTROL: HeaderName = HeaderName::from_static("surrogate-control");

#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub cache: Arc<BadgeCache>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/u/{username}", get(badge))
        .route("/api/recommendations/{username}", get(recommendations_json))
        .route("/api/recommend", post(add_recommendation))
        .route("/api/recommendations/{id}/visibility", post(set_visibility))
        .with_state(state)
}

/// `GET /u/{username}` — the badge document, with CDN cache headers and conditional
/// request handling. Failures surface as a 500 with the degenerate error badge.
async fn badge(
    State(state): State<AppState>,
    Path(username): Path<String>,
    request_headers: HeaderMap,
) -> Response {
    let store = state.store.clone();
    let rendered = state
        .cache
        .get_or_render(&username, move |target| async move {
            store.visible_recommendations_for(&target).await
        })
        .await;

    let rendered = match rendered {
        Ok(rendered) => rendered,
        Err(err) => {
            tracing::error!(username, error = %err, "badge render failed");
            return svg_error_response();
        }
    };

    let etag = etag_for(&username, rendered.last_modified_ms);
    let if_none_match = header_str(&request_headers, header::IF_NONE_MATCH);
    let if_modified_since = header_str(&request_headers, header::IF_MODIFIED_SINCE);

    let headers = cache_headers(&etag, rendered.last_modified_ms);
    if not_modified(if_none_match, if_modified_since, &etag, rendered.last_modified_ms) {
        tracing::debug!(username, "conditional match, responding 304");
        (StatusCode::NOT_MODIFIED, headers).into_response()
    } else {
        (StatusCode::OK, headers, rendered.svg).into_response()
    }
}

/// `GET /api/recommendations/{username}` — the same rows as JSON, no caching contract.
async fn recommendations_json(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Response {
    match state.store.visible_recommendations_for(&username).await {
        Ok(rows) => Json(json!({ "username": username, "recommenders": rows })).into_response(),
        Err(err) => {
            tracing::error!(username, error = %err, "recommendation query failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendBody {
    recommender_username: String,
    #[serde(default)]
    recommender_name: Option<String>,
    recommended_username: String,
    #[serde(default)]
    recommendation_text: Option<String>,
}

/// `POST /api/recommend` — stores a recommendation and synchronously invalidates the
/// target's cached badge.
async fn add_recommendation(
    State(state): State<AppState>,
    Json(body): Json<RecommendBody>,
) -> Response {
    let result = state
        .store
        .add_recommendation(
            &body.recommender_username,
            body.recommender_name.as_deref(),
            &body.recommended_username,
            body.recommendation_text.as_deref(),
        )
        .await;

    match result {
        Ok(()) => {
            state.cache.invalidate(&body.recommended_username);
            Json(json!({ "success": true, "message": "Recommendation added successfully" }))
                .into_response()
        }
        Err(StoreError::Validation(message)) => error_json(StatusCode::BAD_REQUEST, &message),
        Err(err) => {
            tracing::error!(error = %err, "failed to save recommendation");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save recommendation")
        }
    }
}

#[derive(Debug, Deserialize)]
struct VisibilityBody {
    visible: bool,
}

/// `POST /api/recommendations/{id}/visibility` — toggles a row and invalidates the
/// affected username's cached badge.
async fn set_visibility(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<VisibilityBody>,
) -> Response {
    match state.store.set_visibility(id, body.visible).await {
        Ok(username) => {
            state.cache.invalidate(&username);
            Json(json!({ "success": true })).into_response()
        }
        Err(StoreError::NotFound) => error_json(StatusCode::NOT_FOUND, "Recommendation not found"),
        Err(err) => {
            tracing::error!(id, error = %err, "failed to update visibility");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update visibility")
        }
    }
}

async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

fn cache_headers(etag: &str, last_modified_ms: i64) -> [(HeaderName, String); 6] {
    let ttl = CACHE_TTL_SECONDS;
    [
        (header::CONTENT_TYPE, SVG_CONTENT_TYPE.to_owned()),
        (header::CACHE_CONTROL, format!("public, max-age={ttl}, s-maxage={ttl}")),
        (CDN_CACHE_CONTROL, format!("max-age={ttl}")),
        (SURROGATE_CONTROL, format!("max-age={ttl}")),
        (header::ETAG, etag.to_owned()),
        (header::LAST_MODIFIED, http_date(last_modified_ms)),
    ]
}

fn svg_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, SVG_CONTENT_TYPE)],
        render_error_badge("Failed to generate SVG"),
    )
        .into_response()
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
