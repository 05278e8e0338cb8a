//! HTTP routes for the server.

use crate::{
    auth::require_actor,
    error::{ApiError, JsonBody},
    sse::create_event_stream,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Extension, Router,
};
use folio_core::{
    Actor, CreateDocumentInput, CreateVersionInput, Diff, DiffSummary, Page, RenameDocumentInput,
    UpdateContentInput,
};
use folio_storage::{Document, Version};
use serde::Serialize;
use std::{collections::HashMap, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, Span};

type ApiResult<T> = Result<T, ApiError>;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let authenticated = Router::new()
        // ===================
        // Documents
        // ===================
        .route("/documents", post(document_create).get(document_list))
        .route("/documents/{id}", get(document_get).patch(document_rename))
        .route(
            "/documents/{id}/current-version",
            put(document_update_current),
        )
        // ===================
        // Versions
        // ===================
        .route(
            "/documents/{id}/versions",
            post(version_create).get(version_list),
        )
        .route("/documents/{id}/versions/{version_id}", get(version_get))
        .route(
            "/documents/{id}/versions/{version_id}/merge",
            post(version_merge),
        )
        .route("/versions/{version_id}", put(version_update_content))
        // ===================
        // SSE events
        // ===================
        .route("/events", get(events))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_actor));

    Router::new()
        .route("/health", get(health))
        .merge(authenticated)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &Span| {
                    info!(
                        method = %request.method(),
                        path = %request.uri().path(),
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                        info!(
                            status = %response.status(),
                            latency = ?latency,
                            "response"
                        );
                    },
                ),
        )
        .with_state(state)
}

// =============================================================================
// Response types
// =============================================================================

/// A document together with the version that produced its content.
#[derive(Debug, Serialize)]
struct DocumentWithVersion {
    document: Document,
    version: Version,
}

/// A version plus a readable rendering of its stored diff.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionDetail {
    #[serde(flatten)]
    version: Version,
    /// Absent when the stored diff can't be read back.
    #[serde(skip_serializing_if = "Option::is_none")]
    diff_summary: Option<DiffSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff_text: Option<String>,
}

impl From<Version> for VersionDetail {
    fn from(version: Version) -> Self {
        match serde_json::from_value::<Diff>(version.diff.clone()) {
            Ok(diff) => Self {
                diff_summary: Some(diff.summary()),
                diff_text: Some(diff.to_string()),
                version,
            },
            Err(e) => {
                tracing::debug!(version_id = %version.id, error = %e, "Unreadable stored diff");
                Self {
                    version,
                    diff_summary: None,
                    diff_text: None,
                }
            }
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "healthy": true,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Change events for the caller's documents.
async fn events(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> impl IntoResponse {
    create_event_stream(state.bus().clone(), actor)
}

async fn document_create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    JsonBody(body): JsonBody,
) -> ApiResult<impl IntoResponse> {
    let input = CreateDocumentInput::from_json(&body)?;
    let (document, version) = state.history.create_document(&actor, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentWithVersion { document, version }),
    ))
}

async fn document_list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::from_query(
        query.get("page").map(String::as_str),
        query.get("limit").map(String::as_str),
        &state.config,
    );
    let paged = state.history.list_documents(&actor, page).await?;
    Ok(Json(paged))
}

async fn document_get(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.history.get_document(&actor, &id).await?))
}

async fn document_rename(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> ApiResult<impl IntoResponse> {
    let input = RenameDocumentInput::from_json(&body)?;
    Ok(Json(state.history.rename_document(&actor, &id, input).await?))
}

async fn document_update_current(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> ApiResult<impl IntoResponse> {
    let input = UpdateContentInput::from_json(&body)?;
    let version = state
        .history
        .update_current_version(&actor, &id, input)
        .await?;
    Ok(Json(version))
}

async fn version_create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> ApiResult<impl IntoResponse> {
    let input = CreateVersionInput::from_json(&body)?;
    let version = state.history.create_version(&actor, &id, input).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

async fn version_list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.history.list_versions(&actor, &id).await?))
}

async fn version_get(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((id, version_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let version = state.history.get_version(&actor, &id, &version_id).await?;
    Ok(Json(VersionDetail::from(version)))
}

async fn version_merge(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((id, version_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let (document, version) = state.history.merge(&actor, &id, &version_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentWithVersion { document, version }),
    ))
}

async fn version_update_content(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(version_id): Path<String>,
    JsonBody(body): JsonBody,
) -> ApiResult<impl IntoResponse> {
    let input = UpdateContentInput::from_json(&body)?;
    let version = state
        .history
        .update_version_content(&actor, &version_id, input)
        .await?;
    Ok(Json(version))
}
