//! # API Endpoint Handlers
//!
//! Reads take the registry read lock; decisions and submissions take the
//! write lock for the whole load → transition → save sequence.
//!
//! Single-record reads go through [`Registry::lookup`]: a record that is
//! missing, malformed or unreadable is a 404, never a 500.

use super::{
    AppState,
    types::{
        ApiError, ApplicationListResponse, ApplicationResponse, ApplicationSummary,
        DecisionRequest, HealthResponse, ListQuery, ProgressResponse, SubmitRequest,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use membership_core::{
    Application, ApplicationId, MembershipError, ProgressReport, Registry, export_digest,
    export_filename, export_json,
};

/// Response header carrying the BLAKE3 digest of an export body.
pub const EXPORT_DIGEST_HEADER: &str = "x-export-digest";

/// Display lookup of one record; anything short of a readable record is
/// `NotFound`.
fn find(registry: &Registry, id: String) -> Result<Application, ApiError> {
    let id = ApplicationId::new(id);
    registry
        .lookup(&id)
        .ok_or_else(|| ApiError(MembershipError::NotFound(id)))
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// LIST / SUBMIT
// =============================================================================

/// List applications, optionally only one member's.
pub async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApplicationListResponse>, ApiError> {
    let registry = state.registry.read().await;
    let apps = match query.user_id.as_deref() {
        Some(user_id) => registry.list_for_user(user_id)?,
        None => registry.list()?,
    };

    let applications: Vec<ApplicationSummary> =
        apps.iter().map(ApplicationSummary::from_application).collect();
    Ok(Json(ApplicationListResponse {
        count: applications.len(),
        applications,
    }))
}

/// Submit a new application.
pub async fn submit_handler(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<ApplicationResponse>), ApiError> {
    let mut registry = state.registry.write().await;
    let application = registry.submit(&request.user_id, request.profile, Utc::now())?;

    tracing::info!(
        event = "application_submitted",
        application_id = %application.id,
        user_id = %application.user_id,
        "Application submitted"
    );

    Ok((StatusCode::CREATED, Json(ApplicationResponse { application })))
}

// =============================================================================
// SINGLE APPLICATION
// =============================================================================

/// Fetch one application.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let registry = state.registry.read().await;
    let application = find(&registry, id)?;
    Ok(Json(ApplicationResponse { application }))
}

/// Approve or reject the current stage.
pub async fn decide_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let role = request.role()?;
    let id = ApplicationId::new(id);

    let mut registry = state.registry.write().await;
    let application = registry.decide(&id, request.action, role, request.notes(), Utc::now())?;

    tracing::info!(
        event = "stage_decided",
        application_id = %id,
        role = %role,
        decision = ?request.action,
        status = %application.status,
        "Stage decided"
    );

    Ok(Json(ApplicationResponse { application }))
}

/// Derived progress view of one application.
pub async fn progress_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let registry = state.registry.read().await;
    let application = find(&registry, id)?;
    Ok(Json(ProgressResponse {
        application_id: application.id.to_string(),
        progress: ProgressReport::from_application(&application),
    }))
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Download the raw record as a JSON attachment.
pub async fn export_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let application = {
        let registry = state.registry.read().await;
        find(&registry, id)?
    };

    let body = export_json(&application)?;
    let digest = export_digest(&application)?;
    let disposition = format!("attachment; filename=\"{}\"", export_filename(&application));

    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Ok(value) = HeaderValue::from_str(&digest) {
        headers.insert(EXPORT_DIGEST_HEADER, value);
    }
    Ok(response)
}
