//! # API Request/Response Types
//!
//! JSON structures for the HTTP API. Field names are camelCase to match the
//! stored application records.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use membership_core::{
    Application, Decision, MembershipError, ProfileSnapshot, ProgressReport, Role,
    overall_badge, percent_complete,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// SUBMISSION
// =============================================================================

/// New application from a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub user_id: String,
    #[serde(default)]
    pub profile: Option<ProfileSnapshot>,
}

/// A single application record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationResponse {
    pub application: Application,
}

// =============================================================================
// LISTING
// =============================================================================

/// Query string of `GET /applications`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// Only this member's applications, newest first.
    pub user_id: Option<String>,
}

/// One row of the admin application list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub id: String,
    pub user_id: String,
    pub applicant_name: String,
    pub submitted_at: String,
    pub status: String,
    pub percent_complete: u8,
    pub badge: String,
}

impl ApplicationSummary {
    #[must_use]
    pub fn from_application(app: &Application) -> Self {
        let applicant_name = app
            .profile
            .as_ref()
            .map(|p| p.display_name(&app.user_id))
            .unwrap_or_else(|| app.user_id.clone());
        Self {
            id: app.id.to_string(),
            user_id: app.user_id.clone(),
            applicant_name,
            submitted_at: app.submitted_at.to_rfc3339(),
            status: app.status.to_string(),
            percent_complete: percent_complete(app),
            badge: overall_badge(app).to_string(),
        }
    }
}

/// Application list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationListResponse {
    pub applications: Vec<ApplicationSummary>,
    pub count: usize,
}

// =============================================================================
// DECISION
// =============================================================================

/// Reviewer decision on the current stage.
///
/// The acting role is either given directly or inferred from the reviewer's
/// identifier; `reviewerRole` wins when both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub action: Decision,
    #[serde(default)]
    pub reviewer_role: Option<Role>,
    #[serde(default)]
    pub reviewer_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DecisionRequest {
    /// Resolve the acting role.
    pub fn role(&self) -> Result<Role, MembershipError> {
        match (self.reviewer_role, self.reviewer_id.as_deref()) {
            (Some(role), _) => Ok(role),
            (None, Some(id)) if !id.trim().is_empty() => Ok(Role::from_identifier(id)),
            _ => Err(MembershipError::InvalidApplication(
                "reviewerRole or reviewerId is required".to_string(),
            )),
        }
    }

    /// Notes with surrounding whitespace removed; blank notes are dropped.
    #[must_use]
    pub fn notes(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

// =============================================================================
// PROGRESS
// =============================================================================

/// Derived progress view of one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub application_id: String,
    pub progress: ProgressReport,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP-facing wrapper around [`MembershipError`].
#[derive(Debug)]
pub struct ApiError(pub MembershipError);

impl From<MembershipError> for ApiError {
    fn from(e: MembershipError) -> Self {
        Self(e)
    }
}

impl ApiError {
    /// Status code for the wrapped error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MembershipError::NotFound(_) => StatusCode::NOT_FOUND,
            MembershipError::TerminalState { .. } | MembershipError::InvalidTransition(_) => {
                StatusCode::CONFLICT
            }
            MembershipError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            MembershipError::InvalidApplication(_) => StatusCode::BAD_REQUEST,
            MembershipError::SerializationError(_) | MembershipError::IoError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
