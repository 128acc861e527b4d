//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use membership::api::{
    ApiError, ApplicationSummary, DecisionRequest, ErrorResponse, HealthResponse, ListQuery,
    SubmitRequest,
};
use membership_core::{
    Action, Application, ApplicationId, ApplicationStatus, Decision, MembershipError, Role,
    Stage, StageKey, StageStatus,
};
use serde_json::json;

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_serialization() {
    let health = HealthResponse {
        status: "ok".to_string(),
        version: "0.4.2".to_string(),
    };

    let json = serde_json::to_string(&health).unwrap();
    assert!(json.contains("\"status\":\"ok\""));
    assert!(json.contains("\"version\":\"0.4.2\""));
}

// =============================================================================
// REQUEST TESTS
// =============================================================================

#[test]
fn test_submit_request_without_profile() {
    let request: SubmitRequest = serde_json::from_str(r#"{"userId":"member-1"}"#).unwrap();
    assert_eq!(request.user_id, "member-1");
    assert!(request.profile.is_none());
}

#[test]
fn test_submit_request_keeps_unknown_profile_keys() {
    let request: SubmitRequest = serde_json::from_value(json!({
        "userId": "member-1",
        "profile": { "profile": { "firstName": "Asha" }, "uploadedDocs": ["pan.pdf"] }
    }))
    .unwrap();

    let snapshot = request.profile.unwrap();
    assert_eq!(snapshot.main_field("firstName").as_deref(), Some("Asha"));
    assert!(snapshot.rest.contains_key("uploadedDocs"));
}

#[test]
fn test_list_query_is_optional() {
    let query: ListQuery = serde_json::from_str("{}").unwrap();
    assert!(query.user_id.is_none());
}

#[test]
fn test_decision_request_role_precedence() {
    let request: DecisionRequest = serde_json::from_value(json!({
        "action": "approve",
        "reviewerRole": "state_admin",
        "reviewerId": "blockadmin@activ.com"
    }))
    .unwrap();

    assert_eq!(request.action, Decision::Approve);
    assert_eq!(request.role().unwrap(), Role::StateAdmin);
}

#[test]
fn test_decision_request_infers_role_from_id() {
    let request: DecisionRequest = serde_json::from_value(json!({
        "action": "reject",
        "reviewerId": "BA-0042"
    }))
    .unwrap();

    assert_eq!(request.action, Decision::Reject);
    assert_eq!(request.role().unwrap(), Role::BlockAdmin);
}

#[test]
fn test_decision_request_blank_reviewer_is_invalid() {
    let request: DecisionRequest = serde_json::from_value(json!({
        "action": "approve",
        "reviewerId": "  "
    }))
    .unwrap();

    assert!(matches!(
        request.role(),
        Err(MembershipError::InvalidApplication(_))
    ));
}

#[test]
fn test_decision_request_trims_notes() {
    let mut request: DecisionRequest = serde_json::from_value(json!({
        "action": "approve",
        "reviewerRole": "block_admin",
        "notes": "  documents verified \n"
    }))
    .unwrap();
    assert_eq!(request.notes().as_deref(), Some("documents verified"));

    request.notes = Some("   ".to_string());
    assert!(request.notes().is_none());
}

#[test]
fn test_decision_request_rejects_unknown_action() {
    let result: Result<DecisionRequest, _> =
        serde_json::from_value(json!({ "action": "escalate", "reviewerRole": "block_admin" }));
    assert!(result.is_err());
}

// =============================================================================
// SUMMARY TESTS
// =============================================================================

#[test]
fn test_application_summary_uses_profile_name() {
    let app: Application = serde_json::from_value(json!({
        "id": "APP-2025-007",
        "userId": "member-7",
        "submittedAt": "2025-05-01T10:00:00Z",
        "status": "Ready for Payment",
        "stage": 4,
        "stages": [
            { "id": 1, "title": "Block Level Review", "status": "Approved" },
            { "id": 2, "title": "District Level Review", "status": "Approved" },
            { "id": 3, "title": "State Level Review", "status": "Approved" },
            { "id": 4, "title": "Payment Processing", "status": "Approved" }
        ],
        "profile": { "profile": { "firstName": "Asha", "lastName": "Rao" } }
    }))
    .unwrap();

    let summary = ApplicationSummary::from_application(&app);
    assert_eq!(summary.applicant_name, "Asha Rao");
    assert_eq!(summary.status, "Ready for Payment");
    assert_eq!(summary.percent_complete, 100);
    assert_eq!(summary.badge, "Ready");

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["applicantName"], "Asha Rao");
    assert_eq!(json["percentComplete"], 100);
}

#[test]
fn test_application_summary_falls_back_to_user_id() {
    let app = Application {
        id: ApplicationId::new("APP-2025-001"),
        user_id: "member-1".to_string(),
        submitted_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap(),
        status: ApplicationStatus::UnderReview,
        stage: 1,
        stages: vec![Stage::pending(StageKey::Block)],
        profile: None,
    };

    let summary = ApplicationSummary::from_application(&app);
    assert_eq!(summary.applicant_name, "member-1");
    assert_eq!(summary.percent_complete, 0);
    assert_eq!(summary.badge, StageStatus::Pending.as_str());
}

// =============================================================================
// ERROR MAPPING TESTS
// =============================================================================

#[test]
fn test_api_error_status_mapping() {
    let id = ApplicationId::new("APP-2025-001");
    let cases = [
        (MembershipError::NotFound(id.clone()), StatusCode::NOT_FOUND),
        (
            MembershipError::TerminalState {
                id,
                status: ApplicationStatus::Rejected,
            },
            StatusCode::CONFLICT,
        ),
        (
            MembershipError::InvalidTransition("stage already decided".to_string()),
            StatusCode::CONFLICT,
        ),
        (
            MembershipError::Unauthorized {
                role: Role::Member,
                action: Action::Approve,
            },
            StatusCode::FORBIDDEN,
        ),
        (
            MembershipError::InvalidApplication("bad".to_string()),
            StatusCode::BAD_REQUEST,
        ),
        (
            MembershipError::SerializationError("bad".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (
            MembershipError::IoError("disk".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(ApiError::from(error).status(), expected);
    }
}

#[test]
fn test_error_response_shape() {
    let body = ErrorResponse {
        error: "Application not found: APP-2025-001".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&body).unwrap(),
        json!({ "error": "Application not found: APP-2025-001" })
    );
}
