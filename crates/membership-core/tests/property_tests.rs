//! # Property-Based Tests
//!
//! Invariants of the progress model and workflow over arbitrary records.

use chrono::{DateTime, Utc};
use membership_core::{
    Application, ApplicationId, ApplicationStatus, Decision, Stage, StageKey, StageStatus,
    completed_count, current_stage_index, export_json, import_json, is_complete,
    percent_complete, stage_display_state, workflow,
};
use proptest::collection::vec;
use proptest::prelude::*;

// =============================================================================
// STRATEGIES
// =============================================================================

fn stage_status() -> impl Strategy<Value = Option<StageStatus>> {
    prop_oneof![
        Just(None),
        Just(Some(StageStatus::Pending)),
        Just(Some(StageStatus::UnderReview)),
        Just(Some(StageStatus::InProgress)),
        Just(Some(StageStatus::Approved)),
        Just(Some(StageStatus::Rejected)),
        "[A-Za-z ]{0,12}".prop_map(|s| Some(StageStatus::parse(&s))),
    ]
}

fn application_status() -> impl Strategy<Value = ApplicationStatus> {
    prop_oneof![
        Just(ApplicationStatus::UnderReview),
        Just(ApplicationStatus::Rejected),
        Just(ApplicationStatus::ReadyForPayment),
        "[A-Za-z ]{0,12}".prop_map(|s| ApplicationStatus::parse(&s)),
    ]
}

fn application() -> impl Strategy<Value = Application> {
    (
        vec(stage_status(), 0..8),
        any::<i64>(),
        application_status(),
    )
        .prop_map(|(statuses, pointer, status)| {
            let stages = statuses
                .into_iter()
                .enumerate()
                .map(|(i, status)| Stage {
                    id: (i + 1) as u32,
                    key: None,
                    title: format!("Stage {}", i + 1),
                    reviewer: None,
                    status,
                    review_date: None,
                    notes: None,
                })
                .collect();
            Application {
                id: ApplicationId::new("APP-2025-001"),
                user_id: "member".to_string(),
                submitted_at: DateTime::<Utc>::UNIX_EPOCH,
                status,
                stage: pointer,
                stages,
                profile: None,
            }
        })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The current index is always a valid stage index (or 0 with no stages).
    #[test]
    fn current_index_is_in_range(app in application()) {
        let index = current_stage_index(&app);
        if app.stages.is_empty() {
            prop_assert_eq!(index, 0);
        } else {
            prop_assert!(index < app.stages.len());
        }
    }

    /// In-range pointers map to `stage - 1` exactly.
    #[test]
    fn in_range_pointer_is_not_clamped(mut app in application(), offset in 0usize..8) {
        prop_assume!(!app.stages.is_empty());
        let pointer = (offset % app.stages.len()) + 1;
        app.stage = pointer as i64;
        prop_assert_eq!(current_stage_index(&app), pointer - 1);
    }

    /// Percent complete stays within 0..=100.
    #[test]
    fn percent_is_bounded(app in application()) {
        prop_assert!(percent_complete(&app) <= 100);
    }

    /// Ready for Payment always reads 100, whatever the stages say.
    #[test]
    fn ready_for_payment_is_full(mut app in application()) {
        app.status = ApplicationStatus::ReadyForPayment;
        prop_assert_eq!(percent_complete(&app), 100);
    }

    /// Complete exactly when non-empty and all stages are Approved.
    #[test]
    fn completeness_matches_definition(app in application()) {
        let expected = !app.stages.is_empty()
            && app.stages.iter().all(|s| s.status == Some(StageStatus::Approved));
        prop_assert_eq!(is_complete(&app), expected);
        prop_assert!(completed_count(&app) <= app.stages.len());
    }

    /// Display state never panics, even far outside the stage list.
    #[test]
    fn display_state_is_total(app in application(), index in 0usize..32) {
        let _ = stage_display_state(&app, index);
    }

    /// Export followed by import yields an equal record.
    #[test]
    fn export_round_trip(app in application()) {
        let text = export_json(&app).expect("export");
        prop_assert_eq!(import_json(&text).expect("import"), app);
    }

    /// Any sequence of decisions keeps the record well-formed: approved
    /// stages form a prefix and a rejection is final.
    #[test]
    fn decisions_never_skip_stages(decisions in vec(any::<bool>(), 0..10)) {
        let mut app = workflow::submit(
            ApplicationId::new("APP-2025-001"),
            "member",
            None,
            DateTime::<Utc>::UNIX_EPOCH,
        )
        .expect("submit");

        for approve in decisions {
            let decision = if approve { Decision::Approve } else { Decision::Reject };
            let before = app.clone();
            let at = DateTime::<Utc>::UNIX_EPOCH;
            if workflow::apply(&mut app, decision, "Admin", None, at).is_err() {
                prop_assert_eq!(&app, &before);
                prop_assert!(app.status.is_terminal());
            }
        }

        let approved = completed_count(&app);
        prop_assert!(app.stages[..approved].iter().all(Stage::is_approved));
        prop_assert_eq!(app.stages[0].key, Some(StageKey::Block));
        if app.status == ApplicationStatus::ReadyForPayment {
            prop_assert_eq!(approved, app.stages.len());
        }
    }
}
