//! # Stage Progress Model
//!
//! Pure projections over an [`Application`] snapshot. The submission receipt,
//! the member's status tracker and the admin review panel all render from
//! these functions, so they always agree.
//!
//! ## Rules
//!
//! | Value | Rule |
//! |-------|------|
//! | current stage index | `clamp(stage, 1, N) - 1`, 0 when there are no stages |
//! | completed count | stages whose status is exactly Approved |
//! | percent complete | 100 at Ready for Payment, else `round(index / N * 100)` |
//! | complete | N > 0 and every stage Approved |
//!
//! Percent complete measures the position reached, not the number of
//! approvals, so it intentionally disagrees with the completed count on
//! inconsistent data.
//!
//! Every function is total: missing stages or a nonsense pointer degrade to
//! zero/pending, never to an error. Integer arithmetic only.

use crate::primitives::HOLDING_BADGE;
use crate::types::{Application, ApplicationStatus, StageKey, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// DISPLAY STATE
// =============================================================================

/// How a single stage is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageDisplayState {
    Pending,
    Active,
    Approved,
}

/// Headline badge of an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Badge {
    Ready,
    Rejected,
    /// Status text of the stage under the pointer.
    Stage(StageStatus),
    /// The stage under the pointer has no status (or there is no stage).
    Holding,
}

impl Badge {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Badge::Ready => "Ready",
            Badge::Rejected => "Rejected",
            Badge::Stage(status) => status.as_str(),
            Badge::Holding => HOLDING_BADGE,
        }
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// MODEL FUNCTIONS
// =============================================================================

/// Round `part / whole * 100` half up, using integers. `whole == 0` gives 0.
#[must_use]
pub fn ratio_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u64;
    let whole = whole as u64;
    let scaled = part.saturating_mul(200).saturating_add(whole) / whole.saturating_mul(2);
    scaled.min(100) as u8
}

/// 0-based index of the stage awaiting action. Always a valid index when
/// there is at least one stage.
#[must_use]
pub fn current_stage_index(app: &Application) -> usize {
    let total = app.stages.len();
    if total == 0 {
        return 0;
    }
    let clamped = app.stage.clamp(1, total as i64);
    (clamped - 1) as usize
}

/// Number of stages whose status is exactly Approved.
#[must_use]
pub fn completed_count(app: &Application) -> usize {
    app.stages.iter().filter(|s| s.is_approved()).count()
}

/// Progress bar value in `0..=100`.
#[must_use]
pub fn percent_complete(app: &Application) -> u8 {
    if app.status == ApplicationStatus::ReadyForPayment {
        return 100;
    }
    ratio_percent(current_stage_index(app), app.stages.len())
}

/// Display state of `stages[index]`.
///
/// A stage is active when it sits under the pointer with an in-review
/// status, or when the raw pointer equals its id. Both signals are checked
/// because upstream data is not consistent about either.
#[must_use]
pub fn stage_display_state(app: &Application, index: usize) -> StageDisplayState {
    let Some(stage) = app.stages.get(index) else {
        return StageDisplayState::Pending;
    };

    if stage.is_approved() {
        return StageDisplayState::Approved;
    }

    let in_review_here = index == current_stage_index(app)
        && stage.status.as_ref().is_some_and(StageStatus::is_in_review);
    let pointed_at = app.stage == i64::from(stage.id);

    if in_review_here || pointed_at {
        StageDisplayState::Active
    } else {
        StageDisplayState::Pending
    }
}

/// True when there is at least one stage and all of them are Approved.
#[must_use]
pub fn is_complete(app: &Application) -> bool {
    !app.stages.is_empty() && completed_count(app) == app.stages.len()
}

/// Headline badge for the admin panel.
#[must_use]
pub fn overall_badge(app: &Application) -> Badge {
    match app.status {
        ApplicationStatus::ReadyForPayment => Badge::Ready,
        ApplicationStatus::Rejected => Badge::Rejected,
        _ => app
            .stages
            .get(current_stage_index(app))
            .and_then(|stage| stage.status.clone())
            .map_or(Badge::Holding, Badge::Stage),
    }
}

// =============================================================================
// PROGRESS REPORT
// =============================================================================

/// Per-stage row of a [`ProgressReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub id: u32,
    pub key: Option<StageKey>,
    pub title: String,
    pub status: Option<String>,
    pub reviewer: Option<String>,
    pub review_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub state: StageDisplayState,
}

/// Every derived value a surface needs, computed in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub current_stage_index: usize,
    pub completed_count: usize,
    pub total_stages: usize,
    pub percent_complete: u8,
    pub is_complete: bool,
    pub badge: String,
    pub stages: Vec<StageView>,
}

impl ProgressReport {
    #[must_use]
    pub fn from_application(app: &Application) -> Self {
        let stages = app
            .stages
            .iter()
            .enumerate()
            .map(|(index, stage)| StageView {
                id: stage.id,
                key: stage.key,
                title: stage.title.clone(),
                status: stage.status.as_ref().map(|s| s.as_str().to_string()),
                reviewer: stage.reviewer.clone(),
                review_date: stage.review_date,
                notes: stage.notes.clone(),
                state: stage_display_state(app, index),
            })
            .collect();

        Self {
            current_stage_index: current_stage_index(app),
            completed_count: completed_count(app),
            total_stages: app.stages.len(),
            percent_complete: percent_complete(app),
            is_complete: is_complete(app),
            badge: overall_badge(app).label().to_string(),
            stages,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::STAGE_SEQUENCE;
    use crate::types::{ApplicationId, Stage};

    fn app_with(statuses: &[StageStatus], pointer: i64, status: ApplicationStatus) -> Application {
        let stages = STAGE_SEQUENCE
            .iter()
            .zip(statuses)
            .map(|(key, s)| Stage {
                status: Some(s.clone()),
                ..Stage::pending(*key)
            })
            .collect();
        Application {
            id: ApplicationId::new("APP-2025-001"),
            user_id: "member-1".to_string(),
            submitted_at: DateTime::<Utc>::UNIX_EPOCH,
            status,
            stage: pointer,
            stages,
            profile: None,
        }
    }

    use StageStatus::{Approved, Pending, UnderReview};

    #[test]
    fn half_way_scenario() {
        let app = app_with(
            &[Approved, Approved, Pending, Pending],
            3,
            ApplicationStatus::UnderReview,
        );
        assert_eq!(completed_count(&app), 2);
        assert_eq!(current_stage_index(&app), 2);
        assert_eq!(percent_complete(&app), 50);
        assert!(!is_complete(&app));
    }

    #[test]
    fn ready_for_payment_is_full_and_complete() {
        let app = app_with(
            &[Approved, Approved, Approved, Approved],
            4,
            ApplicationStatus::ReadyForPayment,
        );
        assert_eq!(percent_complete(&app), 100);
        assert!(is_complete(&app));
        assert_eq!(overall_badge(&app), Badge::Ready);
    }

    #[test]
    fn ready_for_payment_overrides_empty_stages() {
        let app = app_with(&[], 1, ApplicationStatus::ReadyForPayment);
        assert_eq!(percent_complete(&app), 100);
        assert!(!is_complete(&app));
    }

    #[test]
    fn pointer_is_clamped() {
        let app = app_with(
            &[Pending, Pending, Pending, Pending],
            99,
            ApplicationStatus::UnderReview,
        );
        assert_eq!(current_stage_index(&app), 3);
        assert_eq!(percent_complete(&app), 75);

        let app = app_with(
            &[Pending, Pending, Pending, Pending],
            -4,
            ApplicationStatus::UnderReview,
        );
        assert_eq!(current_stage_index(&app), 0);
        assert_eq!(percent_complete(&app), 0);
    }

    #[test]
    fn empty_stages_degrade_to_zero() {
        let app = app_with(&[], 3, ApplicationStatus::UnderReview);
        assert_eq!(current_stage_index(&app), 0);
        assert_eq!(percent_complete(&app), 0);
        assert_eq!(overall_badge(&app), Badge::Holding);
        assert_eq!(stage_display_state(&app, 0), StageDisplayState::Pending);
    }

    #[test]
    fn rejected_badge_wins() {
        let app = app_with(
            &[Approved, StageStatus::Rejected, Pending, Pending],
            2,
            ApplicationStatus::Rejected,
        );
        assert_eq!(overall_badge(&app).label(), "Rejected");
    }

    #[test]
    fn badge_shows_current_stage_status() {
        let app = app_with(
            &[Approved, UnderReview, Pending, Pending],
            2,
            ApplicationStatus::UnderReview,
        );
        assert_eq!(overall_badge(&app).label(), "Under Review");
    }

    #[test]
    fn badge_holds_when_stage_has_no_status() {
        let mut app = app_with(
            &[Pending, Pending, Pending, Pending],
            1,
            ApplicationStatus::UnderReview,
        );
        app.stages[0].status = None;
        assert_eq!(overall_badge(&app), Badge::Holding);
    }

    #[test]
    fn display_states_follow_both_signals() {
        let mut app = app_with(
            &[Approved, StageStatus::InProgress, Pending, Pending],
            2,
            ApplicationStatus::UnderReview,
        );
        assert_eq!(stage_display_state(&app, 0), StageDisplayState::Approved);
        assert_eq!(stage_display_state(&app, 1), StageDisplayState::Active);
        assert_eq!(stage_display_state(&app, 2), StageDisplayState::Pending);

        // Pointer out of range: index clamps to 3, but stage 2 is still
        // in review and no longer under the pointer.
        app.stage = 9;
        assert_eq!(stage_display_state(&app, 1), StageDisplayState::Pending);

        // Pending stage under the pointer is active through the id match.
        app.stage = 3;
        assert_eq!(stage_display_state(&app, 2), StageDisplayState::Active);
    }

    #[test]
    fn out_of_range_index_is_pending() {
        let app = app_with(
            &[Pending, Pending, Pending, Pending],
            1,
            ApplicationStatus::UnderReview,
        );
        assert_eq!(stage_display_state(&app, 17), StageDisplayState::Pending);
    }

    #[test]
    fn ratio_percent_rounds_half_up() {
        assert_eq!(ratio_percent(1, 8), 13);
        assert_eq!(ratio_percent(1, 3), 33);
        assert_eq!(ratio_percent(2, 3), 67);
        assert_eq!(ratio_percent(5, 4), 100);
        assert_eq!(ratio_percent(0, 0), 0);
    }

    #[test]
    fn report_bundles_everything() {
        let app = app_with(
            &[Approved, UnderReview, Pending, Pending],
            2,
            ApplicationStatus::UnderReview,
        );
        let report = ProgressReport::from_application(&app);
        assert_eq!(report.total_stages, 4);
        assert_eq!(report.completed_count, 1);
        assert_eq!(report.percent_complete, 25);
        assert_eq!(report.badge, "Under Review");
        let states: Vec<_> = report.stages.iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![
                StageDisplayState::Approved,
                StageDisplayState::Active,
                StageDisplayState::Pending,
                StageDisplayState::Pending
            ]
        );
    }
}
