//! # Approval Workflow
//!
//! The only code that mutates an [`Application`]. Transitions are checked
//! before anything is written:
//! - terminal applications (Rejected, Ready for Payment) accept nothing
//! - the stage under the pointer must still be undecided
//! - every earlier stage must already be Approved, so no stage is skipped
//!
//! On error the application is left untouched. Callers pass the clock in;
//! nothing here reads the system time.

use crate::policy::Action;
use crate::primitives::{MAX_NOTES_LENGTH, MAX_USER_ID_LENGTH, STAGE_SEQUENCE};
use crate::profile::ProfileSnapshot;
use crate::progress::current_stage_index;
use crate::types::{
    Application, ApplicationId, ApplicationStatus, MembershipError, Stage, StageStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reviewer decision on the stage under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl From<Decision> for Action {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => Action::Approve,
            Decision::Reject => Action::Reject,
        }
    }
}

/// Create a fresh application: four Pending stages, pointer at 1.
pub fn submit(
    id: ApplicationId,
    user_id: &str,
    profile: Option<ProfileSnapshot>,
    now: DateTime<Utc>,
) -> Result<Application, MembershipError> {
    id.validate()?;
    let user_id = user_id.trim();
    if user_id.is_empty() || user_id.len() > MAX_USER_ID_LENGTH {
        return Err(MembershipError::InvalidApplication(format!(
            "user id must be 1..={MAX_USER_ID_LENGTH} characters"
        )));
    }

    Ok(Application {
        id,
        user_id: user_id.to_string(),
        submitted_at: now,
        status: ApplicationStatus::UnderReview,
        stage: 1,
        stages: STAGE_SEQUENCE.iter().copied().map(Stage::pending).collect(),
        profile,
    })
}

/// Apply `decision` to the stage under the pointer.
pub fn apply(
    app: &mut Application,
    decision: Decision,
    reviewer: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), MembershipError> {
    match decision {
        Decision::Approve => approve(app, reviewer, notes, now),
        Decision::Reject => reject(app, reviewer, notes, now),
    }
}

/// Approve the current stage and advance the pointer. Approving the last
/// stage makes the application Ready for Payment.
pub fn approve(
    app: &mut Application,
    reviewer: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), MembershipError> {
    let index = check_decidable(app, notes.as_deref())?;
    let last = app.stages.len() - 1;

    record(&mut app.stages[index], StageStatus::Approved, reviewer, notes, now);

    if index < last {
        app.stage = (index + 2) as i64;
    } else {
        app.stage = (index + 1) as i64;
        app.status = ApplicationStatus::ReadyForPayment;
    }
    Ok(())
}

/// Reject the current stage; the application stops here for good.
pub fn reject(
    app: &mut Application,
    reviewer: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), MembershipError> {
    let index = check_decidable(app, notes.as_deref())?;

    record(&mut app.stages[index], StageStatus::Rejected, reviewer, notes, now);
    app.stage = (index + 1) as i64;
    app.status = ApplicationStatus::Rejected;
    Ok(())
}

/// Validate the pending transition and return the stage index it targets.
fn check_decidable(app: &Application, notes: Option<&str>) -> Result<usize, MembershipError> {
    if app.status.is_terminal() {
        return Err(MembershipError::TerminalState {
            id: app.id.clone(),
            status: app.status.clone(),
        });
    }
    if app.stages.is_empty() {
        return Err(MembershipError::InvalidTransition(format!(
            "application {} has no stages",
            app.id
        )));
    }
    if notes.is_some_and(|n| n.len() > MAX_NOTES_LENGTH) {
        return Err(MembershipError::InvalidApplication(format!(
            "notes exceed {MAX_NOTES_LENGTH} bytes"
        )));
    }

    let index = current_stage_index(app);
    if let Some(skipped) = app.stages[..index].iter().find(|s| !s.is_approved()) {
        return Err(MembershipError::InvalidTransition(format!(
            "stage {} ({}) has not been approved",
            skipped.id, skipped.title
        )));
    }
    let current = &app.stages[index];
    if current.status.as_ref().is_some_and(StageStatus::is_decided) {
        return Err(MembershipError::InvalidTransition(format!(
            "stage {} ({}) is already decided",
            current.id, current.title
        )));
    }
    Ok(index)
}

fn record(
    stage: &mut Stage,
    status: StageStatus,
    reviewer: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) {
    stage.status = Some(status);
    stage.reviewer = Some(reviewer.to_string());
    stage.review_date = Some(now);
    if notes.is_some() {
        stage.notes = notes;
    }
}
