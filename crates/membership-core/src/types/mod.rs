//! # Core Type Definitions
//!
//! This module contains the record types shared by every surface:
//! - Stage identity and status (`StageKey`, `StageStatus`, `Stage`)
//! - The application record (`ApplicationId`, `ApplicationStatus`, `Application`)
//! - Error types (`MembershipError`)
//!
//! ## Decoding Guarantees
//!
//! Records arrive from browsers, older clients and hand-edited files. Decoding
//! is permissive where the progress model can still produce a sane answer:
//! - missing or `null` `stages` decode as an empty sequence
//! - missing or non-numeric `stage` decodes as 1; numeric strings are parsed
//! - status text that is not one of the known values is kept verbatim
//! - a stage `id` that is not a number takes the stage's 1-based position
//! - null or non-text `title`, `reviewer` and `notes` decode as empty/absent
//! - timestamps accept RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC);
//!   anything else is absent, or the Unix epoch for `submittedAt`
//!
//! Encoding always writes the canonical spelling.

use crate::policy::{Action, Role};
use crate::primitives::{
    APPLICATION_ID_PREFIX, DEFAULT_STAGE_POINTER, MAX_APPLICATION_ID_LENGTH, STAGE_SEQUENCE,
};
use crate::profile::ProfileSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// STAGE KEY
// =============================================================================

/// One checkpoint of the fixed approval sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKey {
    Block,
    District,
    State,
    Payment,
}

impl StageKey {
    /// 1-based position in the approval sequence.
    #[must_use]
    pub fn position(&self) -> u32 {
        match self {
            StageKey::Block => 1,
            StageKey::District => 2,
            StageKey::State => 3,
            StageKey::Payment => 4,
        }
    }

    /// Title given to a freshly created stage.
    #[must_use]
    pub fn default_title(&self) -> &'static str {
        match self {
            StageKey::Block => "Block Admin Review",
            StageKey::District => "District Admin Review",
            StageKey::State => "State Admin Review",
            StageKey::Payment => "Payment Readiness",
        }
    }

    /// Wire spelling of the key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKey::Block => "block",
            StageKey::District => "district",
            StageKey::State => "state",
            StageKey::Payment => "payment",
        }
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKey {
    type Err = MembershipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STAGE_SEQUENCE
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| MembershipError::InvalidApplication(format!("unknown stage key: {s}")))
    }
}

// =============================================================================
// STAGE STATUS
// =============================================================================

/// Review status of a single stage.
///
/// `InProgress` is not produced by the workflow; it exists because upstream
/// data spells the in-review state both ways. `Other` keeps unrecognized text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StageStatus {
    Pending,
    UnderReview,
    InProgress,
    Approved,
    Rejected,
    Other(String),
}

impl StageStatus {
    /// Parse status text. Known values match exactly, except the in-progress
    /// spelling which is matched case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Pending" => StageStatus::Pending,
            "Under Review" => StageStatus::UnderReview,
            "Approved" => StageStatus::Approved,
            "Rejected" => StageStatus::Rejected,
            other if other.trim().eq_ignore_ascii_case("in progress") => StageStatus::InProgress,
            other => StageStatus::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            StageStatus::Pending => "Pending",
            StageStatus::UnderReview => "Under Review",
            StageStatus::InProgress => "In Progress",
            StageStatus::Approved => "Approved",
            StageStatus::Rejected => "Rejected",
            StageStatus::Other(text) => text,
        }
    }

    /// Whether the stage is currently being looked at by a reviewer.
    #[must_use]
    pub fn is_in_review(&self) -> bool {
        matches!(self, StageStatus::UnderReview | StageStatus::InProgress)
    }

    /// Whether a reviewer has already approved or rejected the stage.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        matches!(self, StageStatus::Approved | StageStatus::Rejected)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StageStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StageStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(StageStatus::parse(&raw))
    }
}

// =============================================================================
// APPLICATION STATUS
// =============================================================================

/// Overall status of an application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ApplicationStatus {
    #[default]
    UnderReview,
    Rejected,
    ReadyForPayment,
    Other(String),
}

impl ApplicationStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Under Review" => ApplicationStatus::UnderReview,
            "Rejected" => ApplicationStatus::Rejected,
            "Ready for Payment" => ApplicationStatus::ReadyForPayment,
            other => ApplicationStatus::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ApplicationStatus::UnderReview => "Under Review",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::ReadyForPayment => "Ready for Payment",
            ApplicationStatus::Other(text) => text,
        }
    }

    /// Rejected and Ready for Payment admit no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected | ApplicationStatus::ReadyForPayment
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ApplicationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApplicationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ApplicationStatus::parse(&raw))
    }
}

// =============================================================================
// APPLICATION ID
// =============================================================================

/// Identifier assigned to an application at submission. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Build the id for the `sequence`-th submission of `year`: `APP-2025-001`.
    #[must_use]
    pub fn generate(year: i32, sequence: u64) -> Self {
        Self(format!("{APPLICATION_ID_PREFIX}-{year}-{sequence:03}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate an id received from a caller before it reaches storage.
    pub fn validate(&self) -> Result<(), MembershipError> {
        if self.0.is_empty() || self.0.len() > MAX_APPLICATION_ID_LENGTH {
            return Err(MembershipError::InvalidApplication(format!(
                "application id must be 1..={MAX_APPLICATION_ID_LENGTH} characters"
            )));
        }
        if !self
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(MembershipError::InvalidApplication(
                "application id may only contain letters, digits, '-' and '_'".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// STAGE
// =============================================================================

/// One approval checkpoint inside an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    /// 1-based ordering key. 0 only while decoding; the stage list fills in
    /// the position.
    #[serde(default, deserialize_with = "lenient::stage_id")]
    pub id: u32,
    #[serde(default, deserialize_with = "lenient::stage_key")]
    pub key: Option<StageKey>,
    #[serde(default, deserialize_with = "lenient::title")]
    pub title: String,
    /// Free-text name of the approver.
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub reviewer: Option<String>,
    #[serde(default, deserialize_with = "lenient::stage_status")]
    pub status: Option<StageStatus>,
    /// Set when the status leaves Pending.
    #[serde(default, deserialize_with = "lenient::optional_timestamp")]
    pub review_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub notes: Option<String>,
}

impl Stage {
    /// A Pending stage for `key` with its default title.
    #[must_use]
    pub fn pending(key: StageKey) -> Self {
        Self {
            id: key.position(),
            key: Some(key),
            title: key.default_title().to_string(),
            reviewer: None,
            status: Some(StageStatus::Pending),
            review_date: None,
            notes: None,
        }
    }

    /// Stand-in for an entry that is not a stage object at all.
    fn placeholder(id: u32) -> Self {
        Self {
            id,
            key: None,
            title: String::new(),
            reviewer: None,
            status: None,
            review_date: None,
            notes: None,
        }
    }

    /// True only when the status is exactly Approved.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(self.status, Some(StageStatus::Approved))
    }
}

// =============================================================================
// APPLICATION
// =============================================================================

/// One member's submission moving through the approval sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    /// Owning member's identifier.
    #[serde(default)]
    pub user_id: String,
    #[serde(
        default = "lenient::epoch",
        deserialize_with = "lenient::submitted_at"
    )]
    pub submitted_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::application_status")]
    pub status: ApplicationStatus,
    /// 1-based pointer to the stage awaiting action. Not clamped on decode;
    /// the progress model clamps on read.
    #[serde(
        default = "default_stage_pointer",
        deserialize_with = "lenient::stage_pointer"
    )]
    pub stage: i64,
    #[serde(default, deserialize_with = "lenient::stage_list")]
    pub stages: Vec<Stage>,
    /// Answers captured at submission; never mutated afterwards.
    #[serde(default)]
    pub profile: Option<ProfileSnapshot>,
}

fn default_stage_pointer() -> i64 {
    DEFAULT_STAGE_POINTER
}

mod lenient {
    //! Field decoders that substitute defaults instead of failing.

    use super::{ApplicationStatus, Stage, StageKey, StageStatus};
    use crate::primitives::DEFAULT_STAGE_POINTER;
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
        Option::<Value>::deserialize(deserializer)
    }

    fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match value(deserializer)? {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
    }

    /// Integer view of a JSON number or numeric string. Fractions truncate.
    fn integer(raw: Option<Value>) -> Option<i64> {
        match raw? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    fn timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub(super) fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    pub(super) fn stage_pointer<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<i64, D::Error> {
        Ok(integer(value(deserializer)?).unwrap_or(DEFAULT_STAGE_POINTER))
    }

    pub(super) fn stage_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        Ok(integer(value(deserializer)?)
            .and_then(|id| u32::try_from(id).ok())
            .unwrap_or(0))
    }

    /// Entries that are not stage objects become empty placeholders so later
    /// stages keep their positions. Unusable ids take the 1-based position.
    pub(super) fn stage_list<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Stage>, D::Error> {
        let Some(Value::Array(entries)) = value(deserializer)? else {
            return Ok(Vec::new());
        };
        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let position = u32::try_from(index + 1).unwrap_or(u32::MAX);
                let mut stage = serde_json::from_value::<Stage>(entry)
                    .unwrap_or_else(|_| Stage::placeholder(position));
                if stage.id == 0 {
                    stage.id = position;
                }
                stage
            })
            .collect())
    }

    pub(super) fn title<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(text(deserializer)?.unwrap_or_default())
    }

    pub(super) fn optional_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        text(deserializer)
    }

    pub(super) fn optional_timestamp<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(text(deserializer)?.and_then(|s| timestamp(&s)))
    }

    pub(super) fn submitted_at<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        Ok(optional_timestamp(deserializer)?.unwrap_or_else(epoch))
    }

    pub(super) fn stage_status<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<StageStatus>, D::Error> {
        Ok(text(deserializer)?.map(|s| StageStatus::parse(&s)))
    }

    pub(super) fn stage_key<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<StageKey>, D::Error> {
        Ok(text(deserializer)?.and_then(|s| s.parse().ok()))
    }

    pub(super) fn application_status<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<ApplicationStatus, D::Error> {
        Ok(text(deserializer)?
            .map(|s| ApplicationStatus::parse(&s))
            .unwrap_or_default())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the membership model.
///
/// Reads degrade to defaults; these errors come from writes, lookups by id
/// and storage.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// No application is stored under this id.
    #[error("Application not found: {0}")]
    NotFound(ApplicationId),

    /// The application is Rejected or Ready for Payment.
    #[error("Application {id} is already {status}")]
    TerminalState {
        id: ApplicationId,
        status: ApplicationStatus,
    },

    /// The requested transition would break stage ordering.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The role may not perform the action.
    #[error("Role {role} may not {action}")]
    Unauthorized { role: Role, action: Action },

    /// Caller-supplied data failed validation.
    #[error("Invalid application: {0}")]
    InvalidApplication(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
