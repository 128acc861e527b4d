//! # Profile Snapshot
//!
//! The applicant's answers as they were at submission time. A snapshot is a
//! copy, not a link: later edits to the live profile never reach it.
//!
//! Two maps are kept the way clients send them:
//! - `profile`: personal and contact details. Older clients nest it one level
//!   deeper (`profile.profile`); [`ProfileSnapshot::main`] hides that.
//! - `extra`: business, financial and declaration answers.
//!
//! Unknown top-level keys are preserved so exports stay faithful.

use crate::progress::ratio_percent;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Personal answers counted towards profile completion.
pub const MAIN_COMPLETION_FIELDS: [&str; 10] = [
    "firstName",
    "lastName",
    "email",
    "phone",
    "dateOfBirth",
    "gender",
    "state",
    "district",
    "block",
    "address",
];

/// Business and compliance answers counted towards profile completion.
pub const EXTRA_COMPLETION_FIELDS: [&str; 22] = [
    "aadhaar",
    "street",
    "education",
    "religion",
    "socialCategory",
    "organization",
    "constitution",
    "businessType",
    "businessYear",
    "employees",
    "pan",
    "gst",
    "udyam",
    "filedITR",
    "itrYears",
    "turnover",
    "turnover1",
    "turnover2",
    "turnover3",
    "sisterConcerns",
    "companyNames",
    "declaration",
];

/// Answers captured with an application.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    #[serde(default, deserialize_with = "object_or_empty")]
    pub profile: Map<String, Value>,
    #[serde(default, deserialize_with = "object_or_empty")]
    pub extra: Map<String, Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

fn object_or_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Map<String, Value>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    })
}

impl ProfileSnapshot {
    #[must_use]
    pub fn new(profile: Map<String, Value>, extra: Map<String, Value>) -> Self {
        Self {
            profile,
            extra,
            rest: Map::new(),
        }
    }

    /// Personal answers, unwrapping the doubly nested shape.
    #[must_use]
    pub fn main(&self) -> &Map<String, Value> {
        match self.profile.get("profile") {
            Some(Value::Object(inner)) => inner,
            _ => &self.profile,
        }
    }

    /// Display text of a personal answer; blank answers are `None`.
    #[must_use]
    pub fn main_field(&self, key: &str) -> Option<String> {
        self.main().get(key).and_then(display_text)
    }

    /// Display text of a business/financial answer; blank answers are `None`.
    #[must_use]
    pub fn extra_field(&self, key: &str) -> Option<String> {
        self.extra.get(key).and_then(display_text)
    }

    /// "First Last", or `fallback` when neither name is present.
    #[must_use]
    pub fn display_name(&self, fallback: &str) -> String {
        let parts: Vec<String> = ["firstName", "lastName"]
            .iter()
            .filter_map(|key| self.main_field(key))
            .collect();
        if parts.is_empty() {
            fallback.to_string()
        } else {
            parts.join(" ")
        }
    }

    /// Phone number under either of the keys clients have used.
    #[must_use]
    pub fn phone(&self) -> Option<String> {
        self.main_field("phone")
            .or_else(|| self.main_field("mobile"))
    }

    /// Percentage of tracked answers that are filled in.
    #[must_use]
    pub fn completion_percent(&self) -> u8 {
        profile_completion(self.main(), &self.extra)
    }
}

/// Percentage (rounded half up) of the 32 tracked answers present in `main`
/// and `extra`.
#[must_use]
pub fn profile_completion(main: &Map<String, Value>, extra: &Map<String, Value>) -> u8 {
    let main_filled = MAIN_COMPLETION_FIELDS
        .iter()
        .filter(|key| main.get(**key).is_some_and(is_filled))
        .count();

    let extra_filled = EXTRA_COMPLETION_FIELDS
        .iter()
        .filter(|key| match extra.get(**key) {
            // Selection lists count once anything is chosen.
            Some(value) if **key == "businessType" => match value {
                Value::Array(items) => !items.is_empty(),
                Value::String(s) => !s.is_empty(),
                _ => false,
            },
            Some(value) => is_filled(value),
            None => false,
        })
        .count();

    let total = MAIN_COMPLETION_FIELDS.len() + EXTRA_COMPLETION_FIELDS.len();
    ratio_percent(main_filled + extra_filled, total)
}

/// An answer counts when it is truthy and not blank once rendered as text.
fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) if n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON) => false,
        other => !render(other).trim().is_empty(),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object]".to_string(),
    }
}

fn display_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Array(items) => items
            .iter()
            .map(render)
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => render(other),
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
