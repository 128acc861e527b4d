//! # Export Module
//!
//! Download format for a single application: the raw record as
//! pretty-printed JSON, exactly as stored. Importing an export yields an
//! equal record, including unknown status text and extra profile keys.

use crate::primitives::{DEFAULT_EXPORT_STEM, MAX_IMPORT_SIZE};
use crate::{Application, MembershipError};

/// Serialize `app` for download.
pub fn export_json(app: &Application) -> Result<String, MembershipError> {
    serde_json::to_string_pretty(app)
        .map_err(|e| MembershipError::SerializationError(e.to_string()))
}

/// Parse a previously exported record.
///
/// # Errors
///
/// `InvalidApplication` when the input exceeds `MAX_IMPORT_SIZE`,
/// `SerializationError` when it is not a record.
pub fn import_json(data: &str) -> Result<Application, MembershipError> {
    if data.len() > MAX_IMPORT_SIZE {
        return Err(MembershipError::InvalidApplication(format!(
            "import of {} bytes exceeds the {MAX_IMPORT_SIZE} byte limit",
            data.len()
        )));
    }
    serde_json::from_str(data).map_err(|e| MembershipError::SerializationError(e.to_string()))
}

/// Suggested download file name: `<id>.json`.
#[must_use]
pub fn export_filename(app: &Application) -> String {
    let stem = app.id.as_str().trim();
    if stem.is_empty() {
        format!("{DEFAULT_EXPORT_STEM}.json")
    } else {
        format!("{stem}.json")
    }
}

/// BLAKE3 digest (hex) of the exported bytes.
///
/// Lets a recipient check a download against the value the service reports.
///
/// # Requires
///
/// This function is only available with the `crypto-hash` feature enabled.
#[cfg(feature = "crypto-hash")]
pub fn export_digest(app: &Application) -> Result<String, MembershipError> {
    let data = export_json(app)?;
    Ok(blake3::hash(data.as_bytes()).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================
