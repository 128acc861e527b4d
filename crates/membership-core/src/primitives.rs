//! # Fixed Primitives
//!
//! Constants compiled into the model. They are immutable at runtime.

use crate::types::StageKey;

/// The approval sequence every application walks through, in order.
///
/// Stage ids are the 1-based positions in this array.
pub const STAGE_SEQUENCE: [StageKey; 4] = [
    StageKey::Block,
    StageKey::District,
    StageKey::State,
    StageKey::Payment,
];

/// Number of stages created at submission time.
pub const STAGE_COUNT: usize = STAGE_SEQUENCE.len();

/// Pointer value used when a record carries no usable stage pointer.
pub const DEFAULT_STAGE_POINTER: i64 = 1;

/// Prefix of generated application ids (`APP-2025-001`).
pub const APPLICATION_ID_PREFIX: &str = "APP";

/// Fallback export file stem for records without an id.
pub const DEFAULT_EXPORT_STEM: &str = "application";

/// Badge text shown when the current stage carries no status.
pub const HOLDING_BADGE: &str = "Holding";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of an application id accepted from callers.
pub const MAX_APPLICATION_ID_LENGTH: usize = 64;

/// Maximum length of a user id accepted at submission.
pub const MAX_USER_ID_LENGTH: usize = 256;

/// Maximum length of reviewer notes.
pub const MAX_NOTES_LENGTH: usize = 4096;

/// Maximum size of a single exported application accepted by `import_json`.
///
/// Profile snapshots are small; 1 MB leaves ample room.
pub const MAX_IMPORT_SIZE: usize = 1024 * 1024;

/// Maximum size of a JSON-file application database (100 MB).
pub const MAX_DATABASE_FILE_SIZE: u64 = 100 * 1024 * 1024;
