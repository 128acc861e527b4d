//! # membership-core
//!
//! The membership application model: records, the stage progress model,
//! the approval workflow and storage.
//!
//! An application walks a fixed sequence of review stages (Block, District,
//! State, Payment readiness). Every surface (submission receipt, member
//! tracker, admin panel, CLI) derives its progress view from the same pure
//! functions in [`progress`], and every change goes through [`workflow`].
//!
//! ## Constraints
//!
//! - No async, no network dependencies
//! - Model functions never fail; malformed records degrade to defaults
//! - Integer arithmetic only
//! - Only [`workflow`] mutates an application

// =============================================================================
// MODULES
// =============================================================================

pub mod export;
pub mod policy;
pub mod primitives;
pub mod profile;
pub mod progress;
pub mod registry;
pub mod repository;
pub mod storage;
pub mod types;
pub mod workflow;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Application, ApplicationId, ApplicationStatus, MembershipError, Stage, StageKey, StageStatus,
};

// =============================================================================
// RE-EXPORTS: Model and Workflow
// =============================================================================

pub use policy::{Action, Role, authorize, ensure_authorized};
pub use profile::{ProfileSnapshot, profile_completion};
pub use progress::{
    Badge, ProgressReport, StageDisplayState, StageView, completed_count, current_stage_index,
    is_complete, overall_badge, percent_complete, stage_display_state,
};
pub use workflow::Decision;

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use registry::{Registry, StorageBackend};
pub use repository::{ApplicationRepository, InMemoryRepository};
pub use storage::{JsonFileRepository, RedbRepository};

// =============================================================================
// RE-EXPORTS: Export
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use export::export_digest;
pub use export::{export_filename, export_json, import_json};
