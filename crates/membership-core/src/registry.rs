//! # Registry Module
//!
//! The single entry point surfaces use to read and change applications.
//! Every write goes authorize → load → transition → save, so a refused or
//! failed decision never leaves a partially updated record behind.
//!
//! ## Storage Backends
//!
//! - `InMemory`: fast, volatile
//! - `File`: JSON array on disk, rewritten after every change
//! - `Persistent`: redb-backed ACID storage

use crate::policy::{Action, Role, ensure_authorized};
use crate::primitives::MAX_USER_ID_LENGTH;
use crate::profile::ProfileSnapshot;
use crate::repository::{ApplicationRepository, InMemoryRepository};
use crate::storage::{JsonFileRepository, RedbRepository};
use crate::workflow::{self, Decision};
use crate::{Application, ApplicationId, MembershipError};
use chrono::{DateTime, Datelike, Utc};
use std::path::Path;

// =============================================================================
// ERROR LOGGING HELPERS
// =============================================================================

/// Log a storage error and convert the result to `Option`.
///
/// The core stays free of a logging framework; it writes one JSON line to
/// stderr which the app layer can pick up.
#[inline]
fn log_and_convert<T>(result: Result<T, MembershipError>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            eprintln!(
                "{{\"level\":\"warn\",\"target\":\"membership_core::registry\",\"message\":\"storage error in {}: {}\"}}",
                context, e
            );
            None
        }
    }
}

/// Storage backend for a Registry.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory repository (fast, volatile).
    InMemory(InMemoryRepository),
    /// JSON array file, written through on every save.
    File(JsonFileRepository),
    /// Disk-backed repository using redb (ACID, persistent).
    Persistent(RedbRepository),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(InMemoryRepository::new())
    }
}

/// Owns the application store and applies the workflow to it.
#[derive(Debug, Default)]
pub struct Registry {
    backend: StorageBackend,
}

impl Registry {
    /// Create an empty registry with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory registry seeded with existing records.
    #[must_use]
    pub fn with_applications(apps: impl IntoIterator<Item = Application>) -> Self {
        Self {
            backend: StorageBackend::InMemory(InMemoryRepository::from_applications(apps)),
        }
    }

    /// Create a registry with persistent redb storage at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, MembershipError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbRepository::open(path)?),
        })
    }

    /// Create a registry over the JSON array file at `path`.
    pub fn with_json_file(path: impl AsRef<Path>) -> Result<Self, MembershipError> {
        Ok(Self {
            backend: StorageBackend::File(JsonFileRepository::open(path)?),
        })
    }

    fn repo(&self) -> &dyn ApplicationRepository {
        match &self.backend {
            StorageBackend::InMemory(repo) => repo,
            StorageBackend::File(repo) => repo,
            StorageBackend::Persistent(repo) => repo,
        }
    }

    fn repo_mut(&mut self) -> &mut dyn ApplicationRepository {
        match &mut self.backend {
            StorageBackend::InMemory(repo) => repo,
            StorageBackend::File(repo) => repo,
            StorageBackend::Persistent(repo) => repo,
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Fetch an application, failing with `NotFound` when it is absent.
    pub fn get(&self, id: &ApplicationId) -> Result<Application, MembershipError> {
        id.validate()?;
        self.repo()
            .get_application(id)?
            .ok_or_else(|| MembershipError::NotFound(id.clone()))
    }

    /// Fetch an application for display.
    ///
    /// Missing, malformed and unreadable records all come back as `None`;
    /// storage errors are logged first.
    #[must_use]
    pub fn lookup(&self, id: &ApplicationId) -> Option<Application> {
        if id.validate().is_err() {
            return None;
        }
        log_and_convert(self.repo().get_application(id), "lookup").flatten()
    }

    /// Every stored application, ordered by id.
    pub fn list(&self) -> Result<Vec<Application>, MembershipError> {
        self.repo().list_applications()
    }

    /// Applications owned by `user_id`, newest first.
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<Application>, MembershipError> {
        self.repo().applications_for_user(user_id)
    }

    /// Number of stored applications.
    pub fn count(&self) -> Result<usize, MembershipError> {
        self.repo().application_count()
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Submit a new application for `user_id` and store it.
    ///
    /// Ids are `APP-<year>-<seq>`; a sequence number whose id is already
    /// taken (for example by an imported record) is skipped.
    pub fn submit(
        &mut self,
        user_id: &str,
        profile: Option<ProfileSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<Application, MembershipError> {
        if user_id.trim().is_empty() || user_id.len() > MAX_USER_ID_LENGTH {
            return Err(MembershipError::InvalidApplication(format!(
                "user id must be 1..={MAX_USER_ID_LENGTH} characters"
            )));
        }

        let id = loop {
            let candidate = ApplicationId::generate(now.year(), self.repo_mut().next_sequence()?);
            if self.repo().get_application(&candidate)?.is_none() {
                break candidate;
            }
        };

        let app = workflow::submit(id, user_id, profile, now)?;
        self.repo_mut().save_application(&app)?;
        Ok(app)
    }

    /// Apply a reviewer decision on behalf of `role`.
    ///
    /// The stored record is only replaced when the transition succeeds.
    pub fn decide(
        &mut self,
        id: &ApplicationId,
        decision: Decision,
        role: Role,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Application, MembershipError> {
        ensure_authorized(role, Action::from(decision))?;

        let mut app = self.get(id)?;
        workflow::apply(&mut app, decision, role.reviewer_title(), notes, now)?;
        self.repo_mut().save_application(&app)?;
        Ok(app)
    }

    /// Store an externally produced record as-is, replacing any record with
    /// the same id. Used to restore exports.
    pub fn import(&mut self, app: &Application) -> Result<(), MembershipError> {
        app.id.validate()?;
        self.repo_mut().save_application(app)
    }
}
