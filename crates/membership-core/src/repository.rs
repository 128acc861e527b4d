//! # Application Repository
//!
//! Storage abstraction for application records.
//!
//! A repository is a dumb keyed store: it does not validate transitions or
//! check roles. The [`Registry`](crate::Registry) does that before calling
//! [`ApplicationRepository::save_application`].

use crate::{Application, ApplicationId, MembershipError};
use std::collections::BTreeMap;

/// Trait for application storage backends.
pub trait ApplicationRepository {
    /// Fetch one application by id.
    fn get_application(&self, id: &ApplicationId) -> Result<Option<Application>, MembershipError>;

    /// Insert or replace the record stored under `app.id`.
    fn save_application(&mut self, app: &Application) -> Result<(), MembershipError>;

    /// All stored applications, ordered by id.
    fn list_applications(&self) -> Result<Vec<Application>, MembershipError>;

    /// Reserve the next submission sequence number (starts at 1).
    fn next_sequence(&mut self) -> Result<u64, MembershipError>;

    /// Number of stored applications.
    fn application_count(&self) -> Result<usize, MembershipError> {
        Ok(self.list_applications()?.len())
    }

    /// Applications owned by `user_id`, newest submission first.
    fn applications_for_user(&self, user_id: &str) -> Result<Vec<Application>, MembershipError> {
        let mut owned: Vec<Application> = self
            .list_applications()?
            .into_iter()
            .filter(|app| app.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(owned)
    }
}

/// In-memory repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryRepository {
    applications: BTreeMap<ApplicationId, Application>,
    /// Last sequence number handed out.
    last_sequence: u64,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a repository with existing records. Later duplicates win.
    #[must_use]
    pub fn from_applications(apps: impl IntoIterator<Item = Application>) -> Self {
        let applications: BTreeMap<_, _> =
            apps.into_iter().map(|app| (app.id.clone(), app)).collect();
        let last_sequence = applications.len() as u64;
        Self {
            applications,
            last_sequence,
        }
    }

    /// Number of stored applications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.applications.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }
}

impl ApplicationRepository for InMemoryRepository {
    fn get_application(&self, id: &ApplicationId) -> Result<Option<Application>, MembershipError> {
        Ok(self.applications.get(id).cloned())
    }

    fn save_application(&mut self, app: &Application) -> Result<(), MembershipError> {
        self.applications.insert(app.id.clone(), app.clone());
        Ok(())
    }

    fn list_applications(&self) -> Result<Vec<Application>, MembershipError> {
        Ok(self.applications.values().cloned().collect())
    }

    fn next_sequence(&mut self) -> Result<u64, MembershipError> {
        self.last_sequence = self.last_sequence.saturating_add(1);
        Ok(self.last_sequence)
    }

    fn application_count(&self) -> Result<usize, MembershipError> {
        Ok(self.applications.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow;
    use chrono::{TimeZone, Utc};

    fn app(id: &str, user: &str, day: u32) -> Application {
        let at = Utc
            .with_ymd_and_hms(2025, 5, day, 9, 0, 0)
            .single()
            .expect("valid date");
        workflow::submit(ApplicationId::new(id), user, None, at).expect("submit")
    }

    #[test]
    fn save_then_get() {
        let mut repo = InMemoryRepository::new();
        let a = app("APP-1", "u1", 1);
        repo.save_application(&a).expect("save");
        assert_eq!(repo.get_application(&a.id).expect("get"), Some(a));
        assert_eq!(
            repo.get_application(&ApplicationId::new("APP-2")).expect("get"),
            None
        );
    }

    #[test]
    fn save_replaces_existing_record() {
        let mut repo = InMemoryRepository::new();
        let mut a = app("APP-1", "u1", 1);
        repo.save_application(&a).expect("save");
        a.stage = 2;
        repo.save_application(&a).expect("save");
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.get_application(&a.id).expect("get").map(|x| x.stage), Some(2));
    }

    #[test]
    fn sequence_is_monotonic() {
        let mut repo = InMemoryRepository::new();
        assert_eq!(repo.next_sequence().expect("seq"), 1);
        assert_eq!(repo.next_sequence().expect("seq"), 2);
    }

    #[test]
    fn seeded_repository_continues_sequence() {
        let mut repo = InMemoryRepository::from_applications(vec![
            app("APP-1", "u1", 1),
            app("APP-2", "u2", 2),
        ]);
        assert_eq!(repo.next_sequence().expect("seq"), 3);
    }

    #[test]
    fn user_listing_is_newest_first() {
        let repo = InMemoryRepository::from_applications(vec![
            app("APP-1", "u1", 1),
            app("APP-2", "u2", 2),
            app("APP-3", "u1", 3),
        ]);
        let ids: Vec<_> = repo
            .applications_for_user("u1")
            .expect("list")
            .into_iter()
            .map(|a| a.id.0)
            .collect();
        assert_eq!(ids, vec!["APP-3", "APP-1"]);
    }
}
