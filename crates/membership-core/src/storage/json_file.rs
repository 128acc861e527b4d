//! # JSON File Application Storage
//!
//! The whole database is one pretty-printed JSON array of applications, the
//! same shape a browser keeps under its `applications` key. Every successful
//! save rewrites the file through a temporary sibling and a rename, so a
//! reader sees either the old array or the new one.
//!
//! A save whose write fails leaves the in-memory state unchanged.

use crate::primitives::MAX_DATABASE_FILE_SIZE;
use crate::repository::{ApplicationRepository, InMemoryRepository};
use crate::{Application, ApplicationId, MembershipError};
use std::path::{Path, PathBuf};

/// A file-backed application repository.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    records: InMemoryRepository,
}

impl JsonFileRepository {
    /// Open the array at `path`, creating an empty one if the file is missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MembershipError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let repo = Self {
                path,
                records: InMemoryRepository::new(),
            };
            repo.write(&repo.records)?;
            return Ok(repo);
        }

        let metadata = std::fs::metadata(&path)
            .map_err(|e| MembershipError::IoError(format!("Cannot read db metadata: {}", e)))?;
        if metadata.len() > MAX_DATABASE_FILE_SIZE {
            return Err(MembershipError::SerializationError(format!(
                "Database size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_DATABASE_FILE_SIZE
            )));
        }

        let data = std::fs::read(&path)
            .map_err(|e| MembershipError::IoError(format!("Read db: {}", e)))?;
        let apps: Vec<Application> = serde_json::from_slice(&data).map_err(|e| {
            MembershipError::SerializationError(format!("Could not parse database file: {}", e))
        })?;

        Ok(Self {
            path,
            records: InMemoryRepository::from_applications(apps),
        })
    }

    fn write(&self, records: &InMemoryRepository) -> Result<(), MembershipError> {
        let apps = records.list_applications()?;
        let data = serde_json::to_vec_pretty(&apps)
            .map_err(|e| MembershipError::SerializationError(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, &data)
            .map_err(|e| MembershipError::IoError(format!("Write db: {}", e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| MembershipError::IoError(format!("Replace db: {}", e)))
    }
}

impl ApplicationRepository for JsonFileRepository {
    fn get_application(&self, id: &ApplicationId) -> Result<Option<Application>, MembershipError> {
        self.records.get_application(id)
    }

    fn save_application(&mut self, app: &Application) -> Result<(), MembershipError> {
        let mut next = self.records.clone();
        next.save_application(app)?;
        self.write(&next)?;
        self.records = next;
        Ok(())
    }

    fn list_applications(&self) -> Result<Vec<Application>, MembershipError> {
        self.records.list_applications()
    }

    // Not written to disk: on reopen the sequence restarts at the record
    // count and the registry skips ids that are taken.
    fn next_sequence(&mut self) -> Result<u64, MembershipError> {
        self.records.next_sequence()
    }

    fn application_count(&self) -> Result<usize, MembershipError> {
        self.records.application_count()
    }
}
