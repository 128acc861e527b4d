//! # redb-backed Application Storage
//!
//! Disk-backed application store using the redb embedded database. Every
//! write is its own ACID transaction, so a crash never leaves a record half
//! updated.
//!
//! Records are stored as JSON rather than a compact binary encoding: profile
//! snapshots are free-form and need a self-describing format.

use crate::repository::ApplicationRepository;
use crate::{Application, ApplicationId, MembershipError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for applications: application id -> JSON bytes
const APPLICATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("applications");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// Metadata key holding the last submission sequence handed out.
const SEQUENCE_KEY: &str = "last_application_seq";

/// A disk-backed application repository.
pub struct RedbRepository {
    db: Database,
}

impl std::fmt::Debug for RedbRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbRepository").finish_non_exhaustive()
    }
}

fn io_err(e: impl std::fmt::Display) -> MembershipError {
    MembershipError::IoError(e.to_string())
}

impl RedbRepository {
    /// Open or create an application database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MembershipError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Create tables up front so read transactions never miss them.
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(APPLICATIONS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    fn decode(bytes: &[u8]) -> Result<Application, MembershipError> {
        serde_json::from_slice(bytes)
            .map_err(|e| MembershipError::SerializationError(e.to_string()))
    }
}

impl ApplicationRepository for RedbRepository {
    fn get_application(&self, id: &ApplicationId) -> Result<Option<Application>, MembershipError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(APPLICATIONS).map_err(io_err)?;

        match table.get(id.as_str()).map_err(io_err)? {
            Some(data) => Ok(Some(Self::decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn save_application(&mut self, app: &Application) -> Result<(), MembershipError> {
        let bytes = serde_json::to_vec(app)
            .map_err(|e| MembershipError::SerializationError(e.to_string()))?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(APPLICATIONS).map_err(io_err)?;
            table
                .insert(app.id.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn list_applications(&self) -> Result<Vec<Application>, MembershipError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(APPLICATIONS).map_err(io_err)?;

        let mut apps = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            apps.push(Self::decode(value.value())?);
        }
        Ok(apps)
    }

    fn next_sequence(&mut self) -> Result<u64, MembershipError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let next = {
            let mut table = write_txn.open_table(METADATA).map_err(io_err)?;
            let current = table
                .get(SEQUENCE_KEY)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            let next = current.saturating_add(1);
            table.insert(SEQUENCE_KEY, next).map_err(io_err)?;
            next
        };
        write_txn.commit().map_err(io_err)?;
        Ok(next)
    }

    fn application_count(&self) -> Result<usize, MembershipError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(APPLICATIONS).map_err(io_err)?;
        let len = table.len().map_err(io_err)?;
        Ok(len as usize)
    }
}
