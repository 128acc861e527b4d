//! # Storage Module
//!
//! Persistent application storage.
//!
//! - [`RedbRepository`]: redb database, one ACID transaction per change
//! - [`JsonFileRepository`]: a JSON array of applications, rewritten after
//!   every change

mod json_file;
mod redb_store;

pub use json_file::JsonFileRepository;
pub use redb_store::RedbRepository;
