//! # Membership Service Library
//!
//! HTTP API, CLI and configuration for the membership review service.
//! Split out of the binary so integration tests can build routers directly.

pub mod api;
pub mod cli;
pub mod config;
