//! # Membership CLI Module
//!
//! This module implements the CLI interface.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `submit` - Submit an application for a member
//! - `show` - Show one application and its stage progress
//! - `list` - List applications
//! - `approve` / `reject` - Decide the current stage
//! - `export` / `import` - Move single records in and out
//! - `init` - Initialize a new database
//! - `hash` - BLAKE3 digest of an application's export
//! - `completion` - Profile completion of an application's snapshot

mod commands;

use crate::config::{Backend, Settings};
use clap::{Parser, Subcommand};
use membership_core::{MembershipError, Role};
use std::path::{Path, PathBuf};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Membership - application review service
///
/// Tracks membership applications through Block, District and State review
/// up to payment readiness.
#[derive(Parser, Debug)]
#[command(name = "membership")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the application database (overrides config)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "file" (JSON document) or "redb" (ACID database)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Who is deciding a stage: an explicit role or a legacy identifier.
#[derive(clap::Args, Debug, Clone)]
pub struct ReviewerArgs {
    /// Reviewer role (block_admin, district_admin, state_admin, super_admin)
    #[arg(short, long)]
    pub role: Option<Role>,

    /// Reviewer id or e-mail; the role is inferred when --role is absent
    #[arg(long)]
    pub reviewer: Option<String>,

    /// Notes recorded on the stage
    #[arg(short, long)]
    pub notes: Option<String>,
}

impl ReviewerArgs {
    /// Resolve the acting role.
    pub fn resolve_role(&self) -> Result<Role, MembershipError> {
        match (self.role, self.reviewer.as_deref()) {
            (Some(role), _) => Ok(role),
            (None, Some(id)) => Ok(Role::from_identifier(id)),
            (None, None) => Err(MembershipError::InvalidApplication(
                "--role or --reviewer is required".to_string(),
            )),
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Submit a new application
    Submit {
        /// Owning member's id or e-mail
        #[arg(short, long)]
        user: String,

        /// JSON file with the profile snapshot ({"profile": {...}, "extra": {...}})
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },

    /// Show one application with its stage progress
    Show {
        /// Application id
        id: String,
    },

    /// List applications
    List {
        /// Only this member's applications
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Approve the current stage
    Approve {
        /// Application id
        id: String,

        #[command(flatten)]
        reviewer: ReviewerArgs,
    },

    /// Reject the current stage
    Reject {
        /// Application id
        id: String,

        #[command(flatten)]
        reviewer: ReviewerArgs,
    },

    /// Export one application as JSON
    Export {
        /// Application id
        id: String,

        /// Output file path (defaults to <id>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import an exported application
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Compute BLAKE3 digest of an application's export
    Hash {
        /// Application id
        id: String,
    },

    /// Show profile completion for an application's snapshot
    Completion {
        /// Application id
        id: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Storage location after CLI overrides.
#[derive(Debug, Clone)]
pub struct StorageTarget {
    pub database: PathBuf,
    pub backend: Backend,
}

impl StorageTarget {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.database
    }
}

/// Execute the CLI with parsed arguments and loaded settings.
pub async fn execute(cli: Cli, mut settings: Settings) -> Result<(), MembershipError> {
    if let Some(database) = cli.database {
        settings.storage.database = database;
    }
    if let Some(backend) = cli.backend {
        settings.storage.backend = backend;
    }
    let target = StorageTarget {
        database: settings.storage.database.clone(),
        backend: settings.storage.backend,
    };
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            cmd_server(&target, &settings).await
        }
        Some(Commands::Submit { user, profile }) => {
            cmd_submit(&target, json_mode, &user, profile.as_deref())
        }
        Some(Commands::Show { id }) => cmd_show(&target, json_mode, &id),
        Some(Commands::List { user }) => cmd_list(&target, json_mode, user.as_deref()),
        Some(Commands::Approve { id, reviewer }) => cmd_decide(
            &target,
            json_mode,
            &id,
            membership_core::Decision::Approve,
            &reviewer,
        ),
        Some(Commands::Reject { id, reviewer }) => cmd_decide(
            &target,
            json_mode,
            &id,
            membership_core::Decision::Reject,
            &reviewer,
        ),
        Some(Commands::Export { id, output }) => {
            cmd_export(&target, &id, output.as_deref())
        }
        Some(Commands::Import { input }) => cmd_import(&target, &input),
        Some(Commands::Init { force }) => cmd_init(&target, force),
        Some(Commands::Hash { id }) => cmd_hash(&target, json_mode, &id),
        Some(Commands::Completion { id }) => cmd_completion(&target, json_mode, &id),
        None => {
            // No subcommand - list everything by default
            cmd_list(&target, json_mode, None)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_global_and_decision_args() {
        let cli = Cli::parse_from([
            "membership",
            "--backend",
            "file",
            "-D",
            "apps.json",
            "approve",
            "APP-2025-001",
            "--role",
            "block_admin",
            "--notes",
            "documents verified",
        ]);
        assert_eq!(cli.backend, Some(Backend::File));
        assert_eq!(cli.database, Some(PathBuf::from("apps.json")));
        match cli.command {
            Some(Commands::Approve { id, reviewer }) => {
                assert_eq!(id, "APP-2025-001");
                assert_eq!(reviewer.resolve_role().expect("role"), Role::BlockAdmin);
                assert_eq!(reviewer.notes.as_deref(), Some("documents verified"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn reviewer_identifier_infers_role() {
        let args = ReviewerArgs {
            role: None,
            reviewer: Some("district.pune@activ.com".to_string()),
            notes: None,
        };
        assert_eq!(args.resolve_role().expect("role"), Role::DistrictAdmin);
    }

    #[test]
    fn reviewer_is_required() {
        let args = ReviewerArgs {
            role: None,
            reviewer: None,
            notes: None,
        };
        assert!(args.resolve_role().is_err());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["membership", "--backend", "sqlite", "list"]).is_err());
    }
}
