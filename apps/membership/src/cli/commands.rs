//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::{ReviewerArgs, StorageTarget};
use crate::api::{self, AppState, ApplicationSummary};
use crate::config::{Backend, Settings};
use chrono::Utc;
use membership_core::{
    ApplicationId, Decision, MembershipError, ProfileSnapshot, ProgressReport,
    Registry, export_digest, export_filename, export_json, import_json,
    primitives::MAX_IMPORT_SIZE,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a profile snapshot file (1 MB).
const MAX_PROFILE_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), MembershipError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| MembershipError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(MembershipError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path, following symlinks and `..`, and require a
/// regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, MembershipError> {
    let canonical = path.canonicalize().map_err(|e| {
        MembershipError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(MembershipError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, MembershipError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        MembershipError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(MembershipError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| MembershipError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), MembershipError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| MembershipError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    target: &StorageTarget,
    settings: &Settings,
) -> Result<(), MembershipError> {
    let registry = load_or_create_registry(target)?;
    let stored = registry.count()?;

    println!("Membership Review Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", settings.server.host);
    println!("  Port:     {}", settings.server.port);
    println!("  Backend:  {}", target.backend);
    println!("  Database: {:?} ({} applications)", target.path(), stored);
    println!();
    println!("Endpoints:");
    println!("  GET   /applications               - List applications");
    println!("  POST  /applications               - Submit an application");
    println!("  GET   /applications/{{id}}          - Fetch an application");
    println!("  PATCH /applications/{{id}}          - Approve or reject the current stage");
    println!("  GET   /applications/{{id}}/progress - Stage progress");
    println!("  GET   /applications/{{id}}/export   - Download as JSON");
    println!("  GET   /health                     - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(registry);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    api::run_server(&addr, state, settings).await
}

// =============================================================================
// SUBMIT COMMAND
// =============================================================================

/// Submit a new application.
pub fn cmd_submit(
    target: &StorageTarget,
    json_mode: bool,
    user: &str,
    profile: Option<&Path>,
) -> Result<(), MembershipError> {
    let snapshot = match profile {
        Some(path) => Some(read_profile(path)?),
        None => None,
    };

    let mut registry = load_or_create_registry(target)?;
    let app = registry.submit(user, snapshot, Utc::now())?;

    if json_mode {
        return print_json(&app);
    }

    println!("Application submitted");
    println!("  ID:        {}", app.id);
    println!("  Member:    {}", app.user_id);
    println!("  Submitted: {}", app.submitted_at.format("%Y-%m-%d %H:%M UTC"));
    println!("  Status:    {}", app.status);
    Ok(())
}

fn read_profile(path: &Path) -> Result<ProfileSnapshot, MembershipError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_PROFILE_FILE_SIZE)?;
    let data = std::fs::read(&validated)
        .map_err(|e| MembershipError::IoError(format!("Read profile: {}", e)))?;
    serde_json::from_slice(&data)
        .map_err(|e| MembershipError::SerializationError(format!("Invalid profile: {}", e)))
}

// =============================================================================
// SHOW / LIST COMMANDS
// =============================================================================

/// Show one application with its stage progress.
pub fn cmd_show(target: &StorageTarget, json_mode: bool, id: &str) -> Result<(), MembershipError> {
    let registry = load_or_create_registry(target)?;
    let app = registry.get(&ApplicationId::new(id))?;
    let report = ProgressReport::from_application(&app);

    if json_mode {
        return print_json(&serde_json::json!({
            "application": app,
            "progress": report,
        }));
    }

    let name = app
        .profile
        .as_ref()
        .map(|p| p.display_name(&app.user_id))
        .unwrap_or_else(|| app.user_id.clone());

    println!("Application {}", app.id);
    println!("==========================");
    println!("Applicant: {}", name);
    if let Some(phone) = app.profile.as_ref().and_then(ProfileSnapshot::phone) {
        println!("Phone:     {}", phone);
    }
    println!("Submitted: {}", app.submitted_at.format("%Y-%m-%d %H:%M UTC"));
    println!("Status:    {} [{}]", app.status, report.badge);
    println!(
        "Progress:  {}% ({} of {} stages approved)",
        report.percent_complete, report.completed_count, report.total_stages
    );
    println!();
    for stage in &report.stages {
        let marker = match stage.state {
            membership_core::StageDisplayState::Approved => "[x]",
            membership_core::StageDisplayState::Active => "[>]",
            membership_core::StageDisplayState::Pending => "[ ]",
        };
        println!(
            "  {} {}. {:<24} {}",
            marker,
            stage.id,
            stage.title,
            stage.status.as_deref().unwrap_or("-")
        );
        if let Some(reviewer) = stage.reviewer.as_deref().filter(|r| !r.is_empty()) {
            let date = stage
                .review_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            println!("        by {} {}", reviewer, date);
        }
        if let Some(notes) = stage.notes.as_deref().filter(|n| !n.is_empty()) {
            println!("        notes: {}", notes);
        }
    }
    Ok(())
}

/// List applications.
pub fn cmd_list(
    target: &StorageTarget,
    json_mode: bool,
    user: Option<&str>,
) -> Result<(), MembershipError> {
    let registry = load_or_create_registry(target)?;
    let apps = match user {
        Some(user) => registry.list_for_user(user)?,
        None => registry.list()?,
    };
    let rows: Vec<ApplicationSummary> = apps
        .iter()
        .map(ApplicationSummary::from_application)
        .collect();

    if json_mode {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!("No applications.");
        return Ok(());
    }
    println!("{:<16} {:<28} {:>4}  {}", "ID", "APPLICANT", "%", "STATUS");
    for row in &rows {
        println!(
            "{:<16} {:<28} {:>4}  {}",
            row.id, row.applicant_name, row.percent_complete, row.badge
        );
    }
    println!();
    println!("{} application(s)", rows.len());
    Ok(())
}

// =============================================================================
// DECISION COMMAND
// =============================================================================

/// Approve or reject the current stage.
pub fn cmd_decide(
    target: &StorageTarget,
    json_mode: bool,
    id: &str,
    decision: Decision,
    reviewer: &ReviewerArgs,
) -> Result<(), MembershipError> {
    let role = reviewer.resolve_role()?;
    let mut registry = load_or_create_registry(target)?;
    let app = registry.decide(
        &ApplicationId::new(id),
        decision,
        role,
        reviewer.notes.clone(),
        Utc::now(),
    )?;

    if json_mode {
        return print_json(&app);
    }

    let verb = match decision {
        Decision::Approve => "Approved",
        Decision::Reject => "Rejected",
    };
    let report = ProgressReport::from_application(&app);
    println!("{} by {}", verb, role.reviewer_title());
    println!("  Status:   {}", app.status);
    println!("  Progress: {}%", report.percent_complete);
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT COMMANDS
// =============================================================================

/// Export one application as pretty JSON.
pub fn cmd_export(
    target: &StorageTarget,
    id: &str,
    output: Option<&Path>,
) -> Result<(), MembershipError> {
    let registry = load_or_create_registry(target)?;
    let app = registry.get(&ApplicationId::new(id))?;

    let default_name = PathBuf::from(export_filename(&app));
    let validated_output = validate_output_path(output.unwrap_or(&default_name))?;

    let data = export_json(&app)?;
    std::fs::write(&validated_output, data.as_bytes())
        .map_err(|e| MembershipError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    println!("BLAKE3: {}", export_digest(&app)?);
    Ok(())
}

/// Import an exported application, replacing any record with the same id.
pub fn cmd_import(target: &StorageTarget, input: &Path) -> Result<(), MembershipError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_SIZE as u64)?;

    let data = std::fs::read_to_string(&validated_path)
        .map_err(|e| MembershipError::IoError(format!("Read file: {}", e)))?;
    let app = import_json(&data)?;

    let mut registry = load_or_create_registry(target)?;
    registry.import(&app)?;

    println!("Imported application {}", app.id);
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(target: &StorageTarget, force: bool) -> Result<(), MembershipError> {
    let path = target.path();
    if path.exists() {
        if !force {
            return Err(MembershipError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| MembershipError::IoError(format!("Remove old database: {}", e)))?;
    }

    match target.backend {
        Backend::Redb => {
            let _registry = Registry::with_redb(path)?;
            println!("Initialized new redb database at {:?}", path);
        }
        Backend::File => {
            let _registry = Registry::with_json_file(path)?;
            println!("Initialized new file database at {:?}", path);
        }
    }
    Ok(())
}

// =============================================================================
// HASH / COMPLETION COMMANDS
// =============================================================================

/// Print the BLAKE3 digest of an application's export.
pub fn cmd_hash(target: &StorageTarget, json_mode: bool, id: &str) -> Result<(), MembershipError> {
    let registry = load_or_create_registry(target)?;
    let app = registry.get(&ApplicationId::new(id))?;
    let hash = export_digest(&app)?;

    if json_mode {
        return print_json(&serde_json::json!({
            "id": app.id,
            "algorithm": "blake3",
            "hash": hash,
        }));
    }
    println!("BLAKE3: {}", hash);
    Ok(())
}

/// Print how much of the submitted profile was filled in.
pub fn cmd_completion(
    target: &StorageTarget,
    json_mode: bool,
    id: &str,
) -> Result<(), MembershipError> {
    let registry = load_or_create_registry(target)?;
    let app = registry.get(&ApplicationId::new(id))?;
    let percent = app
        .profile
        .as_ref()
        .map(ProfileSnapshot::completion_percent)
        .unwrap_or(0);

    if json_mode {
        return print_json(&serde_json::json!({
            "id": app.id,
            "profileCompletion": percent,
        }));
    }
    println!("Profile completion: {}%", percent);
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the registry for the configured backend, creating an empty database
/// when none exists. Both backends write every change through to disk.
pub fn load_or_create_registry(target: &StorageTarget) -> Result<Registry, MembershipError> {
    match target.backend {
        Backend::Redb => Registry::with_redb(target.path()),
        Backend::File => Registry::with_json_file(target.path()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use membership_core::{ApplicationStatus, Role};
    use tempfile::tempdir;

    fn file_target(dir: &Path) -> StorageTarget {
        StorageTarget {
            database: dir.join("applications.json"),
            backend: Backend::File,
        }
    }

    #[test]
    fn file_backend_round_trip() {
        let temp = tempdir().expect("temp dir");
        let target = file_target(temp.path());

        let mut registry = load_or_create_registry(&target).expect("load");
        let app = registry.submit("member-1", None, Utc::now()).expect("submit");
        registry
            .decide(&app.id, Decision::Approve, Role::BlockAdmin, None, Utc::now())
            .expect("approve");

        // No save step: a fresh handle reads both changes back.
        let reloaded = load_or_create_registry(&target).expect("reload");
        let stored = reloaded.get(&app.id).expect("get");
        assert_eq!(stored.stage, 2);
        assert_eq!(stored.status, ApplicationStatus::UnderReview);
    }

    #[test]
    fn corrupt_file_database_is_reported() {
        let temp = tempdir().expect("temp dir");
        let target = file_target(temp.path());
        std::fs::write(target.path(), b"{ nope").expect("write");
        assert!(matches!(
            load_or_create_registry(&target),
            Err(MembershipError::SerializationError(_))
        ));
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let temp = tempdir().expect("temp dir");
        let target = file_target(temp.path());
        cmd_init(&target, false).expect("init");
        assert!(cmd_init(&target, false).is_err());
        cmd_init(&target, true).expect("forced init");
    }

    #[test]
    fn export_then_import_into_fresh_database() {
        let temp = tempdir().expect("temp dir");
        let source = file_target(temp.path());
        let mut registry = load_or_create_registry(&source).expect("load");
        let app = registry.submit("member-1", None, Utc::now()).expect("submit");

        let out = temp.path().join("export.json");
        cmd_export(&source, app.id.as_str(), Some(&out)).expect("export");

        let target = StorageTarget {
            database: temp.path().join("restored.redb"),
            backend: Backend::Redb,
        };
        cmd_import(&target, &out).expect("import");
        let restored = load_or_create_registry(&target).expect("open");
        assert_eq!(restored.get(&app.id).expect("get"), app);
    }

    #[test]
    fn output_path_without_directory_uses_cwd() {
        let resolved = validate_output_path(Path::new("APP-2025-001.json")).expect("resolve");
        assert!(resolved.ends_with("APP-2025-001.json"));
    }
}
