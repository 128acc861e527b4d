//! # Configuration
//!
//! Settings come from an optional TOML file, then environment variables.
//! Every field has a default, so an empty file (or none) is valid.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! cors_origins = ["https://members.example.org"]
//! rate_limit = 100
//! body_limit_bytes = 2097152
//!
//! [storage]
//! backend = "redb"
//! database = "membership.db"
//!
//! [auth]
//! api_key = "change-me"
//!
//! [logging]
//! format = "json"
//! filter = "membership=info,tower_http=debug"
//! ```
//!
//! ## Environment Overrides
//!
//! - `MEMBERSHIP_API_KEY`: bearer key required on every route but `/health`
//! - `MEMBERSHIP_RATE_LIMIT`: requests per second, 0 disables limiting
//! - `MEMBERSHIP_CORS_ORIGINS`: comma-separated origins, or `*`
//! - `MEMBERSHIP_LOG_FORMAT`: `text` or `json`

use membership_core::MembershipError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest configuration file accepted (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

// =============================================================================
// SETTINGS
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means localhost only; `["*"]` allows all.
    pub cors_origins: Vec<String>,
    /// Requests per second across all clients. 0 disables limiting.
    pub rate_limit: u32,
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            rate_limit: 100,
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Which storage engine holds the applications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A JSON array of applications, rewritten after each change.
    File,
    /// redb database, one transaction per change.
    #[default]
    Redb,
}

impl Backend {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::File => "file",
            Backend::Redb => "redb",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Backend {
    type Err = MembershipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Backend::File),
            "redb" => Ok(Backend::Redb),
            other => Err(MembershipError::InvalidApplication(format!(
                "unknown backend '{other}', expected file or redb"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: Backend,
    pub database: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Redb,
            database: PathBuf::from("membership.db"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// When set, every route except `/health` requires `Authorization: Bearer <key>`.
    pub api_key: Option<String>,
}

impl AuthSettings {
    /// The configured key, ignoring an empty string.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "membership=info,tower_http=debug".to_string(),
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl Settings {
    /// Load settings from `path` (if given) and the process environment.
    ///
    /// Also returns the override warnings, since logging is configured from
    /// the settings and cannot be running yet.
    pub fn load(path: Option<&Path>) -> Result<(Self, Vec<String>), MembershipError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let warnings = settings.apply_overrides(|key| std::env::var(key).ok());
        Ok((settings, warnings))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, MembershipError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            MembershipError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(MembershipError::SerializationError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| MembershipError::IoError(format!("Read config: {}", e)))?;
        Self::from_toml(&text)
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, MembershipError> {
        toml::from_str(text)
            .map_err(|e| MembershipError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Apply `MEMBERSHIP_*` overrides read through `lookup`.
    ///
    /// Unparseable values are ignored and reported in the returned list.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(key) = lookup("MEMBERSHIP_API_KEY") {
            self.auth.api_key = Some(key).filter(|k| !k.is_empty());
        }

        if let Some(raw) = lookup("MEMBERSHIP_RATE_LIMIT") {
            match raw.trim().parse() {
                Ok(rps) => self.server.rate_limit = rps,
                Err(_) => {
                    warnings.push(format!("Ignoring invalid MEMBERSHIP_RATE_LIMIT '{}'", raw));
                }
            }
        }

        if let Some(raw) = lookup("MEMBERSHIP_CORS_ORIGINS") {
            self.server.cors_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(raw) = lookup("MEMBERSHIP_LOG_FORMAT") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "json" => self.logging.format = LogFormat::Json,
                "text" => self.logging.format = LogFormat::Text,
                _ => warnings.push(format!("Ignoring invalid MEMBERSHIP_LOG_FORMAT '{}'", raw)),
            }
        }

        warnings
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let settings = Settings::from_toml("").expect("parse");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.server.rate_limit, 100);
        assert_eq!(settings.storage.backend, Backend::Redb);
        assert!(settings.auth.api_key().is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings = Settings::from_toml(
            r#"
            [server]
            port = 9000

            [storage]
            backend = "file"
            "#,
        )
        .expect("parse");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.storage.backend, Backend::File);
        assert_eq!(settings.storage.database, PathBuf::from("membership.db"));
    }

    #[test]
    fn invalid_toml_is_reported() {
        assert!(matches!(
            Settings::from_toml("[server\nport = "),
            Err(MembershipError::SerializationError(_))
        ));
    }

    #[test]
    fn environment_overrides_file() {
        let mut settings = Settings::from_toml("[auth]\napi_key = \"from-file\"").expect("parse");
        let warnings = settings.apply_overrides(env(&[
            ("MEMBERSHIP_API_KEY", "from-env"),
            ("MEMBERSHIP_RATE_LIMIT", "0"),
            ("MEMBERSHIP_CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("MEMBERSHIP_LOG_FORMAT", "JSON"),
        ]));
        assert_eq!(settings.auth.api_key(), Some("from-env"));
        assert_eq!(settings.server.rate_limit, 0);
        assert_eq!(
            settings.server.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert!(warnings.is_empty());
    }

    #[test]
    fn bad_override_values_are_ignored() {
        let mut settings = Settings::default();
        let warnings = settings.apply_overrides(env(&[
            ("MEMBERSHIP_RATE_LIMIT", "lots"),
            ("MEMBERSHIP_LOG_FORMAT", "xml"),
        ]));
        assert_eq!(settings.server.rate_limit, 100);
        assert_eq!(settings.logging.format, LogFormat::Text);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("'lots'"));
        assert!(warnings[1].contains("'xml'"));
    }

    #[test]
    fn empty_api_key_disables_auth() {
        let mut settings = Settings::default();
        let warnings = settings.apply_overrides(env(&[("MEMBERSHIP_API_KEY", "")]));
        assert!(warnings.is_empty());
        assert!(settings.auth.api_key().is_none());
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("REDB".parse::<Backend>().expect("parse"), Backend::Redb);
        assert!("sqlite".parse::<Backend>().is_err());
    }
}
