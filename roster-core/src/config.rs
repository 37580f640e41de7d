//! Configuration management for Roster
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (ROSTER_*)
//! 3. Config file (~/.config/roster/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::policy::DEFAULT_MAX_REVIEWERS;
use crate::{Error, Result};

/// Reviewer assignment configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssignmentConfig {
    /// Cap on simultaneous reviewers per pull request
    pub max_reviewers: usize,

    /// Fixed seed for reviewer selection, for reproducible runs
    pub seed: Option<u64>,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            max_reviewers: DEFAULT_MAX_REVIEWERS,
            seed: None, // Seed from OS entropy
        }
    }
}

/// Database location and pool settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file
    pub path: Option<PathBuf>,

    /// Maximum number of pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
        }
    }
}

impl DatabaseSettings {
    /// Configured path, or `~/.cache/roster/roster.db`
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        dirs::cache_dir()
            .map(|p| p.join("roster").join("roster.db"))
            .ok_or_else(|| Error::Config("Could not determine cache directory".to_string()))
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Assignment configuration
    pub assignment: AssignmentConfig,

    /// Database configuration
    pub database: DatabaseSettings,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/roster/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("roster").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - ROSTER_MAX_REVIEWERS: reviewer cap per pull request
    /// - ROSTER_SEED: selection seed
    /// - ROSTER_DB_PATH: database file
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(max) = var("ROSTER_MAX_REVIEWERS") {
            self.assignment.max_reviewers = max.parse().map_err(|_| {
                Error::Config(format!("ROSTER_MAX_REVIEWERS is not a number: {}", max))
            })?;
        }

        if let Some(seed) = var("ROSTER_SEED") {
            self.assignment.seed = Some(
                seed.parse()
                    .map_err(|_| Error::Config(format!("ROSTER_SEED is not a number: {}", seed)))?,
            );
        }

        if let Some(path) = var("ROSTER_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(
        mut self,
        max_reviewers: Option<usize>,
        seed: Option<u64>,
        db_path: Option<PathBuf>,
    ) -> Self {
        if let Some(max) = max_reviewers {
            self.assignment.max_reviewers = max;
        }

        if let Some(seed) = seed {
            self.assignment.seed = Some(seed);
        }

        if let Some(path) = db_path {
            self.database.path = Some(path);
        }

        self
    }

    /// Reject settings the engine cannot work with
    pub fn validate(self) -> Result<Self> {
        if self.assignment.max_reviewers == 0 {
            return Err(Error::Config(
                "max_reviewers must be at least 1".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        max_reviewers: Option<usize>,
        seed: Option<u64>,
        db_path: Option<PathBuf>,
    ) -> Result<Self> {
        Self::load()?
            .with_env_overrides()?
            .with_cli_overrides(max_reviewers, seed, db_path)
            .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.assignment.max_reviewers, 2);
        assert!(config.assignment.seed.is_none());
        assert!(config.database.path.is_none());
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default().with_cli_overrides(
            Some(3),
            Some(42),
            Some(PathBuf::from("/tmp/roster.db")),
        );

        assert_eq!(config.assignment.max_reviewers, 3);
        assert_eq!(config.assignment.seed, Some(42));
        assert_eq!(
            config.database.resolved_path().unwrap(),
            PathBuf::from("/tmp/roster.db")
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([("ROSTER_MAX_REVIEWERS", "4"), ("ROSTER_SEED", "7")]);
        let config = Config::default()
            .with_overrides_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.assignment.max_reviewers, 4);
        assert_eq!(config.assignment.seed, Some(7));
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let result = Config::default().with_overrides_from(|k| {
            (k == "ROSTER_MAX_REVIEWERS").then(|| "two".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_reviewers() {
        let config = Config::default().with_cli_overrides(Some(0), None, None);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[assignment]
max_reviewers = 3
seed = 1234

[database]
path = "/var/lib/roster/roster.db"
max_connections = 2
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.assignment.max_reviewers, 3);
        assert_eq!(config.assignment.seed, Some(1234));
        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/var/lib/roster/roster.db"))
        );
        assert_eq!(config.database.max_connections, 2);
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[assignment]
seed = 5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        // max_reviewers should use default
        assert_eq!(config.assignment.max_reviewers, 2);
        assert_eq!(config.assignment.seed, Some(5));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[assignment]\nmax_reviewers = 1\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.assignment.max_reviewers, 1);
    }
}
