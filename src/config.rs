use anyhow::{bail, Result};
use chrono::TimeDelta;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::workflow::{RoleLevel, Thresholds};

/// Main configuration structure for the workflow engine
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Engine rules: role thresholds, lock timeout, publish gating
    pub workflow: WorkflowSettings,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Database settings (optional)
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Role required for each gated effect
    pub thresholds: Thresholds,
    /// Locks older than this are treated as released
    pub lock_timeout_minutes: i64,
    /// Refuse Reviewed -> Published while the publication checklist is incomplete
    pub require_complete_publication_checklist: bool,
    /// Buffered change notifications per subscriber
    pub event_channel_capacity: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            lock_timeout_minutes: 10,
            require_complete_publication_checklist: false,
            event_channel_capacity: 256,
        }
    }
}

impl WorkflowSettings {
    /// Lock timeout as a duration. A value too large to represent saturates,
    /// which means locks never go stale.
    pub fn lock_timeout(&self) -> TimeDelta {
        TimeDelta::try_minutes(self.lock_timeout_minutes).unwrap_or(TimeDelta::MAX)
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.lock_timeout_minutes <= 0 {
            bail!(
                "workflow.lock_timeout_minutes must be positive, got {}",
                self.lock_timeout_minutes
            );
        }
        if TimeDelta::try_minutes(self.lock_timeout_minutes).is_none() {
            bail!(
                "workflow.lock_timeout_minutes is out of range: {}",
                self.lock_timeout_minutes
            );
        }
        if self.thresholds.restart < RoleLevel::Publisher {
            bail!(
                "workflow.thresholds.restart must be Publisher, got {}",
                self.thresholds.restart
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON instead of human-readable log lines
    pub json_logs: bool,
    /// Count engine outcomes and log them after a replay
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://borehole-workflow.db".to_string(),
            max_connections: 10,
            auto_migrate: true,
        }
    }
}

impl WorkflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (borehole-workflow.toml, or the given path)
    /// 3. Environment variables (prefixed with BOREHOLE_WORKFLOW_, `__` between sections)
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&WorkflowConfig::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None if Path::new("borehole-workflow.toml").exists() => {
                builder = builder.add_source(File::with_name("borehole-workflow"));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("BOREHOLE_WORKFLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: WorkflowConfig = builder.build()?.try_deserialize()?;
        config.workflow.validate()?;
        Ok(config)
    }

    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<WorkflowConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = WorkflowConfig::load_env_file();
        WorkflowConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static WorkflowConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_role_table() {
        let settings = WorkflowSettings::default();
        assert_eq!(settings.thresholds.published, RoleLevel::Publisher);
        assert_eq!(settings.lock_timeout(), chrono::Duration::minutes(10));
        assert!(!settings.require_complete_publication_checklist);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.toml");
        std::fs::write(
            &path,
            r#"
[workflow]
lock_timeout_minutes = 30
require_complete_publication_checklist = true

[workflow.thresholds]
reviewed = "Validator"
"#,
        )
        .unwrap();

        let config = WorkflowConfig::load_from(Some(&path)).unwrap();

        assert_eq!(config.workflow.lock_timeout_minutes, 30);
        assert!(config.workflow.require_complete_publication_checklist);
        assert_eq!(config.workflow.thresholds.reviewed, RoleLevel::Validator);
        // untouched keys keep their defaults
        assert_eq!(config.workflow.thresholds.in_review, RoleLevel::Editor);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");

        let mut config = WorkflowConfig::default();
        config.workflow.thresholds.reject = RoleLevel::Validator;
        config.save_to_file(&path).unwrap();

        let loaded = WorkflowConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.workflow, config.workflow);
    }

    #[test]
    fn test_lock_timeout_saturates_instead_of_overflowing() {
        let settings = WorkflowSettings {
            lock_timeout_minutes: i64::MAX,
            ..WorkflowSettings::default()
        };
        assert_eq!(settings.lock_timeout(), TimeDelta::MAX);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_invalid_settings_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();

        for (name, body) in [
            ("negative.toml", "[workflow]\nlock_timeout_minutes = -5\n"),
            ("zero.toml", "[workflow]\nlock_timeout_minutes = 0\n"),
            ("huge.toml", "[workflow]\nlock_timeout_minutes = 1000000000000000\n"),
            ("restart.toml", "[workflow.thresholds]\nrestart = \"Controller\"\n"),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            assert!(WorkflowConfig::load_from(Some(&path)).is_err(), "{name}");
        }
    }
}
