use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assignment::{PersonRoles, RoleDirectory, TaskAssigner};

/// Main configuration structure for the approval engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApprovalConfig {
    /// Workspace file settings
    pub store: StoreConfig,
    /// Task creation settings
    pub tasks: TaskConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// People and the roles they hold
    #[serde(default)]
    pub directory: Vec<PersonRoles>,
    /// Database settings (optional)
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// JSON workspace used by the command-line tool
    pub state_file: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskConfig {
    /// Fail transition creation when nobody holds the task's role
    pub require_assignee: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable output
    pub json_logs: bool,
    /// Report transition counters at shutdown
    pub metrics_enabled: bool,
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

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                state_file: ".invoice-approval/workspace.json".to_string(),
            },
            tasks: TaskConfig {
                require_assignee: false, // role-only tasks are allowed unless asked otherwise
            },
            observability: ObservabilityConfig::default(),
            directory: Vec::new(),
            database: None,
        }
    }
}

impl ApprovalConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (invoice-approval.toml)
    /// 3. Environment variables (prefixed with INVOICE_APPROVAL_, `__` between sections)
    pub fn load() -> Result<Self> {
        let file = Path::new("invoice-approval.toml");
        Self::load_from(file.exists().then_some(file))
    }

    /// Same precedence as [`load`](Self::load) with an explicit file
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path.to_path_buf()));
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix("INVOICE_APPROVAL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let approval_config: ApprovalConfig = config.try_deserialize()?;
        Ok(approval_config)
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

    pub fn state_file(&self) -> PathBuf {
        PathBuf::from(&self.store.state_file)
    }

    pub fn role_directory(&self) -> RoleDirectory {
        RoleDirectory::new(self.directory.clone())
    }

    /// Task assigner backed by the configured directory
    pub fn task_assigner(&self) -> TaskAssigner {
        TaskAssigner::new(Arc::new(self.role_directory()), self.tasks.require_assignee)
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<ApprovalConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = ApprovalConfig::load_env_file();
        ApprovalConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static ApprovalConfig> {
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
