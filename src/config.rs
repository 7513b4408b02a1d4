//! Configuration management for the reactor
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (yang-reactor.toml)
//! - Environment variables (YANG_REACTOR__*)
//!
//! ## Example config file (yang-reactor.toml):
//! ```toml
//! [reactor]
//! parallel = true
//! enforce_statement_order = true
//!
//! [repository]
//! path = "./models"
//! extension = "yang"
//! lenient_revisions = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReactorConfig {
    /// Build session settings
    #[serde(default)]
    pub reactor: ReactorSettings,

    /// Source repository settings
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// Build session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactorSettings {
    /// Process independent sources/modules of a phase on the rayon pool
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Require module sections in header, linkage, meta, revision, body order
    #[serde(default = "default_true")]
    pub enforce_statement_order: bool,
}

/// Directory repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Directory holding source files
    #[serde(default = "default_repository_path")]
    pub path: PathBuf,

    /// Source file extension
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Ignore malformed revision segments in file names instead of failing
    #[serde(default)]
    pub lenient_revisions: bool,
}

fn default_true() -> bool {
    true
}

fn default_repository_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension() -> String {
    crate::identifier::YANG_FILE_EXTENSION.to_string()
}

impl Default for ReactorSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            enforce_statement_order: true,
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: default_repository_path(),
            extension: default_extension(),
            lenient_revisions: false,
        }
    }
}

impl ReactorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "yang-reactor.toml",
            ".yang-reactor.toml",
            "config/yang-reactor.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("org", "yang", "yang-reactor") {
            let xdg_config = config_dir.config_dir().join("yang-reactor.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("YANG_REACTOR")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Repository path, resolved against the working directory
    pub fn repository_path(&self) -> PathBuf {
        if self.repository.path.is_absolute() {
            self.repository.path.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.repository.path)
        }
    }
}
