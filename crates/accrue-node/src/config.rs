//! Node configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Genesis JSON holding the engine params. Relative paths resolve
    /// against the data directory.
    #[serde(default = "default_genesis_file")]
    pub genesis_file: String,
    /// Delete paid claims of departed accounts after every replayed step.
    #[serde(default)]
    pub prune_zero_claims: bool,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
}

fn default_genesis_file() -> String {
    "genesis.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            genesis_file: default_genesis_file(),
            prune_zero_claims: false,
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from `path`, or from `config.toml` in the default
    /// data directory.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_data_dir().join("config.toml"));
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: NodeConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Database file inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("accrue.db")
    }

    /// Resolved genesis file path.
    pub fn genesis_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.engine.genesis_file);
        if path.is_absolute() {
            path
        } else {
            self.data_dir().join(path)
        }
    }
}

/// Default data directory: `$ACCRUE_DATA_DIR`, else `$HOME/.accrue`.
fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ACCRUE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(".accrue"))
        .unwrap_or_else(|_| PathBuf::from("/tmp/accrue"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.engine.genesis_file, "genesis.json");
        assert!(!config.engine.prune_zero_claims);
        assert_eq!(config.advanced.log_level, "info");
        assert!(config.advanced.log_file.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = NodeConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let _parsed: NodeConfig = toml::from_str(&toml_str).expect("parse");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: NodeConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/var/lib/accrue"

            [engine]
            prune_zero_claims = true
            "#,
        )
        .expect("parse");
        assert!(config.engine.prune_zero_claims);
        assert_eq!(config.advanced.log_level, "info");
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/accrue/accrue.db"));
        assert_eq!(
            config.genesis_path(),
            PathBuf::from("/var/lib/accrue/genesis.json")
        );
    }

    #[test]
    fn test_absolute_genesis_path_kept() {
        let mut config = NodeConfig::default();
        config.engine.genesis_file = "/etc/accrue/genesis.json".to_string();
        assert_eq!(config.genesis_path(), PathBuf::from("/etc/accrue/genesis.json"));
    }
}
