// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{Result, SyncError};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub sync: SyncSettings,
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncSettings {
    pub read_timeout_secs: u64,
    pub manual_check_timeout_secs: u64,
    pub edit_grace_secs: u64,
    pub conflict_lock_secs: u64,
    pub watch_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupConfig {
    pub enabled: bool,
    #[serde(default)]
    pub folder_path: Option<PathBuf>,
    pub max_backups: usize,
    pub cache_snapshots: usize,
}

impl SyncSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn manual_check_timeout(&self) -> Duration {
        Duration::from_secs(self.manual_check_timeout_secs)
    }

    pub fn edit_grace(&self) -> Duration {
        Duration::from_secs(self.edit_grace_secs)
    }

    pub fn conflict_lock(&self) -> Duration {
        Duration::from_secs(self.conflict_lock_secs)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let defaults = Self::default_config();
        let mut builder = config::Config::builder()
            .add_source(
                config::Config::try_from(&defaults)
                    .map_err(|e| SyncError::Config(e.to_string()))?,
            );

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new("config/default.toml")).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SHELFSYNC")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: PathBuf::from("./data"),
            },
            sync: SyncSettings {
                read_timeout_secs: 5,
                manual_check_timeout_secs: 15,
                edit_grace_secs: 3,
                conflict_lock_secs: 30,
                watch_interval_secs: 60,
            },
            backup: BackupConfig {
                enabled: true,
                folder_path: None,
                max_backups: 10,
                cache_snapshots: 5,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sync.read_timeout_secs == 0 {
            return Err(SyncError::Config(
                "read_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.sync.manual_check_timeout_secs == 0 {
            return Err(SyncError::Config(
                "manual_check_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.sync.watch_interval_secs == 0 {
            return Err(SyncError::Config(
                "watch_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.backup.max_backups == 0 {
            return Err(SyncError::Config(
                "max_backups must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.read_timeout(), Duration::from_secs(5));
        assert_eq!(config.sync.manual_check_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_load_overrides_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("shelfsync.toml");
        fs::write(
            &path,
            "[storage]\ndata_dir = \"/var/lib/shelfsync\"\n\n[backup]\nmax_backups = 3\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/shelfsync"));
        assert_eq!(config.backup.max_backups, 3);
        // untouched keys keep their defaults
        assert_eq!(config.sync.edit_grace_secs, 3);
        assert!(config.backup.enabled);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = AppConfig::default_config();
        config.sync.read_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }
}
