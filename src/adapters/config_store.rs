use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::{AppConfig, DomainError};
use crate::ports::ConfigStore;

/// TOML-based configuration store with OS-specific paths.
pub struct TomlConfigStore {
    data_dir: PathBuf,
    logs_dir: PathBuf,
}

impl TomlConfigStore {
    /// Create a new TomlConfigStore.
    /// Uses OS-specific application data directories.
    pub fn new() -> Result<Self, DomainError> {
        let data_dir = Self::get_data_dir()?;
        let logs_dir = Self::get_logs_dir(&data_dir);
        Self::at(data_dir, logs_dir)
    }

    /// Create a store rooted at explicit directories.
    pub fn at(data_dir: PathBuf, logs_dir: PathBuf) -> Result<Self, DomainError> {
        // Ensure the data directory exists
        fs::create_dir_all(&data_dir)?;

        info!(data_dir = ?data_dir, "ConfigStore initialized");

        Ok(Self { data_dir, logs_dir })
    }

    /// Get the OS-specific application data directory.
    /// - macOS: ~/Library/Application Support/VoxDesk/
    /// - Windows: %APPDATA%\VoxDesk\
    /// - Linux: ~/.config/VoxDesk/
    fn get_data_dir() -> Result<PathBuf, DomainError> {
        #[cfg(target_os = "macos")]
        let base = dirs::data_dir();

        #[cfg(not(target_os = "macos"))]
        let base = dirs::config_dir();

        base.map(|p| p.join("VoxDesk"))
            .ok_or_else(|| DomainError::Config("Could not find application data directory".to_string()))
    }

    /// Get the OS-specific log directory.
    /// - macOS: ~/Library/Application Support/VoxDesk/logs/
    /// - Windows: %LOCALAPPDATA%\VoxDesk\logs\
    /// - Linux: ~/.local/share/VoxDesk/logs/
    fn get_logs_dir(data_dir: &Path) -> PathBuf {
        #[cfg(target_os = "macos")]
        let base: Option<PathBuf> = None;

        #[cfg(target_os = "windows")]
        let base = dirs::data_local_dir();

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let base = dirs::data_dir();

        base.map(|p| p.join("VoxDesk").join("logs"))
            .unwrap_or_else(|| data_dir.join("logs"))
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<AppConfig, DomainError> {
        let config_path = self.config_path();

        if config_path.exists() {
            debug!(path = ?config_path, "Loading configuration");
            let content = fs::read_to_string(&config_path)?;
            let config: AppConfig = toml::from_str(&content)?;
            info!(path = ?config_path, "Configuration loaded");
            Ok(config)
        } else {
            info!(path = ?config_path, "Configuration file not found, creating default");
            let config = AppConfig::new();
            self.save(&config)?;
            Ok(config)
        }
    }

    fn save(&self, config: &AppConfig) -> Result<(), DomainError> {
        let config_path = self.config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&config_path, content)?;

        info!(path = ?config_path, "Configuration saved");
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    fn logs_dir(&self) -> PathBuf {
        self.logs_dir.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, TomlConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlConfigStore::at(dir.path().join("data"), dir.path().join("logs")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_config_store_paths() {
        let (_dir, store) = temp_store();

        assert!(store.config_path().ends_with("config.toml"));
        assert!(store.logs_dir().ends_with("logs"));
        assert!(store.data_dir().exists());
    }

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let (_dir, store) = temp_store();

        let config = store.load().unwrap();

        assert_eq!(config.host.program, "voxdesk-host");
        assert!(store.config_path().exists());
    }

    #[test]
    fn test_config_roundtrip() {
        let (_dir, store) = temp_store();

        let mut config = AppConfig::new();
        config.ui.escape_closes_settings = false;
        config.logging.level = "debug".to_string();
        config.host.args = vec!["--stdio".to_string()];
        store.save(&config).unwrap();

        let loaded = store.load().unwrap();
        assert!(!loaded.ui.escape_closes_settings);
        assert_eq!(loaded.logging.level, "debug");
        assert_eq!(loaded.host.args, vec!["--stdio"]);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let (_dir, store) = temp_store();
        fs::write(store.config_path(), "[host\nprogram = ").unwrap();

        assert!(matches!(store.load(), Err(DomainError::Config(_))));
    }
}
