use serde::{Deserialize, Serialize};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
    /// Maximum number of log files to keep.
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
            max_files: 7,
        }
    }
}

/// How to reach the native host process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Host executable. Resolved through `PATH` when not absolute.
    pub program: String,
    /// Extra arguments passed to the host.
    pub args: Vec<String>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Capacity of the host event broadcast channel.
    pub event_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            program: "voxdesk-host".to_string(),
            args: Vec::new(),
            // Catalog and status calls touch the disk; downloads only kick off.
            request_timeout_ms: 15_000,
            event_capacity: 256,
        }
    }
}

/// UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Escape closes the settings window (suppressed while capturing a shortcut).
    pub escape_closes_settings: bool,
    /// Theme: "system", "light", "dark".
    pub theme: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            escape_closes_settings: true,
            theme: "system".to_string(),
        }
    }
}

/// Front-end configuration, stored next to the app and never sent to the host.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub host: HostConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Create a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("[host]\nprogram = \"/opt/vox/host\"\n").unwrap();
        assert_eq!(config.host.program, "/opt/vox/host");
        assert_eq!(config.host.request_timeout_ms, 15_000);
        assert!(config.ui.escape_closes_settings);
        assert_eq!(config.logging.level, "info");
    }
}
