pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod settings;
pub mod shortcut;

pub use config::{AppConfig, HostConfig, LoggingConfig, UiConfig};
pub use error::DomainError;
pub use events::HostEvent;
pub use model::{DownloadEvent, DownloadProgress, DownloadState, ModelDescriptor, ModelStatus};
pub use settings::{
    ApiKey, LlmCleanupConfig, LlmProvider, Settings, ShortcutBinding, ShortcutBindings,
    TranscriptionMode,
};
pub use shortcut::{format_key, Modifier, ShortcutError, ShortcutSlot, ShortcutSpec};
