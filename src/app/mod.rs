pub mod active_model;
pub mod catalog;
pub mod controller;
pub mod downloads;
pub mod report;
pub mod settings_sync;
pub mod shortcut_recorder;

#[cfg(test)]
pub(crate) mod testing;

pub use active_model::ModelWarning;
pub use catalog::{ModelCatalogCache, ModelEntry};
pub use controller::{AppController, AppPaths, EscapeOutcome, ViewUpdate};
pub use downloads::{DownloadTracker, Transition};
pub use report::ErrorReport;
pub use settings_sync::{EditOutcome, SettingsSync};
pub use shortcut_recorder::{CaptureStep, ShortcutRecorder};
