use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::adapters::{StdioHostClient, TomlConfigStore};
use crate::app::active_model::{self, ModelWarning};
use crate::app::catalog::{ModelCatalogCache, ModelEntry};
use crate::app::downloads::DownloadTracker;
use crate::app::report::ErrorReport;
use crate::app::settings_sync::{EditOutcome, SettingsSync};
use crate::app::shortcut_recorder::{CaptureStep, ShortcutRecorder};
use crate::domain::{
    AppConfig, DomainError, DownloadEvent, DownloadState, HostEvent, LlmCleanupConfig, Settings, ShortcutError,
    ShortcutSlot, TranscriptionMode,
};
use crate::infrastructure::init_logging;
use crate::ports::{Clipboard, ConfigStore, HostClient};

/// Capacity of the view update channel.
const UPDATE_CAPACITY: usize = 64;

/// Notification for the views that some state they render changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewUpdate {
    /// The settings draft was replaced by a host snapshot.
    SettingsReplaced,
    /// Catalog or install status changed.
    CatalogChanged,
    DownloadChanged { model: String },
    ErrorReported,
}

/// What a window-level Escape press should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EscapeOutcome {
    /// A shortcut capture consumed the key.
    CaptureCancelled { slot: ShortcutSlot },
    CloseSettings,
    Ignored,
}

/// Application paths information.
#[derive(Debug, Clone, Serialize)]
pub struct AppPaths {
    pub data_dir: String,
    pub logs_dir: String,
    pub config_path: String,
}

/// Application controller that wires the shortcut recorder, settings sync and
/// model lifecycle to the host.
pub struct AppController {
    host: Arc<dyn HostClient>,
    config: RwLock<AppConfig>,
    config_store: Option<Arc<dyn ConfigStore>>,
    recorder: Mutex<ShortcutRecorder>,
    settings: SettingsSync,
    catalog: ModelCatalogCache,
    downloads: DownloadTracker,
    validation_error: RwLock<Option<ShortcutError>>,
    last_error: RwLock<Option<ErrorReport>>,
    updates: broadcast::Sender<ViewUpdate>,
    _log_guard: Option<WorkerGuard>,
}

impl AppController {
    /// Initialize the application controller.
    /// This sets up configuration, logging, and the host connection.
    pub async fn start() -> Result<Self, DomainError> {
        // Step 1: Initialize config store
        let config_store = Arc::new(TomlConfigStore::new()?);

        // Step 2: Load configuration
        let config = config_store.load()?;

        // Step 3: Initialize logging
        let log_guard = init_logging(&config_store.logs_dir(), &config.logging)?;

        info!("VoxDesk starting up");

        // Step 4: Start the host process
        let host = StdioHostClient::spawn(&config.host)?;

        let mut controller = Self::with_host(Arc::new(host), config);
        controller.config_store = Some(config_store);
        controller._log_guard = log_guard;

        info!("AppController initialized");
        Ok(controller)
    }

    /// Build a controller around an already connected host.
    pub fn with_host(host: Arc<dyn HostClient>, config: AppConfig) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            host,
            config: RwLock::new(config),
            config_store: None,
            recorder: Mutex::new(ShortcutRecorder::new()),
            settings: SettingsSync::new(),
            catalog: ModelCatalogCache::new(),
            downloads: DownloadTracker::new(),
            validation_error: RwLock::new(None),
            last_error: RwLock::new(None),
            updates,
            _log_guard: None,
        }
    }

    // ==================== Host events ====================

    /// Drain host events in order until the host goes away.
    ///
    /// Status checks run on their own tasks so the pump never waits on the
    /// host while events queue up behind it.
    pub fn spawn_event_pump(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.host.subscribe();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Some(model) = controller.apply_host_event(event) {
                            let worker = Arc::clone(&controller);
                            tokio::spawn(async move {
                                worker.refresh_model_status(&model).await;
                            });
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(lagged = n, "Host event pump lagged; some events were dropped");
                        let worker = Arc::clone(&controller);
                        tokio::spawn(async move {
                            worker.recover_lagged_downloads().await;
                        });
                    }
                    Err(RecvError::Closed) => {
                        info!("Host event channel closed; stopping event pump");
                        break;
                    }
                }
            }
        })
    }

    /// Apply one host event and refresh the model status it invalidated.
    pub async fn handle_host_event(&self, event: HostEvent) {
        if let Some(model) = self.apply_host_event(event) {
            self.refresh_model_status(&model).await;
        }
    }

    /// Apply the synchronous part of a host event. Returns the model whose
    /// install status must be re-checked, if any.
    fn apply_host_event(&self, event: HostEvent) -> Option<String> {
        debug!(event = event.name(), model = ?event.model_key(), "Host event");

        if let HostEvent::SettingsChanged(settings) = event {
            self.settings.apply_external(settings);
            self.notify(ViewUpdate::SettingsReplaced);
            return None;
        }

        let transition = self.downloads.handle_event(&event)?;
        if let Some(message) = transition.state.error_message() {
            self.report(format!("download {}", transition.model), message);
        }
        self.notify(ViewUpdate::DownloadChanged {
            model: transition.model.clone(),
        });

        transition.refresh_status.then_some(transition.model)
    }

    async fn refresh_model_status(&self, model: &str) {
        self.catalog.refresh_status(self.host.as_ref(), model).await;
        self.notify(ViewUpdate::CatalogChanged);
    }

    /// Re-check every model still shown as downloading after events were
    /// dropped. A model the host now reports installed is marked complete,
    /// since its completion event may have been among the dropped ones.
    async fn recover_lagged_downloads(&self) {
        let downloading: Vec<String> = self
            .downloads
            .snapshot()
            .into_iter()
            .filter(|(_, state)| state.is_downloading())
            .map(|(model, _)| model)
            .collect();
        if downloading.is_empty() {
            return;
        }

        let host = self.host.as_ref();
        let statuses = join_all(
            downloading
                .iter()
                .map(|model| self.catalog.refresh_status(host, model)),
        )
        .await;

        for (model, status) in downloading.iter().zip(statuses) {
            // A newer event may have settled the download meanwhile.
            if status.installed && self.downloads.state(model).is_downloading() {
                info!(model = %model, "Download finished while events were dropped");
                self.downloads.apply(model, DownloadEvent::Completed);
                self.notify(ViewUpdate::DownloadChanged {
                    model: model.clone(),
                });
            }
        }
        self.notify(ViewUpdate::CatalogChanged);
    }

    /// Subscribe to view update notifications.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<ViewUpdate> {
        self.updates.subscribe()
    }

    // ==================== Settings ====================

    /// Load the host settings into the draft. Called when the settings view opens.
    pub async fn activate_settings_view(&self) -> Result<Settings, DomainError> {
        match self.settings.activate(self.host.as_ref()).await {
            Ok(settings) => {
                self.notify(ViewUpdate::SettingsReplaced);
                Ok(settings)
            }
            Err(e) => {
                self.report("load settings", e.to_string());
                Err(e)
            }
        }
    }

    /// Current settings draft.
    pub fn settings(&self) -> Settings {
        self.settings.draft()
    }

    /// Apply a local edit to the draft and commit it.
    pub async fn edit_settings<F>(&self, edit: F) -> EditOutcome
    where
        F: FnOnce(&mut Settings) + Send,
    {
        let outcome = self.settings.edit(self.host.as_ref(), edit).await;
        if let EditOutcome::CommitFailed(message) = &outcome {
            self.report("save settings", message.clone());
        }
        outcome
    }

    /// Enable or disable a shortcut slot. Disabling the last enabled slot is a no-op.
    pub async fn set_slot_enabled(&self, slot: ShortcutSlot, enabled: bool) -> EditOutcome {
        self.edit_settings(move |s| {
            if !s.set_slot_enabled(slot, enabled) {
                debug!(slot = %slot, "Refusing to disable the last enabled shortcut");
            }
        })
        .await
    }

    pub async fn set_transcription_mode(&self, mode: TranscriptionMode) -> EditOutcome {
        self.edit_settings(move |s| s.transcription_mode = mode).await
    }

    pub async fn set_local_model(&self, model: String) -> EditOutcome {
        self.edit_settings(move |s| s.local_model = model).await
    }

    pub async fn set_microphone_device(&self, device: Option<String>) -> EditOutcome {
        self.edit_settings(move |s| s.microphone_device = device).await
    }

    pub async fn set_language(&self, language: String) -> EditOutcome {
        self.edit_settings(move |s| s.language = language).await
    }

    pub async fn set_llm_cleanup(&self, llm_cleanup: LlmCleanupConfig) -> EditOutcome {
        self.edit_settings(move |s| s.llm_cleanup = llm_cleanup).await
    }

    pub async fn set_dictionary(&self, entries: Vec<String>) -> EditOutcome {
        let entries: Vec<String> = entries
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        self.edit_settings(move |s| s.dictionary = entries).await
    }

    // ==================== Shortcut capture ====================

    /// Start capturing a shortcut for `slot`. Returns `false` if the slot is disabled.
    pub fn start_capture(&self, slot: ShortcutSlot) -> bool {
        let settings = self.settings.draft();
        self.recorder.lock().start(slot, &settings)
    }

    pub fn cancel_capture(&self) -> Option<ShortcutSlot> {
        self.recorder.lock().cancel()
    }

    pub fn active_capture(&self) -> Option<ShortcutSlot> {
        self.recorder.lock().active_slot()
    }

    pub fn capture_key_down(&self, code: &str) -> CaptureStep {
        self.recorder.lock().key_down(code)
    }

    /// Feed a key release; a finished capture is written into its slot.
    pub async fn capture_key_up(&self, code: &str) -> CaptureStep {
        let step = self.recorder.lock().key_up(code);
        match &step {
            CaptureStep::Completed { slot, shortcut } => {
                info!(slot = %slot, shortcut = %shortcut, "Shortcut captured");
                *self.validation_error.write() = None;
                let (slot, shortcut) = (*slot, shortcut.clone());
                self.edit_settings(move |s| s.set_shortcut(slot, &shortcut))
                    .await;
            }
            CaptureStep::Rejected { slot, error } => {
                debug!(slot = %slot, error = %error, "Shortcut capture rejected");
                *self.validation_error.write() = Some(error.clone());
            }
            _ => {}
        }
        step
    }

    /// Validation error from the last capture, if it failed.
    pub fn validation_error(&self) -> Option<ShortcutError> {
        self.validation_error.read().clone()
    }

    /// Window-level Escape. A running capture takes precedence over closing.
    pub fn handle_escape(&self) -> EscapeOutcome {
        if let Some(slot) = self.recorder.lock().cancel() {
            return EscapeOutcome::CaptureCancelled { slot };
        }
        if self.config.read().ui.escape_closes_settings {
            EscapeOutcome::CloseSettings
        } else {
            EscapeOutcome::Ignored
        }
    }

    // ==================== Models ====================

    /// Load the catalog and every model's status. Called when the models view opens.
    pub async fn activate_models_view(&self) -> Vec<ModelEntry> {
        if let Err(e) = self.catalog.load(self.host.as_ref()).await {
            self.report("load model catalog", e.to_string());
        }
        self.catalog.refresh_all(self.host.as_ref()).await;
        self.notify(ViewUpdate::CatalogChanged);
        self.catalog.entries()
    }

    pub fn models(&self) -> Vec<ModelEntry> {
        self.catalog.entries()
    }

    pub fn download_state(&self, model: &str) -> DownloadState {
        self.downloads.state(model)
    }

    pub fn download_states(&self) -> HashMap<String, DownloadState> {
        self.downloads.snapshot()
    }

    /// Start downloading a model. Returns the state right after the request.
    pub async fn request_download(&self, model: &str) -> DownloadState {
        let transition = self.downloads.request_download(self.host.as_ref(), model).await;
        if let Some(message) = transition.state.error_message() {
            self.report(format!("download {}", model), message);
        }
        self.notify(ViewUpdate::DownloadChanged {
            model: model.to_string(),
        });
        transition.state
    }

    /// Delete a model, then keep the selected local model valid.
    pub async fn request_delete(&self, model: &str) -> Result<(), DomainError> {
        let result = self.downloads.request_delete(self.host.as_ref(), model).await;
        self.notify(ViewUpdate::DownloadChanged {
            model: model.to_string(),
        });

        if let Err(e) = result {
            self.report(format!("delete {}", model), e.to_string());
            return Err(e);
        }

        self.catalog.refresh_status(self.host.as_ref(), model).await;
        self.notify(ViewUpdate::CatalogChanged);
        self.reselect_after_delete(model).await;
        Ok(())
    }

    async fn reselect_after_delete(&self, deleted: &str) {
        let draft = self.settings.draft();
        let Some(next) = active_model::replacement_after_delete(&draft, deleted, &self.catalog)
        else {
            debug!(deleted, "Active model unchanged after delete");
            return;
        };
        info!(deleted, selected = %next, "Switching active model after delete");
        self.edit_settings(move |s| s.local_model = next).await;
    }

    /// Warning for the models view when local mode has no usable model.
    pub fn local_model_warning(&self) -> Option<ModelWarning> {
        active_model::local_model_warning(&self.settings.draft(), &self.catalog)
    }

    // ==================== Errors ====================

    pub fn last_error(&self) -> Option<ErrorReport> {
        self.last_error.read().clone()
    }

    pub fn clear_error(&self) {
        *self.last_error.write() = None;
    }

    /// Copy the latest error report to the clipboard. Returns `false` if there is none.
    pub fn copy_last_error(&self, clipboard: &dyn Clipboard) -> Result<bool, DomainError> {
        let Some(report) = self.last_error() else {
            return Ok(false);
        };
        clipboard.copy_text(&report.copy_text())?;
        Ok(true)
    }

    fn report(&self, context: impl Into<String>, message: impl Into<String>) {
        let report = ErrorReport::new(context, message);
        warn!(context = %report.context, message = %report.message, "Reporting error to view");
        *self.last_error.write() = Some(report);
        self.notify(ViewUpdate::ErrorReported);
    }

    fn notify(&self, update: ViewUpdate) {
        // No subscribers is fine; views attach lazily.
        let _ = self.updates.send(update);
    }

    // ==================== Configuration ====================

    /// Get the current configuration.
    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Update the configuration.
    pub fn update_config(&self, config: AppConfig) -> Result<(), DomainError> {
        if let Some(store) = &self.config_store {
            store.save(&config)?;
        }
        *self.config.write() = config;

        info!("Configuration updated");
        Ok(())
    }

    /// Application paths, when backed by an on-disk store.
    pub fn paths(&self) -> Option<AppPaths> {
        self.config_store.as_ref().map(|store| AppPaths {
            data_dir: store.data_dir().to_string_lossy().to_string(),
            logs_dir: store.logs_dir().to_string_lossy().to_string(),
            config_path: store.config_path().to_string_lossy().to_string(),
        })
    }
}
