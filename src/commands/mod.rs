use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tauri::{State, WebviewWindow};
use tracing::warn;

use crate::adapters::ArboardClipboard;
use crate::app::{
    AppController, AppPaths, CaptureStep, EditOutcome, ErrorReport, EscapeOutcome, ModelEntry,
    ModelWarning,
};
use crate::domain::{
    AppConfig, DownloadState, LlmCleanupConfig, Settings, ShortcutSlot, TranscriptionMode,
};

type Controller<'a> = State<'a, Arc<AppController>>;

/// Capture step as the settings view sees it.
#[derive(Debug, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CaptureView {
    Ignored,
    Listening,
    Cancelled { slot: ShortcutSlot },
    Completed { slot: ShortcutSlot, shortcut: String },
    Rejected { slot: ShortcutSlot, error: String },
}

impl From<CaptureStep> for CaptureView {
    fn from(step: CaptureStep) -> Self {
        match step {
            CaptureStep::Ignored => CaptureView::Ignored,
            CaptureStep::Listening => CaptureView::Listening,
            CaptureStep::Cancelled { slot } => CaptureView::Cancelled { slot },
            CaptureStep::Completed { slot, shortcut } => CaptureView::Completed {
                slot,
                shortcut: shortcut.to_string(),
            },
            CaptureStep::Rejected { slot, error } => CaptureView::Rejected {
                slot,
                error: error.to_string(),
            },
        }
    }
}

// ==================== Config Commands ====================

/// Get the current application configuration.
#[tauri::command]
pub fn get_config(controller: Controller<'_>) -> AppConfig {
    controller.config()
}

/// Update the application configuration.
#[tauri::command]
pub fn update_config(controller: Controller<'_>, config: AppConfig) -> Result<(), String> {
    controller
        .update_config(config)
        .map_err(|e| e.to_string())
}

/// Get application paths information.
#[tauri::command]
pub fn get_paths(controller: Controller<'_>) -> Option<AppPaths> {
    controller.paths()
}

// ==================== Settings Commands ====================

/// Load the host settings into the view. Called when the settings view opens.
#[tauri::command]
pub async fn load_settings(controller: Controller<'_>) -> Result<Settings, String> {
    controller
        .activate_settings_view()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_settings(controller: Controller<'_>) -> Settings {
    controller.settings()
}

#[tauri::command]
pub async fn set_shortcut_enabled(
    controller: Controller<'_>,
    slot: ShortcutSlot,
    enabled: bool,
) -> Result<EditOutcome, String> {
    Ok(controller.set_slot_enabled(slot, enabled).await)
}

#[tauri::command]
pub async fn set_transcription_mode(
    controller: Controller<'_>,
    mode: TranscriptionMode,
) -> Result<EditOutcome, String> {
    Ok(controller.set_transcription_mode(mode).await)
}

#[tauri::command]
pub async fn set_local_model(controller: Controller<'_>, model: String) -> Result<EditOutcome, String> {
    Ok(controller.set_local_model(model).await)
}

#[tauri::command]
pub async fn set_microphone_device(
    controller: Controller<'_>,
    device: Option<String>,
) -> Result<EditOutcome, String> {
    Ok(controller.set_microphone_device(device).await)
}

#[tauri::command]
pub async fn set_language(controller: Controller<'_>, language: String) -> Result<EditOutcome, String> {
    Ok(controller.set_language(language).await)
}

#[tauri::command]
pub async fn set_llm_cleanup(
    controller: Controller<'_>,
    llm_cleanup: LlmCleanupConfig,
) -> Result<EditOutcome, String> {
    Ok(controller.set_llm_cleanup(llm_cleanup).await)
}

#[tauri::command]
pub async fn set_dictionary(
    controller: Controller<'_>,
    entries: Vec<String>,
) -> Result<EditOutcome, String> {
    Ok(controller.set_dictionary(entries).await)
}

// ==================== Shortcut Capture Commands ====================

/// Start listening for a shortcut. Returns `false` if the slot is disabled.
#[tauri::command]
pub fn start_shortcut_capture(controller: Controller<'_>, slot: ShortcutSlot) -> bool {
    controller.start_capture(slot)
}

#[tauri::command]
pub fn cancel_shortcut_capture(controller: Controller<'_>) -> Option<ShortcutSlot> {
    controller.cancel_capture()
}

/// Forward a `keydown` from the view. `code` is the physical key code.
#[tauri::command]
pub fn capture_key_down(controller: Controller<'_>, code: String) -> CaptureView {
    controller.capture_key_down(&code).into()
}

/// Forward a `keyup` from the view.
#[tauri::command]
pub async fn capture_key_up(controller: Controller<'_>, code: String) -> Result<CaptureView, String> {
    Ok(controller.capture_key_up(&code).await.into())
}

#[tauri::command]
pub fn get_validation_error(controller: Controller<'_>) -> Option<String> {
    controller.validation_error().map(|e| e.to_string())
}

/// Window-level Escape. Closes the settings window unless a capture eats the key.
#[tauri::command]
pub fn handle_escape(controller: Controller<'_>, window: WebviewWindow) -> EscapeOutcome {
    let outcome = controller.handle_escape();
    if outcome == EscapeOutcome::CloseSettings {
        if let Err(e) = window.close() {
            warn!(error = %e, "Failed to close settings window");
        }
    }
    outcome
}

// ==================== Model Commands ====================

/// Load the catalog and statuses. Called when the models view opens.
#[tauri::command]
pub async fn load_models(controller: Controller<'_>) -> Result<Vec<ModelEntry>, String> {
    Ok(controller.activate_models_view().await)
}

#[tauri::command]
pub fn get_models(controller: Controller<'_>) -> Vec<ModelEntry> {
    controller.models()
}

#[tauri::command]
pub fn get_download_states(controller: Controller<'_>) -> HashMap<String, DownloadState> {
    controller.download_states()
}

#[tauri::command]
pub async fn download_model(controller: Controller<'_>, model: String) -> Result<DownloadState, String> {
    Ok(controller.request_download(&model).await)
}

#[tauri::command]
pub async fn delete_model(controller: Controller<'_>, model: String) -> Result<(), String> {
    controller
        .request_delete(&model)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_local_model_warning(controller: Controller<'_>) -> Option<ModelWarning> {
    controller.local_model_warning()
}

// ==================== Error Commands ====================

#[tauri::command]
pub fn get_last_error(controller: Controller<'_>) -> Option<ErrorReport> {
    controller.last_error()
}

#[tauri::command]
pub fn clear_error(controller: Controller<'_>) {
    controller.clear_error()
}

/// Copy the latest error report to the system clipboard.
#[tauri::command]
pub fn copy_last_error(controller: Controller<'_>) -> Result<bool, String> {
    let clipboard = ArboardClipboard::new().map_err(|e| e.to_string())?;
    controller
        .copy_last_error(&clipboard)
        .map_err(|e| e.to_string())
}
