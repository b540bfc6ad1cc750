#![forbid(unsafe_code)]

pub mod adapters;
pub mod app;
pub mod domain;
pub mod infrastructure;
pub mod ports;

#[cfg(feature = "desktop")]
mod commands;

/// Event the views listen on for [`app::ViewUpdate`] notifications.
pub const VIEW_UPDATE_EVENT: &str = "view:update";

#[cfg(feature = "desktop")]
pub fn run() -> anyhow::Result<()> {
    use std::sync::Arc;

    use anyhow::Context;
    use tauri::Emitter;
    use tokio::sync::broadcast::error::RecvError;
    use tracing::{info, warn};

    use app::AppController;
    use commands::*;

    // Start inside Tauri's runtime so the host reader and event pump live on it.
    let controller = tauri::async_runtime::block_on(async {
        let controller = Arc::new(AppController::start().await?);
        controller.spawn_event_pump();
        Ok::<_, domain::DomainError>(controller)
    })
    .context("failed to initialize application")?;

    let mut updates = controller.subscribe_updates();

    tauri::Builder::default()
        .manage(controller)
        .setup(move |app| {
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                loop {
                    match updates.recv().await {
                        Ok(update) => {
                            if let Err(e) = handle.emit(VIEW_UPDATE_EVENT, &update) {
                                warn!(error = %e, "Failed to emit view update");
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            warn!(lagged = n, "View update relay lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });
            info!("VoxDesk window ready");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Config commands
            get_config,
            update_config,
            get_paths,
            // Settings commands
            load_settings,
            get_settings,
            set_shortcut_enabled,
            set_transcription_mode,
            set_local_model,
            set_microphone_device,
            set_language,
            set_llm_cleanup,
            set_dictionary,
            // Shortcut capture commands
            start_shortcut_capture,
            cancel_shortcut_capture,
            capture_key_down,
            capture_key_up,
            get_validation_error,
            handle_escape,
            // Model commands
            load_models,
            get_models,
            get_download_states,
            download_model,
            delete_model,
            get_local_model_warning,
            // Error commands
            get_last_error,
            clear_error,
            copy_last_error,
        ])
        .run(tauri::generate_context!())
        .context("error while running tauri application")
}
