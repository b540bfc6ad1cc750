use serde::Serialize;

use crate::app::catalog::ModelCatalogCache;
use crate::domain::{Settings, TranscriptionMode};

/// Warning shown when local transcription has nothing usable to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelWarning {
    /// No model is installed at all.
    NoneInstalled { selected: String },
    /// The selected model is missing but others are installed.
    SelectedNotInstalled {
        selected: String,
        installed: Vec<String>,
    },
}

/// Pick the model to select after `deleted` was removed.
///
/// Only called once the host confirmed the deletion. Returns `None` when the
/// selection should stay as it is: either another model was selected, or no
/// other model is installed and the warning should point at the same key.
pub fn replacement_after_delete(
    settings: &Settings,
    deleted: &str,
    catalog: &ModelCatalogCache,
) -> Option<String> {
    if settings.local_model != deleted {
        return None;
    }
    catalog
        .installed_keys()
        .into_iter()
        .find(|key| key != deleted)
}

/// Check whether local transcription can run with the current selection.
pub fn local_model_warning(settings: &Settings, catalog: &ModelCatalogCache) -> Option<ModelWarning> {
    if settings.transcription_mode != TranscriptionMode::Local {
        return None;
    }
    if catalog.is_installed(&settings.local_model) {
        return None;
    }
    let installed = catalog.installed_keys();
    let selected = settings.local_model.clone();
    if installed.is_empty() {
        Some(ModelWarning::NoneInstalled { selected })
    } else {
        Some(ModelWarning::SelectedNotInstalled { selected, installed })
    }
}
