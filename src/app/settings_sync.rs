use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{DomainError, Settings};
use crate::ports::HostClient;

/// Result of a local edit to the settings draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum EditOutcome {
    /// The edit did not change anything (or was refused by an invariant).
    Unchanged,
    /// The draft changed, but the initial load has not completed so nothing
    /// was sent to the host.
    Staged,
    /// The host stored the new draft.
    Committed,
    /// A newer draft replaced this one before it was sent.
    Superseded,
    /// The host rejected the commit. The draft keeps the edit.
    CommitFailed(String),
}

#[derive(Debug, Default)]
struct SyncState {
    draft: Settings,
    /// Commits are armed only once the host snapshot has been applied.
    loaded: bool,
    /// Bumped on every draft change, local or external.
    revision: u64,
}

/// Keeps the local settings draft, the host copy and host broadcasts in
/// agreement.
///
/// Host snapshots (initial load and `settings:changed`) overwrite the draft
/// and never produce a commit. Local edits made after the initial load commit
/// the whole draft. Commits go through a single lane and a commit whose draft
/// is older than the current one is skipped.
#[derive(Debug, Default)]
pub struct SettingsSync {
    state: RwLock<SyncState>,
    commit_lane: Mutex<()>,
}

impl SettingsSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current draft.
    pub fn draft(&self) -> Settings {
        self.state.read().draft.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().loaded
    }

    /// Fetch the host snapshot, overwrite the draft and arm commits.
    ///
    /// On failure the draft is untouched and commits stay disarmed so that
    /// defaults are never written over the host's copy.
    pub async fn activate(&self, host: &dyn HostClient) -> Result<Settings, DomainError> {
        let settings = host.get_settings().await.map_err(|e| {
            warn!(error = %e, "Failed to load settings from host");
            e
        })?;
        let settings = normalized(settings);
        {
            let mut state = self.state.write();
            state.draft = settings.clone();
            state.revision += 1;
            state.loaded = true;
        }
        info!("Settings loaded from host");
        Ok(settings)
    }

    /// Overwrite the draft with a snapshot broadcast by the host.
    pub fn apply_external(&self, settings: Settings) {
        let settings = normalized(settings);
        let mut state = self.state.write();
        state.draft = settings;
        state.revision += 1;
        debug!(revision = state.revision, "Settings replaced by host broadcast");
    }

    /// Apply a local edit and, once loaded, commit the full draft.
    pub async fn edit<F>(&self, host: &dyn HostClient, edit: F) -> EditOutcome
    where
        F: FnOnce(&mut Settings) + Send,
    {
        let (revision, snapshot) = {
            let mut state = self.state.write();
            let before = state.draft.clone();
            edit(&mut state.draft);
            if state.draft == before {
                return EditOutcome::Unchanged;
            }
            state.revision += 1;
            if !state.loaded {
                debug!("Settings edited before load, not committing");
                return EditOutcome::Staged;
            }
            (state.revision, state.draft.clone())
        };

        self.commit(host, revision, snapshot).await
    }

    async fn commit(&self, host: &dyn HostClient, revision: u64, snapshot: Settings) -> EditOutcome {
        let _lane = self.commit_lane.lock().await;

        let latest = self.state.read().revision;
        if revision < latest {
            debug!(revision, latest, "Skipping superseded settings commit");
            return EditOutcome::Superseded;
        }

        match host.update_settings(&snapshot).await {
            Ok(()) => {
                debug!(revision, "Settings committed");
                EditOutcome::Committed
            }
            Err(e) => {
                warn!(revision, error = %e, "Settings commit failed, keeping local draft");
                EditOutcome::CommitFailed(e.to_string())
            }
        }
    }
}

/// Render the host's shortcut strings canonically. Unparseable ones are kept
/// as sent so the host's copy is never lost.
fn normalized(mut settings: Settings) -> Settings {
    for (slot, error) in settings.normalize_shortcuts() {
        warn!(
            slot = %slot,
            shortcut = %settings.shortcuts.get(slot).shortcut,
            error = %error,
            "Host sent an invalid shortcut, keeping it unchanged"
        );
    }
    settings
}
