use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::domain::events::{DownloadCompletePayload, DownloadErrorPayload, DownloadProgressPayload};
use crate::domain::{DomainError, DownloadEvent, DownloadState, HostEvent};
use crate::ports::HostClient;

/// What the caller has to do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub model: String,
    pub state: DownloadState,
    /// The model's install status changed on disk and should be re-read.
    pub refresh_status: bool,
}

/// Per-model download state machines.
///
/// Entries are created on first use, so events for keys the catalog does not
/// know yet are kept rather than dropped.
#[derive(Debug, Default)]
pub struct DownloadTracker {
    states: RwLock<HashMap<String, DownloadState>>,
}

impl DownloadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for `model`; `Idle` if nothing happened yet.
    pub fn state(&self, model: &str) -> DownloadState {
        self.states.read().get(model).cloned().unwrap_or_default()
    }

    /// Snapshot of every tracked model.
    pub fn snapshot(&self) -> HashMap<String, DownloadState> {
        self.states.read().clone()
    }

    /// Apply one event to a model's state machine.
    pub fn apply(&self, model: &str, event: DownloadEvent) -> Transition {
        let refresh_status = matches!(event, DownloadEvent::Completed | DownloadEvent::Deleted);
        let mut states = self.states.write();
        let entry = states.entry(model.to_string()).or_default();
        let next = entry.transition(event);
        *entry = next.clone();
        Transition {
            model: model.to_string(),
            state: next,
            refresh_status,
        }
    }

    /// Route a host event to its model. Returns `None` for non-download events.
    pub fn handle_event(&self, event: &HostEvent) -> Option<Transition> {
        let transition = match event {
            HostEvent::DownloadProgress(DownloadProgressPayload {
                model,
                file,
                downloaded,
                total,
                percent,
            }) => self.apply(
                model,
                DownloadEvent::Progress {
                    file: file.clone(),
                    downloaded: *downloaded,
                    total: *total,
                    percent: *percent,
                },
            ),
            HostEvent::DownloadComplete(DownloadCompletePayload { model }) => {
                info!(model = %model, "Model download complete");
                self.apply(model, DownloadEvent::Completed)
            }
            HostEvent::DownloadError(DownloadErrorPayload { model, error }) => {
                warn!(model = %model, error = %error, "Model download failed");
                self.apply(
                    model,
                    DownloadEvent::Failed {
                        message: error.clone(),
                    },
                )
            }
            HostEvent::SettingsChanged(_) => return None,
        };
        Some(transition)
    }

    /// Mark `model` as downloading, then ask the host to fetch it.
    ///
    /// If the host call fails the model moves to `Error` with the failure text.
    pub async fn request_download(&self, host: &dyn HostClient, model: &str) -> Transition {
        let started = self.apply(model, DownloadEvent::Requested);
        info!(model, "Requesting model download");

        match host.download_model(model).await {
            Ok(()) => {
                debug!(model, "Host accepted download request");
                // Progress events may already have moved the state on.
                Transition {
                    state: self.state(model),
                    ..started
                }
            }
            Err(e) => {
                warn!(model, error = %e, "Download request failed");
                self.apply(
                    model,
                    DownloadEvent::Failed {
                        message: e.to_string(),
                    },
                )
            }
        }
    }

    /// Ask the host to delete `model`.
    ///
    /// Success resets the model to `Idle`; failure moves it to `Error` and
    /// returns the host error.
    pub async fn request_delete(
        &self,
        host: &dyn HostClient,
        model: &str,
    ) -> Result<Transition, DomainError> {
        info!(model, "Requesting model deletion");
        match host.delete_model(model).await {
            Ok(()) => Ok(self.apply(model, DownloadEvent::Deleted)),
            Err(e) => {
                warn!(model, error = %e, "Model deletion failed");
                self.apply(
                    model,
                    DownloadEvent::Failed {
                        message: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::MockHost;
    use crate::domain::DownloadProgress;

    fn progress(model: &str, percent: f32) -> HostEvent {
        HostEvent::DownloadProgress(DownloadProgressPayload {
            model: model.to_string(),
            file: "weights.bin".to_string(),
            downloaded: percent as u64,
            total: 100,
            percent,
        })
    }

    #[tokio::test]
    async fn test_request_download_is_optimistic() {
        let host = MockHost::new().with_model("m1", false);
        let tracker = DownloadTracker::new();

        let transition = tracker.request_download(&host, "m1").await;

        assert_eq!(
            transition.state,
            DownloadState::Downloading(DownloadProgress::default())
        );
        assert!(!transition.refresh_status);
        assert_eq!(host.calls(), vec!["download_model:m1"]);
    }

    #[tokio::test]
    async fn test_rejected_download_call_becomes_error() {
        let host = MockHost::new();
        host.fail("download_model", "no space left on device");
        let tracker = DownloadTracker::new();

        let transition = tracker.request_download(&host, "m1").await;

        assert_eq!(transition.state.error_message(), Some("no space left on device"));
        assert!(!tracker.state("m1").is_downloading());
    }

    #[tokio::test]
    async fn test_progress_then_error_keeps_percent() {
        let host = MockHost::new();
        let tracker = DownloadTracker::new();
        tracker.request_download(&host, "m3").await;

        tracker.handle_event(&progress("m3", 40.0));
        tracker.handle_event(&HostEvent::DownloadError(DownloadErrorPayload {
            model: "m3".to_string(),
            error: "disk full".to_string(),
        }));

        let state = tracker.state("m3");
        assert_eq!(state.error_message(), Some("disk full"));
        assert_eq!(state.percent(), 40.0);
    }

    #[test]
    fn test_complete_asks_for_status_refresh() {
        let tracker = DownloadTracker::new();
        tracker.handle_event(&progress("m1", 90.0));
        let transition = tracker
            .handle_event(&HostEvent::DownloadComplete(DownloadCompletePayload {
                model: "m1".to_string(),
            }))
            .unwrap();

        assert!(transition.refresh_status);
        assert_eq!(transition.state.percent(), 100.0);
    }

    #[test]
    fn test_events_are_routed_by_key() {
        let tracker = DownloadTracker::new();
        tracker.handle_event(&progress("a", 10.0));
        tracker.handle_event(&progress("b", 70.0));
        tracker.handle_event(&progress("a", 20.0));

        assert_eq!(tracker.state("a").percent(), 20.0);
        assert_eq!(tracker.state("b").percent(), 70.0);
        assert_eq!(tracker.snapshot().len(), 2);
    }

    #[test]
    fn test_settings_event_is_not_routed() {
        let tracker = DownloadTracker::new();
        let event = HostEvent::SettingsChanged(Default::default());
        assert!(tracker.handle_event(&event).is_none());
        assert!(tracker.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_delete_success_resets_to_idle() {
        let host = MockHost::new().with_model("m1", true);
        let tracker = DownloadTracker::new();
        tracker.handle_event(&HostEvent::DownloadComplete(DownloadCompletePayload {
            model: "m1".to_string(),
        }));

        let transition = tracker.request_delete(&host, "m1").await.unwrap();

        assert_eq!(transition.state, DownloadState::Idle);
        assert!(transition.refresh_status);
        assert_eq!(tracker.state("m1").progress(), DownloadProgress::default());
    }

    #[tokio::test]
    async fn test_delete_failure_sets_error() {
        let host = MockHost::new().with_model("m1", true);
        host.fail("delete_model", "file in use");
        let tracker = DownloadTracker::new();

        let result = tracker.request_delete(&host, "m1").await;

        assert!(result.is_err());
        assert_eq!(tracker.state("m1").error_message(), Some("file in use"));
    }
}
