use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::settings::Settings;

/// Event names emitted by the host.
pub const SETTINGS_CHANGED: &str = "settings:changed";
pub const DOWNLOAD_PROGRESS: &str = "download:progress";
pub const DOWNLOAD_COMPLETE: &str = "download:complete";
pub const DOWNLOAD_ERROR: &str = "download:error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgressPayload {
    pub model: String,
    #[serde(default)]
    pub file: String,
    pub downloaded: u64,
    pub total: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadCompletePayload {
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadErrorPayload {
    pub model: String,
    pub error: String,
}

/// Notification pushed by the host outside of any request.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Settings were changed elsewhere (another window, the tray, ...).
    SettingsChanged(Settings),
    DownloadProgress(DownloadProgressPayload),
    DownloadComplete(DownloadCompletePayload),
    DownloadError(DownloadErrorPayload),
}

impl HostEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::SettingsChanged(_) => SETTINGS_CHANGED,
            HostEvent::DownloadProgress(_) => DOWNLOAD_PROGRESS,
            HostEvent::DownloadComplete(_) => DOWNLOAD_COMPLETE,
            HostEvent::DownloadError(_) => DOWNLOAD_ERROR,
        }
    }

    /// Model the event is about, if any.
    pub fn model_key(&self) -> Option<&str> {
        match self {
            HostEvent::SettingsChanged(_) => None,
            HostEvent::DownloadProgress(p) => Some(&p.model),
            HostEvent::DownloadComplete(p) => Some(&p.model),
            HostEvent::DownloadError(p) => Some(&p.model),
        }
    }

    /// Decode an event from its wire name and JSON payload.
    ///
    /// Returns `Ok(None)` for event names this crate does not consume.
    pub fn from_wire(name: &str, payload: serde_json::Value) -> Result<Option<Self>, DomainError> {
        let event = match name {
            SETTINGS_CHANGED => HostEvent::SettingsChanged(serde_json::from_value(payload)?),
            DOWNLOAD_PROGRESS => HostEvent::DownloadProgress(serde_json::from_value(payload)?),
            DOWNLOAD_COMPLETE => HostEvent::DownloadComplete(serde_json::from_value(payload)?),
            DOWNLOAD_ERROR => HostEvent::DownloadError(serde_json::from_value(payload)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_progress() {
        let event = HostEvent::from_wire(
            DOWNLOAD_PROGRESS,
            json!({"model": "m3", "file": "encoder.onnx", "downloaded": 40, "total": 100, "percent": 40.0}),
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.model_key(), Some("m3"));
        assert_eq!(event.name(), DOWNLOAD_PROGRESS);
    }

    #[test]
    fn test_unknown_event_is_skipped() {
        let event = HostEvent::from_wire("recording:started", json!({})).unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let result = HostEvent::from_wire(DOWNLOAD_ERROR, json!({"model": "m1"}));
        assert!(matches!(result, Err(DomainError::Serialization(_))));
    }
}
