use serde::{Deserialize, Serialize};

/// Catalog entry for a local transcription model, as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Stable identifier (e.g., "whisper-small").
    pub key: String,
    /// Human-readable name.
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Download size in megabytes.
    pub size_mb: u64,
    /// Number of files that make up the model.
    pub file_count: u32,
    /// Inference engine identifier (e.g., "whisper", "parakeet").
    pub engine: String,
    /// Variant tag (e.g., "q5_1", "int8").
    #[serde(default)]
    pub variant: String,
    /// Capability tags (e.g., "multilingual", "fast").
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Install status of a model on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub installed: bool,
    pub bytes_on_disk: u64,
    /// Files the model needs that are not on disk.
    #[serde(default)]
    pub missing_files: Vec<String>,
    /// Install directory, empty when unknown.
    #[serde(default)]
    pub directory: String,
}

impl ModelStatus {
    /// Status assumed when the host cannot tell us anything.
    pub fn not_installed() -> Self {
        Self::default()
    }
}

/// Download counters for one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Progress as percentage (0.0 - 100.0).
    pub percent: f32,
    /// Bytes downloaded so far.
    pub downloaded: u64,
    /// Total bytes to download (0 if unknown).
    pub total: u64,
    /// File currently being fetched.
    pub current_file: Option<String>,
}

impl DownloadProgress {
    /// Fold a newer progress report into this one.
    ///
    /// Percent and byte count never move backwards within one download.
    fn advance(&mut self, file: String, downloaded: u64, total: u64, percent: f32) {
        self.percent = self.percent.max(percent.clamp(0.0, 100.0));
        self.downloaded = self.downloaded.max(downloaded);
        self.total = total;
        self.current_file = Some(file);
    }
}

/// Input to the download state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// The user asked for a download; applied before the host is called.
    Requested,
    Progress {
        file: String,
        downloaded: u64,
        total: u64,
        percent: f32,
    },
    Completed,
    Failed { message: String },
    /// The host confirmed the model was deleted.
    Deleted,
}

/// Download lifecycle of a single model.
///
/// Transitions:
/// - any -> Downloading (Requested, counters reset)
/// - Downloading -> Downloading (Progress, monotonic percent)
/// - Idle/Complete/Error -> Downloading (Progress from a download we did not start)
/// - any -> Complete (Completed, percent 100)
/// - any -> Error (Failed, counters preserved)
/// - any -> Idle (Deleted, counters zeroed)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadState {
    #[default]
    Idle,
    Downloading(DownloadProgress),
    Complete(DownloadProgress),
    Error {
        #[serde(flatten)]
        progress: DownloadProgress,
        message: String,
    },
}

impl DownloadState {
    /// Apply an event and return the next state.
    #[must_use]
    pub fn transition(&self, event: DownloadEvent) -> DownloadState {
        match event {
            DownloadEvent::Requested => DownloadState::Downloading(DownloadProgress::default()),
            DownloadEvent::Progress {
                file,
                downloaded,
                total,
                percent,
            } => {
                let mut progress = match self {
                    DownloadState::Downloading(progress) => progress.clone(),
                    _ => DownloadProgress::default(),
                };
                progress.advance(file, downloaded, total, percent);
                DownloadState::Downloading(progress)
            }
            DownloadEvent::Completed => {
                let mut progress = self.progress();
                progress.percent = 100.0;
                if progress.total > 0 {
                    progress.downloaded = progress.total;
                }
                DownloadState::Complete(progress)
            }
            DownloadEvent::Failed { message } => DownloadState::Error {
                progress: self.progress(),
                message,
            },
            DownloadEvent::Deleted => DownloadState::Idle,
        }
    }

    /// Counters for this state; zeroed for `Idle`.
    pub fn progress(&self) -> DownloadProgress {
        match self {
            DownloadState::Idle => DownloadProgress::default(),
            DownloadState::Downloading(progress) | DownloadState::Complete(progress) => {
                progress.clone()
            }
            DownloadState::Error { progress, .. } => progress.clone(),
        }
    }

    pub fn percent(&self) -> f32 {
        match self {
            DownloadState::Idle => 0.0,
            DownloadState::Downloading(progress) | DownloadState::Complete(progress) => {
                progress.percent
            }
            DownloadState::Error { progress, .. } => progress.percent,
        }
    }

    pub fn is_downloading(&self) -> bool {
        matches!(self, DownloadState::Downloading(_))
    }

    /// Error message, if the last operation failed.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            DownloadState::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}
