//! Scripted in-memory host used by the unit tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::domain::{DomainError, HostEvent, ModelDescriptor, ModelStatus, Settings};
use crate::ports::HostClient;

pub struct MockHost {
    settings: Mutex<Settings>,
    models: Mutex<Vec<ModelDescriptor>>,
    statuses: Mutex<HashMap<String, ModelStatus>>,
    failures: Mutex<HashMap<&'static str, String>>,
    calls: Mutex<Vec<String>>,
    commits: Mutex<Vec<Settings>>,
    status_delay: Mutex<Option<Duration>>,
    events: broadcast::Sender<HostEvent>,
}

impl MockHost {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            settings: Mutex::new(Settings::default()),
            models: Mutex::new(Vec::new()),
            statuses: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
            status_delay: Mutex::new(None),
            events,
        }
    }

    pub fn with_settings(self, settings: Settings) -> Self {
        *self.settings.lock() = settings;
        self
    }

    /// Add a model to the catalog with the given install state.
    pub fn with_model(self, key: &str, installed: bool) -> Self {
        self.models.lock().push(descriptor(key));
        self.set_installed(key, installed);
        self
    }

    pub fn set_installed(&self, key: &str, installed: bool) {
        let status = ModelStatus {
            installed,
            bytes_on_disk: if installed { 1024 } else { 0 },
            missing_files: if installed {
                Vec::new()
            } else {
                vec!["model.bin".to_string()]
            },
            directory: format!("/models/{}", key),
        };
        self.statuses.lock().insert(key.to_string(), status);
    }

    /// Make every call to `command` fail with `message`.
    pub fn fail(&self, command: &'static str, message: &str) {
        self.failures.lock().insert(command, message.to_string());
    }

    pub fn heal(&self, command: &'static str) {
        self.failures.lock().remove(command);
    }

    /// Make every status check wait `delay` before answering.
    pub fn delay_status_checks(&self, delay: Duration) {
        *self.status_delay.lock() = Some(delay);
    }

    pub fn emit(&self, event: HostEvent) {
        let _ = self.events.send(event);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn commits(&self) -> Vec<Settings> {
        self.commits.lock().clone()
    }

    pub fn stored_settings(&self) -> Settings {
        self.settings.lock().clone()
    }

    fn record(&self, command: &'static str, arg: Option<&str>) -> Result<(), DomainError> {
        let call = match arg {
            Some(arg) => format!("{}:{}", command, arg),
            None => command.to_string(),
        };
        self.calls.lock().push(call);
        match self.failures.lock().get(command) {
            Some(message) => Err(DomainError::Host(message.clone())),
            None => Ok(()),
        }
    }
}

pub fn descriptor(key: &str) -> ModelDescriptor {
    ModelDescriptor {
        key: key.to_string(),
        label: key.to_uppercase(),
        description: String::new(),
        size_mb: 100,
        file_count: 1,
        engine: "whisper".to_string(),
        variant: "q5_1".to_string(),
        tags: vec!["multilingual".to_string()],
    }
}

#[async_trait]
impl HostClient for MockHost {
    async fn get_settings(&self) -> Result<Settings, DomainError> {
        self.record("get_settings", None)?;
        Ok(self.settings.lock().clone())
    }

    async fn update_settings(&self, settings: &Settings) -> Result<(), DomainError> {
        self.record("update_settings", None)?;
        self.commits.lock().push(settings.clone());
        *self.settings.lock() = settings.clone();
        Ok(())
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, DomainError> {
        self.record("list_models", None)?;
        Ok(self.models.lock().clone())
    }

    async fn check_model_status(&self, model: &str) -> Result<ModelStatus, DomainError> {
        self.record("check_model_status", Some(model))?;
        let delay = *self.status_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .statuses
            .lock()
            .get(model)
            .cloned()
            .unwrap_or_else(ModelStatus::not_installed))
    }

    async fn download_model(&self, model: &str) -> Result<(), DomainError> {
        self.record("download_model", Some(model))
    }

    async fn delete_model(&self, model: &str) -> Result<(), DomainError> {
        self.record("delete_model", Some(model))?;
        self.set_installed(model, false);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }
}
