use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{DomainError, HostEvent, ModelDescriptor, ModelStatus, Settings};

/// Port for the native host process.
///
/// The host owns the persisted settings and the model files. Every call is a
/// suspend point; download progress arrives through [`HostClient::subscribe`]
/// rather than through return values.
#[async_trait]
pub trait HostClient: Send + Sync {
    /// Fetch the authoritative settings snapshot.
    async fn get_settings(&self) -> Result<Settings, DomainError>;

    /// Persist the full settings object.
    async fn update_settings(&self, settings: &Settings) -> Result<(), DomainError>;

    /// List every model the host knows about.
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, DomainError>;

    /// Inspect one model on disk.
    async fn check_model_status(&self, model: &str) -> Result<ModelStatus, DomainError>;

    /// Start downloading a model.
    ///
    /// Progress, completion and failure are reported as [`HostEvent`]s.
    async fn download_model(&self, model: &str) -> Result<(), DomainError>;

    /// Remove a model's files.
    async fn delete_model(&self, model: &str) -> Result<(), DomainError>;

    /// Subscribe to host-emitted events.
    fn subscribe(&self) -> broadcast::Receiver<HostEvent>;
}
