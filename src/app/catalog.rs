use std::collections::HashMap;

use futures_util::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{DomainError, ModelDescriptor, ModelStatus};
use crate::ports::HostClient;

/// A catalog entry joined with its last known status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEntry {
    pub descriptor: ModelDescriptor,
    pub status: ModelStatus,
}

#[derive(Debug, Default)]
struct CatalogState {
    models: Vec<ModelDescriptor>,
    statuses: HashMap<String, ModelStatus>,
}

/// In-memory mirror of the host's model catalog and per-model install status.
///
/// Locks are only held for the copy in or out, never across a host call.
#[derive(Debug, Default)]
pub struct ModelCatalogCache {
    state: RwLock<CatalogState>,
}

impl ModelCatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the catalog and replace the cached list.
    ///
    /// On failure the previous list stays in place and the error is returned
    /// for reporting.
    pub async fn load(&self, host: &dyn HostClient) -> Result<usize, DomainError> {
        match host.list_models().await {
            Ok(models) => {
                let count = models.len();
                self.state.write().models = models;
                info!(count, "Model catalog loaded");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load model catalog, keeping previous list");
                Err(e)
            }
        }
    }

    /// Fetch the status of one model and store it.
    ///
    /// A failed lookup stores and returns the not-installed default instead of
    /// keeping stale data.
    pub async fn refresh_status(&self, host: &dyn HostClient, key: &str) -> ModelStatus {
        let status = match host.check_model_status(key).await {
            Ok(status) => status,
            Err(e) => {
                warn!(model = key, error = %e, "Status check failed, assuming not installed");
                ModelStatus::not_installed()
            }
        };
        debug!(model = key, installed = status.installed, "Model status refreshed");
        self.state
            .write()
            .statuses
            .insert(key.to_string(), status.clone());
        status
    }

    /// Refresh every catalog entry concurrently.
    pub async fn refresh_all(&self, host: &dyn HostClient) {
        let keys = self.keys();
        join_all(keys.iter().map(|key| self.refresh_status(host, key))).await;
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.read().models.iter().map(|m| m.key.clone()).collect()
    }

    pub fn is_installed(&self, key: &str) -> bool {
        self.state
            .read()
            .statuses
            .get(key)
            .is_some_and(|s| s.installed)
    }

    /// Installed model keys in catalog order.
    pub fn installed_keys(&self) -> Vec<String> {
        let state = self.state.read();
        state
            .models
            .iter()
            .filter(|m| state.statuses.get(&m.key).is_some_and(|s| s.installed))
            .map(|m| m.key.clone())
            .collect()
    }

    /// Catalog entries with their status, unknown statuses shown as not installed.
    pub fn entries(&self) -> Vec<ModelEntry> {
        let state = self.state.read();
        state
            .models
            .iter()
            .map(|m| ModelEntry {
                descriptor: m.clone(),
                status: state.statuses.get(&m.key).cloned().unwrap_or_default(),
            })
            .collect()
    }
}
