//! Shared handle passed to every helper

use crate::client::{LocalStorageClient, MemoryStorageClient, StorageClient};
use crate::config::StorageConfig;
use crate::error::Result;
use crate::notify::{LogNotifier, Notifier};
use std::sync::Arc;

/// Storage client, notifier and configuration bundled together
///
/// Cloning is cheap; clones share the client and notifier.
#[derive(Clone)]
pub struct StorageContext {
    client: Arc<dyn StorageClient>,
    notifier: Arc<dyn Notifier>,
    config: Arc<StorageConfig>,
}

impl std::fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContext")
            .field("bucket", &self.client.bucket())
            .field("config", &self.config)
            .finish()
    }
}

impl StorageContext {
    pub fn new(
        client: Arc<dyn StorageClient>,
        notifier: Arc<dyn Notifier>,
        config: StorageConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            client,
            notifier,
            config: Arc::new(config),
        })
    }

    /// Context over a [`LocalStorageClient`] that reports through `log`
    pub fn local(config: StorageConfig) -> Result<Self> {
        let client = LocalStorageClient::new(&config)?;
        Self::new(Arc::new(client), Arc::new(LogNotifier), config)
    }

    /// Context over a fresh [`MemoryStorageClient`] that reports through `log`
    pub fn in_memory(config: StorageConfig) -> Result<Self> {
        let client = MemoryStorageClient::new(&config);
        Self::new(Arc::new(client), Arc::new(LogNotifier), config)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn client(&self) -> &dyn StorageClient {
        self.client.as_ref()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}
