use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use super::traits::{shallow_merge, SettingsStore};
use crate::types::SettingsDocument;

#[derive(Clone, Default)]
pub struct InMemorySettingsStore {
    document: Arc<RwLock<SettingsDocument>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: SettingsDocument) -> Self {
        Self {
            document: Arc::new(RwLock::new(document)),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<SettingsDocument> {
        let document = self
            .document
            .read()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        Ok(document.clone())
    }

    async fn merge(&self, patch: SettingsDocument) -> Result<SettingsDocument> {
        let mut document = self
            .document
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        shallow_merge(&mut document, patch);
        Ok(document.clone())
    }
}
