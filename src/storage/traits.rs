use anyhow::Result;
use async_trait::async_trait;

use crate::types::SettingsDocument;

/// Flat key-value persistence for the settings document.
///
/// Writes are read-merge-write at the granularity of top-level keys; with
/// concurrent writers the last full write wins.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// The whole document. An empty store yields an empty map.
    async fn load(&self) -> Result<SettingsDocument>;

    /// Shallow-merge `patch` over the stored document and return the result.
    async fn merge(&self, patch: SettingsDocument) -> Result<SettingsDocument>;

    async fn get(&self, keys: Option<&[String]>) -> Result<SettingsDocument> {
        let document = self.load().await?;
        Ok(match keys {
            None => document,
            Some(keys) => document
                .into_iter()
                .filter(|(key, _)| keys.contains(key))
                .collect(),
        })
    }
}

pub(crate) fn shallow_merge(document: &mut SettingsDocument, patch: SettingsDocument) {
    for (key, value) in patch {
        document.insert(key, value);
    }
}
