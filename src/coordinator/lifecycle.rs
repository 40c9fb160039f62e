use chrono::Utc;

use super::Coordinator;
use crate::error::Result;
use crate::storage::migration;
use crate::types::SettingsDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update { previous_version: String },
}

impl InstallReason {
    pub fn as_str(&self) -> &str {
        match self {
            InstallReason::Install => "install",
            InstallReason::Update { .. } => "update",
        }
    }
}

impl Coordinator {
    /// Prepare the settings document after an install or an update.
    ///
    /// Both only add the recognized sections that are missing. On an empty
    /// store that is the full default document; anything the user already
    /// has, including unknown keys, is left untouched, so running it again is
    /// harmless.
    pub async fn on_installed(&self, reason: InstallReason) -> Result<SettingsDocument> {
        let existing = self.store.load().await?;
        let patch = migration::missing_sections(&existing, Utc::now());
        let label = match &reason {
            InstallReason::Install => "Install".to_string(),
            InstallReason::Update { previous_version } => {
                format!("Update from {}", previous_version)
            }
        };

        if patch.is_empty() {
            log::info!("{}: settings already complete", label);
            return Ok(existing);
        }
        log::info!(
            "{}: adding sections {}",
            label,
            patch.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(self.store.merge(patch).await?)
    }
}
