use serde_json::json;
use std::sync::Arc;

use crate::bridge::Bridge;
use crate::coordinator::CoordinatorHandle;
use crate::error::{Error, Result};
use crate::types::settings::{KEY_SETTINGS, KEY_USER_CONTEXT, KEY_USER_ROLE};
use crate::types::{
    Preferences, ProfileRecord, Request, Response, SettingsDocument, TabId, UserContext,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMessage {
    pub text: String,
    pub profile: ProfileRecord,
}

/// The user-facing surface, bound to the page it was opened on.
pub struct Popup {
    coordinator: CoordinatorHandle,
    bridge: Arc<Bridge>,
    tab: TabId,
}

impl Popup {
    pub fn new(coordinator: CoordinatorHandle, bridge: Arc<Bridge>, tab: TabId) -> Self {
        Self {
            coordinator,
            bridge,
            tab,
        }
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// One click on "generate": read the page, ask for a message, record it.
    pub async fn generate(&self) -> Result<GeneratedMessage> {
        let context = self.load_context().await?;
        if !context.is_complete() {
            return Err(Error::ConfigMissing(
                "describe yourself in the settings before generating".to_string(),
            ));
        }

        let profile = match self.bridge.deliver(self.tab, Request::GetProfileData).await? {
            Response::Profile(profile) => profile,
            Response::Failure { error } => return Err(Error::from_remote(error)),
            other => return Err(unexpected("getProfileData", &other)),
        };

        let text = match self
            .coordinator
            .send(Request::GenerateMessage {
                profile_data: profile.clone(),
            })
            .await?
        {
            Response::Message(text) => text,
            Response::Failure { error } => return Err(Error::from_remote(error)),
            other => return Err(unexpected("generateGeminiMessage", &other)),
        };

        let activity = Request::LogActivity {
            activity: "message_generated".to_string(),
            details: Some(json!({
                "industry": profile.industry,
                "length": text.chars().count(),
            })),
        };
        if let Err(e) = self.coordinator.send(activity).await {
            log::warn!("Could not log activity: {}", e);
        }

        Ok(GeneratedMessage { text, profile })
    }

    pub async fn load_context(&self) -> Result<UserContext> {
        let keys = vec![KEY_USER_CONTEXT.to_string(), KEY_USER_ROLE.to_string()];
        let document = self.get_settings(keys).await?;
        Ok(UserContext::from_document(&document))
    }

    pub async fn load_preferences(&self) -> Result<Preferences> {
        let document = self.get_settings(vec![KEY_SETTINGS.to_string()]).await?;
        Ok(Preferences::from_document(&document))
    }

    /// Persist the user's context and tell the page agent. The page hearing
    /// about it is best effort.
    pub async fn save_context(&self, context: &UserContext) -> Result<()> {
        self.save(context.to_patch()).await?;
        let delivered = self
            .bridge
            .notify(
                self.tab,
                Request::SettingsUpdated {
                    settings: context.clone(),
                },
            )
            .await;
        if !delivered {
            log::debug!("Page {} will pick up the new context on next load", self.tab);
        }
        Ok(())
    }

    pub async fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        let value =
            serde_json::to_value(preferences).map_err(|e| Error::Storage(e.to_string()))?;
        let mut patch = SettingsDocument::new();
        patch.insert(KEY_SETTINGS.to_string(), value);
        self.save(patch).await
    }

    async fn save(&self, data: SettingsDocument) -> Result<()> {
        match self.coordinator.send(Request::SaveSettings { data }).await? {
            Response::Failure { error } => Err(Error::Storage(error)),
            _ => Ok(()),
        }
    }

    async fn get_settings(&self, keys: Vec<String>) -> Result<SettingsDocument> {
        match self
            .coordinator
            .send(Request::GetSettings { keys: Some(keys) })
            .await?
        {
            Response::Settings(document) => Ok(document),
            Response::Failure { error } => Err(Error::Storage(error)),
            other => Err(unexpected("getSettings", &other)),
        }
    }
}

fn unexpected(action: &str, response: &Response) -> Error {
    Error::Protocol(format!("unexpected answer to {}: {:?}", action, response))
}
