use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ProfileRecord, SettingsDocument, UserContext};

pub const UNKNOWN_ACTION: &str = "Unknown action";

/// Every message that travels over the bus. The `action` tag is the wire
/// discriminator; anything outside this set fails to decode and is answered
/// with [`Response::unknown_action`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    Ping,
    GetProfileData,
    #[serde(
        rename = "generateGeminiMessage",
        alias = "generateMessage",
        rename_all = "camelCase"
    )]
    GenerateMessage { profile_data: ProfileRecord },
    SettingsUpdated { settings: UserContext },
    ShowGenerateButton,
    GetSettings {
        #[serde(default)]
        keys: Option<Vec<String>>,
    },
    SaveSettings { data: SettingsDocument },
    LogActivity {
        activity: String,
        #[serde(default)]
        details: Option<Value>,
    },
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::GetProfileData => "getProfileData",
            Request::GenerateMessage { .. } => "generateGeminiMessage",
            Request::SettingsUpdated { .. } => "settingsUpdated",
            Request::ShowGenerateButton => "showGenerateButton",
            Request::GetSettings { .. } => "getSettings",
            Request::SaveSettings { .. } => "saveSettings",
            Request::LogActivity { .. } => "logActivity",
        }
    }

    pub fn from_wire(message: Value) -> Option<Self> {
        serde_json::from_value(message).ok()
    }
}

/// Typed answer to a [`Request`]. Exactly one is produced per request.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Pong { ready: bool },
    Profile(ProfileRecord),
    Message(String),
    Settings(SettingsDocument),
    Ack,
    Failure { error: String },
}

impl Response {
    pub fn failure(error: impl Into<String>) -> Self {
        Response::Failure {
            error: error.into(),
        }
    }

    pub fn unknown_action() -> Self {
        Self::failure(UNKNOWN_ACTION)
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Response::Failure { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Response::Pong { ready: true })
    }

    /// Render the JSON shape exchanged on the bus. Every shape carries a
    /// `success` flag.
    pub fn to_wire(&self) -> Value {
        match self {
            Response::Pong { ready } => json!({"success": true, "ready": ready}),
            Response::Profile(profile) => json!({"success": true, "profileData": profile}),
            Response::Message(message) => json!({"success": true, "message": message}),
            Response::Settings(data) => json!({"success": true, "data": Value::Object(data.clone())}),
            Response::Ack => json!({"success": true}),
            Response::Failure { error } => json!({"success": false, "error": error}),
        }
    }
}
