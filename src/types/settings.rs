use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// The flat key-value document persisted by the settings store.
pub type SettingsDocument = Map<String, Value>;

pub const KEY_USER_CONTEXT: &str = "userContext";
pub const KEY_USER_ROLE: &str = "userRole";
pub const KEY_SETTINGS: &str = "settings";
pub const KEY_STATISTICS: &str = "statistics";

pub const STAT_MESSAGES_GENERATED: &str = "messagesGenerated";
pub const STAT_LAST_GENERATED: &str = "lastGenerated";
pub const STAT_LAST_ACTIVITY: &str = "lastActivity";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    #[serde(default)]
    pub user_context: String,
    #[serde(default)]
    pub user_role: String,
}

impl UserContext {
    pub fn new(user_context: impl Into<String>, user_role: impl Into<String>) -> Self {
        Self {
            user_context: user_context.into(),
            user_role: user_role.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.user_context.trim().is_empty()
    }

    pub fn from_document(doc: &SettingsDocument) -> Self {
        let field = |key: &str| {
            doc.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Self {
            user_context: field(KEY_USER_CONTEXT),
            user_role: field(KEY_USER_ROLE),
        }
    }

    pub fn to_patch(&self) -> SettingsDocument {
        let mut patch = Map::new();
        patch.insert(
            KEY_USER_CONTEXT.to_string(),
            Value::String(self.user_context.clone()),
        );
        patch.insert(
            KEY_USER_ROLE.to_string(),
            Value::String(self.user_role.clone()),
        );
        patch
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl MessageLength {
    /// Target size of the generated note, in characters.
    pub fn char_window(&self) -> (usize, usize) {
        match self {
            MessageLength::Short => (150, 200),
            MessageLength::Medium => (200, 300),
            MessageLength::Long => (300, 400),
        }
    }
}

impl FromStr for MessageLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "short" => Ok(MessageLength::Short),
            "medium" => Ok(MessageLength::Medium),
            "long" => Ok(MessageLength::Long),
            other => Err(format!("unknown message length: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Casual,
}

impl Tone {
    pub fn describe(&self) -> &str {
        match self {
            Tone::Professional => "professional and respectful",
            Tone::Friendly => "warm and friendly while staying professional",
            Tone::Casual => "relaxed and conversational",
        }
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "friendly" => Ok(Tone::Friendly),
            "casual" => Ok(Tone::Casual),
            other => Err(format!("unknown tone: {}", other)),
        }
    }
}

/// The nested `settings` section of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub message_length: MessageLength,
    pub tone: Tone,
    pub auto_generate: bool,
}

impl Preferences {
    pub fn from_document(doc: &SettingsDocument) -> Self {
        doc.get(KEY_SETTINGS)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

/// The nested `statistics` section of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Statistics {
    pub messages_generated: u64,
    pub installed_at: Option<DateTime<Utc>>,
    pub last_generated: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl Statistics {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            installed_at: Some(now),
            ..Default::default()
        }
    }

    /// Read the section field by field. A field that does not decode reads
    /// as its default without affecting the others.
    pub fn from_document(doc: &SettingsDocument) -> Self {
        let Some(Value::Object(section)) = doc.get(KEY_STATISTICS) else {
            return Self::default();
        };
        let timestamp = |key: &str| {
            section
                .get(key)
                .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v.clone()).ok())
        };
        Self {
            messages_generated: section
                .get(STAT_MESSAGES_GENERATED)
                .and_then(Value::as_u64)
                .unwrap_or_default(),
            installed_at: timestamp("installedAt"),
            last_generated: timestamp(STAT_LAST_GENERATED),
            last_activity: timestamp(STAT_LAST_ACTIVITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_context_from_document() {
        let doc = json!({"userContext": "CS grad", "userRole": "developer", "other": 1});
        let ctx = UserContext::from_document(doc.as_object().unwrap());
        assert_eq!(ctx, UserContext::new("CS grad", "developer"));
        assert!(ctx.is_complete());
    }

    #[test]
    fn test_blank_context_is_incomplete() {
        assert!(!UserContext::new("   ", "developer").is_complete());
        assert!(!UserContext::from_document(&Map::new()).is_complete());
    }

    #[test]
    fn test_statistics_keep_counter_when_a_timestamp_is_legacy() {
        let doc = json!({"statistics": {"messagesGenerated": 12, "lastGenerated": 1700000000000u64}});
        let stats = Statistics::from_document(doc.as_object().unwrap());
        assert_eq!(stats.messages_generated, 12);
        assert!(stats.last_generated.is_none());
    }

    #[test]
    fn test_preferences_tolerate_partial_section() {
        let doc = json!({"settings": {"tone": "casual"}});
        let prefs = Preferences::from_document(doc.as_object().unwrap());
        assert_eq!(prefs.tone, Tone::Casual);
        assert_eq!(prefs.message_length, MessageLength::Medium);
        assert!(!prefs.auto_generate);
    }

    #[test]
    fn test_parse_length_and_tone() {
        assert_eq!("SHORT".parse::<MessageLength>().unwrap(), MessageLength::Short);
        assert_eq!("friendly".parse::<Tone>().unwrap(), Tone::Friendly);
        assert!("verbose".parse::<MessageLength>().is_err());
    }
}
