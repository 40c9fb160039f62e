use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::settings::{KEY_SETTINGS, KEY_STATISTICS, KEY_USER_CONTEXT, KEY_USER_ROLE};
use crate::types::{Preferences, SettingsDocument, Statistics};

pub const RECOGNIZED_KEYS: [&str; 4] = [KEY_USER_CONTEXT, KEY_USER_ROLE, KEY_SETTINGS, KEY_STATISTICS];

fn default_section(key: &str, now: DateTime<Utc>) -> Value {
    match key {
        KEY_SETTINGS => serde_json::to_value(Preferences::default()).unwrap_or_default(),
        KEY_STATISTICS => serde_json::to_value(Statistics::fresh(now)).unwrap_or_default(),
        _ => Value::String(String::new()),
    }
}

/// Full default document for a first install.
pub fn defaults(now: DateTime<Utc>) -> SettingsDocument {
    RECOGNIZED_KEYS
        .iter()
        .map(|key| (key.to_string(), default_section(key, now)))
        .collect()
}

/// Patch holding only the recognized top-level sections absent from
/// `existing`. Present sections, including partially filled ones, and
/// unknown keys are never touched.
pub fn missing_sections(existing: &SettingsDocument, now: DateTime<Utc>) -> SettingsDocument {
    RECOGNIZED_KEYS
        .iter()
        .filter(|key| !existing.contains_key(**key))
        .map(|key| (key.to_string(), default_section(key, now)))
        .collect()
}
