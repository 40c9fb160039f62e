use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::traits::{shallow_merge, SettingsStore};
use crate::types::SettingsDocument;

/// Settings document kept as a single JSON object on disk.
pub struct JsonFileSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<SettingsDocument> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SettingsDocument::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        if raw.trim().is_empty() {
            return Ok(SettingsDocument::new());
        }

        match serde_json::from_str::<Value>(&raw)
            .with_context(|| format!("parsing {}", self.path.display()))?
        {
            Value::Object(document) => Ok(document),
            other => bail!(
                "{} holds a JSON {} instead of an object",
                self.path.display(),
                json_kind(&other)
            ),
        }
    }

    async fn write_document(&self, document: &SettingsDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let body = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn load(&self) -> Result<SettingsDocument> {
        self.read_document().await
    }

    async fn merge(&self, patch: SettingsDocument) -> Result<SettingsDocument> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        shallow_merge(&mut document, patch);
        self.write_document(&document).await?;
        log::debug!("Saved settings to {}", self.path.display());
        Ok(document)
    }
}
