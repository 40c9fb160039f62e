use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::prompt::{build_prompt, greeting, PromptOptions, SIGN_OFF};
use crate::error::GenerationError;
use crate::types::{ProfileRecord, UserContext};

/// Turns a profile plus the sender's context into an outreach note. One call
/// is one provider request; implementations never retry.
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn generate(
        &self,
        profile: &ProfileRecord,
        context: &UserContext,
        options: &PromptOptions,
    ) -> Result<String, GenerationError>;
}

// Mock generator for tests and offline runs
pub struct MockGenerator {
    outcome: Result<String, GenerationError>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockGenerator {
    /// Answers with a templated note built from the profile.
    pub fn new() -> Self {
        Self {
            outcome: Ok(String::new()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            outcome: Ok(response.into()),
            ..Self::new()
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageGenerator for MockGenerator {
    async fn generate(
        &self,
        profile: &ProfileRecord,
        context: &UserContext,
        options: &PromptOptions,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.last_prompt.lock() {
            *slot = Some(build_prompt(profile, context, options));
        }

        match &self.outcome {
            Ok(text) if !text.is_empty() => Ok(text.clone()),
            Ok(_) => Ok(format!(
                "{} your work as {} caught my eye. I'm a {} and would be glad to connect.\n{}",
                greeting(profile),
                if profile.headline.is_empty() { "a professional" } else { profile.headline.as_str() },
                if context.user_role.is_empty() { "professional" } else { context.user_role.as_str() },
                SIGN_OFF
            )),
            Err(e) => Err(e.clone()),
        }
    }
}
