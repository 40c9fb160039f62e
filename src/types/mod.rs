pub mod message;
pub mod profile;
pub mod settings;

pub use message::{Request, Response, UNKNOWN_ACTION};
pub use profile::{PageSnapshot, ProfileRecord};
pub use settings::{MessageLength, Preferences, SettingsDocument, Statistics, Tone, UserContext};

use serde::{Deserialize, Serialize};

pub type TabId = u32;

/// Per-page agent lifecycle as seen by the host.
///
/// There is no "destroyed" notification: navigation silently drops the page
/// back to `NotInstalled`, and the only observable signal is a missing
/// answer to a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentLifecycleState {
    NotInstalled,
    Installing,
    Ready,
}

impl AgentLifecycleState {
    pub fn as_str(&self) -> &str {
        match self {
            AgentLifecycleState::NotInstalled => "NotInstalled",
            AgentLifecycleState::Installing => "Installing",
            AgentLifecycleState::Ready => "Ready",
        }
    }
}
