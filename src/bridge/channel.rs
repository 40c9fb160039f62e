use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Request, Response, TabId};

/// Failures of the page transport itself, as opposed to failures reported
/// inside a [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("no page with id {0}")]
    NoSuchTab(TabId),
    #[error("no agent is listening in the page")]
    NoReceiver,
    #[error("the page context was destroyed")]
    ContextDestroyed,
    #[error("timed out waiting for the page")]
    Timeout,
    #[error("agent installation failed: {0}")]
    InstallFailed(String),
}

/// The host's view of page contexts: addressing, delivery, and agent
/// installation. Installation must be idempotent: installing into a page that
/// already has an agent is a no-op.
#[async_trait]
pub trait TabChannel: Send + Sync {
    async fn tab_url(&self, tab: TabId) -> Result<String, ChannelError>;

    async fn send(&self, tab: TabId, request: Request) -> Result<Response, ChannelError>;

    async fn install_agent(&self, tab: TabId) -> Result<(), ChannelError>;
}
