use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::agent::PageAgent;
use crate::bridge::{ChannelError, TabChannel};
use crate::extractor::ProfileExtractor;
use crate::storage::SettingsStore;
use crate::types::{AgentLifecycleState, PageSnapshot, Request, Response, TabId};

struct Tab {
    page: PageSnapshot,
    agent: Option<Arc<PageAgent>>,
    lifecycle: AgentLifecycleState,
    // Bumped on every navigation; an agent belongs to exactly one generation.
    generation: u64,
}

/// In-process stand-in for the browser: a set of pages, each of which may
/// carry one agent.
///
/// Installing returns as soon as the agent is attached; its initialization
/// finishes later, after `agent_init_delay`, and until then the page does not
/// answer. Navigating drops the agent without notice.
#[derive(Clone)]
pub struct InProcessHost {
    tabs: Arc<RwLock<HashMap<TabId, Tab>>>,
    next_id: Arc<AtomicU32>,
    installs: Arc<AtomicU32>,
    extractor: Arc<ProfileExtractor>,
    store: Arc<dyn SettingsStore>,
    agent_init_delay: Duration,
}

impl InProcessHost {
    pub fn new(extractor: Arc<ProfileExtractor>, store: Arc<dyn SettingsStore>) -> Self {
        Self {
            tabs: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
            installs: Arc::new(AtomicU32::new(0)),
            extractor,
            store,
            agent_init_delay: Duration::from_millis(50),
        }
    }

    pub fn with_agent_init_delay(mut self, delay: Duration) -> Self {
        self.agent_init_delay = delay;
        self
    }

    pub fn open_tab(&self, url: impl Into<String>, html: impl Into<String>) -> TabId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut tabs) = self.tabs.write() {
            tabs.insert(
                id,
                Tab {
                    page: PageSnapshot::new(url, html),
                    agent: None,
                    lifecycle: AgentLifecycleState::NotInstalled,
                    generation: 0,
                },
            );
        }
        id
    }

    /// Load a new document into the page. The previous agent context is gone.
    pub fn navigate(
        &self,
        tab: TabId,
        url: impl Into<String>,
        html: impl Into<String>,
    ) -> Result<(), ChannelError> {
        let mut tabs = self.tabs.write().map_err(|_| ChannelError::NoSuchTab(tab))?;
        let entry = tabs.get_mut(&tab).ok_or(ChannelError::NoSuchTab(tab))?;
        entry.page = PageSnapshot::new(url, html);
        entry.agent = None;
        entry.lifecycle = AgentLifecycleState::NotInstalled;
        entry.generation += 1;
        Ok(())
    }

    pub fn close_tab(&self, tab: TabId) {
        if let Ok(mut tabs) = self.tabs.write() {
            tabs.remove(&tab);
        }
    }

    pub fn lifecycle(&self, tab: TabId) -> Option<AgentLifecycleState> {
        let tabs = self.tabs.read().ok()?;
        tabs.get(&tab).map(|t| t.lifecycle)
    }

    pub fn agent(&self, tab: TabId) -> Option<Arc<PageAgent>> {
        let tabs = self.tabs.read().ok()?;
        tabs.get(&tab).and_then(|t| t.agent.clone())
    }

    /// Installations that actually attached a new agent.
    pub fn install_count(&self) -> u32 {
        self.installs.load(Ordering::SeqCst)
    }

    fn mark_ready(&self, tab: TabId, generation: u64) {
        if let Ok(mut tabs) = self.tabs.write() {
            if let Some(entry) = tabs.get_mut(&tab) {
                if entry.generation == generation && entry.agent.is_some() {
                    entry.lifecycle = AgentLifecycleState::Ready;
                }
            }
        }
    }
}

#[async_trait]
impl TabChannel for InProcessHost {
    async fn tab_url(&self, tab: TabId) -> Result<String, ChannelError> {
        let tabs = self.tabs.read().map_err(|_| ChannelError::NoSuchTab(tab))?;
        tabs.get(&tab)
            .map(|t| t.page.url.clone())
            .ok_or(ChannelError::NoSuchTab(tab))
    }

    async fn send(&self, tab: TabId, request: Request) -> Result<Response, ChannelError> {
        let (agent, page, generation) = {
            let tabs = self.tabs.read().map_err(|_| ChannelError::NoSuchTab(tab))?;
            let entry = tabs.get(&tab).ok_or(ChannelError::NoSuchTab(tab))?;
            let agent = entry.agent.clone().ok_or(ChannelError::NoReceiver)?;
            (agent, entry.page.clone(), entry.generation)
        };

        if !agent.is_ready() {
            return Err(ChannelError::NoReceiver);
        }

        let response = agent.handle(request, &page);

        let tabs = self.tabs.read().map_err(|_| ChannelError::ContextDestroyed)?;
        match tabs.get(&tab) {
            Some(entry) if entry.generation == generation => Ok(response),
            _ => Err(ChannelError::ContextDestroyed),
        }
    }

    async fn install_agent(&self, tab: TabId) -> Result<(), ChannelError> {
        let (agent, generation) = {
            let mut tabs = self
                .tabs
                .write()
                .map_err(|_| ChannelError::InstallFailed("host state poisoned".to_string()))?;
            let entry = tabs.get_mut(&tab).ok_or(ChannelError::NoSuchTab(tab))?;

            if entry.agent.is_some() {
                log::debug!("Page {} already has an agent, skipping install", tab);
                return Ok(());
            }

            let agent = Arc::new(PageAgent::new(self.extractor.clone()));
            entry.agent = Some(agent.clone());
            entry.lifecycle = AgentLifecycleState::Installing;
            (agent, entry.generation)
        };
        self.installs.fetch_add(1, Ordering::SeqCst);
        log::info!("Installed agent into page {}", tab);

        let host = self.clone();
        let delay = self.agent_init_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            agent.initialize(host.store.as_ref()).await;
            host.mark_ready(tab, generation);
        });

        Ok(())
    }
}
