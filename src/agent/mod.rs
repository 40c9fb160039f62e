use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::extractor::ProfileExtractor;
use crate::storage::SettingsStore;
use crate::types::{PageSnapshot, Request, Response, UserContext};

/// The agent attached to one page context. Lives exactly as long as that
/// context; a navigation replaces it with nothing until the next install.
pub struct PageAgent {
    extractor: Arc<ProfileExtractor>,
    ready: AtomicBool,
    button_visible: AtomicBool,
    context: RwLock<UserContext>,
}

impl PageAgent {
    pub fn new(extractor: Arc<ProfileExtractor>) -> Self {
        Self {
            extractor,
            ready: AtomicBool::new(false),
            button_visible: AtomicBool::new(false),
            context: RwLock::new(UserContext::default()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn is_button_visible(&self) -> bool {
        self.button_visible.load(Ordering::SeqCst)
    }

    pub fn cached_context(&self) -> UserContext {
        self.context
            .read()
            .map(|ctx| ctx.clone())
            .unwrap_or_default()
    }

    /// Load the cached user context and start answering. Running this on an
    /// already-ready agent does nothing.
    pub async fn initialize(&self, store: &dyn SettingsStore) {
        if self.is_ready() {
            return;
        }

        match store.load().await {
            Ok(document) => self.set_context(UserContext::from_document(&document)),
            Err(e) => log::warn!("Agent starting without cached settings: {}", e),
        }
        self.ready.store(true, Ordering::SeqCst);
    }

    fn set_context(&self, context: UserContext) {
        if let Ok(mut slot) = self.context.write() {
            *slot = context;
        }
    }

    pub fn handle(&self, request: Request, page: &PageSnapshot) -> Response {
        match request {
            Request::Ping => Response::Pong {
                ready: self.is_ready(),
            },
            Request::GetProfileData => match self.extractor.extract_page(page) {
                Ok(profile) => Response::Profile(profile),
                Err(e) => Response::failure(e.to_string()),
            },
            Request::SettingsUpdated { settings } => {
                self.set_context(settings);
                Response::Ack
            }
            Request::ShowGenerateButton => {
                if self.extractor.is_profile_url(&page.url) {
                    self.button_visible.store(true, Ordering::SeqCst);
                }
                Response::Ack
            }
            Request::GenerateMessage { .. }
            | Request::GetSettings { .. }
            | Request::SaveSettings { .. }
            | Request::LogActivity { .. } => Response::unknown_action(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractorConfig;
    use crate::storage::InMemorySettingsStore;
    use crate::types::UNKNOWN_ACTION;
    use serde_json::json;

    fn agent() -> PageAgent {
        PageAgent::new(Arc::new(
            ProfileExtractor::new(&ExtractorConfig::default()).unwrap(),
        ))
    }

    fn profile_page() -> PageSnapshot {
        PageSnapshot::new(
            "https://www.linkedin.com/in/ada",
            r#"<h1 class="text-heading-xlarge">Ada Lovelace</h1>"#,
        )
    }

    #[tokio::test]
    async fn test_initialize_loads_context_and_sets_ready() {
        let store = InMemorySettingsStore::with_document(
            json!({"userContext": "CS grad", "userRole": "developer"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let agent = agent();
        assert!(!agent.is_ready());

        agent.initialize(&store).await;
        assert!(agent.is_ready());
        assert_eq!(agent.cached_context(), UserContext::new("CS grad", "developer"));
    }

    #[tokio::test]
    async fn test_reinitialize_keeps_updated_context() {
        let store = InMemorySettingsStore::new();
        let agent = agent();
        agent.initialize(&store).await;
        agent.handle(
            Request::SettingsUpdated {
                settings: UserContext::new("new", "role"),
            },
            &profile_page(),
        );

        agent.initialize(&store).await;
        assert_eq!(agent.cached_context().user_context, "new");
    }

    #[test]
    fn test_ping_reports_readiness() {
        let agent = agent();
        assert_eq!(
            agent.handle(Request::Ping, &profile_page()),
            Response::Pong { ready: false }
        );
    }

    #[test]
    fn test_profile_extraction() {
        match agent().handle(Request::GetProfileData, &profile_page()) {
            Response::Profile(profile) => assert_eq!(profile.name, "Ada Lovelace"),
            other => panic!("expected profile, got {:?}", other),
        }
    }

    #[test]
    fn test_profile_refused_off_profile() {
        let page = PageSnapshot::new("https://www.linkedin.com/feed/", "<h1>Feed</h1>");
        assert_eq!(
            agent().handle(Request::GetProfileData, &page),
            Response::failure(crate::error::NOT_A_PROFILE_PAGE)
        );
    }

    #[test]
    fn test_show_button_only_on_profiles() {
        let agent = agent();
        let feed = PageSnapshot::new("https://www.linkedin.com/feed/", "");
        assert_eq!(agent.handle(Request::ShowGenerateButton, &feed), Response::Ack);
        assert!(!agent.is_button_visible());

        agent.handle(Request::ShowGenerateButton, &profile_page());
        assert!(agent.is_button_visible());
    }

    #[test]
    fn test_coordinator_actions_are_unknown_here() {
        let response = agent().handle(Request::GetSettings { keys: None }, &profile_page());
        assert_eq!(response, Response::failure(UNKNOWN_ACTION));
    }
}
