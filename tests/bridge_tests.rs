//! Delivery-cycle behaviour of the bridge against scripted pages.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reachout::bridge::{
    Bridge, BridgeConfig, BridgeState, ChannelError, SettleStrategy, TabChannel,
};
use reachout::types::{Request, Response, TabId, UserContext};
use reachout::Error;

const TAB: TabId = 7;

/// A page whose agent behaves according to a fixed script.
struct ScriptedPage {
    url: String,
    live: AtomicBool,
    installed: AtomicBool,
    // Probes that go unanswered after installation before the agent is up.
    // `u32::MAX` means never.
    pings_until_ready: AtomicU32,
    install_error: Option<ChannelError>,
    delivery_error: Option<ChannelError>,
    pings: AtomicU32,
    installs: AtomicU32,
    deliveries: AtomicU32,
}

impl ScriptedPage {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            live: AtomicBool::new(false),
            installed: AtomicBool::new(false),
            pings_until_ready: AtomicU32::new(0),
            install_error: None,
            delivery_error: None,
            pings: AtomicU32::new(0),
            installs: AtomicU32::new(0),
            deliveries: AtomicU32::new(0),
        }
    }

    fn live(self) -> Self {
        self.live.store(true, Ordering::SeqCst);
        self
    }

    fn never_ready(self) -> Self {
        self.pings_until_ready.store(u32::MAX, Ordering::SeqCst);
        self
    }

    fn ready_after(self, pings: u32) -> Self {
        self.pings_until_ready.store(pings, Ordering::SeqCst);
        self
    }

    fn failing_install(mut self, error: ChannelError) -> Self {
        self.install_error = Some(error);
        self
    }

    fn failing_delivery(mut self, error: ChannelError) -> Self {
        self.delivery_error = Some(error);
        self
    }

    fn installs(&self) -> u32 {
        self.installs.load(Ordering::SeqCst)
    }

    fn deliveries(&self) -> u32 {
        self.deliveries.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TabChannel for ScriptedPage {
    async fn tab_url(&self, tab: TabId) -> Result<String, ChannelError> {
        if tab == TAB {
            Ok(self.url.clone())
        } else {
            Err(ChannelError::NoSuchTab(tab))
        }
    }

    async fn send(&self, _tab: TabId, request: Request) -> Result<Response, ChannelError> {
        if let Request::Ping = request {
            self.pings.fetch_add(1, Ordering::SeqCst);
            if self.live.load(Ordering::SeqCst) {
                return Ok(Response::Pong { ready: true });
            }
            if self.installed.load(Ordering::SeqCst) {
                let remaining = self.pings_until_ready.load(Ordering::SeqCst);
                if remaining == 0 {
                    self.live.store(true, Ordering::SeqCst);
                    return Ok(Response::Pong { ready: true });
                }
                if remaining != u32::MAX {
                    self.pings_until_ready.store(remaining - 1, Ordering::SeqCst);
                }
            }
            return Err(ChannelError::NoReceiver);
        }

        self.deliveries.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.delivery_error {
            return Err(error.clone());
        }
        if self.live.load(Ordering::SeqCst) {
            Ok(Response::Ack)
        } else {
            Err(ChannelError::NoReceiver)
        }
    }

    async fn install_agent(&self, _tab: TabId) -> Result<(), ChannelError> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.install_error {
            return Err(error.clone());
        }
        self.installed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn create_test_bridge(page: Arc<ScriptedPage>) -> Bridge {
    Bridge::new(
        page,
        BridgeConfig {
            probe_timeout: Duration::from_millis(50),
            delivery_timeout: Duration::from_millis(200),
            settle: SettleStrategy::Handshake {
                initial: Duration::from_millis(5),
                max_wait: Duration::from_millis(100),
            },
            ..Default::default()
        },
    )
}

fn profile_page() -> ScriptedPage {
    ScriptedPage::new("https://www.linkedin.com/in/ada")
}

#[tokio::test]
async fn test_live_agent_gets_immediate_delivery() {
    let page = Arc::new(profile_page().live());
    let bridge = create_test_bridge(page.clone());

    let (result, delivery) = bridge.deliver_traced(TAB, Request::GetProfileData).await;

    assert_eq!(result.unwrap(), Response::Ack);
    assert_eq!(page.installs(), 0);
    assert_eq!(page.deliveries(), 1);
    assert_eq!(delivery.installs, 0);
    assert_eq!(
        delivery.visited,
        vec![
            BridgeState::Idle,
            BridgeState::Probing,
            BridgeState::Ready,
            BridgeState::Delivering,
            BridgeState::Done,
        ]
    );
}

#[tokio::test]
async fn test_unresponsive_page_installs_once_and_gives_up() {
    let page = Arc::new(profile_page().never_ready());
    let bridge = create_test_bridge(page.clone());

    let (result, delivery) = bridge.deliver_traced(TAB, Request::GetProfileData).await;

    match result {
        Err(e @ Error::ChannelUnavailable(_)) => assert!(e.user_hint().contains("reload")),
        other => panic!("expected ChannelUnavailable, got {:?}", other),
    }
    assert_eq!(page.installs(), 1);
    assert_eq!(page.deliveries(), 1);
    assert_eq!(delivery.installs, 1);
    assert!(delivery.attempts() <= 2);
    assert_eq!(delivery.state, BridgeState::Failed);
}

#[tokio::test]
async fn test_handshake_waits_for_new_agent() {
    let page = Arc::new(profile_page().ready_after(2));
    let bridge = create_test_bridge(page.clone());

    let (result, delivery) = bridge.deliver_traced(TAB, Request::GetProfileData).await;

    assert_eq!(result.unwrap(), Response::Ack);
    assert_eq!(page.installs(), 1);
    assert_eq!(page.deliveries(), 1);
    assert_eq!(delivery.settle_polls, 3);
    assert_eq!(delivery.state, BridgeState::Done);
}

#[tokio::test]
async fn test_fixed_delay_settle() {
    let page = Arc::new(profile_page());
    let bridge = Bridge::new(
        page.clone(),
        BridgeConfig {
            probe_timeout: Duration::from_millis(50),
            settle: SettleStrategy::FixedDelay(Duration::from_millis(10)),
            ..Default::default()
        },
    );

    // Comes up on the first probe after install, which the fixed delay never sends.
    let (result, delivery) = bridge.deliver_traced(TAB, Request::ShowGenerateButton).await;

    assert!(matches!(result, Err(Error::ChannelUnavailable(_))));
    assert_eq!(delivery.settle_polls, 0);
    assert_eq!(page.installs(), 1);
}

#[tokio::test]
async fn test_install_failure_is_channel_unavailable() {
    let page = Arc::new(
        profile_page().failing_install(ChannelError::InstallFailed("blocked".to_string())),
    );
    let bridge = create_test_bridge(page.clone());

    let (result, delivery) = bridge.deliver_traced(TAB, Request::GetProfileData).await;

    assert!(matches!(result, Err(Error::ChannelUnavailable(_))));
    assert_eq!(page.installs(), 1);
    assert_eq!(page.deliveries(), 0);
    assert_eq!(delivery.state, BridgeState::Failed);
}

#[tokio::test]
async fn test_context_destroyed_mid_delivery() {
    let page = Arc::new(profile_page().live().failing_delivery(ChannelError::ContextDestroyed));
    let bridge = create_test_bridge(page.clone());

    let result = bridge.deliver(TAB, Request::GetProfileData).await;

    assert!(matches!(result, Err(Error::ChannelUnavailable(_))));
    assert_eq!(page.installs(), 0);
    assert_eq!(page.deliveries(), 1);
}

#[tokio::test]
async fn test_wrong_host_short_circuits() {
    let page = Arc::new(ScriptedPage::new("https://example.org/in/ada").live());
    let bridge = create_test_bridge(page.clone());

    let (result, delivery) = bridge.deliver_traced(TAB, Request::GetProfileData).await;

    assert!(matches!(result, Err(Error::NotAProfilePage)));
    assert_eq!(delivery.probes, 0);
    assert_eq!(page.pings.load(Ordering::SeqCst), 0);
    assert_eq!(page.deliveries(), 0);
}

#[tokio::test]
async fn test_notify_is_best_effort() {
    let page = Arc::new(profile_page());
    let bridge = create_test_bridge(page.clone());
    let update = Request::SettingsUpdated {
        settings: UserContext::new("CS grad", "developer"),
    };

    assert!(!bridge.notify(TAB, update.clone()).await);
    assert_eq!(page.installs(), 0);
    assert_eq!(page.deliveries(), 1);

    let live = Arc::new(profile_page().live());
    assert!(create_test_bridge(live).notify(TAB, update).await);
}
