//! Request delivery from the UI surface to the agent attached to a page.
//!
//! Each logical request runs its own probe-then-deliver cycle:
//!
//! 1. resolve the target page and reject anything outside the expected host
//!    without touching the page;
//! 2. send a liveness probe with a short bounded wait;
//! 3. if nobody answers, install an agent once and wait for it to settle;
//! 4. deliver the request exactly once.
//!
//! A failed cycle is reported to the caller as [`Error::ChannelUnavailable`]
//! rather than retried. Concurrent calls are not coalesced; two overlapping
//! calls may both install, which the host treats as a no-op the second time.

pub mod channel;
pub mod state_machine;

pub use channel::{ChannelError, TabChannel};
pub use state_machine::{BridgeEvent, BridgeState, BridgeStateMachine};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::types::{Request, Response, TabId};

pub const DEFAULT_EXPECTED_HOST: &str = "linkedin.com";

/// How to wait for a freshly installed agent before delivering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStrategy {
    /// Sleep once for a flat delay.
    FixedDelay(Duration),
    /// Poll with liveness probes, doubling the gap from `initial`, until the
    /// agent acknowledges or `max_wait` has elapsed.
    Handshake { initial: Duration, max_wait: Duration },
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub probe_timeout: Duration,
    pub delivery_timeout: Duration,
    pub settle: SettleStrategy,
    /// Host the target page must belong to. Empty accepts any host.
    pub expected_host: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(1000),
            delivery_timeout: Duration::from_secs(10),
            settle: SettleStrategy::Handshake {
                initial: Duration::from_millis(100),
                max_wait: Duration::from_millis(1500),
            },
            expected_host: DEFAULT_EXPECTED_HOST.to_string(),
        }
    }
}

/// Record of one delivery cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub state: BridgeState,
    pub visited: Vec<BridgeState>,
    pub probes: u32,
    pub installs: u32,
    pub settle_polls: u32,
    pub deliveries: u32,
}

impl Delivery {
    fn new() -> Self {
        Self {
            state: BridgeState::Idle,
            visited: vec![BridgeState::Idle],
            probes: 0,
            installs: 0,
            settle_polls: 0,
            deliveries: 0,
        }
    }

    fn advance(&mut self, event: BridgeEvent) -> Result<()> {
        let next = BridgeStateMachine::transition(self.state, event)
            .map_err(|e| Error::Protocol(e.to_string()))?;
        log::debug!(
            "bridge {} -> {} on {:?}",
            self.state.as_str(),
            next.as_str(),
            event
        );
        self.state = next;
        self.visited.push(next);
        Ok(())
    }

    /// Probes plus the delivery itself.
    pub fn attempts(&self) -> u32 {
        self.probes + self.deliveries
    }
}

pub struct Bridge {
    channel: Arc<dyn TabChannel>,
    config: BridgeConfig,
}

impl Bridge {
    pub fn new(channel: Arc<dyn TabChannel>, config: BridgeConfig) -> Self {
        Self { channel, config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub async fn deliver(&self, tab: TabId, request: Request) -> Result<Response> {
        self.deliver_traced(tab, request).await.0
    }

    /// Like [`Bridge::deliver`], also returning the cycle record.
    pub async fn deliver_traced(&self, tab: TabId, request: Request) -> (Result<Response>, Delivery) {
        let mut delivery = Delivery::new();
        let result = self.run_cycle(tab, request, &mut delivery).await;
        (result, delivery)
    }

    /// Best-effort, at-most-once send with no probing or installation. A
    /// failure is logged and dropped; the receiver can always re-read the
    /// settings store on demand.
    pub async fn notify(&self, tab: TabId, request: Request) -> bool {
        let action = request.action();
        match self.send_once(tab, request, self.config.probe_timeout).await {
            Ok(response) if response.is_success() => {
                log::debug!("Delivered {} to page {}", action, tab);
                true
            }
            Ok(response) => {
                log::warn!("Page {} refused {}: {:?}", tab, action, response);
                false
            }
            Err(e) => {
                log::warn!("Dropped {} notification for page {}: {}", action, tab, e);
                false
            }
        }
    }

    /// Whether a live agent acknowledges in the page within the probe window.
    pub async fn probe(&self, tab: TabId) -> bool {
        match self.send_once(tab, Request::Ping, self.config.probe_timeout).await {
            Ok(response) => response.is_ready(),
            Err(_) => false,
        }
    }

    async fn run_cycle(
        &self,
        tab: TabId,
        request: Request,
        delivery: &mut Delivery,
    ) -> Result<Response> {
        let action = request.action();

        if let Err(e) = self.check_address(tab).await {
            delivery.advance(BridgeEvent::AddressingFailed)?;
            return Err(e);
        }

        delivery.advance(BridgeEvent::ProbeSent)?;
        delivery.probes += 1;
        if self.probe(tab).await {
            delivery.advance(BridgeEvent::ProbeAcknowledged)?;
            delivery.advance(BridgeEvent::DeliverySent)?;
        } else {
            delivery.advance(BridgeEvent::ProbeFailed)?;
            log::info!("No live agent in page {}, installing", tab);

            delivery.installs += 1;
            if let Err(e) = self.channel.install_agent(tab).await {
                delivery.advance(BridgeEvent::InstallFailed)?;
                log::warn!("Agent installation into page {} failed: {}", tab, e);
                return Err(Error::ChannelUnavailable(e.to_string()));
            }

            if !self.settle(tab, delivery).await {
                log::warn!(
                    "Agent in page {} did not acknowledge within the settle window",
                    tab
                );
            }
            delivery.advance(BridgeEvent::Settled)?;
        }

        delivery.deliveries += 1;
        match self
            .send_once(tab, request, self.config.delivery_timeout)
            .await
        {
            Ok(response) => {
                delivery.advance(BridgeEvent::ResponseReceived)?;
                Ok(response)
            }
            Err(e) => {
                delivery.advance(BridgeEvent::DeliveryRejected)?;
                log::warn!("Delivery of {} to page {} failed: {}", action, tab, e);
                Err(Error::ChannelUnavailable(e.to_string()))
            }
        }
    }

    async fn check_address(&self, tab: TabId) -> Result<()> {
        let url = self.channel.tab_url(tab).await.map_err(|e| match e {
            ChannelError::NoSuchTab(id) => Error::TargetNotFound(id),
            other => Error::ChannelUnavailable(other.to_string()),
        })?;

        if self.is_expected_host(&url) {
            Ok(())
        } else {
            log::debug!("Page {} is outside {}: {}", tab, self.config.expected_host, url);
            Err(Error::NotAProfilePage)
        }
    }

    fn is_expected_host(&self, url: &str) -> bool {
        let expected = self.config.expected_host.as_str();
        if expected.is_empty() {
            return true;
        }
        url::Url::parse(url)
            .ok()
            .and_then(|parsed| {
                parsed
                    .host_str()
                    .map(|host| host == expected || host.ends_with(&format!(".{}", expected)))
            })
            .unwrap_or(false)
    }

    /// Returns whether the new agent acknowledged. Never installs again.
    async fn settle(&self, tab: TabId, delivery: &mut Delivery) -> bool {
        match self.config.settle {
            SettleStrategy::FixedDelay(delay) => {
                tokio::time::sleep(delay).await;
                true
            }
            SettleStrategy::Handshake { initial, max_wait } => {
                let deadline = Instant::now() + max_wait;
                let mut wait = initial;
                loop {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    tokio::time::sleep(wait.min(deadline - now)).await;
                    delivery.settle_polls += 1;
                    if self.probe(tab).await {
                        return true;
                    }
                    wait = wait.saturating_mul(2);
                }
            }
        }
    }

    async fn send_once(
        &self,
        tab: TabId,
        request: Request,
        timeout: Duration,
    ) -> std::result::Result<Response, ChannelError> {
        match tokio::time::timeout(timeout, self.channel.send(tab, request)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout),
        }
    }
}
