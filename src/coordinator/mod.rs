//! The long-lived router. It owns the only receiver of the message bus and
//! answers every envelope exactly once.

pub mod lifecycle;

pub use lifecycle::InstallReason;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::providers::{MessageGenerator, PromptOptions};
use crate::storage::SettingsStore;
use crate::types::settings::{
    KEY_STATISTICS, STAT_LAST_ACTIVITY, STAT_LAST_GENERATED, STAT_MESSAGES_GENERATED,
};
use crate::types::{
    Preferences, ProfileRecord, Request, Response, SettingsDocument, TabId, UserContext,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One request on the bus. `target` names the page the sender is looking at,
/// for actions the coordinator relays to an agent.
pub struct Envelope {
    pub request: Request,
    pub target: Option<TabId>,
    pub reply: oneshot::Sender<Response>,
}

pub struct Coordinator {
    store: Arc<dyn SettingsStore>,
    generator: Arc<dyn MessageGenerator>,
    relay: Option<Arc<Bridge>>,
    // Serializes read-modify-write of the statistics section.
    stats_lock: Mutex<()>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn SettingsStore>, generator: Arc<dyn MessageGenerator>) -> Self {
        Self {
            store,
            generator,
            relay: None,
            stats_lock: Mutex::new(()),
        }
    }

    pub fn with_relay(mut self, bridge: Arc<Bridge>) -> Self {
        self.relay = Some(bridge);
        self
    }

    pub fn store(&self) -> &Arc<dyn SettingsStore> {
        &self.store
    }

    /// Start the receive loop on its own task.
    pub fn spawn(self, buffer: usize) -> (CoordinatorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(buffer);
        let task = tokio::spawn(Arc::new(self).run(receiver));
        (CoordinatorHandle::new(sender), task)
    }

    pub async fn run(self: Arc<Self>, mut receiver: mpsc::Receiver<Envelope>) {
        log::info!("Coordinator listening");
        while let Some(envelope) = receiver.recv().await {
            let coordinator = self.clone();
            tokio::spawn(async move {
                let action = envelope.request.action();
                let response = coordinator
                    .dispatch(envelope.request, envelope.target)
                    .await;
                if envelope.reply.send(response).is_err() {
                    log::debug!("Sender of {} went away before the reply", action);
                }
            });
        }
        log::info!("Message bus closed, coordinator stopping");
    }

    pub async fn dispatch(&self, request: Request, target: Option<TabId>) -> Response {
        log::debug!("Dispatching {}", request.action());
        match request {
            Request::Ping => Response::Pong { ready: true },
            Request::GenerateMessage { profile_data } => {
                match self.generate(&profile_data).await {
                    Ok(message) => Response::Message(message),
                    Err(e) => {
                        log::warn!("Message generation failed: {}", e);
                        Response::failure(e.to_string())
                    }
                }
            }
            Request::GetSettings { keys } => match self.store.get(keys.as_deref()).await {
                Ok(data) => Response::Settings(data),
                Err(e) => Response::failure(Error::from(e).to_string()),
            },
            Request::SaveSettings { data } => match self.store.merge(data).await {
                Ok(_) => Response::Ack,
                Err(e) => Response::failure(Error::from(e).to_string()),
            },
            Request::LogActivity { activity, details } => {
                match &details {
                    Some(details) => log::info!("Activity: {} {}", activity, details),
                    None => log::info!("Activity: {}", activity),
                }
                if let Err(e) = self
                    .touch_statistics(|section| {
                        section.insert(STAT_LAST_ACTIVITY.to_string(), timestamp(Utc::now()));
                    })
                    .await
                {
                    log::warn!("Could not record activity: {}", e);
                }
                Response::Ack
            }
            Request::GetProfileData => self.relay_to_page(Request::GetProfileData, target).await,
            request @ (Request::SettingsUpdated { .. } | Request::ShowGenerateButton) => {
                match (&self.relay, target) {
                    (Some(bridge), Some(tab)) => {
                        bridge.notify(tab, request).await;
                    }
                    _ => log::debug!("No page to forward {} to", request.action()),
                }
                Response::Ack
            }
        }
    }

    async fn generate(&self, profile: &ProfileRecord) -> Result<String> {
        let document = self.store.load().await?;
        let context = UserContext::from_document(&document);
        if !context.is_complete() {
            return Err(Error::ConfigMissing(
                "describe yourself in the settings before generating".to_string(),
            ));
        }
        let options = PromptOptions::from(&Preferences::from_document(&document));

        let message = self.generator.generate(profile, &context, &options).await?;

        if let Err(e) = self
            .touch_statistics(|section| {
                increment_messages_generated(section);
                section.insert(STAT_LAST_GENERATED.to_string(), timestamp(Utc::now()));
            })
            .await
        {
            log::warn!("Could not update statistics: {}", e);
        }
        Ok(message)
    }

    async fn relay_to_page(&self, request: Request, target: Option<TabId>) -> Response {
        let Some(bridge) = &self.relay else {
            return Response::failure("No page relay is configured");
        };
        let Some(tab) = target else {
            return Response::failure("No target page for the request");
        };
        match bridge.deliver(tab, request).await {
            Ok(response) => response,
            Err(e) => Response::failure(e.to_string()),
        }
    }

    /// Edit the `statistics` section in place. Keys the update does not
    /// touch, including ones this version does not know, are written back
    /// unchanged.
    async fn touch_statistics<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Value>) + Send,
    {
        let _guard = self.stats_lock.lock().await;
        let document = self.store.load().await?;
        let mut section = match document.get(KEY_STATISTICS) {
            Some(Value::Object(section)) => section.clone(),
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                log::warn!("Leaving malformed statistics section alone: {}", other);
                return Ok(());
            }
        };
        update(&mut section);

        let mut patch = SettingsDocument::new();
        patch.insert(KEY_STATISTICS.to_string(), Value::Object(section));
        self.store.merge(patch).await?;
        Ok(())
    }
}

fn timestamp(now: DateTime<Utc>) -> Value {
    Value::String(now.to_rfc3339())
}

fn increment_messages_generated(section: &mut Map<String, Value>) {
    let next = match section.get(STAT_MESSAGES_GENERATED) {
        None | Some(Value::Null) => 1,
        Some(current) => match current.as_u64() {
            Some(count) => count + 1,
            None => {
                log::warn!("Not counting: messagesGenerated is {}", current);
                return;
            }
        },
    };
    section.insert(STAT_MESSAGES_GENERATED.to_string(), Value::from(next));
}

/// Cloneable sending side of the bus.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<Envelope>,
    timeout: Duration,
}

impl CoordinatorHandle {
    pub fn new(sender: mpsc::Sender<Envelope>) -> Self {
        Self {
            sender,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn send(&self, request: Request) -> Result<Response> {
        self.send_to(request, None).await
    }

    pub async fn send_to(&self, request: Request, target: Option<TabId>) -> Result<Response> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(Envelope {
                request,
                target,
                reply,
            })
            .await
            .map_err(|_| Error::ChannelUnavailable("coordinator is not running".to_string()))?;

        match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(Error::ChannelUnavailable(
                "coordinator dropped the request".to_string(),
            )),
            Err(_) => Err(Error::ChannelUnavailable(
                "timed out waiting for the coordinator".to_string(),
            )),
        }
    }

    /// Answer a raw JSON message the way the bus does.
    pub async fn handle_wire(&self, message: Value, target: Option<TabId>) -> Value {
        let Some(request) = Request::from_wire(message) else {
            return Response::unknown_action().to_wire();
        };
        match self.send_to(request, target).await {
            Ok(response) => response.to_wire(),
            Err(e) => Response::failure(e.to_string()).to_wire(),
        }
    }
}
