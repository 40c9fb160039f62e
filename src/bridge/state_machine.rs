use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeState {
    Idle,
    Probing,
    Ready,
    Installing,
    Delivering,
    Done,
    Failed,
}

impl BridgeState {
    pub fn as_str(&self) -> &str {
        match self {
            BridgeState::Idle => "Idle",
            BridgeState::Probing => "Probing",
            BridgeState::Ready => "Ready",
            BridgeState::Installing => "Installing",
            BridgeState::Delivering => "Delivering",
            BridgeState::Done => "Done",
            BridgeState::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeState::Done | BridgeState::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeEvent {
    ProbeSent,
    ProbeAcknowledged,
    ProbeFailed,
    Settled,
    InstallFailed,
    DeliverySent,
    ResponseReceived,
    DeliveryRejected,
    AddressingFailed,
}

pub struct BridgeStateMachine;

impl BridgeStateMachine {
    pub fn transition(state: BridgeState, event: BridgeEvent) -> Result<BridgeState> {
        let next = match (state, event) {
            (BridgeState::Idle, BridgeEvent::ProbeSent) => BridgeState::Probing,
            (BridgeState::Probing, BridgeEvent::ProbeAcknowledged) => BridgeState::Ready,
            (BridgeState::Probing, BridgeEvent::ProbeFailed) => BridgeState::Installing,
            (BridgeState::Ready, BridgeEvent::DeliverySent) => BridgeState::Delivering,
            (BridgeState::Installing, BridgeEvent::Settled) => BridgeState::Delivering,
            (BridgeState::Installing, BridgeEvent::InstallFailed) => BridgeState::Failed,
            (BridgeState::Delivering, BridgeEvent::ResponseReceived) => BridgeState::Done,
            (BridgeState::Delivering, BridgeEvent::DeliveryRejected) => BridgeState::Failed,

            (s, BridgeEvent::AddressingFailed) if !s.is_terminal() => BridgeState::Failed,

            _ => {
                return Err(anyhow!(
                    "Invalid bridge transition from {:?} with event {:?}",
                    state,
                    event
                ));
            }
        };

        Ok(next)
    }
}
