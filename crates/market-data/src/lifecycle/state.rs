//! Per-broker credential state machine.
//!
//! ```text
//! Uninitialized -> Initializing -> Healthy <-> Unhealthy -> Rotating -> Healthy
//!                       |             |                        ^   |
//!                       |             +------------------------+   |
//!                       +--------------> Failed <------------------+
//! ```
//!
//! `Failed` is never terminal: the next health cycle probes again and rotates if the
//! probe still fails.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Credential state of one broker.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerState {
    Uninitialized,
    Initializing,
    Healthy,
    /// Last probe failed; rotation pending.
    Unhealthy,
    Rotating,
    /// Initialization or rotation failed; retried next cycle.
    Failed,
}

impl BrokerState {
    /// Whether the machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: BrokerState) -> bool {
        use BrokerState::*;

        matches!(
            (self, next),
            (Uninitialized, Initializing)
                | (Initializing, Healthy)
                | (Initializing, Failed)
                | (Healthy, Healthy)
                | (Healthy, Unhealthy)
                | (Healthy, Rotating)
                | (Unhealthy, Healthy)
                | (Unhealthy, Rotating)
                | (Rotating, Healthy)
                | (Rotating, Failed)
                | (Failed, Healthy)
                | (Failed, Unhealthy)
                | (Failed, Rotating)
                | (Failed, Initializing)
        )
    }

    pub fn is_healthy(self) -> bool {
        self == BrokerState::Healthy
    }
}

impl std::fmt::Display for BrokerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "Uninitialized",
            Self::Initializing => "Initializing",
            Self::Healthy => "Healthy",
            Self::Unhealthy => "Unhealthy",
            Self::Rotating => "Rotating",
            Self::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// Observable status of one broker.
#[derive(Clone, Debug, Serialize)]
pub struct BrokerStatus {
    pub broker_type: &'static str,
    pub state: BrokerState,
    /// When the current state was entered.
    pub since: DateTime<Utc>,
    /// Last completed health probe.
    pub last_checked: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Successful credential rotations since start.
    pub rotations: u64,
}

impl BrokerStatus {
    pub fn new(broker_type: &'static str) -> Self {
        Self {
            broker_type,
            state: BrokerState::Uninitialized,
            since: Utc::now(),
            last_checked: None,
            last_error: None,
            rotations: 0,
        }
    }

    /// Moves to `next`. Returns `false` (and stays put) when the move is not allowed.
    pub fn transition(&mut self, next: BrokerState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        if self.state != next {
            self.since = Utc::now();
        }
        self.state = next;
        if next.is_healthy() {
            self.last_error = None;
        }
        true
    }

    pub fn record_error(&mut self, error: impl ToString) {
        self.last_error = Some(error.to_string());
    }
}
