//! OS permission gate.
//!
//! Capabilities are re-checked on every launch; nothing here persists
//! across restarts. A denial is a terminal state surfaced to the user
//! with an explanation, not an error, and the gate never retries on
//! its own — only on an explicit user re-request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// A discrete OS-mediated permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ReadSms,
    ReceiveSms,
    ReadContacts,
    /// Display over other apps. Granting requires a settings-app round
    /// trip with no synchronous completion signal.
    Overlay,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::ReadSms,
        Capability::ReceiveSms,
        Capability::ReadContacts,
        Capability::Overlay,
    ];

    /// Capabilities needed before ingestion or triage may run.
    pub const SMS: [Capability; 2] = [Capability::ReadSms, Capability::ReceiveSms];

    /// Whether granting goes through the settings app, so the result
    /// of `request` cannot be trusted and state must be re-checked.
    pub fn needs_settings_round_trip(self) -> bool {
        matches!(self, Capability::Overlay)
    }

    pub fn label(self) -> &'static str {
        match self {
            Capability::ReadSms => "SMS access",
            Capability::ReceiveSms => "incoming SMS access",
            Capability::ReadContacts => "contacts access",
            Capability::Overlay => "display over other apps",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

/// Snapshot of every capability's status at a point in time.
#[derive(Debug, Clone, Default)]
pub struct PermissionState {
    statuses: HashMap<Capability, PermissionStatus>,
}

impl PermissionState {
    pub fn status(&self, cap: Capability) -> PermissionStatus {
        self.statuses.get(&cap).copied().unwrap_or_default()
    }

    pub fn granted(&self, cap: Capability) -> bool {
        self.status(cap).is_granted()
    }

    pub fn set(&mut self, cap: Capability, status: PermissionStatus) {
        self.statuses.insert(cap, status);
    }

    pub fn all_granted(&self) -> bool {
        Capability::ALL.iter().all(|&cap| self.granted(cap))
    }

    /// Capabilities still needed before ingestion and triage may run.
    pub fn missing_for_sms(&self) -> Vec<Capability> {
        Capability::SMS
            .iter()
            .copied()
            .filter(|&cap| !self.granted(cap))
            .collect()
    }
}

/// Platform permission broker.
///
/// `request` may suspend pending user interaction, including
/// backgrounding to the system settings for round-trip capabilities.
/// It must never move a capability from Denied to Granted without an
/// intervening user action.
#[async_trait]
pub trait PermissionBroker: Send + Sync {
    /// Non-mutating status query.
    async fn check(&self, cap: Capability) -> PermissionStatus;

    /// Trigger the platform prompt for a capability.
    async fn request(&self, cap: Capability) -> PermissionStatus;
}

/// Broker for platforms without the underlying capability model:
/// everything is pre-granted.
pub struct PreGranted;

#[async_trait]
impl PermissionBroker for PreGranted {
    async fn check(&self, _cap: Capability) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request(&self, _cap: Capability) -> PermissionStatus {
        PermissionStatus::Granted
    }
}

/// Readiness gate over a platform broker.
pub struct PermissionGate {
    broker: Box<dyn PermissionBroker>,
}

impl PermissionGate {
    pub fn new(broker: Box<dyn PermissionBroker>) -> Self {
        Self { broker }
    }

    /// Query every capability without prompting.
    pub async fn check_all(&self) -> PermissionState {
        let mut state = PermissionState::default();
        for cap in Capability::ALL {
            state.set(cap, self.broker.check(cap).await);
        }
        debug!(?state, "permission check");
        state
    }

    /// Request a capability on explicit user action.
    ///
    /// For settings round-trip capabilities the request's return value
    /// is not trusted; state is re-checked on return.
    pub async fn request(&self, cap: Capability) -> PermissionStatus {
        let result = self.broker.request(cap).await;
        let status = if cap.needs_settings_round_trip() {
            self.broker.check(cap).await
        } else {
            result
        };
        info!(%cap, ?status, "permission request resolved");
        status
    }

    /// Whether SMS ingestion and triage are allowed to run.
    pub async fn sms_ready(&self) -> bool {
        self.check_all().await.missing_for_sms().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pre_granted_platform_is_always_ready() {
        let gate = PermissionGate::new(Box::new(PreGranted));
        assert!(gate.check_all().await.all_granted());
        assert!(gate.sms_ready().await);
    }

    #[test]
    fn unknown_is_the_initial_status() {
        let state = PermissionState::default();
        assert_eq!(state.status(Capability::ReadSms), PermissionStatus::Unknown);
        assert!(!state.granted(Capability::ReadSms));
        assert_eq!(state.missing_for_sms().len(), 2);
    }
}
