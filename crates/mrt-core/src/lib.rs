//! Mobile Risk Trainer core
//!
//! Smishing-awareness engine: gates on OS capabilities, ingests device
//! SMS, flags URL-bearing messages, and routes flagged senders into a
//! user-driven reporting workflow backed by a shared collection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ Permission Gate  │  ← OS capability checks / prompts
//! └────────┬─────────┘
//!          │ granted
//!          ▼
//! ┌──────────────────┐
//! │  SMS Ingestion   │  ← historical listing + live subscription
//! └────────┬─────────┘
//!          │ one message at a time
//!          ▼
//! ┌──────────────────┐
//! │   URL Triage     │  ← whitespace-strip + pattern test
//! └────────┬─────────┘
//!          │ flagged
//!          ▼
//! ┌──────────────────┐
//! │  Notification    │  ← "Report" affordance, payload round trip
//! └────────┬─────────┘
//!          │ user taps
//!          ▼
//! ┌──────────────────┐
//! │ Report Workflow  │  ← reason choice, single store write
//! └──────────────────┘
//! ```
//!
//! Authentication, persistence, and push delivery are delegated to
//! external collaborators behind traits; this crate only reacts to
//! their state transitions.

pub mod capability;
pub mod config;
pub mod contacts;
pub mod error;
pub mod ingest;
pub mod memory;
pub mod message;
pub mod notify;
pub mod report;
pub mod router;
pub mod session;
pub mod triage;

// Re-exports
pub use capability::{Capability, PermissionBroker, PermissionGate, PermissionState, PermissionStatus};
pub use config::TrainerConfig;
pub use error::{MrtError, Result};
pub use ingest::{SmsEvents, SmsStore, SmsSubscription};
pub use message::{ConversationGroup, ConversationSummary, Mailbox, Message, SmsQuery};
pub use notify::{Notifier, SmishingAlert};
pub use report::{Report, ReportReason, ReportStore, ReportWorkflow};
pub use router::{AppRoute, Screen};
pub use session::{AuthProvider, SessionWatcher, UserId};

use tracing::{debug, error, info};

/// Drives the live triage loop: one message at a time, in arrival
/// order, each processed to completion before the next is accepted.
pub struct TriageCoordinator {
    subscription: SmsSubscription,
    notifier: Box<dyn Notifier>,
    notify_on_match: bool,
}

impl TriageCoordinator {
    /// Gate on SMS capabilities, create the notification channel once,
    /// and take over the live subscription.
    pub async fn new(
        gate: &PermissionGate,
        events: &dyn SmsEvents,
        notifier: Box<dyn Notifier>,
        config: &TrainerConfig,
    ) -> Result<Self> {
        let state = gate.check_all().await;
        let missing = state.missing_for_sms();
        if !missing.is_empty() {
            let labels: Vec<&str> = missing.iter().map(|c| c.label()).collect();
            return Err(MrtError::Permission(format!(
                "Grant {} to monitor incoming messages",
                labels.join(" and ")
            )));
        }

        // Channel creation is idempotent and happens exactly once
        // here, never per message.
        notifier.ensure_channel().await?;

        let subscription = events.subscribe().await;
        Ok(Self {
            subscription,
            notifier,
            notify_on_match: config.notify.notify_on_match,
        })
    }

    /// Run until the subscription ends. A failure on one message is
    /// logged and does not stop the loop.
    pub async fn run(mut self) -> Result<()> {
        info!("smishing triage started");
        while let Some(message) = self.subscription.recv().await {
            if let Err(e) = self.handle(&message).await {
                error!("error handling message from {}: {e}", message.address);
            }
        }
        info!("smishing triage stopped: subscription ended");
        Ok(())
    }

    /// Triage a single message; exactly one notification per positive.
    async fn handle(&self, message: &Message) -> Result<()> {
        if !triage::contains_url(&message.body) {
            debug!(sender = %message.address, "message clean");
            return Ok(());
        }

        info!(sender = %message.address, "URL detected in incoming message");
        if self.notify_on_match {
            self.notifier
                .post(&SmishingAlert::from_message(message))
                .await?;
        }
        Ok(())
    }
}
