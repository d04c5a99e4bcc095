//! Local notification boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::message::Message;
use crate::report::ReportWorkflow;
use crate::session::UserId;

/// Default alert title for a flagged message.
pub const ALERT_TITLE: &str = "Suspicious link detected";

/// Payload attached to a posted notification and handed back on user
/// interaction, so the report flow can be entered from the
/// notification itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub sender: String,
    pub body: String,
}

impl AlertPayload {
    /// Enter the reporting workflow from a notification tap. The
    /// payload's sender and body become the workflow's immutable entry
    /// parameters.
    pub fn into_workflow(self, user: Option<UserId>) -> ReportWorkflow {
        ReportWorkflow::new(self.sender, user, Some(self.body))
    }
}

/// One local notification offering to report a flagged sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmishingAlert {
    pub title: String,
    /// The raw message body, shown as the notification text.
    pub body: String,
    pub sender: String,
    /// Body and sender duplicated for retrieval on interaction.
    pub payload: AlertPayload,
}

impl SmishingAlert {
    pub fn from_message(message: &Message) -> Self {
        Self {
            title: ALERT_TITLE.to_string(),
            body: message.body.clone(),
            sender: message.address.clone(),
            payload: AlertPayload {
                sender: message.address.clone(),
                body: message.body.clone(),
            },
        }
    }
}

/// Platform notification boundary.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Create the notification channel. Idempotent; called once at
    /// startup, never per message.
    async fn ensure_channel(&self) -> Result<()>;

    /// Post one notification with a "Report" action affordance.
    async fn post(&self, alert: &SmishingAlert) -> Result<()>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    async fn ensure_channel(&self) -> Result<()> {
        (**self).ensure_channel().await
    }

    async fn post(&self, alert: &SmishingAlert) -> Result<()> {
        (**self).post(alert).await
    }
}

/// Notifier that writes alerts to the log, for headless use.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn ensure_channel(&self) -> Result<()> {
        Ok(())
    }

    async fn post(&self, alert: &SmishingAlert) -> Result<()> {
        info!(sender = %alert.sender, body = %alert.body, "{}", alert.title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::WorkflowState;

    #[test]
    fn alert_duplicates_body_into_payload() {
        let msg = Message::new("1", "12345", "visit http://bit.ly/x", 100);
        let alert = SmishingAlert::from_message(&msg);
        assert_eq!(alert.title, ALERT_TITLE);
        assert_eq!(alert.body, alert.payload.body);
        assert_eq!(alert.sender, alert.payload.sender);
    }

    #[test]
    fn payload_enters_workflow_with_its_parameters() {
        let payload = AlertPayload {
            sender: "12345".into(),
            body: "visit http://bit.ly/x".into(),
        };
        let wf = payload.into_workflow(Some("u1".to_string()));
        assert_eq!(wf.number(), "12345");
        assert_eq!(wf.state(), WorkflowState::Idle);
    }
}
