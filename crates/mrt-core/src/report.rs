//! Reporting workflow and the shared report collection boundary.
//!
//! A report is written once and never mutated or deleted. The
//! locally-scoped blocklist is a different record type and is the only
//! deletable one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

use crate::error::{MrtError, Result};
use crate::session::UserId;

/// Why a sender is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportReason {
    Fraud,
    Spam,
    Threat,
    Unknown,
}

impl ReportReason {
    pub const ALL: [ReportReason; 4] = [
        ReportReason::Fraud,
        ReportReason::Spam,
        ReportReason::Threat,
        ReportReason::Unknown,
    ];
}

impl std::fmt::Display for ReportReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReportReason::Fraud => "Fraud",
            ReportReason::Spam => "Spam",
            ReportReason::Threat => "Threat",
            ReportReason::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for ReportReason {
    type Err = MrtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fraud" => Ok(ReportReason::Fraud),
            "spam" => Ok(ReportReason::Spam),
            "threat" => Ok(ReportReason::Threat),
            "unknown" => Ok(ReportReason::Unknown),
            other => Err(MrtError::InvalidInput(format!(
                "Unknown report reason: {other}"
            ))),
        }
    }
}

/// A submitted report as persisted in the shared collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub number: String,
    pub reason: ReportReason,
    pub reported_by: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Server-assigned submission timestamp.
    pub reported_at: DateTime<Utc>,
}

/// Everything the store needs to persist one report. The timestamp is
/// assigned server-side, never by the caller.
#[derive(Debug, Clone)]
pub struct ReportDraft {
    pub number: String,
    pub reason: ReportReason,
    pub reported_by: UserId,
    pub body: Option<String>,
}

/// Shared report collection boundary. Writes are atomic per call;
/// reads filter by exact-match equality only.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn submit(&self, draft: ReportDraft) -> Result<Report>;

    async fn list_by_reporter(&self, user: &UserId) -> Result<Vec<Report>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    ReasonChosen(ReportReason),
    Submitted,
}

/// Report submission state machine.
///
/// `{Idle} -[choose]-> {ReasonChosen} -[submit]-> {Submitted}`, where
/// a failed submit stays at ReasonChosen and retry is a fresh
/// user-initiated submit. Entry parameters are set once and never
/// mutated by the workflow.
pub struct ReportWorkflow {
    number: String,
    reported_by: Option<UserId>,
    body: Option<String>,
    state: WorkflowState,
}

impl ReportWorkflow {
    pub fn new(
        number: impl Into<String>,
        reported_by: Option<UserId>,
        body: Option<String>,
    ) -> Self {
        Self {
            number: number.into(),
            reported_by,
            body,
            state: WorkflowState::Idle,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// Select (or re-select) a reason. Refused once submitted.
    pub fn choose(&mut self, reason: ReportReason) -> Result<()> {
        if self.state == WorkflowState::Submitted {
            return Err(MrtError::InvalidInput(
                "Report has already been submitted".into(),
            ));
        }
        self.state = WorkflowState::ReasonChosen(reason);
        Ok(())
    }

    /// Guard condition for the submission control.
    pub fn can_submit(&self) -> bool {
        matches!(self.state, WorkflowState::ReasonChosen(_)) && self.reported_by.is_some()
    }

    /// Construct the report and persist it, exactly one store write
    /// per call. Refused with no store write when no reason is chosen,
    /// no user is signed in, or the workflow already completed.
    pub async fn submit(&mut self, store: &dyn ReportStore) -> Result<Report> {
        let reason = match self.state {
            WorkflowState::ReasonChosen(reason) => reason,
            WorkflowState::Idle => {
                return Err(MrtError::InvalidInput(
                    "Select a reason before submitting".into(),
                ))
            }
            WorkflowState::Submitted => {
                return Err(MrtError::InvalidInput(
                    "Report has already been submitted".into(),
                ))
            }
        };
        let reported_by = self
            .reported_by
            .clone()
            .ok_or_else(|| MrtError::Auth("Sign in before reporting a number".into()))?;

        let draft = ReportDraft {
            number: self.number.clone(),
            reason,
            reported_by,
            body: self.body.clone(),
        };

        // On store failure the state stays ReasonChosen; retry is a
        // fresh user-initiated submit.
        let report = store.submit(draft).await?;
        self.state = WorkflowState::Submitted;
        info!(number = %report.number, reason = %report.reason, "sender reported");
        Ok(report)
    }
}

/// A locally-scoped blocked contact. Unlike reports these can be
/// removed again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedContact {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub reason: String,
}

/// Per-user blocklist boundary.
#[async_trait]
pub trait ContactBlocklist: Send + Sync {
    async fn list(&self, user: &UserId) -> Result<Vec<BlockedContact>>;

    async fn block(&self, user: &UserId, contact: BlockedContact) -> Result<()>;

    async fn remove(&self, user: &UserId, id: &str) -> Result<()>;
}

/// Case-insensitive name / substring phone filter, as used by the
/// blocklist search box.
pub fn filter_blocked<'a>(entries: &'a [BlockedContact], query: &str) -> Vec<&'a BlockedContact> {
    let needle = query.to_lowercase();
    entries
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle) || c.phone.contains(query))
        .collect()
}
