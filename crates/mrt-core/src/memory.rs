//! In-memory implementations of the external boundaries.
//!
//! These back the test suite and the CLI's demo paths. They model the
//! external collaborators faithfully enough to exercise the core:
//! user-action-driven permission grants, a single live SMS
//! subscription, server-assigned report timestamps, and an identity
//! provider that signals session changes over a watch channel.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{watch, Mutex};

use crate::capability::{Capability, PermissionBroker, PermissionStatus};
use crate::contacts::{Contact, ContactsSource};
use crate::error::{MrtError, Result};
use crate::ingest::{LiveFeed, SmsEvents, SmsStore, SmsSubscription};
use crate::message::{Mailbox, Message, SmsQuery};
use crate::notify::{Notifier, SmishingAlert};
use crate::report::{BlockedContact, ContactBlocklist, Report, ReportDraft, ReportStore};
use crate::session::{
    AuthProvider, Credentials, ProfileStore, Registration, UserId, UserProfile,
};

/// Permission broker whose outcomes are driven by queued user
/// decisions. Without a queued decision a request resolves the way a
/// dismissed prompt would: Unknown becomes Denied, everything else
/// keeps its status. Denied therefore never flips to Granted without
/// a prior [`ManualBroker::user_will`] call.
pub struct ManualBroker {
    state: Mutex<HashMap<Capability, PermissionStatus>>,
    queued: Mutex<HashMap<Capability, PermissionStatus>>,
}

impl ManualBroker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            queued: Mutex::new(HashMap::new()),
        }
    }

    /// Queue the user's decision for the next prompt on `cap`. This is
    /// the "user action event" that can move a capability out of
    /// Denied.
    pub async fn user_will(&self, cap: Capability, status: PermissionStatus) {
        self.queued.lock().await.insert(cap, status);
    }
}

impl Default for ManualBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionBroker for ManualBroker {
    async fn check(&self, cap: Capability) -> PermissionStatus {
        self.state
            .lock()
            .await
            .get(&cap)
            .copied()
            .unwrap_or_default()
    }

    async fn request(&self, cap: Capability) -> PermissionStatus {
        let mut state = self.state.lock().await;
        let current = state.get(&cap).copied().unwrap_or_default();
        let resolved = match self.queued.lock().await.remove(&cap) {
            Some(decision) => decision,
            None if current == PermissionStatus::Unknown => PermissionStatus::Denied,
            None => current,
        };
        state.insert(cap, resolved);
        resolved
    }
}

/// In-memory device SMS store with a live feed.
pub struct MemorySmsStore {
    messages: Mutex<Vec<(Mailbox, Message)>>,
    feed: LiveFeed,
}

impl MemorySmsStore {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            feed: LiveFeed::new(),
        }
    }

    /// Seed a historical message without live delivery.
    pub async fn seed(&self, mailbox: Mailbox, message: Message) {
        self.messages.lock().await.push((mailbox, message));
    }

    /// Simulate an arriving SMS: lands in the inbox and is pushed to
    /// the active live subscription, if any.
    pub async fn deliver(&self, message: Message) -> bool {
        self.messages
            .lock()
            .await
            .push((Mailbox::Inbox, message.clone()));
        self.feed.publish(message).await
    }
}

impl Default for MemorySmsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsStore for MemorySmsStore {
    async fn list(&self, query: &SmsQuery) -> Result<Vec<Message>> {
        let messages = self.messages.lock().await;
        let mut matching: Vec<Message> = messages
            .iter()
            .filter(|(mailbox, msg)| *mailbox == query.mailbox && query.in_window(msg.date))
            .map(|(_, msg)| msg.clone())
            .collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date));
        matching.truncate(query.max_count);
        Ok(matching)
    }
}

#[async_trait]
impl SmsEvents for MemorySmsStore {
    async fn subscribe(&self) -> SmsSubscription {
        self.feed.subscribe().await
    }
}

/// Report store assigning server timestamps on write.
pub struct MemoryReportStore {
    reports: Mutex<Vec<Report>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
        }
    }

    pub async fn all(&self) -> Vec<Report> {
        self.reports.lock().await.clone()
    }
}

impl Default for MemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn submit(&self, draft: ReportDraft) -> Result<Report> {
        let report = Report {
            number: draft.number,
            reason: draft.reason,
            reported_by: draft.reported_by,
            body: draft.body,
            reported_at: Utc::now(),
        };
        self.reports.lock().await.push(report.clone());
        Ok(report)
    }

    async fn list_by_reporter(&self, user: &UserId) -> Result<Vec<Report>> {
        Ok(self
            .reports
            .lock()
            .await
            .iter()
            .filter(|r| &r.reported_by == user)
            .cloned()
            .collect())
    }
}

/// Report store that always fails, for exercising the retry path.
pub struct FailingReportStore;

#[async_trait]
impl ReportStore for FailingReportStore {
    async fn submit(&self, _draft: ReportDraft) -> Result<Report> {
        Err(MrtError::ReportStore("store unavailable".into()))
    }

    async fn list_by_reporter(&self, _user: &UserId) -> Result<Vec<Report>> {
        Err(MrtError::ReportStore("store unavailable".into()))
    }
}

struct UserRecord {
    user_id: UserId,
    password: String,
    profile: UserProfile,
}

/// Identity provider with email/password accounts and watch-channel
/// session signaling.
pub struct MemoryAuthProvider {
    users: Mutex<HashMap<String, UserRecord>>,
    next_id: AtomicU64,
    session_tx: watch::Sender<Option<UserId>>,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            users: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            session_tx,
        }
    }
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_up(&self, registration: &Registration) -> Result<UserId> {
        registration.validate()?;
        let mut users = self.users.lock().await;
        if users.contains_key(&registration.email) {
            return Err(MrtError::Auth("Email is already registered".into()));
        }
        let user_id = format!("u{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        users.insert(
            registration.email.clone(),
            UserRecord {
                user_id: user_id.clone(),
                password: registration.password.clone(),
                profile: UserProfile {
                    username: registration.username.clone(),
                    phone_number: registration.phone_number.clone(),
                    email: registration.email.clone(),
                    role: "client".to_string(),
                    created_at: Utc::now(),
                },
            },
        );
        Ok(user_id)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<UserId> {
        credentials.validate()?;
        let users = self.users.lock().await;
        let record = users
            .get(&credentials.email)
            .filter(|r| r.password == credentials.password)
            .ok_or_else(|| MrtError::Auth("Invalid email or password".into()))?;
        self.session_tx.send(Some(record.user_id.clone())).ok();
        Ok(record.user_id.clone())
    }

    async fn sign_out(&self) -> Result<()> {
        self.session_tx.send(None).ok();
        Ok(())
    }

    fn watch(&self) -> watch::Receiver<Option<UserId>> {
        self.session_tx.subscribe()
    }
}

#[async_trait]
impl ProfileStore for MemoryAuthProvider {
    async fn profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|r| &r.user_id == user)
            .map(|r| r.profile.clone()))
    }
}

/// Notifier that records every posted alert and counts channel inits.
pub struct RecordingNotifier {
    posted: Mutex<Vec<SmishingAlert>>,
    channel_inits: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            posted: Mutex::new(Vec::new()),
            channel_inits: AtomicUsize::new(0),
        }
    }

    pub async fn posted(&self) -> Vec<SmishingAlert> {
        self.posted.lock().await.clone()
    }

    pub fn channel_inits(&self) -> usize {
        self.channel_inits.load(Ordering::Relaxed)
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn ensure_channel(&self) -> Result<()> {
        self.channel_inits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn post(&self, alert: &SmishingAlert) -> Result<()> {
        self.posted.lock().await.push(alert.clone());
        Ok(())
    }
}

/// Fixed contact list source.
pub struct MemoryContacts {
    contacts: Vec<Contact>,
}

impl MemoryContacts {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl ContactsSource for MemoryContacts {
    async fn all(&self) -> Result<Vec<Contact>> {
        Ok(self.contacts.clone())
    }
}

/// Per-user blocklist map.
pub struct MemoryBlocklist {
    entries: Mutex<HashMap<UserId, Vec<BlockedContact>>>,
}

impl MemoryBlocklist {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBlocklist {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContactBlocklist for MemoryBlocklist {
    async fn list(&self, user: &UserId) -> Result<Vec<BlockedContact>> {
        Ok(self
            .entries
            .lock()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    async fn block(&self, user: &UserId, contact: BlockedContact) -> Result<()> {
        self.entries
            .lock()
            .await
            .entry(user.clone())
            .or_default()
            .push(contact);
        Ok(())
    }

    async fn remove(&self, user: &UserId, id: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let list = entries
            .get_mut(user)
            .ok_or_else(|| MrtError::ReportStore("No blocklist for user".into()))?;
        let before = list.len();
        list.retain(|c| c.id != id);
        if list.len() == before {
            return Err(MrtError::ReportStore(format!(
                "No blocked contact with id {id}"
            )));
        }
        Ok(())
    }
}
