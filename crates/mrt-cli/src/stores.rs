//! File-backed dev implementations of the external boundaries.
//!
//! Plaintext JSON under the platform config dir, dev-only, mirroring
//! the rest of the product's local dev files. The permission file
//! stands in for the OS grant table: `mrt grant` / `mrt deny` are the
//! user actions that a platform prompt would capture.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use mrt_core::capability::{Capability, PermissionBroker, PermissionStatus};
use mrt_core::error::{MrtError, Result};
use mrt_core::ingest::{SmsEvents, SmsStore, SmsSubscription};
use mrt_core::message::{Mailbox, Message, SmsQuery};
use mrt_core::report::{BlockedContact, ContactBlocklist, Report, ReportDraft, ReportStore};
use mrt_core::session::{
    AuthProvider, Credentials, ProfileStore, Registration, UserId, UserProfile,
};

/// Where the dev files live.
pub fn data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mrt")
}

fn read_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

// ===== Identity =====

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    user_id: UserId,
    password: String,
    profile: UserProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AuthFile {
    users: Vec<StoredUser>,
    session: Option<UserId>,
    next_id: u64,
}

/// Dev plaintext identity provider persisted to `users.json`.
pub struct FileAuthProvider {
    path: PathBuf,
    session_tx: watch::Sender<Option<UserId>>,
}

impl FileAuthProvider {
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join("users.json");
        let file: AuthFile = read_json(&path)?;
        let (session_tx, _) = watch::channel(file.session);
        Ok(Self { path, session_tx })
    }

    fn load(&self) -> Result<AuthFile> {
        read_json(&self.path)
    }

    fn save(&self, file: &AuthFile) -> Result<()> {
        write_json(&self.path, file)
    }

    /// The persisted session from the last `mrt login`.
    pub fn current_session(&self) -> Option<UserId> {
        self.session_tx.borrow().clone()
    }
}

#[async_trait]
impl AuthProvider for FileAuthProvider {
    async fn sign_up(&self, registration: &Registration) -> Result<UserId> {
        registration.validate()?;
        let mut file = self.load()?;
        if file.users.iter().any(|u| u.profile.email == registration.email) {
            return Err(MrtError::Auth("Email is already registered".into()));
        }
        file.next_id += 1;
        let user_id = format!("u{}", file.next_id);
        file.users.push(StoredUser {
            user_id: user_id.clone(),
            password: registration.password.clone(),
            profile: UserProfile {
                username: registration.username.clone(),
                phone_number: registration.phone_number.clone(),
                email: registration.email.clone(),
                role: "client".to_string(),
                created_at: Utc::now(),
            },
        });
        self.save(&file)?;
        Ok(user_id)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<UserId> {
        credentials.validate()?;
        let mut file = self.load()?;
        let user_id = file
            .users
            .iter()
            .find(|u| u.profile.email == credentials.email && u.password == credentials.password)
            .map(|u| u.user_id.clone())
            .ok_or_else(|| MrtError::Auth("Invalid email or password".into()))?;
        file.session = Some(user_id.clone());
        self.save(&file)?;
        self.session_tx.send(Some(user_id.clone())).ok();
        Ok(user_id)
    }

    async fn sign_out(&self) -> Result<()> {
        let mut file = self.load()?;
        file.session = None;
        self.save(&file)?;
        self.session_tx.send(None).ok();
        Ok(())
    }

    fn watch(&self) -> watch::Receiver<Option<UserId>> {
        self.session_tx.subscribe()
    }
}

#[async_trait]
impl ProfileStore for FileAuthProvider {
    async fn profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
        Ok(self
            .load()?
            .users
            .into_iter()
            .find(|u| &u.user_id == user)
            .map(|u| u.profile))
    }
}

// ===== Permissions =====

/// Broker over the recorded grant table in `permissions.json`.
///
/// A CLI process cannot show a platform prompt, so `request` resolves
/// from the recorded decisions; `mrt grant` / `mrt deny` record the
/// user action.
pub struct FilePermissionBroker {
    path: PathBuf,
}

impl FilePermissionBroker {
    pub fn open(dir: &Path) -> Self {
        Self {
            path: dir.join("permissions.json"),
        }
    }

    fn load(&self) -> Result<HashMap<Capability, PermissionStatus>> {
        read_json(&self.path)
    }

    /// Record a user decision, the way the settings app would.
    pub fn record(&self, cap: Capability, status: PermissionStatus) -> Result<()> {
        let mut table = self.load()?;
        table.insert(cap, status);
        write_json(&self.path, &table)
    }
}

#[async_trait]
impl PermissionBroker for FilePermissionBroker {
    async fn check(&self, cap: Capability) -> PermissionStatus {
        self.load()
            .ok()
            .and_then(|table| table.get(&cap).copied())
            .unwrap_or_default()
    }

    async fn request(&self, cap: Capability) -> PermissionStatus {
        self.check(cap).await
    }
}

// ===== Device SMS store =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MessageFile {
    #[serde(default)]
    inbox: Vec<Message>,
    #[serde(default)]
    sent: Vec<Message>,
}

/// Device SMS store read from a JSON message file.
pub struct FileSmsStore {
    path: PathBuf,
}

impl FileSmsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<MessageFile> {
        if !self.path.exists() {
            return Err(MrtError::SmsStore(format!(
                "No message file at {}",
                self.path.display()
            )));
        }
        read_json(&self.path)
    }

    /// Every inbox message, oldest first, for replay through the live
    /// pipeline.
    pub fn inbox_in_arrival_order(&self) -> Result<Vec<Message>> {
        let mut inbox = self.load()?.inbox;
        inbox.sort_by_key(|m| m.date);
        Ok(inbox)
    }
}

#[async_trait]
impl SmsStore for FileSmsStore {
    async fn list(&self, query: &SmsQuery) -> Result<Vec<Message>> {
        let file = self.load()?;
        let mut messages = match query.mailbox {
            Mailbox::Inbox => file.inbox,
            Mailbox::Sent => file.sent,
        };
        messages.retain(|m| query.in_window(m.date));
        messages.sort_by(|a, b| b.date.cmp(&a.date));
        messages.truncate(query.max_count);
        Ok(messages)
    }
}

/// Replays a message file through a live feed so the triage loop sees
/// one arrival at a time.
pub struct ReplayFeed {
    feed: mrt_core::ingest::LiveFeed,
}

impl ReplayFeed {
    pub fn new() -> Self {
        Self {
            feed: mrt_core::ingest::LiveFeed::new(),
        }
    }

    pub async fn deliver(&self, message: Message) -> bool {
        self.feed.publish(message).await
    }
}

#[async_trait]
impl SmsEvents for ReplayFeed {
    async fn subscribe(&self) -> SmsSubscription {
        self.feed.subscribe().await
    }
}

// ===== Reports and blocklist =====

/// Shared report collection persisted to `reports.json`. Append-only;
/// the server timestamp is assigned at write time.
pub struct FileReportStore {
    path: PathBuf,
}

impl FileReportStore {
    pub fn open(dir: &Path) -> Self {
        Self {
            path: dir.join("reports.json"),
        }
    }

    fn load(&self) -> Result<Vec<Report>> {
        read_json(&self.path)
    }
}

#[async_trait]
impl ReportStore for FileReportStore {
    async fn submit(&self, draft: ReportDraft) -> Result<Report> {
        let mut reports = self.load()?;
        let report = Report {
            number: draft.number,
            reason: draft.reason,
            reported_by: draft.reported_by,
            body: draft.body,
            reported_at: Utc::now(),
        };
        reports.push(report.clone());
        write_json(&self.path, &reports)?;
        Ok(report)
    }

    async fn list_by_reporter(&self, user: &UserId) -> Result<Vec<Report>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|r| &r.reported_by == user)
            .collect())
    }
}

/// Per-user blocklist persisted to `blocked.json`.
pub struct FileBlocklist {
    path: PathBuf,
}

impl FileBlocklist {
    pub fn open(dir: &Path) -> Self {
        Self {
            path: dir.join("blocked.json"),
        }
    }

    fn load(&self) -> Result<HashMap<UserId, Vec<BlockedContact>>> {
        read_json(&self.path)
    }
}

#[async_trait]
impl ContactBlocklist for FileBlocklist {
    async fn list(&self, user: &UserId) -> Result<Vec<BlockedContact>> {
        Ok(self.load()?.get(user).cloned().unwrap_or_default())
    }

    async fn block(&self, user: &UserId, contact: BlockedContact) -> Result<()> {
        let mut table = self.load()?;
        table.entry(user.clone()).or_default().push(contact);
        write_json(&self.path, &table)
    }

    async fn remove(&self, user: &UserId, id: &str) -> Result<()> {
        let mut table = self.load()?;
        let list = table
            .get_mut(user)
            .ok_or_else(|| MrtError::ReportStore("No blocked contacts".into()))?;
        let before = list.len();
        list.retain(|c| c.id != id);
        if list.len() == before {
            return Err(MrtError::ReportStore(format!(
                "No blocked contact with id {id}"
            )));
        }
        write_json(&self.path, &table)
    }
}
