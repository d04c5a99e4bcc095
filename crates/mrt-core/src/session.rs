//! Authentication session mirror and input validation.
//!
//! Sign-in, sign-up, and sign-out correctness all belong to the
//! external identity provider. This module only reacts to its state
//! transitions: screens that need identity treat a null session as
//! "not ready" and must never act on a cached id after sign-out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{MrtError, Result};

/// Opaque user id assigned by the identity provider.
pub type UserId = String;

/// Sign-in input, validated before any provider call.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(MrtError::InvalidInput(
                "Email and password are required".into(),
            ));
        }
        if !plausible_email(&self.email) {
            return Err(MrtError::InvalidInput("Invalid email address".into()));
        }
        Ok(())
    }
}

/// Registration input, validated before any provider call.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub phone_number: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty()
            || self.phone_number.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
        {
            return Err(MrtError::InvalidInput("All fields are required".into()));
        }
        if self.password != self.confirm_password {
            return Err(MrtError::InvalidInput("Passwords do not match".into()));
        }
        if !plausible_email(&self.email) {
            return Err(MrtError::InvalidInput("Invalid email address".into()));
        }
        if !plausible_phone(&self.phone_number) {
            return Err(MrtError::InvalidInput("Invalid phone number".into()));
        }
        Ok(())
    }
}

fn plausible_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

fn plausible_phone(s: &str) -> bool {
    let digits = s
        .chars()
        .filter(|c| !matches!(c, '+' | ' ' | '-' | '(' | ')'))
        .collect::<String>();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) && digits.len() >= 7
}

/// Per-user profile document written at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub phone_number: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Result of loading a profile: a missing document is an explicit
/// state, not an error.
#[derive(Debug, Clone)]
pub enum ProfileView {
    Loaded(UserProfile),
    Missing,
}

/// External identity provider boundary.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, registration: &Registration) -> Result<UserId>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<UserId>;

    async fn sign_out(&self) -> Result<()>;

    /// Identity-change notifications. The receiver always reflects the
    /// provider's latest state.
    fn watch(&self) -> watch::Receiver<Option<UserId>>;
}

/// Per-user document storage boundary.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile(&self, user: &UserId) -> Result<Option<UserProfile>>;
}

/// Read-only mirror of the provider's session state.
pub struct SessionWatcher {
    rx: watch::Receiver<Option<UserId>>,
}

impl SessionWatcher {
    pub fn new(rx: watch::Receiver<Option<UserId>>) -> Self {
        Self { rx }
    }

    /// The current user id, or None when signed out. Reads the channel
    /// directly so a stale id is never observed after sign-out.
    pub fn current(&self) -> Option<UserId> {
        self.rx.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait for the next identity transition and return the new value.
    /// Returns None when the provider has gone away.
    pub async fn changed(&mut self) -> Option<Option<UserId>> {
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow().clone()),
            Err(_) => None,
        }
    }
}

/// Load a profile view for a signed-in user, surfacing a missing
/// document as `ProfileView::Missing`.
pub async fn load_profile(store: &dyn ProfileStore, user: &UserId) -> Result<ProfileView> {
    Ok(match store.profile(user).await? {
        Some(profile) => ProfileView::Loaded(profile),
        None => ProfileView::Missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            username: "alice".into(),
            phone_number: "+1 555-123-4567".into(),
            email: "alice@example.com".into(),
            password: "hunter22".into(),
            confirm_password: "hunter22".into(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn mismatched_passwords_are_rejected() {
        let mut reg = registration();
        reg.confirm_password = "other".into();
        let err = reg.validate().unwrap_err();
        assert!(err.to_string().contains("Passwords do not match"));
    }

    #[test]
    fn empty_fields_are_rejected() {
        let mut reg = registration();
        reg.username = String::new();
        assert!(reg.validate().is_err());
    }

    #[test]
    fn email_and_phone_shapes_are_checked() {
        let mut reg = registration();
        reg.email = "not-an-email".into();
        assert!(reg.validate().is_err());

        let mut reg = registration();
        reg.phone_number = "call me".into();
        assert!(reg.validate().is_err());
    }

    #[tokio::test]
    async fn watcher_never_reports_a_stale_id() {
        let (tx, rx) = watch::channel(Some("u1".to_string()));
        let watcher = SessionWatcher::new(rx);
        assert_eq!(watcher.current().as_deref(), Some("u1"));

        tx.send(None).ok();
        assert_eq!(watcher.current(), None);
        assert!(!watcher.is_signed_in());
    }

    #[tokio::test]
    async fn watcher_observes_transitions_and_provider_teardown() {
        let (tx, rx) = watch::channel(None);
        let mut watcher = SessionWatcher::new(rx);

        tx.send(Some("u1".to_string())).ok();
        assert_eq!(watcher.changed().await, Some(Some("u1".to_string())));

        tx.send(None).ok();
        assert_eq!(watcher.changed().await, Some(None));

        drop(tx);
        assert_eq!(watcher.changed().await, None);
    }
}
