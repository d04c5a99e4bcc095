//! Route state machine deciding which screens are reachable.

use crate::capability::{Capability, PermissionState};
use crate::session::UserId;

/// Every screen in the product. Pure identifiers; rendering lives
/// elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Permissions,
    Login,
    Register,
    Home,
    Smishing,
    Contacts,
    SmsList,
    SmsViewer,
    ReportList,
    ReportReason,
    Profile,
    About,
}

impl Screen {
    /// Screens that issue identity-dependent calls and must not mount
    /// while the session is null.
    pub fn requires_identity(self) -> bool {
        matches!(
            self,
            Screen::Profile | Screen::ReportList | Screen::ReportReason
        )
    }
}

/// Top-level routing state derived from permissions and session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRoute {
    NeedsPermission,
    NeedsAuth,
    Ready,
}

impl AppRoute {
    /// Derive the route from current permission and session state.
    /// Overlay is not blocking; it only affects the notification
    /// prompt, not basic operation.
    pub fn derive(permissions: &PermissionState, session: Option<&UserId>) -> Self {
        let launch_caps = [
            Capability::ReadSms,
            Capability::ReceiveSms,
            Capability::ReadContacts,
        ];
        if !launch_caps.iter().all(|&cap| permissions.granted(cap)) {
            AppRoute::NeedsPermission
        } else if session.is_none() {
            AppRoute::NeedsAuth
        } else {
            AppRoute::Ready
        }
    }

    /// Whether a screen is a legal destination in this state.
    pub fn allows(self, screen: Screen) -> bool {
        match self {
            AppRoute::NeedsPermission => {
                matches!(screen, Screen::Permissions | Screen::About)
            }
            AppRoute::NeedsAuth => matches!(
                screen,
                Screen::Login | Screen::Register | Screen::Permissions | Screen::About
            ),
            AppRoute::Ready => true,
        }
    }
}
