//! Permission gate behavior at the OS boundary.

use async_trait::async_trait;

use mrt_core::capability::{
    Capability, PermissionBroker, PermissionGate, PermissionStatus,
};
use mrt_core::memory::ManualBroker;

/// Broker simulating a settings-app round trip: the request call has
/// no trustworthy return value, but a re-check sees the user's grant.
struct SettingsRoundTrip;

#[async_trait]
impl PermissionBroker for SettingsRoundTrip {
    async fn check(&self, cap: Capability) -> PermissionStatus {
        if cap == Capability::Overlay {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Unknown
        }
    }

    async fn request(&self, _cap: Capability) -> PermissionStatus {
        // Backgrounded to settings; nothing synchronous to report.
        PermissionStatus::Unknown
    }
}

#[tokio::test]
async fn overlay_grants_are_recheck_based_not_return_based() {
    let gate = PermissionGate::new(Box::new(SettingsRoundTrip));

    // The raw request reports Unknown, but the gate re-checks on
    // return and sees the grant.
    let status = gate.request(Capability::Overlay).await;
    assert_eq!(status, PermissionStatus::Granted);

    // Non-round-trip capabilities use the request result directly.
    let status = gate.request(Capability::ReadSms).await;
    assert_eq!(status, PermissionStatus::Unknown);
}

#[tokio::test]
async fn denial_is_terminal_until_the_user_acts_again() {
    let broker = ManualBroker::new();
    broker
        .user_will(Capability::ReadContacts, PermissionStatus::Denied)
        .await;
    let gate = PermissionGate::new(Box::new(broker));

    assert_eq!(
        gate.request(Capability::ReadContacts).await,
        PermissionStatus::Denied
    );
    // Re-requesting without a new user decision stays denied; the
    // gate itself never retries.
    assert_eq!(
        gate.request(Capability::ReadContacts).await,
        PermissionStatus::Denied
    );

    let state = gate.check_all().await;
    assert!(!state.granted(Capability::ReadContacts));
    assert!(!state.all_granted());
}
