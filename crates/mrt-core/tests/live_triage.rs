//! End-to-end live triage: permission gate, single subscription,
//! one notification per flagged message.

use std::sync::Arc;

use mrt_core::capability::{Capability, PermissionGate, PermissionStatus, PreGranted};
use mrt_core::memory::{ManualBroker, MemorySmsStore, RecordingNotifier};
use mrt_core::{Message, TrainerConfig, TriageCoordinator};

fn config() -> TrainerConfig {
    TrainerConfig::default()
}

#[tokio::test]
async fn flagged_message_posts_exactly_one_notification() {
    let gate = PermissionGate::new(Box::new(PreGranted));
    let store = MemorySmsStore::new();
    let notifier = Arc::new(RecordingNotifier::new());

    let coordinator =
        TriageCoordinator::new(&gate, &store, Box::new(notifier.clone()), &config())
            .await
            .unwrap();

    // The worked scenario: a URL-bearing message and a clean follow-up
    // from the same sender.
    store
        .deliver(Message::new(
            "1",
            "12345",
            "Win prize now! visit http://bit.ly/x",
            100,
        ))
        .await;
    store
        .deliver(Message::new("2", "12345", "ok thanks", 200))
        .await;

    // Dropping the store ends the live feed so the loop drains and exits.
    drop(store);
    coordinator.run().await.unwrap();

    let posted = notifier.posted().await;
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].sender, "12345");
    assert_eq!(posted[0].body, "Win prize now! visit http://bit.ly/x");
    assert_eq!(posted[0].payload.body, posted[0].body);

    // Channel creation happened once at startup, not per message.
    assert_eq!(notifier.channel_inits(), 1);
}

#[tokio::test]
async fn coordinator_refuses_to_start_without_sms_permissions() {
    let broker = ManualBroker::new();
    broker
        .user_will(Capability::ReadSms, PermissionStatus::Denied)
        .await;
    let gate = PermissionGate::new(Box::new(broker));
    let store = MemorySmsStore::new();
    let notifier = Arc::new(RecordingNotifier::new());

    let result =
        TriageCoordinator::new(&gate, &store, Box::new(notifier.clone()), &config()).await;
    assert!(matches!(result, Err(mrt_core::MrtError::Permission(_))));

    // Denied startup never touched the notification channel.
    assert_eq!(notifier.channel_inits(), 0);
}

#[tokio::test]
async fn replacing_the_subscription_prevents_double_processing() {
    let gate = PermissionGate::new(Box::new(PreGranted));
    let store = MemorySmsStore::new();
    let notifier = Arc::new(RecordingNotifier::new());

    // A first coordinator takes the subscription...
    let first = TriageCoordinator::new(&gate, &store, Box::new(notifier.clone()), &config())
        .await
        .unwrap();
    // ...and a second one replaces it.
    let second = TriageCoordinator::new(&gate, &store, Box::new(notifier.clone()), &config())
        .await
        .unwrap();

    store
        .deliver(Message::new("1", "999", "see bit.ly/x", 100))
        .await;
    drop(store);

    // The first loop ends immediately (its stream was replaced), the
    // second processes the message once.
    first.run().await.unwrap();
    second.run().await.unwrap();

    assert_eq!(notifier.posted().await.len(), 1);
}
