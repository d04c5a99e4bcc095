//! SMS ingestion: historical listing and live listening.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::error::Result;
use crate::message::{Message, SmsQuery};

/// Device SMS store boundary for one-shot historical queries.
///
/// Results come back most recent first, capped at the query's
/// `max_count`. Zero results is an empty list, not an error.
#[async_trait]
pub trait SmsStore: Send + Sync {
    async fn list(&self, query: &SmsQuery) -> Result<Vec<Message>>;
}

/// Push-style new-message source.
///
/// Exactly one subscription is active at a time: subscribing again
/// replaces the prior one, whose stream then ends, so a single
/// incoming message is never processed twice.
#[async_trait]
pub trait SmsEvents: Send + Sync {
    async fn subscribe(&self) -> SmsSubscription;
}

/// Owned handle to the live SMS stream. Messages arrive in delivery
/// order; dropping the handle releases the subscription.
pub struct SmsSubscription {
    rx: mpsc::Receiver<Message>,
}

impl SmsSubscription {
    /// Next incoming message, or None once the subscription has been
    /// replaced or the source has gone away.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

/// Single-subscriber fan-out for implementors of [`SmsEvents`].
///
/// Holds at most one live sender; installing a new one drops the old
/// one, which terminates the previous subscription's stream.
pub struct LiveFeed {
    slot: Mutex<Option<mpsc::Sender<Message>>>,
}

impl LiveFeed {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub async fn subscribe(&self) -> SmsSubscription {
        let (tx, rx) = mpsc::channel(64);
        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            debug!("replacing active SMS subscription");
        }
        *slot = Some(tx);
        SmsSubscription { rx }
    }

    /// Deliver one message to the active subscriber, if any. Returns
    /// whether anybody received it.
    ///
    /// The sender is cloned out of the slot before sending, so a
    /// backpressured send never holds the lock and `subscribe` can
    /// always replace the subscription.
    pub async fn publish(&self, message: Message) -> bool {
        let tx = self.slot.lock().await.clone();
        match tx {
            Some(tx) => tx.send(message).await.is_ok(),
            None => false,
        }
    }
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str) -> Message {
        Message::new(id, "12345", "hello", 100)
    }

    #[tokio::test]
    async fn publish_reaches_the_active_subscriber() {
        let feed = LiveFeed::new();
        let mut sub = feed.subscribe().await;

        assert!(feed.publish(msg("1")).await);
        assert_eq!(sub.recv().await.map(|m| m.id), Some("1".to_string()));
    }

    #[tokio::test]
    async fn resubscribing_replaces_the_prior_handle() {
        let feed = LiveFeed::new();
        let mut first = feed.subscribe().await;
        let mut second = feed.subscribe().await;

        assert!(feed.publish(msg("1")).await);
        // The first stream has ended; only the second sees the message.
        assert!(first.recv().await.is_none());
        assert_eq!(second.recv().await.map(|m| m.id), Some("1".to_string()));
    }

    #[tokio::test]
    async fn publish_without_subscriber_is_dropped() {
        let feed = LiveFeed::new();
        assert!(!feed.publish(msg("1")).await);
    }

    #[tokio::test]
    async fn backpressured_publish_does_not_block_replacement() {
        use std::sync::Arc;

        let feed = Arc::new(LiveFeed::new());
        let first = feed.subscribe().await;
        for i in 0..64 {
            assert!(feed.publish(msg(&i.to_string())).await);
        }

        // This publish stalls on the full channel.
        let stalled = tokio::spawn({
            let feed = feed.clone();
            async move { feed.publish(msg("overflow")).await }
        });
        tokio::task::yield_now().await;

        // Resubscribing must go through even while a send is pending.
        let mut second = feed.subscribe().await;

        // Dropping the replaced receiver fails the stalled send.
        drop(first);
        assert!(!stalled.await.unwrap());

        assert!(feed.publish(msg("fresh")).await);
        assert_eq!(second.recv().await.map(|m| m.id), Some("fresh".to_string()));
    }

    #[tokio::test]
    async fn delivery_preserves_arrival_order() {
        let feed = LiveFeed::new();
        let mut sub = feed.subscribe().await;
        for i in 0..5 {
            feed.publish(msg(&i.to_string())).await;
        }
        for i in 0..5 {
            assert_eq!(sub.recv().await.map(|m| m.id), Some(i.to_string()));
        }
    }
}
