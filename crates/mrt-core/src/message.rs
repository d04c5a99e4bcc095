//! Device SMS records and conversation grouping.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An SMS record read from the device store or delivered live.
///
/// Dates are epoch milliseconds, matching the device store convention.
/// Live-delivered messages carry no persistent id guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub address: String,
    pub body: String,
    pub date: i64,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        address: impl Into<String>,
        body: impl Into<String>,
        date: i64,
    ) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            body: body.into(),
            date,
        }
    }
}

/// Device SMS store partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mailbox {
    Inbox,
    Sent,
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mailbox::Inbox => write!(f, "inbox"),
            Mailbox::Sent => write!(f, "sent"),
        }
    }
}

/// A one-shot historical query against the device SMS store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsQuery {
    pub mailbox: Mailbox,
    /// Result cap, most recent first.
    pub max_count: usize,
    /// Optional inclusive lower bound, epoch ms.
    pub min_date: Option<i64>,
    /// Optional inclusive upper bound, epoch ms.
    pub max_date: Option<i64>,
}

impl SmsQuery {
    pub fn inbox(max_count: usize) -> Self {
        Self {
            mailbox: Mailbox::Inbox,
            max_count,
            min_date: None,
            max_date: None,
        }
    }

    pub fn sent(max_count: usize) -> Self {
        Self {
            mailbox: Mailbox::Sent,
            ..Self::inbox(max_count)
        }
    }

    /// Whether a message date falls inside the query's date window.
    pub fn in_window(&self, date: i64) -> bool {
        self.min_date.map_or(true, |min| date >= min)
            && self.max_date.map_or(true, |max| date <= max)
    }
}

/// All of one sender's messages, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationGroup {
    pub address: String,
    pub messages: Vec<Message>,
}

impl ConversationGroup {
    /// The newest message in the group, or None for an empty group.
    /// Groups produced by [`group_keep_all`] always have one.
    pub fn latest(&self) -> Option<&Message> {
        self.messages.first()
    }
}

/// Conversation view holding only the single newest message per sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub address: String,
    pub latest: Message,
}

/// Group messages by sender, keeping the full per-sender list.
///
/// Within each group messages are sorted newest first; the group list
/// itself is ordered by each group's newest timestamp, descending.
/// The union of all group members is exactly the input set.
pub fn group_keep_all(messages: &[Message]) -> Vec<ConversationGroup> {
    let mut by_sender: HashMap<String, Vec<Message>> = HashMap::new();
    for msg in messages {
        by_sender
            .entry(msg.address.clone())
            .or_default()
            .push(msg.clone());
    }

    let mut groups: Vec<ConversationGroup> = by_sender
        .into_iter()
        .map(|(address, mut messages)| {
            messages.sort_by(|a, b| b.date.cmp(&a.date));
            ConversationGroup { address, messages }
        })
        .collect();

    groups.sort_by_key(|g| std::cmp::Reverse(g.latest().map_or(i64::MIN, |m| m.date)));
    groups
}

/// Group messages by sender, keeping only the newest message each.
///
/// The list is ordered by that newest timestamp, descending.
pub fn group_keep_latest(messages: &[Message]) -> Vec<ConversationSummary> {
    let mut latest: HashMap<String, Message> = HashMap::new();
    for msg in messages {
        match latest.get(&msg.address) {
            Some(seen) if seen.date >= msg.date => {}
            _ => {
                latest.insert(msg.address.clone(), msg.clone());
            }
        }
    }

    let mut summaries: Vec<ConversationSummary> = latest
        .into_iter()
        .map(|(address, latest)| ConversationSummary { address, latest })
        .collect();

    summaries.sort_by(|a, b| b.latest.date.cmp(&a.latest.date));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, address: &str, date: i64) -> Message {
        Message::new(id, address, "body", date)
    }

    #[test]
    fn keep_all_orders_newest_first() {
        let input = vec![
            msg("1", "12345", 100),
            msg("2", "67890", 300),
            msg("3", "12345", 200),
        ];

        let groups = group_keep_all(&input);
        assert_eq!(groups.len(), 2);
        // Group list ordered by newest timestamp descending.
        assert_eq!(groups[0].address, "67890");
        assert_eq!(groups[1].address, "12345");
        // Within-group order newest first.
        assert_eq!(groups[1].messages[0].date, 200);
        assert_eq!(groups[1].messages[1].date, 100);
    }

    #[test]
    fn empty_group_has_no_latest() {
        let group = ConversationGroup {
            address: "12345".into(),
            messages: Vec::new(),
        };
        assert!(group.latest().is_none());

        let grouped = &group_keep_all(&[msg("1", "12345", 100)])[0];
        assert_eq!(grouped.latest().map(|m| m.date), Some(100));
    }

    #[test]
    fn keep_latest_picks_max_timestamp() {
        let input = vec![msg("1", "12345", 100), msg("2", "12345", 200)];

        let summaries = group_keep_latest(&input);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].latest.date, 200);
    }

    #[test]
    fn query_window_bounds_are_inclusive() {
        let q = SmsQuery {
            min_date: Some(100),
            max_date: Some(200),
            ..SmsQuery::inbox(30)
        };
        assert!(q.in_window(100));
        assert!(q.in_window(200));
        assert!(!q.in_window(99));
        assert!(!q.in_window(201));
    }
}
