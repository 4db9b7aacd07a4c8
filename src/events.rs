//! Change notifications
//!
//! Every completed or rejected operation emits exactly one [`OutlineEvent`] (a status change
//! that reopens completed ancestors emits one extra `item:status` per ancestor). Events are
//! kept in a bounded history and optionally fanned out over a broadcast channel.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{ItemId, Note, StatusState, Timestamp};
use crate::permission::Action;
use crate::tree::Location;

/// Maximum number of events kept for `events_since`
pub const MAX_EVENT_HISTORY: usize = 256;

/// How a `move` changed the item's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveType {
    Reorder,
    Indent,
    Outdent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "detail")]
pub enum OutlineEvent {
    #[serde(rename = "item:add", rename_all = "camelCase")]
    Add {
        id: ItemId,
        text: String,
        parent_id: Option<ItemId>,
    },
    #[serde(rename = "item:status", rename_all = "camelCase")]
    Status {
        id: ItemId,
        to: StatusState,
        completed: bool,
        has_label: bool,
    },
    #[serde(rename = "item:indent")]
    Indent { id: ItemId, parent: ItemId },
    #[serde(rename = "item:outdent", rename_all = "camelCase")]
    Outdent {
        id: ItemId,
        new_parent: Option<ItemId>,
    },
    #[serde(rename = "item:move", rename_all = "camelCase")]
    Move {
        id: ItemId,
        from: Location,
        to: Location,
        move_type: MoveType,
        parent_id: Option<ItemId>,
    },
    #[serde(rename = "item:archive")]
    Archive { id: ItemId, text: String },
    #[serde(rename = "item:due")]
    Due {
        id: ItemId,
        timestamp: Option<Timestamp>,
    },
    #[serde(rename = "item:schedule")]
    Schedule {
        id: ItemId,
        timestamp: Option<Timestamp>,
    },
    #[serde(rename = "item:assign")]
    Assign {
        id: ItemId,
        assignee: Option<String>,
    },
    #[serde(rename = "item:tags")]
    Tags { id: ItemId, tags: Vec<String> },
    #[serde(rename = "item:priority")]
    Priority { id: ItemId, priority: bool },
    #[serde(rename = "item:blocked")]
    Blocked { id: ItemId, blocked: bool },
    #[serde(rename = "item:comment")]
    Comment { id: ItemId, comment: Note },
    #[serde(rename = "item:worklog", rename_all = "camelCase")]
    Worklog { id: ItemId, worklog_entry: Note },
    #[serde(rename = "item:permission-denied")]
    PermissionDenied { id: ItemId, action: Action },
    #[serde(rename = "item:edit:start", rename_all = "camelCase")]
    EditStart { id: ItemId, original_text: String },
    #[serde(rename = "item:edit:save", rename_all = "camelCase")]
    EditSave {
        id: ItemId,
        original_text: String,
        new_text: String,
    },
    #[serde(rename = "item:edit:cancel")]
    EditCancel { id: ItemId },
}

impl OutlineEvent {
    /// Wire name, e.g. `item:status`
    pub fn name(&self) -> &'static str {
        match self {
            OutlineEvent::Add { .. } => "item:add",
            OutlineEvent::Status { .. } => "item:status",
            OutlineEvent::Indent { .. } => "item:indent",
            OutlineEvent::Outdent { .. } => "item:outdent",
            OutlineEvent::Move { .. } => "item:move",
            OutlineEvent::Archive { .. } => "item:archive",
            OutlineEvent::Due { .. } => "item:due",
            OutlineEvent::Schedule { .. } => "item:schedule",
            OutlineEvent::Assign { .. } => "item:assign",
            OutlineEvent::Tags { .. } => "item:tags",
            OutlineEvent::Priority { .. } => "item:priority",
            OutlineEvent::Blocked { .. } => "item:blocked",
            OutlineEvent::Comment { .. } => "item:comment",
            OutlineEvent::Worklog { .. } => "item:worklog",
            OutlineEvent::PermissionDenied { .. } => "item:permission-denied",
            OutlineEvent::EditStart { .. } => "item:edit:start",
            OutlineEvent::EditSave { .. } => "item:edit:save",
            OutlineEvent::EditCancel { .. } => "item:edit:cancel",
        }
    }

    /// The item the event is about
    pub fn id(&self) -> &ItemId {
        match self {
            OutlineEvent::Add { id, .. }
            | OutlineEvent::Status { id, .. }
            | OutlineEvent::Indent { id, .. }
            | OutlineEvent::Outdent { id, .. }
            | OutlineEvent::Move { id, .. }
            | OutlineEvent::Archive { id, .. }
            | OutlineEvent::Due { id, .. }
            | OutlineEvent::Schedule { id, .. }
            | OutlineEvent::Assign { id, .. }
            | OutlineEvent::Tags { id, .. }
            | OutlineEvent::Priority { id, .. }
            | OutlineEvent::Blocked { id, .. }
            | OutlineEvent::Comment { id, .. }
            | OutlineEvent::Worklog { id, .. }
            | OutlineEvent::PermissionDenied { id, .. }
            | OutlineEvent::EditStart { id, .. }
            | OutlineEvent::EditSave { id, .. }
            | OutlineEvent::EditCancel { id } => id,
        }
    }
}

/// An emitted event with its sequence number and emission time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: OutlineEvent,
}

/// Bounded event history with optional live fan-out
#[derive(Debug, Default)]
pub struct EventChannel {
    history: VecDeque<EventRecord>,
    last_seq: u64,
    sender: Option<broadcast::Sender<EventRecord>>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwards every subsequently emitted event to `sender`
    pub fn attach(&mut self, sender: broadcast::Sender<EventRecord>) {
        self.sender = Some(sender);
    }

    pub fn emit(&mut self, event: OutlineEvent) -> EventRecord {
        self.last_seq += 1;
        let record = EventRecord {
            seq: self.last_seq,
            timestamp: Utc::now(),
            event,
        };
        tracing::debug!("event #{} {} {}", record.seq, record.event.name(), record.event.id());

        self.history.push_back(record.clone());
        while self.history.len() > MAX_EVENT_HISTORY {
            self.history.pop_front();
        }

        if let Some(sender) = &self.sender {
            // No subscribers is fine
            let _ = sender.send(record.clone());
        }
        record
    }

    /// Sequence number of the most recent event, 0 before the first one
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Retained events with a sequence number greater than `seq`
    pub fn events_since(&self, seq: u64) -> Vec<EventRecord> {
        self.history.iter().filter(|r| r.seq > seq).cloned().collect()
    }

    pub fn history(&self) -> impl DoubleEndedIterator<Item = &EventRecord> {
        self.history.iter()
    }
}
