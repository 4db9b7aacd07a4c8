//! Core models for the outliner library
//!
//! This module contains the item data carried by every node of the outline, plus the
//! seed (input) and record (read-only export) shapes exchanged with outer layers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::labels::StatusLabels;

/// Opaque, stable item identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Draws a fresh 128-bit hex id
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(format!("{:032x}", rng.gen::<u128>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Workflow status of an item.
///
/// `NoLabel` marks a header: it carries no workflow status and is excluded from
/// completion accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusState {
    #[default]
    NoLabel,
    Status(usize),
}

impl StatusState {
    pub fn has_label(self) -> bool {
        matches!(self, StatusState::Status(_))
    }

    pub fn index(self) -> Option<usize> {
        match self {
            StatusState::NoLabel => None,
            StatusState::Status(i) => Some(i),
        }
    }

    /// Derived completion flag: labelled with a configured end state
    pub fn is_completed(self, labels: &StatusLabels) -> bool {
        self.index().is_some_and(|i| labels.is_end(i))
    }

    /// Resolves free-form status text: `none`, `status-N`, or a label's display text
    pub fn resolve(text: &str, labels: &StatusLabels) -> Option<Self> {
        text.parse()
            .ok()
            .or_else(|| labels.position_of(text).map(StatusState::Status))
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusState::NoLabel => f.write_str("none"),
            StatusState::Status(i) => write!(f, "status-{}", i),
        }
    }
}

/// Error for unparseable status text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status '{0}', expected 'none' or 'status-N'")]
pub struct ParseStatusError(String);

impl FromStr for StatusState {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "none" {
            return Ok(StatusState::NoLabel);
        }
        s.strip_prefix("status-")
            .and_then(|n| n.parse().ok())
            .map(StatusState::Status)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

impl Serialize for StatusState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatusState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A due or schedule moment: a calendar date, or a date with a time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    DateTime(NaiveDateTime),
    Date(NaiveDate),
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Timestamp::DateTime(dt));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Timestamp::Date)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            Timestamp::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// An append-only comment or worklog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub text: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// Completion aggregate over completable direct children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.done, self.total)
    }
}

/// Per-item data. Structure (parent, children, cached progress) lives in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    id: ItemId,
    pub(crate) text: String,
    pub(crate) status: StatusState,
    editable: bool,
    pub(crate) priority: bool,
    pub(crate) blocked: bool,
    pub(crate) due: Option<Timestamp>,
    pub(crate) schedule: Option<Timestamp>,
    pub(crate) assignee: Option<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) comments: Vec<Note>,
    pub(crate) worklog: Vec<Note>,
}

impl Item {
    /// Creates an editable item with no metadata
    pub fn new(id: ItemId, text: impl Into<String>, status: StatusState) -> Self {
        Self {
            id,
            text: text.into(),
            status,
            editable: true,
            priority: false,
            blocked: false,
            due: None,
            schedule: None,
            assignee: None,
            tags: Vec::new(),
            comments: Vec::new(),
            worklog: Vec::new(),
        }
    }

    /// Sets the externally supplied editability flag
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> StatusState {
        self.status
    }

    pub fn is_completed(&self, labels: &StatusLabels) -> bool {
        self.status.is_completed(labels)
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn is_priority(&self) -> bool {
        self.priority
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn due(&self) -> Option<Timestamp> {
        self.due
    }

    pub fn schedule(&self) -> Option<Timestamp> {
        self.schedule
    }

    pub fn assignee(&self) -> Option<&str> {
        self.assignee.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn comments(&self) -> &[Note] {
        &self.comments
    }

    pub fn worklog(&self) -> &[Note] {
        &self.worklog
    }
}

/// Normalizes a tag list: strips `#`, drops blanks and duplicates, keeps first-seen order
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().trim_start_matches('#');
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Externally supplied initial item, nested
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemSeed {
    pub id: Option<ItemId>,
    pub text: String,
    /// `none`, `status-N`, or a label's display text; absent means the first label
    pub status: Option<String>,
    pub editable: Option<bool>,
    pub priority: bool,
    pub blocked: bool,
    pub due: Option<Timestamp>,
    pub schedule: Option<Timestamp>,
    pub assignee: Option<String>,
    pub tags: Vec<String>,
    pub comments: Vec<Note>,
    pub worklog: Vec<Note>,
    pub children: Vec<ItemSeed>,
}

impl ItemSeed {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_children(mut self, children: Vec<ItemSeed>) -> Self {
        self.children = children;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = Some(false);
        self
    }
}

/// Read-only export of an item and its subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    #[serde(flatten)]
    pub item: Item,
    /// Display text of the current label, absent for headers
    pub label: Option<String>,
    pub completed: bool,
    pub progress: Option<Progress>,
    pub children: Vec<ItemRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{StatusLabel, StatusLabels};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_status_state_text_round_trip() {
        assert_eq!("none".parse::<StatusState>(), Ok(StatusState::NoLabel));
        assert_eq!("status-3".parse::<StatusState>(), Ok(StatusState::Status(3)));
        assert!("status-x".parse::<StatusState>().is_err());
        assert!("DONE".parse::<StatusState>().is_err());
        assert_eq!(StatusState::Status(1).to_string(), "status-1");
        assert_eq!(
            serde_json::to_string(&StatusState::NoLabel).unwrap(),
            "\"none\""
        );
    }

    #[test]
    fn test_resolve_accepts_label_text() {
        let labels = StatusLabels::new(vec![
            StatusLabel::new("TODO", false),
            StatusLabel::new("DONE", true),
        ]);
        assert_eq!(
            StatusState::resolve("DONE", &labels),
            Some(StatusState::Status(1))
        );
        assert_eq!(
            StatusState::resolve("none", &labels),
            Some(StatusState::NoLabel)
        );
        assert_eq!(StatusState::resolve("LATER", &labels), None);
    }

    #[test]
    fn test_completed_is_derived_from_labels() {
        let labels = StatusLabels::default();
        assert!(!StatusState::NoLabel.is_completed(&labels));
        assert!(!StatusState::Status(0).is_completed(&labels));
        assert!(StatusState::Status(1).is_completed(&labels));
        assert!(!StatusState::Status(9).is_completed(&labels));
    }

    #[test]
    fn test_timestamp_parsing() {
        let date: Timestamp = "2025-03-14".parse().unwrap();
        assert!(matches!(date, Timestamp::Date(_)));
        let dt: Timestamp = "2025-03-14 09:30".parse().unwrap();
        assert!(matches!(dt, Timestamp::DateTime(_)));
        assert_eq!(dt.to_string(), "2025-03-14 09:30");
        assert!("tomorrow".parse::<Timestamp>().is_err());

        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(serde_json::from_str::<Timestamp>(&json).unwrap(), date);
    }

    #[test]
    fn test_normalize_tags() {
        assert_eq!(
            normalize_tags(["#ops", "infra", "ops", " ", "#infra"]),
            vec!["ops".to_string(), "infra".to_string()]
        );
    }

    #[test]
    fn test_random_ids_are_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = ItemId::random(&mut rng);
        let b = ItemId::random(&mut rng);
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }
}
