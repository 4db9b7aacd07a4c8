//! Configured status labels
//!
//! This module defines the ordered list of workflow labels an outline cycles through.
//! Index position is significant: it defines cycle order and is what `StatusState`
//! refers to.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref DEFAULT_STATUS_LABELS: Vec<StatusLabel> = vec![todo_label(), done_label()];
}

/// A single configured workflow label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLabel {
    label: String,
    #[serde(default)]
    is_end_state: bool,
}

impl StatusLabel {
    /// Creates a new label
    pub fn new(label: impl Into<String>, is_end_state: bool) -> Self {
        Self {
            label: label.into(),
            is_end_state,
        }
    }

    /// Gets the display text of this label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether reaching this label marks an item completed
    pub fn is_end_state(&self) -> bool {
        self.is_end_state
    }
}

/// Returns the default open label
pub fn todo_label() -> StatusLabel {
    StatusLabel::new("TODO", false)
}

/// Returns the default end label
pub fn done_label() -> StatusLabel {
    StatusLabel::new("DONE", true)
}

/// Returns the default label list: `TODO`, `DONE`
pub fn default_status_labels() -> Vec<StatusLabel> {
    DEFAULT_STATUS_LABELS.clone()
}

/// The ordered label list an outline is configured with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusLabels(Vec<StatusLabel>);

impl Default for StatusLabels {
    fn default() -> Self {
        Self(default_status_labels())
    }
}

impl From<Vec<StatusLabel>> for StatusLabels {
    fn from(labels: Vec<StatusLabel>) -> Self {
        Self(labels)
    }
}

impl StatusLabels {
    pub fn new(labels: Vec<StatusLabel>) -> Self {
        Self(labels)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StatusLabel> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusLabel> {
        self.0.iter()
    }

    /// True iff `index` exists and is flagged as an end state
    pub fn is_end(&self, index: usize) -> bool {
        self.0.get(index).is_some_and(StatusLabel::is_end_state)
    }

    /// Smallest end-state index strictly after `index`
    pub fn next_end_after(&self, index: usize) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, l)| l.is_end_state())
            .map(|(i, _)| i)
    }

    /// Largest end-state index
    pub fn last_end(&self) -> Option<usize> {
        self.0.iter().rposition(StatusLabel::is_end_state)
    }

    /// First label that does not complete an item
    pub fn first_open(&self) -> Option<usize> {
        self.0.iter().position(|l| !l.is_end_state())
    }

    /// Looks a label up by its display text
    pub fn position_of(&self, text: &str) -> Option<usize> {
        self.0.iter().position(|l| l.label() == text)
    }
}
