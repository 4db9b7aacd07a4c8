//! Permission guard
//!
//! Structural edits (status, hierarchy, text) require the item's `editable` flag.
//! Collaborative metadata (priority, blocked, dates, assignee, tags, comments, worklog)
//! is exempt.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::ItemId;
use crate::tree::ItemTree;

/// Action named in a rejection and in `item:permission-denied`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Status,
    Indent,
    Outdent,
    Move,
    Archive,
    Edit,
    /// The completion guard, rather than the editable flag, refused the change
    CompleteWithIncompleteChildren,
    Add,
    Priority,
    Blocked,
    Due,
    Schedule,
    Assign,
    Tags,
    Comment,
    Worklog,
}

impl Action {
    pub fn requires_editable(self) -> bool {
        matches!(
            self,
            Action::Status
                | Action::Indent
                | Action::Outdent
                | Action::Move
                | Action::Archive
                | Action::Edit
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Status => "status",
            Action::Indent => "indent",
            Action::Outdent => "outdent",
            Action::Move => "move",
            Action::Archive => "archive",
            Action::Edit => "edit",
            Action::CompleteWithIncompleteChildren => "complete-with-incomplete-children",
            Action::Add => "add",
            Action::Priority => "priority",
            Action::Blocked => "blocked",
            Action::Due => "due",
            Action::Schedule => "schedule",
            Action::Assign => "assign",
            Action::Tags => "tags",
            Action::Comment => "comment",
            Action::Worklog => "worklog",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refused operation. Always recoverable; the tree is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("permission denied for {action} on item {id}")]
pub struct Rejection {
    pub id: ItemId,
    pub action: Action,
}

impl Rejection {
    pub fn new(id: ItemId, action: Action) -> Self {
        Self { id, action }
    }
}

/// Checks whether `action` may be applied to `id`.
///
/// Unknown ids pass; callers resolve them before checking.
pub fn check(tree: &ItemTree, id: &ItemId, action: Action) -> Result<(), Rejection> {
    let editable = tree.get(id).map_or(true, |item| item.is_editable());
    if action.requires_editable() && !editable {
        return Err(Rejection::new(id.clone(), action));
    }
    Ok(())
}
