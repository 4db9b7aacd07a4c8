//! Hierarchy mutations: add, indent, outdent, move, reorder and archive.
//!
//! Each operation is one tree edit followed by aggregate propagation along every affected
//! parent chain and a single notification.

use serde::{Deserialize, Serialize};

use super::{NoOp, Outcome, Outline, OutlineError, OutlineResult};
use crate::events::{MoveType, OutlineEvent};
use crate::models::{Item, ItemId};
use crate::permission::Action;
use crate::tree::{default_status, Location};

/// Report of an archived subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Archived {
    pub id: ItemId,
    pub text: String,
    /// Every removed id, the archived item first, in document order
    pub removed: Vec<ItemId>,
    /// Where the item used to sit
    pub former: Location,
    /// Suggested focus: next sibling, previous sibling, former parent, or any remaining item
    pub focus: Option<ItemId>,
}

impl Outline {
    /// Appends a new item with the default status as the last child of `parent`
    /// (or as the last root item)
    pub fn add(&mut self, text: &str, parent: Option<&ItemId>) -> OutlineResult<ItemId> {
        self.require_parent(parent)?;
        self.insert_new(text, parent, usize::MAX)
    }

    /// Inserts a new item directly after `id` in the same sibling list
    pub fn add_after(&mut self, id: &ItemId, text: &str) -> OutlineResult<ItemId> {
        let location = self
            .tree
            .location(id)
            .ok_or_else(|| OutlineError::UnknownItem(id.clone()))?;
        self.insert_new(text, location.parent.as_ref(), location.index + 1)
    }

    fn insert_new(
        &mut self,
        text: &str,
        parent: Option<&ItemId>,
        index: usize,
    ) -> OutlineResult<ItemId> {
        let id = self.next_id();
        let item = Item::new(id.clone(), text, default_status(self.labels()));
        let Some(location) = self.tree.insert(item, parent, index) else {
            return Err(match parent {
                Some(p) => OutlineError::UnknownParent(p.clone()),
                None => OutlineError::UnknownItem(id),
            });
        };
        tracing::debug!("added item {} at {:?}", id, location);
        self.events.emit(OutlineEvent::Add {
            id: id.clone(),
            text: text.to_string(),
            parent_id: parent.cloned(),
        });
        self.settle(parent);
        Ok(Outcome::Applied(id))
    }

    /// Makes `id` the last child of its previous sibling
    pub fn indent(&mut self, id: &ItemId) -> OutlineResult<Location> {
        self.require(id)?;
        if let Some(r) = self.deny(id, Action::Indent) {
            return Ok(Outcome::Rejected(r));
        }
        let from = self
            .tree
            .location(id)
            .ok_or_else(|| OutlineError::UnknownItem(id.clone()))?;
        if from.index == 0 {
            return Ok(self.unchanged(id, NoOp::FirstSibling));
        }
        let prev = self.tree.children(from.parent.as_ref())[from.index - 1].clone();

        let Some((_, to)) = self.relocate(id, Some(&prev), usize::MAX) else {
            return Err(OutlineError::UnknownItem(id.clone()));
        };
        tracing::debug!("indented item {} under {}", id, prev);
        self.events.emit(OutlineEvent::Indent {
            id: id.clone(),
            parent: prev.clone(),
        });
        // prev shares the old parent, so its chain covers both
        self.settle(Some(&prev));
        Ok(Outcome::Applied(to))
    }

    /// Promotes `id` to the sibling slot right after its parent
    pub fn outdent(&mut self, id: &ItemId) -> OutlineResult<Location> {
        self.require(id)?;
        if let Some(r) = self.deny(id, Action::Outdent) {
            return Ok(Outcome::Rejected(r));
        }
        let Some(parent) = self.tree.parent(id).cloned() else {
            return Ok(self.unchanged(id, NoOp::AlreadyAtRoot));
        };
        let parent_location = self
            .tree
            .location(&parent)
            .ok_or_else(|| OutlineError::UnknownItem(parent.clone()))?;

        let Some((_, to)) = self.relocate(
            id,
            parent_location.parent.as_ref(),
            parent_location.index + 1,
        ) else {
            return Err(OutlineError::UnknownItem(id.clone()));
        };
        tracing::debug!("outdented item {} out of {}", id, parent);
        self.events.emit(OutlineEvent::Outdent {
            id: id.clone(),
            new_parent: parent_location.parent.clone(),
        });
        // the old parent's chain contains the new parent
        self.settle(Some(&parent));
        Ok(Outcome::Applied(to))
    }

    /// Relocates `id` to `index` under `parent` (or the root list). `index` counts
    /// positions in the destination list with the item already removed and is clamped.
    pub fn move_item(
        &mut self,
        id: &ItemId,
        parent: Option<&ItemId>,
        index: usize,
    ) -> OutlineResult<Location> {
        self.require(id)?;
        self.require_parent(parent)?;
        if let Some(r) = self.deny(id, Action::Move) {
            return Ok(Outcome::Rejected(r));
        }
        if parent.is_some_and(|p| self.tree.is_ancestor_or_self(id, p)) {
            return Ok(self.unchanged(id, NoOp::IntoOwnSubtree));
        }
        let from = self
            .tree
            .location(id)
            .ok_or_else(|| OutlineError::UnknownItem(id.clone()))?;
        if from.parent.as_ref() == parent {
            let last = self.tree.children(parent).len().saturating_sub(1);
            if index.min(last) == from.index {
                return Ok(self.unchanged(id, NoOp::SamePosition));
            }
        }
        self.move_unchecked(id, parent, index)
    }

    /// Swaps `id` with its previous sibling
    pub fn move_up(&mut self, id: &ItemId) -> OutlineResult<Location> {
        self.require(id)?;
        if let Some(r) = self.deny(id, Action::Move) {
            return Ok(Outcome::Rejected(r));
        }
        let from = self
            .tree
            .location(id)
            .ok_or_else(|| OutlineError::UnknownItem(id.clone()))?;
        if from.index == 0 {
            return Ok(self.unchanged(id, NoOp::AtBoundary));
        }
        self.move_unchecked(id, from.parent.as_ref(), from.index - 1)
    }

    /// Swaps `id` with its next sibling
    pub fn move_down(&mut self, id: &ItemId) -> OutlineResult<Location> {
        self.require(id)?;
        if let Some(r) = self.deny(id, Action::Move) {
            return Ok(Outcome::Rejected(r));
        }
        let from = self
            .tree
            .location(id)
            .ok_or_else(|| OutlineError::UnknownItem(id.clone()))?;
        if from.index + 1 >= self.tree.children(from.parent.as_ref()).len() {
            return Ok(self.unchanged(id, NoOp::AtBoundary));
        }
        self.move_unchecked(id, from.parent.as_ref(), from.index + 1)
    }

    fn move_unchecked(
        &mut self,
        id: &ItemId,
        parent: Option<&ItemId>,
        index: usize,
    ) -> OutlineResult<Location> {
        let Some((from, to)) = self.relocate(id, parent, index) else {
            return Err(OutlineError::UnknownItem(id.clone()));
        };
        let move_type = if from.parent == to.parent {
            MoveType::Reorder
        } else if to.parent.is_some() {
            MoveType::Indent
        } else {
            MoveType::Outdent
        };
        tracing::debug!("moved item {} ({:?}) to {:?}", id, move_type, to);
        self.events.emit(OutlineEvent::Move {
            id: id.clone(),
            from: from.clone(),
            to: to.clone(),
            move_type,
            parent_id: to.parent.clone(),
        });
        self.settle(from.parent.as_ref());
        if from.parent != to.parent {
            self.settle(to.parent.as_ref());
        }
        Ok(Outcome::Applied(to))
    }

    fn relocate(
        &mut self,
        id: &ItemId,
        parent: Option<&ItemId>,
        index: usize,
    ) -> Option<(Location, Location)> {
        let from = self.tree.detach(id)?;
        match self.tree.attach(id, parent, index) {
            Some(to) => Some((from, to)),
            None => {
                // unreachable for known parents; put the item back
                self.tree.attach(id, from.parent.as_ref(), from.index);
                None
            }
        }
    }

    /// Removes `id` and its whole subtree permanently
    pub fn archive(&mut self, id: &ItemId) -> OutlineResult<Archived> {
        self.require(id)?;
        if let Some(r) = self.deny(id, Action::Archive) {
            return Ok(Outcome::Rejected(r));
        }
        let Some((former, items)) = self.tree.remove_subtree(id) else {
            return Err(OutlineError::UnknownItem(id.clone()));
        };
        let removed: Vec<ItemId> = items.iter().map(|item| item.id().clone()).collect();
        let text = items
            .first()
            .map(|item| item.text().to_string())
            .unwrap_or_default();

        if self.editor.release_any(removed.iter()) {
            tracing::debug!("closed editor of archived item");
        }
        if self.edit.as_ref().is_some_and(|e| removed.contains(&e.id)) {
            self.edit = None;
        }

        let focus = self.tree.focus_candidate(&former);
        tracing::debug!("archived item {} with {} descendants", id, removed.len() - 1);
        self.events.emit(OutlineEvent::Archive {
            id: id.clone(),
            text: text.clone(),
        });
        self.settle(former.parent.as_ref());
        Ok(Outcome::Applied(Archived {
            id: id.clone(),
            text,
            removed,
            former,
            focus,
        }))
    }
}
