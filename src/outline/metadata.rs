//! Collaborative metadata, text editing and the editor slot.
//!
//! Metadata changes (priority, blocked, dates, assignee, tags, comments, worklog) are not
//! gated by the editable flag. Text edits are.

use chrono::Utc;

use super::{EditSession, NoOp, Outcome, Outline, OutlineError, OutlineResult};
use crate::events::OutlineEvent;
use crate::models::{normalize_tags, Item, ItemId, Note, Timestamp};
use crate::permission::Action;
use crate::popup::{ActiveEditor, EditorKind, PendingInput};

impl Outline {
    fn item_mut(&mut self, id: &ItemId) -> Result<&mut Item, OutlineError> {
        self.tree
            .get_mut(id)
            .ok_or_else(|| OutlineError::UnknownItem(id.clone()))
    }

    pub fn toggle_priority(&mut self, id: &ItemId) -> OutlineResult<bool> {
        let item = self.item_mut(id)?;
        item.priority = !item.priority;
        let priority = item.priority;
        self.events.emit(OutlineEvent::Priority {
            id: id.clone(),
            priority,
        });
        Ok(Outcome::Applied(priority))
    }

    pub fn toggle_blocked(&mut self, id: &ItemId) -> OutlineResult<bool> {
        let item = self.item_mut(id)?;
        item.blocked = !item.blocked;
        let blocked = item.blocked;
        self.events.emit(OutlineEvent::Blocked {
            id: id.clone(),
            blocked,
        });
        Ok(Outcome::Applied(blocked))
    }

    /// Sets or clears (`None`) the due date
    pub fn set_due(&mut self, id: &ItemId, due: Option<Timestamp>) -> OutlineResult<Option<Timestamp>> {
        self.item_mut(id)?.due = due;
        self.events.emit(OutlineEvent::Due {
            id: id.clone(),
            timestamp: due,
        });
        Ok(Outcome::Applied(due))
    }

    /// Sets or clears (`None`) the scheduled date
    pub fn set_schedule(
        &mut self,
        id: &ItemId,
        schedule: Option<Timestamp>,
    ) -> OutlineResult<Option<Timestamp>> {
        self.item_mut(id)?.schedule = schedule;
        self.events.emit(OutlineEvent::Schedule {
            id: id.clone(),
            timestamp: schedule,
        });
        Ok(Outcome::Applied(schedule))
    }

    /// Assigns the item; blank names unassign it
    pub fn set_assignee(
        &mut self,
        id: &ItemId,
        assignee: Option<&str>,
    ) -> OutlineResult<Option<String>> {
        let assignee = assignee
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        if assignee
            .as_ref()
            .is_some_and(|a| !self.config.assignees.is_empty() && !self.config.assignees.contains(a))
        {
            tracing::debug!("assigning item {} to unlisted assignee", id);
        }
        self.item_mut(id)?.assignee = assignee.clone();
        self.events.emit(OutlineEvent::Assign {
            id: id.clone(),
            assignee: assignee.clone(),
        });
        Ok(Outcome::Applied(assignee))
    }

    /// Replaces the tag set (normalized: no `#`, no blanks, no duplicates)
    pub fn set_tags<I, S>(&mut self, id: &ItemId, tags: I) -> OutlineResult<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags = normalize_tags(tags);
        self.item_mut(id)?.tags = tags.clone();
        self.events.emit(OutlineEvent::Tags {
            id: id.clone(),
            tags: tags.clone(),
        });
        Ok(Outcome::Applied(tags))
    }

    /// Adds (`on`) or removes a single tag
    pub fn toggle_tag(&mut self, id: &ItemId, tag: &str, on: bool) -> OutlineResult<Vec<String>> {
        self.require(id)?;
        let Some(tag) = normalize_tags([tag]).pop() else {
            return Ok(self.unchanged(id, NoOp::EmptyText));
        };
        let current = self.item_mut(id)?.tags.clone();
        if current.contains(&tag) == on {
            return Ok(self.unchanged(id, NoOp::NothingToChange));
        }
        let next: Vec<String> = if on {
            current.into_iter().chain(std::iter::once(tag)).collect()
        } else {
            current.into_iter().filter(|t| *t != tag).collect()
        };
        self.set_tags(id, next)
    }

    /// Appends a comment authored by the configured current user
    pub fn add_comment(&mut self, id: &ItemId, text: &str) -> OutlineResult<Note> {
        self.require(id)?;
        let Some(note) = self.note(text) else {
            return Ok(self.unchanged(id, NoOp::EmptyText));
        };
        self.item_mut(id)?.comments.push(note.clone());
        self.events.emit(OutlineEvent::Comment {
            id: id.clone(),
            comment: note.clone(),
        });
        Ok(Outcome::Applied(note))
    }

    /// Appends a worklog entry authored by the configured current user
    pub fn add_worklog(&mut self, id: &ItemId, text: &str) -> OutlineResult<Note> {
        self.require(id)?;
        let Some(note) = self.note(text) else {
            return Ok(self.unchanged(id, NoOp::EmptyText));
        };
        self.item_mut(id)?.worklog.push(note.clone());
        self.events.emit(OutlineEvent::Worklog {
            id: id.clone(),
            worklog_entry: note.clone(),
        });
        Ok(Outcome::Applied(note))
    }

    fn note(&mut self, text: &str) -> Option<Note> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Note {
            id: ItemId::random(&mut self.rng).to_string(),
            text: text.to_string(),
            author: self.config.current_user.clone(),
            timestamp: Utc::now(),
        })
    }

    /// Opens a text-edit session. A session open on another item is cancelled first.
    pub fn start_edit(&mut self, id: &ItemId) -> OutlineResult<String> {
        self.require(id)?;
        if let Some(r) = self.deny(id, Action::Edit) {
            return Ok(Outcome::Rejected(r));
        }
        let original_text = self.item_mut(id)?.text.clone();
        if let Some(displaced) = self.edit.take().filter(|s| &s.id != id) {
            self.events.emit(OutlineEvent::EditCancel { id: displaced.id });
        }
        self.edit = Some(EditSession {
            id: id.clone(),
            original_text: original_text.clone(),
        });
        self.events.emit(OutlineEvent::EditStart {
            id: id.clone(),
            original_text: original_text.clone(),
        });
        Ok(Outcome::Applied(original_text))
    }

    /// Commits new text. Blank or unchanged text cancels the edit instead.
    pub fn save_edit(&mut self, id: &ItemId, text: &str) -> OutlineResult<String> {
        self.require(id)?;
        if let Some(r) = self.deny(id, Action::Edit) {
            return Ok(Outcome::Rejected(r));
        }
        let session = self.take_session(id);
        let item = self.item_mut(id)?;
        let original_text = session
            .map(|s| s.original_text)
            .unwrap_or_else(|| item.text.clone());
        let new_text = text.trim();

        let reason = if new_text.is_empty() {
            Some(NoOp::EmptyText)
        } else if new_text == item.text {
            Some(NoOp::TextUnchanged)
        } else {
            None
        };
        if let Some(reason) = reason {
            self.events.emit(OutlineEvent::EditCancel { id: id.clone() });
            return Ok(self.unchanged(id, reason));
        }

        item.text = new_text.to_string();
        tracing::debug!("edited text of item {}", id);
        self.events.emit(OutlineEvent::EditSave {
            id: id.clone(),
            original_text,
            new_text: new_text.to_string(),
        });
        Ok(Outcome::Applied(new_text.to_string()))
    }

    /// Closes the edit session without touching the text
    pub fn cancel_edit(&mut self, id: &ItemId) -> OutlineResult<()> {
        self.require(id)?;
        self.take_session(id);
        self.events.emit(OutlineEvent::EditCancel { id: id.clone() });
        Ok(Outcome::Applied(()))
    }

    /// One-shot text replacement, equivalent to a start/save pair
    pub fn edit_text(&mut self, id: &ItemId, text: &str) -> OutlineResult<String> {
        self.save_edit(id, text)
    }

    /// Opens a metadata editor on `id`, closing any open one. Returns the displaced editor.
    pub fn open_editor(
        &mut self,
        id: &ItemId,
        kind: EditorKind,
    ) -> OutlineResult<Option<ActiveEditor>> {
        self.require(id)?;
        let displaced = self.editor.open(id.clone(), kind);
        if let Some(previous) = &displaced {
            tracing::debug!("closed {:?} editor on {} without applying", previous.kind, previous.id);
        }
        Ok(Outcome::Applied(displaced))
    }

    /// Stages input in the open editor
    pub fn stage(&mut self, input: PendingInput) -> Outcome<()> {
        if self.editor.stage(input) {
            Outcome::Applied(())
        } else {
            Outcome::Unchanged(NoOp::NoMatchingEditor)
        }
    }

    /// Closes the open editor without applying anything
    pub fn cancel_editor(&mut self) -> Outcome<ActiveEditor> {
        match self.editor.take() {
            Some(editor) => Outcome::Applied(editor),
            None => Outcome::Unchanged(NoOp::NoEditorOpen),
        }
    }

    fn take_session(&mut self, id: &ItemId) -> Option<EditSession> {
        if self.edit.as_ref().is_some_and(|s| s.id == *id) {
            self.edit.take()
        } else {
            None
        }
    }

    /// Releases the slot, returning the editor for the caller to apply
    pub(crate) fn take_editor(&mut self) -> Option<ActiveEditor> {
        self.editor.take()
    }
}
