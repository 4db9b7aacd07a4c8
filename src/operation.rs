//! Typed operation dispatcher
//!
//! Outer layers (HTTP handlers, CLI, key bindings) describe what they want as an
//! [`Operation`] and hand it to [`Outline::dispatch`]; the engine stays UI-agnostic.

use serde::{Deserialize, Serialize};

use crate::events::EventRecord;
use crate::models::{ItemId, Note, StatusState, Timestamp};
use crate::outline::{Archived, NoOp, Outcome, Outline, OutlineError, OutlineResult};
use crate::popup::{ActiveEditor, EditorKind, PendingInput};
use crate::tree::Location;

/// A request to change the outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Operation {
    Add {
        text: String,
        #[serde(default)]
        parent: Option<ItemId>,
    },
    AddAfter {
        id: ItemId,
        text: String,
    },
    CycleForward {
        id: ItemId,
    },
    CycleBackward {
        id: ItemId,
    },
    Toggle {
        id: ItemId,
    },
    /// `status` is `none`, `status-N`, or a configured label's text
    SetStatus {
        id: ItemId,
        status: String,
    },
    Indent {
        id: ItemId,
    },
    Outdent {
        id: ItemId,
    },
    Move {
        id: ItemId,
        #[serde(default)]
        parent: Option<ItemId>,
        index: usize,
    },
    MoveUp {
        id: ItemId,
    },
    MoveDown {
        id: ItemId,
    },
    Archive {
        id: ItemId,
    },
    TogglePriority {
        id: ItemId,
    },
    ToggleBlocked {
        id: ItemId,
    },
    SetDue {
        id: ItemId,
        #[serde(default)]
        due: Option<Timestamp>,
    },
    SetSchedule {
        id: ItemId,
        #[serde(default)]
        schedule: Option<Timestamp>,
    },
    Assign {
        id: ItemId,
        #[serde(default)]
        assignee: Option<String>,
    },
    SetTags {
        id: ItemId,
        tags: Vec<String>,
    },
    ToggleTag {
        id: ItemId,
        tag: String,
        on: bool,
    },
    Comment {
        id: ItemId,
        text: String,
    },
    Worklog {
        id: ItemId,
        text: String,
    },
    StartEdit {
        id: ItemId,
    },
    SaveEdit {
        id: ItemId,
        text: String,
    },
    CancelEdit {
        id: ItemId,
    },
    EditText {
        id: ItemId,
        text: String,
    },
    OpenEditor {
        id: ItemId,
        kind: EditorKind,
    },
    Stage {
        input: PendingInput,
    },
    ConfirmEditor,
    CancelEditor,
}

impl Operation {
    /// Operation that applies input staged in an editor on `id`
    pub fn from_pending(id: ItemId, input: PendingInput) -> Self {
        match input {
            PendingInput::Status(status) => Operation::SetStatus {
                id,
                status: status.to_string(),
            },
            PendingInput::Tags(tags) => Operation::SetTags { id, tags },
            PendingInput::Due(due) => Operation::SetDue { id, due },
            PendingInput::Schedule(schedule) => Operation::SetSchedule { id, schedule },
            PendingInput::Assign(assignee) => Operation::Assign { id, assignee },
            PendingInput::Comment(text) => Operation::Comment { id, text },
            PendingInput::Worklog(text) => Operation::Worklog { id, text },
            PendingInput::Archive => Operation::Archive { id },
        }
    }

    /// Target item, if the operation has one
    pub fn id(&self) -> Option<&ItemId> {
        match self {
            Operation::Add { parent, .. } => parent.as_ref(),
            Operation::Stage { .. } | Operation::ConfirmEditor | Operation::CancelEditor => None,
            Operation::AddAfter { id, .. }
            | Operation::CycleForward { id }
            | Operation::CycleBackward { id }
            | Operation::Toggle { id }
            | Operation::SetStatus { id, .. }
            | Operation::Indent { id }
            | Operation::Outdent { id }
            | Operation::Move { id, .. }
            | Operation::MoveUp { id }
            | Operation::MoveDown { id }
            | Operation::Archive { id }
            | Operation::TogglePriority { id }
            | Operation::ToggleBlocked { id }
            | Operation::SetDue { id, .. }
            | Operation::SetSchedule { id, .. }
            | Operation::Assign { id, .. }
            | Operation::SetTags { id, .. }
            | Operation::ToggleTag { id, .. }
            | Operation::Comment { id, .. }
            | Operation::Worklog { id, .. }
            | Operation::StartEdit { id }
            | Operation::SaveEdit { id, .. }
            | Operation::CancelEdit { id }
            | Operation::EditText { id, .. }
            | Operation::OpenEditor { id, .. } => Some(id),
        }
    }
}

/// What an applied operation produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Effect {
    Done,
    Item(ItemId),
    Status(StatusState),
    Location(Location),
    Archived(Archived),
    Flag(bool),
    Timestamp(Option<Timestamp>),
    Assignee(Option<String>),
    Tags(Vec<String>),
    Note(Note),
    Text(String),
    Editor(Option<ActiveEditor>),
    Closed(ActiveEditor),
}

/// An outcome together with the events the operation emitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatched {
    pub outcome: Outcome<Effect>,
    pub events: Vec<EventRecord>,
}

impl Outline {
    pub fn dispatch(&mut self, op: Operation) -> OutlineResult<Effect> {
        tracing::debug!("dispatching {:?}", op);
        let outcome = match op {
            Operation::Add { text, parent } => self.add(&text, parent.as_ref())?.map(Effect::Item),
            Operation::AddAfter { id, text } => self.add_after(&id, &text)?.map(Effect::Item),
            Operation::CycleForward { id } => self.cycle_forward(&id)?.map(Effect::Status),
            Operation::CycleBackward { id } => self.cycle_backward(&id)?.map(Effect::Status),
            Operation::Toggle { id } => self.toggle(&id)?.map(Effect::Status),
            Operation::SetStatus { id, status } => {
                let target = self.resolve_status(&status)?;
                self.set_status(&id, target)?.map(Effect::Status)
            }
            Operation::Indent { id } => self.indent(&id)?.map(Effect::Location),
            Operation::Outdent { id } => self.outdent(&id)?.map(Effect::Location),
            Operation::Move { id, parent, index } => {
                self.move_item(&id, parent.as_ref(), index)?.map(Effect::Location)
            }
            Operation::MoveUp { id } => self.move_up(&id)?.map(Effect::Location),
            Operation::MoveDown { id } => self.move_down(&id)?.map(Effect::Location),
            Operation::Archive { id } => self.archive(&id)?.map(Effect::Archived),
            Operation::TogglePriority { id } => self.toggle_priority(&id)?.map(Effect::Flag),
            Operation::ToggleBlocked { id } => self.toggle_blocked(&id)?.map(Effect::Flag),
            Operation::SetDue { id, due } => self.set_due(&id, due)?.map(Effect::Timestamp),
            Operation::SetSchedule { id, schedule } => {
                self.set_schedule(&id, schedule)?.map(Effect::Timestamp)
            }
            Operation::Assign { id, assignee } => {
                self.set_assignee(&id, assignee.as_deref())?.map(Effect::Assignee)
            }
            Operation::SetTags { id, tags } => self.set_tags(&id, tags)?.map(Effect::Tags),
            Operation::ToggleTag { id, tag, on } => {
                self.toggle_tag(&id, &tag, on)?.map(Effect::Tags)
            }
            Operation::Comment { id, text } => self.add_comment(&id, &text)?.map(Effect::Note),
            Operation::Worklog { id, text } => self.add_worklog(&id, &text)?.map(Effect::Note),
            Operation::StartEdit { id } => self.start_edit(&id)?.map(Effect::Text),
            Operation::SaveEdit { id, text } => self.save_edit(&id, &text)?.map(Effect::Text),
            Operation::CancelEdit { id } => self.cancel_edit(&id)?.map(|()| Effect::Done),
            Operation::EditText { id, text } => self.edit_text(&id, &text)?.map(Effect::Text),
            Operation::OpenEditor { id, kind } => self.open_editor(&id, kind)?.map(Effect::Editor),
            Operation::Stage { input } => self.stage(input).map(|()| Effect::Done),
            Operation::ConfirmEditor => self.confirm_editor()?,
            Operation::CancelEditor => self.cancel_editor().map(Effect::Closed),
        };
        Ok(outcome)
    }

    /// Dispatches `op` and collects the events it emitted
    pub fn dispatch_recorded(&mut self, op: Operation) -> Result<Dispatched, OutlineError> {
        let since = self.events().last_seq();
        let outcome = self.dispatch(op)?;
        Ok(Dispatched {
            outcome,
            events: self.events_since(since),
        })
    }

    /// Applies the open editor's staged input through the regular operation (guards
    /// included) and releases the slot
    pub fn confirm_editor(&mut self) -> OutlineResult<Effect> {
        let Some(editor) = self.take_editor() else {
            return Ok(Outcome::Unchanged(NoOp::NoEditorOpen));
        };
        let Some(input) = editor.pending else {
            return Ok(Outcome::Unchanged(NoOp::NothingStaged));
        };
        self.dispatch(Operation::from_pending(editor.id, input))
    }
}
