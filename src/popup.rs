//! Active editor slot
//!
//! At most one metadata editor (status picker, tag editor, date picker, ...) is open at a
//! time. Opening one closes whatever was open before; pending input is only applied on
//! confirm and is discarded on cancel.

use serde::{Deserialize, Serialize};

use crate::models::{ItemId, StatusState, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditorKind {
    Status,
    Tags,
    Due,
    Schedule,
    Assign,
    Comments,
    Worklog,
    Archive,
}

/// Input staged in an open editor, not yet applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum PendingInput {
    Status(StatusState),
    Tags(Vec<String>),
    Due(Option<Timestamp>),
    Schedule(Option<Timestamp>),
    Assign(Option<String>),
    Comment(String),
    Worklog(String),
    /// Archive confirmation
    Archive,
}

impl PendingInput {
    /// Editor kind this input belongs to
    pub fn kind(&self) -> EditorKind {
        match self {
            PendingInput::Status(_) => EditorKind::Status,
            PendingInput::Tags(_) => EditorKind::Tags,
            PendingInput::Due(_) => EditorKind::Due,
            PendingInput::Schedule(_) => EditorKind::Schedule,
            PendingInput::Assign(_) => EditorKind::Assign,
            PendingInput::Comment(_) => EditorKind::Comments,
            PendingInput::Worklog(_) => EditorKind::Worklog,
            PendingInput::Archive => EditorKind::Archive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEditor {
    pub id: ItemId,
    pub kind: EditorKind,
    pub pending: Option<PendingInput>,
}

/// The single-holder editor slot
#[derive(Debug, Clone, Default)]
pub struct EditorSlot {
    active: Option<ActiveEditor>,
}

impl EditorSlot {
    pub fn active(&self) -> Option<&ActiveEditor> {
        self.active.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Opens an editor, returning the one it displaced (closed without applying)
    pub fn open(&mut self, id: ItemId, kind: EditorKind) -> Option<ActiveEditor> {
        self.active.replace(ActiveEditor {
            id,
            kind,
            pending: None,
        })
    }

    /// Stages input for the open editor. Returns false if nothing is open or the input
    /// belongs to another kind of editor.
    pub fn stage(&mut self, input: PendingInput) -> bool {
        match self.active.as_mut() {
            Some(editor) if editor.kind == input.kind() => {
                editor.pending = Some(input);
                true
            }
            _ => false,
        }
    }

    /// Releases the slot
    pub fn take(&mut self) -> Option<ActiveEditor> {
        self.active.take()
    }

    /// Releases the slot if its editor targets one of `ids`
    pub fn release_any<'a>(&mut self, mut ids: impl Iterator<Item = &'a ItemId>) -> bool {
        let hit = self
            .active
            .as_ref()
            .is_some_and(|editor| ids.any(|id| *id == editor.id));
        if hit {
            self.active = None;
        }
        hit
    }
}
