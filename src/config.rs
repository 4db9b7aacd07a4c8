//! Outline configuration
//!
//! Supplied once at construction, usually from a JSON document shaped like the
//! widget options (`statusLabels`, `assignees`, `tags`, `currentUser`, `features`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::labels::StatusLabels;
use crate::operation::Operation;
use crate::popup::EditorKind;

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutlineConfig {
    pub status_labels: StatusLabels,
    pub assignees: Vec<String>,
    pub tags: Vec<String>,
    pub current_user: String,
    pub features: Features,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            status_labels: StatusLabels::default(),
            assignees: Vec::new(),
            tags: Vec::new(),
            current_user: "current-user".to_string(),
            features: Features::default(),
        }
    }
}

impl OutlineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

/// Feature gates for UI affordances.
///
/// These never restrict the engine; only outer surfaces consult them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Features {
    pub priority: bool,
    pub blocked: bool,
    pub due: bool,
    pub schedule: bool,
    pub assign: bool,
    pub tags: bool,
    pub comments: bool,
    pub worklog: bool,
    pub archive: bool,
    pub add_button: bool,
    pub navigation: bool,
    pub reorder: bool,
    pub drag_and_drop: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            priority: true,
            blocked: true,
            due: true,
            schedule: true,
            assign: true,
            tags: true,
            comments: true,
            worklog: true,
            archive: true,
            add_button: true,
            navigation: true,
            reorder: true,
            drag_and_drop: true,
        }
    }
}

impl Features {
    /// Whether a UI surface should expose `op`
    pub fn allows(&self, op: &Operation) -> bool {
        match op {
            Operation::Add { .. } | Operation::AddAfter { .. } => self.add_button,
            Operation::TogglePriority { .. } => self.priority,
            Operation::ToggleBlocked { .. } => self.blocked,
            Operation::SetDue { .. } => self.due,
            Operation::SetSchedule { .. } => self.schedule,
            Operation::Assign { .. } => self.assign,
            Operation::SetTags { .. } | Operation::ToggleTag { .. } => self.tags,
            Operation::Comment { .. } => self.comments,
            Operation::Worklog { .. } => self.worklog,
            Operation::Archive { .. } => self.archive,
            Operation::MoveUp { .. } | Operation::MoveDown { .. } => self.reorder,
            Operation::Move { .. } => self.drag_and_drop,
            Operation::OpenEditor { kind, .. } => self.allows_editor(*kind),
            Operation::Stage { input } => self.allows_editor(input.kind()),
            _ => true,
        }
    }

    /// Whether a metadata editor of `kind` may be opened or filled
    pub fn allows_editor(&self, kind: EditorKind) -> bool {
        match kind {
            EditorKind::Status => true,
            EditorKind::Tags => self.tags,
            EditorKind::Due => self.due,
            EditorKind::Schedule => self.schedule,
            EditorKind::Assign => self.assign,
            EditorKind::Comments => self.comments,
            EditorKind::Worklog => self.worklog,
            EditorKind::Archive => self.archive,
        }
    }
}
