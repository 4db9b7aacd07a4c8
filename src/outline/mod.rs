//! Outline engine
//!
//! [`Outline`] owns the item tree, configuration, event channel and editor slot. Every
//! operation runs to completion (tree edit, aggregate propagation, notification) before
//! returning. Guard rejections and structural no-ops are reported through [`Outcome`];
//! `Err` is reserved for ids that do not exist.

mod cycle;
mod handle;
mod hierarchy;
mod metadata;

pub use handle::Core;
pub use hierarchy::Archived;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::aggregate;
use crate::config::OutlineConfig;
use crate::events::{EventChannel, EventRecord, OutlineEvent};
use crate::labels::StatusLabels;
use crate::models::{Item, ItemId, ItemRecord, ItemSeed};
use crate::permission::{self, Action, Rejection};
use crate::popup::{ActiveEditor, EditorSlot};
use crate::status;
use crate::tree::ItemTree;

/// Caller mistakes. Everything else is an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutlineError {
    #[error("item {0} not found")]
    UnknownItem(ItemId),

    #[error("parent item {0} not found")]
    UnknownParent(ItemId),

    #[error("unknown status '{0}', expected 'none', 'status-N' or a configured label")]
    InvalidStatus(String),
}

/// Why an operation left the outline untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoOp {
    NoLabelsConfigured,
    SameStatus,
    FirstSibling,
    AlreadyAtRoot,
    SamePosition,
    AtBoundary,
    IntoOwnSubtree,
    NothingToChange,
    EmptyText,
    TextUnchanged,
    NoEditorOpen,
    NoMatchingEditor,
    NothingStaged,
}

/// Result of an engine operation that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "value", rename_all = "kebab-case")]
pub enum Outcome<T> {
    Applied(T),
    Unchanged(NoOp),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Rejected(r) => Some(r),
            _ => None,
        }
    }

    pub fn no_op(&self) -> Option<NoOp> {
        match self {
            Outcome::Unchanged(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Applied(value) => Outcome::Applied(f(value)),
            Outcome::Unchanged(reason) => Outcome::Unchanged(reason),
            Outcome::Rejected(r) => Outcome::Rejected(r),
        }
    }
}

pub type OutlineResult<T> = Result<Outcome<T>, OutlineError>;

/// An open text-edit session
#[derive(Debug, Clone, PartialEq, Eq)]
struct EditSession {
    id: ItemId,
    original_text: String,
}

/// The in-memory outline state machine
#[derive(Debug)]
pub struct Outline {
    config: OutlineConfig,
    tree: ItemTree,
    events: EventChannel,
    editor: EditorSlot,
    edit: Option<EditSession>,
    rng: StdRng,
}

impl Outline {
    /// Creates an empty outline with entropy-seeded ids
    pub fn new(config: OutlineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Creates an empty outline whose generated ids are reproducible
    pub fn with_seed(config: OutlineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: OutlineConfig, rng: StdRng) -> Self {
        Self {
            config,
            tree: ItemTree::new(),
            events: EventChannel::new(),
            editor: EditorSlot::default(),
            edit: None,
            rng,
        }
    }

    /// Builder form of [`Outline::load`]
    pub fn with_items(mut self, seeds: Vec<ItemSeed>) -> Self {
        self.load(seeds);
        self
    }

    /// Appends externally supplied items, then recomputes every aggregate.
    ///
    /// Completed items whose completable children are not all completed are reopened
    /// (without events) so the loaded tree satisfies the completion guard.
    pub fn load(&mut self, seeds: Vec<ItemSeed>) {
        let labels = &self.config.status_labels;
        self.tree.load(seeds, labels, &mut self.rng);

        // children before parents
        for (_, id) in self.tree.walk().into_iter().rev() {
            aggregate::recompute(&mut self.tree, labels, &id);
            if aggregate_violation(&self.tree, labels, &id) {
                let reopened = status::reopen_state(labels);
                tracing::warn!(
                    "item {} is completed with incomplete children, reopening as {}",
                    id,
                    reopened
                );
                if let Some(item) = self.tree.get_mut(&id) {
                    item.status = reopened;
                }
            }
        }
        tracing::debug!("loaded outline with {} items", self.tree.len());
    }

    /// Forwards every emitted event to a broadcast channel
    pub fn attach_events(&mut self, sender: tokio::sync::broadcast::Sender<EventRecord>) {
        self.events.attach(sender);
    }

    pub fn config(&self) -> &OutlineConfig {
        &self.config
    }

    pub fn labels(&self) -> &StatusLabels {
        &self.config.status_labels
    }

    pub fn tree(&self) -> &ItemTree {
        &self.tree
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.tree.get(id)
    }

    /// Nested read-only export of the whole outline
    pub fn records(&self) -> Vec<ItemRecord> {
        self.tree.records(&self.config.status_labels)
    }

    pub fn record(&self, id: &ItemId) -> Option<ItemRecord> {
        self.tree.record(id, &self.config.status_labels)
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    pub fn events_since(&self, seq: u64) -> Vec<EventRecord> {
        self.events.events_since(seq)
    }

    pub fn active_editor(&self) -> Option<&ActiveEditor> {
        self.editor.active()
    }

    /// Item whose text is currently being edited
    pub fn editing(&self) -> Option<&ItemId> {
        self.edit.as_ref().map(|e| &e.id)
    }

    fn require(&self, id: &ItemId) -> Result<(), OutlineError> {
        if self.tree.contains(id) {
            Ok(())
        } else {
            Err(OutlineError::UnknownItem(id.clone()))
        }
    }

    fn require_parent(&self, parent: Option<&ItemId>) -> Result<(), OutlineError> {
        match parent {
            Some(p) if !self.tree.contains(p) => Err(OutlineError::UnknownParent(p.clone())),
            _ => Ok(()),
        }
    }

    /// Runs the permission guard, emitting `item:permission-denied` on refusal
    fn deny(&mut self, id: &ItemId, action: Action) -> Option<Rejection> {
        permission::check(&self.tree, id, action)
            .err()
            .map(|rejection| self.reject(rejection))
    }

    fn reject(&mut self, rejection: Rejection) -> Rejection {
        tracing::info!("rejected {} on item {}", rejection.action, rejection.id);
        self.events.emit(OutlineEvent::PermissionDenied {
            id: rejection.id.clone(),
            action: rejection.action,
        });
        rejection
    }

    fn unchanged<T>(&self, id: &ItemId, reason: NoOp) -> Outcome<T> {
        tracing::info!("no change for item {}: {:?}", id, reason);
        Outcome::Unchanged(reason)
    }

    fn next_id(&mut self) -> ItemId {
        loop {
            let id = ItemId::random(&mut self.rng);
            if !self.tree.contains(&id) {
                return id;
            }
        }
    }

    /// Recomputes aggregates from `from` up to the root, reopening completed ancestors
    /// that gained an incomplete completable child. Nearest ancestor first.
    fn settle(&mut self, from: Option<&ItemId>) {
        let mut current = from.cloned();
        while let Some(id) = current {
            aggregate::recompute(&mut self.tree, &self.config.status_labels, &id);
            if aggregate_violation(&self.tree, &self.config.status_labels, &id) {
                self.reopen(&id);
            }
            current = self.tree.parent(&id).cloned();
        }
    }

    fn reopen(&mut self, id: &ItemId) {
        let labels = &self.config.status_labels;
        let reopened = status::reopen_state(labels);
        let Some(item) = self.tree.get_mut(id) else {
            return;
        };
        item.status = reopened;
        let completed = reopened.is_completed(labels);
        tracing::debug!("reopened item {} as {}", id, reopened);
        self.events.emit(OutlineEvent::Status {
            id: id.clone(),
            to: reopened,
            completed,
            has_label: reopened.has_label(),
        });
    }
}

/// A completed item with an incomplete completable child
fn aggregate_violation(tree: &ItemTree, labels: &StatusLabels, id: &ItemId) -> bool {
    tree.get(id).is_some_and(|item| item.is_completed(labels))
        && aggregate::has_incomplete_children(tree, labels, id)
}
