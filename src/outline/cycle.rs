//! Status operations: cycling, the legacy toggle, and direct assignment

use super::{NoOp, Outcome, Outline, OutlineError, OutlineResult};
use crate::events::OutlineEvent;
use crate::labels::StatusLabels;
use crate::models::{ItemId, StatusState};
use crate::permission::{Action, Rejection};
use crate::status;

type Table = fn(&StatusLabels, StatusState) -> StatusState;

impl Outline {
    pub fn cycle_forward(&mut self, id: &ItemId) -> OutlineResult<StatusState> {
        self.transition(id, status::forward)
    }

    pub fn cycle_backward(&mut self, id: &ItemId) -> OutlineResult<StatusState> {
        self.transition(id, status::backward)
    }

    /// Single-click toggle kept for compatibility with older front ends
    pub fn toggle(&mut self, id: &ItemId) -> OutlineResult<StatusState> {
        self.transition(id, status::toggle)
    }

    /// Sets a status directly. Indices outside the configured list fall back to the
    /// first label.
    pub fn set_status(&mut self, id: &ItemId, target: StatusState) -> OutlineResult<StatusState> {
        self.require(id)?;
        if let Some(r) = self.deny(id, Action::Status) {
            return Ok(Outcome::Rejected(r));
        }
        let Some(normalized) = status::normalize_target(self.labels(), target) else {
            return Ok(self.unchanged(id, NoOp::NoLabelsConfigured));
        };
        if normalized != target {
            tracing::warn!(
                "status {} is not configured, falling back to {} for item {}",
                target,
                normalized,
                id
            );
        }
        self.apply_status(id, normalized)
    }

    /// Resolves status text (`none`, `status-N`, or a label) against the configured labels
    pub fn resolve_status(&self, text: &str) -> Result<StatusState, OutlineError> {
        StatusState::resolve(text, self.labels())
            .ok_or_else(|| OutlineError::InvalidStatus(text.to_string()))
    }

    fn transition(&mut self, id: &ItemId, table: Table) -> OutlineResult<StatusState> {
        let current = self
            .item(id)
            .map(|item| item.status())
            .ok_or_else(|| OutlineError::UnknownItem(id.clone()))?;
        if let Some(r) = self.deny(id, Action::Status) {
            return Ok(Outcome::Rejected(r));
        }
        if self.labels().is_empty() {
            return Ok(self.unchanged(id, NoOp::NoLabelsConfigured));
        }
        if current.index().is_some_and(|i| i >= self.labels().len()) {
            tracing::warn!(
                "item {} has unconfigured status {}, using fallback transition",
                id,
                current
            );
        }
        let next = table(self.labels(), current);
        self.apply_status(id, next)
    }

    /// Applies a normalized target, enforcing the completion guard
    fn apply_status(&mut self, id: &ItemId, target: StatusState) -> OutlineResult<StatusState> {
        let current = self
            .item(id)
            .map(|item| item.status())
            .ok_or_else(|| OutlineError::UnknownItem(id.clone()))?;
        if current == target {
            return Ok(self.unchanged(id, NoOp::SameStatus));
        }
        if !status::can_enter(&self.tree, self.labels(), id, target) {
            let rejection = self.reject(Rejection::new(
                id.clone(),
                Action::CompleteWithIncompleteChildren,
            ));
            return Ok(Outcome::Rejected(rejection));
        }

        if let Some(item) = self.tree.get_mut(id) {
            item.status = target;
        }
        let completed = target.is_completed(self.labels());
        tracing::debug!("item {} status {} -> {}", id, current, target);
        self.events.emit(OutlineEvent::Status {
            id: id.clone(),
            to: target,
            completed,
            has_label: target.has_label(),
        });

        let parent = self.tree.parent(id).cloned();
        self.settle(parent.as_ref());
        Ok(Outcome::Applied(target))
    }
}
