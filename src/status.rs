//! Status transition tables
//!
//! Pure functions from the current state to the next one. Applying a transition (the
//! completion guard, events, aggregate updates) happens in [`crate::outline`].
//!
//! With zero configured labels there is no valid labelled state, so every table returns
//! its input unchanged.

use crate::aggregate;
use crate::labels::StatusLabels;
use crate::models::{ItemId, StatusState};
use crate::tree::ItemTree;

/// Next state when cycling forward.
///
/// `NoLabel` starts at the first label; open labels advance one step; an end state jumps to
/// the next end state by index, or back to `NoLabel` after the last one. A final label that
/// is not an end state also returns to `NoLabel`. Indices outside the list fall back to the
/// first label.
///
/// Returning to `NoLabel` from a final open label departs from the usual fallback to the
/// first label, so that forward cycling always passes through `NoLabel`.
pub fn forward(labels: &StatusLabels, current: StatusState) -> StatusState {
    if labels.is_empty() {
        return current;
    }
    let last = labels.len() - 1;
    match current {
        StatusState::NoLabel => StatusState::Status(0),
        StatusState::Status(i) if i > last => StatusState::Status(0),
        StatusState::Status(i) if labels.is_end(i) => labels
            .next_end_after(i)
            .map_or(StatusState::NoLabel, StatusState::Status),
        StatusState::Status(i) if i < last => StatusState::Status(i + 1),
        StatusState::Status(_) => StatusState::NoLabel,
    }
}

/// Next state when cycling backward.
///
/// `NoLabel` wraps to the last end state (the last label if none is flagged), the first label
/// steps down to `NoLabel`, every other label steps to its predecessor. Indices outside the
/// list fall back like `NoLabel` does.
pub fn backward(labels: &StatusLabels, current: StatusState) -> StatusState {
    if labels.is_empty() {
        return current;
    }
    let wrap = StatusState::Status(labels.last_end().unwrap_or(labels.len() - 1));
    match current {
        StatusState::NoLabel => wrap,
        StatusState::Status(i) if i >= labels.len() => wrap,
        StatusState::Status(0) => StatusState::NoLabel,
        StatusState::Status(i) => StatusState::Status(i - 1),
    }
}

/// Legacy single-click toggle.
///
/// Any completed item drops straight to `NoLabel` (chained end states are never visited),
/// `NoLabel` goes to the first label, and open labels advance one step, leaving the final
/// label for `NoLabel`.
pub fn toggle(labels: &StatusLabels, current: StatusState) -> StatusState {
    if labels.is_empty() {
        return current;
    }
    match current {
        s if s.is_completed(labels) => StatusState::NoLabel,
        StatusState::NoLabel => StatusState::Status(0),
        StatusState::Status(i) if i >= labels.len() => StatusState::Status(0),
        StatusState::Status(i) if i + 1 < labels.len() => StatusState::Status(i + 1),
        StatusState::Status(_) => StatusState::NoLabel,
    }
}

/// Maps a requested target onto a configured state; unknown indices fall back to the
/// first label. `None` when no labels are configured.
pub fn normalize_target(labels: &StatusLabels, target: StatusState) -> Option<StatusState> {
    if labels.is_empty() {
        return None;
    }
    Some(match target {
        StatusState::Status(i) if i >= labels.len() => StatusState::Status(0),
        other => other,
    })
}

/// Completion guard: an item may not enter an end state while a completable direct child
/// is still incomplete. Headers are never blocked since `NoLabel` is not an end state.
pub fn can_enter(tree: &ItemTree, labels: &StatusLabels, id: &ItemId, target: StatusState) -> bool {
    !target.is_completed(labels) || !aggregate::has_incomplete_children(tree, labels, id)
}

/// State a completed parent falls back to when it regains an incomplete child: the first
/// open label, or a header when every label is an end state
pub fn reopen_state(labels: &StatusLabels) -> StatusState {
    labels
        .first_open()
        .map_or(StatusState::NoLabel, StatusState::Status)
}
