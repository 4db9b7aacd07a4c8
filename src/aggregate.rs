//! Completion aggregates
//!
//! A parent's progress counts its *completable* direct children (anything that is not a
//! header) and how many of them are completed. Parents with no completable children carry
//! no progress at all rather than `0/0`.

use crate::labels::StatusLabels;
use crate::models::{ItemId, Progress};
use crate::tree::ItemTree;

/// Fresh progress of `id`, computed from its direct children
pub fn child_progress(tree: &ItemTree, labels: &StatusLabels, id: &ItemId) -> Option<Progress> {
    let (done, total) = tree
        .children(Some(id))
        .iter()
        .filter_map(|c| tree.get(c))
        .filter(|c| c.status().has_label())
        .fold((0, 0), |(done, total), c| {
            (done + usize::from(c.is_completed(labels)), total + 1)
        });
    (total > 0).then_some(Progress { done, total })
}

/// True if `id` has a completable direct child that is not completed
pub fn has_incomplete_children(tree: &ItemTree, labels: &StatusLabels, id: &ItemId) -> bool {
    child_progress(tree, labels, id).is_some_and(|p| p.done < p.total)
}

/// Recomputes and caches the progress of a single item
pub fn recompute(tree: &mut ItemTree, labels: &StatusLabels, id: &ItemId) {
    let progress = child_progress(tree, labels, id);
    tree.set_progress(id, progress);
}

/// Recomputes `id` and every ancestor up to the root list
pub fn propagate(tree: &mut ItemTree, labels: &StatusLabels, id: &ItemId) {
    let mut current = Some(id.clone());
    while let Some(next) = current {
        recompute(tree, labels, &next);
        current = tree.parent(&next).cloned();
    }
}

/// Recomputes every node, e.g. after loading or a label change
pub fn recompute_all(tree: &mut ItemTree, labels: &StatusLabels) {
    for (_, id) in tree.walk() {
        recompute(tree, labels, &id);
    }
}

/// Items whose cached progress differs from a full re-scan
pub fn stale_items(tree: &ItemTree, labels: &StatusLabels) -> Vec<ItemId> {
    tree.walk()
        .into_iter()
        .map(|(_, id)| id)
        .filter(|id| tree.progress(id) != child_progress(tree, labels, id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Item, StatusState};

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    fn add(tree: &mut ItemTree, name: &str, parent: Option<&str>, status: StatusState) {
        let parent = parent.map(id);
        tree.insert(Item::new(id(name), name, status), parent.as_ref(), usize::MAX)
            .unwrap();
    }

    #[test]
    fn test_headers_are_not_counted() {
        let labels = StatusLabels::default();
        let mut tree = ItemTree::new();
        add(&mut tree, "p", None, StatusState::NoLabel);
        add(&mut tree, "a", Some("p"), StatusState::Status(0));
        add(&mut tree, "b", Some("p"), StatusState::Status(1));
        add(&mut tree, "h", Some("p"), StatusState::NoLabel);

        assert_eq!(
            child_progress(&tree, &labels, &id("p")),
            Some(Progress { done: 1, total: 2 })
        );
        assert!(has_incomplete_children(&tree, &labels, &id("p")));
    }

    #[test]
    fn test_only_headers_means_no_progress() {
        let labels = StatusLabels::default();
        let mut tree = ItemTree::new();
        add(&mut tree, "p", None, StatusState::Status(0));
        add(&mut tree, "h", Some("p"), StatusState::NoLabel);

        recompute(&mut tree, &labels, &id("p"));
        assert_eq!(tree.progress(&id("p")), None);
        assert!(!has_incomplete_children(&tree, &labels, &id("p")));
    }

    #[test]
    fn test_propagate_walks_to_root() {
        let labels = StatusLabels::default();
        let mut tree = ItemTree::new();
        add(&mut tree, "g", None, StatusState::Status(0));
        add(&mut tree, "p", Some("g"), StatusState::Status(0));
        add(&mut tree, "c", Some("p"), StatusState::Status(1));

        assert_eq!(stale_items(&tree, &labels), vec![id("g"), id("p")]);
        propagate(&mut tree, &labels, &id("c"));
        assert!(stale_items(&tree, &labels).is_empty());
        assert_eq!(tree.progress(&id("p")), Some(Progress { done: 1, total: 1 }));
        assert_eq!(tree.progress(&id("g")), Some(Progress { done: 0, total: 1 }));
    }

    #[test]
    fn test_recompute_all_clears_staleness() {
        let labels = StatusLabels::default();
        let mut tree = ItemTree::new();
        add(&mut tree, "a", None, StatusState::Status(0));
        add(&mut tree, "b", Some("a"), StatusState::Status(0));
        add(&mut tree, "c", Some("b"), StatusState::Status(0));
        recompute_all(&mut tree, &labels);
        assert!(stale_items(&tree, &labels).is_empty());
    }
}
