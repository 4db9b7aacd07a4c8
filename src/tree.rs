//! Item tree
//!
//! Arena storage for the outline: every node is keyed by its id and records its parent id,
//! so ancestor walks are O(depth) and no node holds a back-reference. Root items live in
//! an ordered root list; there is no synthetic root node.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::labels::StatusLabels;
use crate::models::{normalize_tags, Item, ItemId, ItemRecord, ItemSeed, Progress, StatusState};

#[derive(Debug, Clone)]
struct Node {
    item: Item,
    parent: Option<ItemId>,
    children: Vec<ItemId>,
    progress: Option<Progress>,
}

/// Position of an item: its parent (`None` for the root list) and sibling index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub parent: Option<ItemId>,
    pub index: usize,
}

/// Rooted, ordered forest of items
#[derive(Debug, Clone, Default)]
pub struct ItemTree {
    nodes: HashMap<ItemId, Node>,
    roots: Vec<ItemId>,
}

impl ItemTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.nodes.get(id).map(|n| &n.item)
    }

    pub(crate) fn get_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.nodes.get_mut(id).map(|n| &mut n.item)
    }

    /// Parent of `id`, `None` for root items and unknown ids
    pub fn parent(&self, id: &ItemId) -> Option<&ItemId> {
        self.nodes.get(id).and_then(|n| n.parent.as_ref())
    }

    /// Ordered children of `parent`, or the root list for `None`
    pub fn children(&self, parent: Option<&ItemId>) -> &[ItemId] {
        match parent {
            None => &self.roots,
            Some(p) => self.nodes.get(p).map_or(&[], |n| n.children.as_slice()),
        }
    }

    pub fn has_children(&self, id: &ItemId) -> bool {
        !self.children(Some(id)).is_empty()
    }

    /// Cached completion aggregate, absent when there are no completable children
    pub fn progress(&self, id: &ItemId) -> Option<Progress> {
        self.nodes.get(id).and_then(|n| n.progress)
    }

    pub(crate) fn set_progress(&mut self, id: &ItemId, progress: Option<Progress>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.progress = progress;
        }
    }

    pub fn location(&self, id: &ItemId) -> Option<Location> {
        let node = self.nodes.get(id)?;
        let index = self
            .children(node.parent.as_ref())
            .iter()
            .position(|c| c == id)?;
        Some(Location {
            parent: node.parent.clone(),
            index,
        })
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: &ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p.clone());
            current = self.parent(p);
        }
        out
    }

    /// True if `ancestor` is `id` itself or lies on its parent chain
    pub fn is_ancestor_or_self(&self, ancestor: &ItemId, id: &ItemId) -> bool {
        ancestor == id || self.ancestors(id).iter().any(|a| a == ancestor)
    }

    /// Depth-first traversal in document order as `(depth, id)`
    pub fn walk(&self) -> Vec<(usize, ItemId)> {
        fn visit(tree: &ItemTree, list: &[ItemId], depth: usize, out: &mut Vec<(usize, ItemId)>) {
            for id in list {
                out.push((depth, id.clone()));
                visit(tree, tree.children(Some(id)), depth + 1, out);
            }
        }

        let mut out = Vec::with_capacity(self.nodes.len());
        visit(self, &self.roots, 0, &mut out);
        out
    }

    /// Nested read-only export of the whole outline
    pub fn records(&self, labels: &StatusLabels) -> Vec<ItemRecord> {
        self.roots.iter().filter_map(|id| self.record(id, labels)).collect()
    }

    pub fn record(&self, id: &ItemId, labels: &StatusLabels) -> Option<ItemRecord> {
        let node = self.nodes.get(id)?;
        Some(ItemRecord {
            item: node.item.clone(),
            label: node
                .item
                .status()
                .index()
                .and_then(|i| labels.get(i))
                .map(|l| l.label().to_string()),
            completed: node.item.is_completed(labels),
            progress: node.progress,
            children: node
                .children
                .iter()
                .filter_map(|c| self.record(c, labels))
                .collect(),
        })
    }

    /// Focus target after an item left `former`: next sibling, else previous sibling,
    /// else the former parent, else the first remaining item
    pub fn focus_candidate(&self, former: &Location) -> Option<ItemId> {
        let siblings = self.children(former.parent.as_ref());
        siblings
            .get(former.index)
            .or_else(|| former.index.checked_sub(1).and_then(|i| siblings.get(i)))
            .or(former.parent.as_ref())
            .or_else(|| self.roots.first())
            .cloned()
    }

    fn list_mut(&mut self, parent: Option<&ItemId>) -> Option<&mut Vec<ItemId>> {
        match parent {
            None => Some(&mut self.roots),
            Some(p) => self.nodes.get_mut(p).map(|n| &mut n.children),
        }
    }

    /// Inserts a new leaf under `parent` at `index` (clamped to the list length).
    /// Returns `None` if the parent is unknown or the id is already present.
    pub(crate) fn insert(
        &mut self,
        item: Item,
        parent: Option<&ItemId>,
        index: usize,
    ) -> Option<Location> {
        if self.contains(item.id()) || parent.is_some_and(|p| !self.contains(p)) {
            return None;
        }
        let id = item.id().clone();
        self.nodes.insert(
            id.clone(),
            Node {
                item,
                parent: None,
                children: Vec::new(),
                progress: None,
            },
        );
        self.attach(&id, parent, index)
    }

    /// Unlinks `id` from its sibling list, keeping the node and its subtree in the arena
    pub(crate) fn detach(&mut self, id: &ItemId) -> Option<Location> {
        let location = self.location(id)?;
        self.list_mut(location.parent.as_ref())?.remove(location.index);
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
        Some(location)
    }

    /// Links a detached node under `parent` at `index` (clamped)
    pub(crate) fn attach(
        &mut self,
        id: &ItemId,
        parent: Option<&ItemId>,
        index: usize,
    ) -> Option<Location> {
        let list = self.list_mut(parent)?;
        let index = index.min(list.len());
        list.insert(index, id.clone());
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = parent.cloned();
        }
        Some(Location {
            parent: parent.cloned(),
            index,
        })
    }

    /// Unlinks `id` and drops its whole subtree. Returns the former location and the
    /// removed items in document order.
    pub(crate) fn remove_subtree(&mut self, id: &ItemId) -> Option<(Location, Vec<Item>)> {
        let location = self.detach(id)?;
        let mut removed = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children.iter().rev().cloned());
                removed.push(node.item);
            }
        }
        Some((location, removed))
    }

    /// Appends seeded items (and their subtrees) to the root list.
    /// Progress is not computed here.
    pub(crate) fn load<R: Rng + ?Sized>(
        &mut self,
        seeds: Vec<ItemSeed>,
        labels: &StatusLabels,
        rng: &mut R,
    ) {
        for seed in seeds {
            self.load_seed(seed, None, labels, rng);
        }
    }

    fn load_seed<R: Rng + ?Sized>(
        &mut self,
        seed: ItemSeed,
        parent: Option<&ItemId>,
        labels: &StatusLabels,
        rng: &mut R,
    ) {
        let id = match seed.id {
            Some(id) if !self.contains(&id) => id,
            Some(id) => {
                tracing::warn!("duplicate item id {} in seed data, assigning a new one", id);
                ItemId::random(rng)
            }
            None => ItemId::random(rng),
        };
        let status = match seed.status.as_deref() {
            None => default_status(labels),
            Some(text) => StatusState::resolve(text, labels)
                .filter(|s| s.index().map_or(true, |i| i < labels.len()))
                .unwrap_or_else(|| {
                    tracing::warn!(
                        "status '{}' of item {} is not configured, using the first status",
                        text,
                        id
                    );
                    default_status(labels)
                }),
        };

        let mut item = Item::new(id.clone(), seed.text, status)
            .with_editable(seed.editable.unwrap_or(true));
        item.priority = seed.priority;
        item.blocked = seed.blocked;
        item.due = seed.due;
        item.schedule = seed.schedule;
        item.assignee = seed.assignee;
        item.tags = normalize_tags(&seed.tags);
        item.comments = seed.comments;
        item.worklog = seed.worklog;

        if self.insert(item, parent, usize::MAX).is_some() {
            for child in seed.children {
                self.load_seed(child, Some(&id), labels, rng);
            }
        }
    }
}

/// Status given to new items: the first configured label, or a header when none exist
pub fn default_status(labels: &StatusLabels) -> StatusState {
    if labels.is_empty() {
        StatusState::NoLabel
    } else {
        StatusState::Status(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    fn leaf(s: &str) -> Item {
        Item::new(id(s), s, StatusState::Status(0))
    }

    fn sample() -> ItemTree {
        // a
        //   a1
        //   a2
        //     a2x
        // b
        let mut tree = ItemTree::new();
        tree.insert(leaf("a"), None, usize::MAX).unwrap();
        tree.insert(leaf("b"), None, usize::MAX).unwrap();
        tree.insert(leaf("a1"), Some(&id("a")), usize::MAX).unwrap();
        tree.insert(leaf("a2"), Some(&id("a")), usize::MAX).unwrap();
        tree.insert(leaf("a2x"), Some(&id("a2")), usize::MAX).unwrap();
        tree
    }

    #[test]
    fn test_structure_queries() {
        let tree = sample();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.children(None), &[id("a"), id("b")]);
        assert_eq!(tree.children(Some(&id("a"))), &[id("a1"), id("a2")]);
        assert_eq!(tree.parent(&id("a2x")), Some(&id("a2")));
        assert_eq!(tree.parent(&id("a")), None);
        assert_eq!(tree.ancestors(&id("a2x")), vec![id("a2"), id("a")]);
        assert!(tree.is_ancestor_or_self(&id("a"), &id("a2x")));
        assert!(!tree.is_ancestor_or_self(&id("b"), &id("a2x")));
        assert!(tree.has_children(&id("a2")));
        assert!(!tree.has_children(&id("b")));
        assert_eq!(
            tree.location(&id("a2")),
            Some(Location {
                parent: Some(id("a")),
                index: 1
            })
        );
    }

    #[test]
    fn test_walk_is_document_order() {
        let order: Vec<_> = sample()
            .walk()
            .into_iter()
            .map(|(d, i)| (d, i.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                (0, "a".to_string()),
                (1, "a1".to_string()),
                (1, "a2".to_string()),
                (2, "a2x".to_string()),
                (0, "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_insert_rejects_duplicates_and_unknown_parents() {
        let mut tree = sample();
        assert!(tree.insert(leaf("a"), None, 0).is_none());
        assert!(tree.insert(leaf("z"), Some(&id("ghost")), 0).is_none());
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_detach_and_attach_moves_subtree() {
        let mut tree = sample();
        let from = tree.detach(&id("a2")).unwrap();
        assert_eq!(from.index, 1);
        assert_eq!(tree.children(Some(&id("a"))), &[id("a1")]);

        let to = tree.attach(&id("a2"), None, 99).unwrap();
        assert_eq!(to.index, 2);
        assert_eq!(tree.parent(&id("a2x")), Some(&id("a2")));
        assert_eq!(tree.ancestors(&id("a2x")), vec![id("a2")]);
    }

    #[test]
    fn test_remove_subtree_drops_descendants() {
        let mut tree = sample();
        let (location, removed) = tree.remove_subtree(&id("a2")).unwrap();
        assert_eq!(location.parent, Some(id("a")));
        let removed: Vec<_> = removed.iter().map(|i| i.id().to_string()).collect();
        assert_eq!(removed, vec!["a2".to_string(), "a2x".to_string()]);
        assert!(!tree.contains(&id("a2x")));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_focus_candidate_order() {
        let mut tree = sample();
        // next sibling takes the vacated index
        let (loc, _) = tree.remove_subtree(&id("a1")).unwrap();
        assert_eq!(tree.focus_candidate(&loc), Some(id("a2")));
        // no next sibling: previous one
        let (loc, _) = tree.remove_subtree(&id("b")).unwrap();
        assert_eq!(tree.focus_candidate(&loc), Some(id("a")));
        // only child: parent
        let (loc, _) = tree.remove_subtree(&id("a2x")).unwrap();
        assert_eq!(tree.focus_candidate(&loc), Some(id("a2")));
    }

    #[test]
    fn test_load_resolves_statuses_and_ids() {
        let labels = StatusLabels::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut tree = ItemTree::new();
        tree.load(
            vec![
                ItemSeed::new("Header").with_id("h").with_status("none").with_children(vec![
                    ItemSeed::new("Done thing").with_status("DONE"),
                    ItemSeed::new("Mystery").with_status("LATER"),
                    ItemSeed::new("Dup").with_id("h"),
                ]),
                ItemSeed::new("Locked").read_only(),
            ],
            &labels,
            &mut rng,
        );

        assert_eq!(tree.len(), 5);
        let header = tree.get(&id("h")).unwrap();
        assert_eq!(header.status(), StatusState::NoLabel);
        let kids = tree.children(Some(&id("h")));
        assert_eq!(kids.len(), 3);
        assert_eq!(tree.get(&kids[0]).unwrap().status(), StatusState::Status(1));
        assert_eq!(tree.get(&kids[1]).unwrap().status(), StatusState::Status(0));
        assert_ne!(kids[2], id("h"));
        let locked = &tree.children(None)[1];
        assert!(!tree.get(locked).unwrap().is_editable());
    }

    #[test]
    fn test_records_carry_labels_and_completion() {
        let labels = StatusLabels::default();
        let mut tree = ItemTree::new();
        tree.insert(Item::new(id("x"), "x", StatusState::Status(1)), None, 0)
            .unwrap();
        let records = tree.records(&labels);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label.as_deref(), Some("DONE"));
        assert!(records[0].completed);
        assert!(records[0].children.is_empty());
    }
}
