use crate::engine::identifier::Identifier;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Unordered, duplicate-free membership filter.
///
/// Serialized as a sorted list so checkpoints are stable between saves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Identifier>", into = "Vec<Identifier>")]
pub struct IdentifierSet {
    items: HashSet<Identifier>,
}

impl IdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Identifier) -> bool {
        self.items.insert(id)
    }

    pub fn remove(&mut self, id: &Identifier) -> bool {
        self.items.remove(id)
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.items.contains(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.items.iter()
    }
}

impl FromIterator<Identifier> for IdentifierSet {
    fn from_iter<I: IntoIterator<Item = Identifier>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Identifier>> for IdentifierSet {
    fn from(items: Vec<Identifier>) -> Self {
        items.into_iter().collect()
    }
}

impl From<IdentifierSet> for Vec<Identifier> {
    fn from(set: IdentifierSet) -> Self {
        let mut items: Vec<Identifier> = set.items.into_iter().collect();
        items.sort();
        items
    }
}

impl Extend<Identifier> for IdentifierSet {
    fn extend<I: IntoIterator<Item = Identifier>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

/// FIFO of identifiers with an auxiliary membership index.
///
/// Insertion order is discovery order; an identifier already queued is never
/// queued twice. The index is updated on every push and pop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Identifier>", into = "Vec<Identifier>")]
pub struct WorkQueue {
    order: VecDeque<Identifier>,
    members: HashSet<Identifier>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id` unless it is already queued. Returns whether it was added.
    pub fn push(&mut self, id: Identifier) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        self.members.insert(id.clone());
        self.order.push_back(id);
        true
    }

    pub fn pop(&mut self) -> Option<Identifier> {
        let id = self.order.pop_front()?;
        self.members.remove(&id);
        Some(id)
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.order.iter()
    }

    /// Drops every queued identifier present in any of `filters`, keeping order.
    pub fn retain_outside(&mut self, filters: &[&IdentifierSet]) -> usize {
        let before = self.order.len();
        let members = &mut self.members;
        self.order.retain(|id| {
            let keep = !filters.iter().any(|set| set.contains(id));
            if !keep {
                members.remove(id);
            }
            keep
        });
        before - self.order.len()
    }
}

impl PartialEq for WorkQueue {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for WorkQueue {}

impl From<Vec<Identifier>> for WorkQueue {
    fn from(items: Vec<Identifier>) -> Self {
        items.into_iter().collect()
    }
}

impl From<WorkQueue> for Vec<Identifier> {
    fn from(queue: WorkQueue) -> Self {
        queue.order.into_iter().collect()
    }
}

impl FromIterator<Identifier> for WorkQueue {
    fn from_iter<I: IntoIterator<Item = Identifier>>(iter: I) -> Self {
        let mut queue = WorkQueue::new();
        for id in iter {
            queue.push(id);
        }
        queue
    }
}

/// Enqueues every candidate that is neither queued nor a member of any filter
/// set, in input order. Returns the number added.
pub fn enqueue_new<I>(queue: &mut WorkQueue, candidates: I, filters: &[&IdentifierSet]) -> usize
where
    I: IntoIterator<Item = Identifier>,
{
    let mut added = 0;
    for id in candidates {
        if filters.iter().any(|set| set.contains(&id)) {
            continue;
        }
        if queue.push(id) {
            added += 1;
        }
    }
    added
}
