//! Test fixtures shared by unit tests.
//!
//! [`MemoryTree`] is an in-memory [`TreeTransaction`] backend. `begin()` works
//! on a private copy of the state; only `commit()` writes it back, so dropping
//! a transaction behaves like a rollback.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::tree::{record_insert, NodeRef, Tier, TreeError, TreeTransaction};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryState {
    parents: BTreeMap<NodeRef, Option<NodeRef>>,
    stats: BTreeMap<NodeRef, BTreeMap<Tier, i64>>,
    users: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    state: MemoryState,
    fail_on_remove: Option<Tier>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> MemoryTx<'_> {
        MemoryTx {
            working: self.state.clone(),
            fail_on_remove: self.fail_on_remove,
            base: &mut self.state,
        }
    }

    /// Make every later `remove_node` on `tier` fail.
    pub fn fail_on_remove(&mut self, tier: Tier) {
        self.fail_on_remove = Some(tier);
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    pub fn rows(&self, tier: Tier) -> usize {
        self.state.parents.keys().filter(|n| n.tier() == tier).count()
    }

    pub fn has_user(&self, username: &str) -> bool {
        self.state.users.contains(username)
    }

    pub fn counters(&self, node: &NodeRef) -> Option<BTreeMap<Tier, i64>> {
        self.state.stats.get(node).map(|counters| {
            counters
                .iter()
                .filter(|(_, value)| **value != 0)
                .map(|(tier, value)| (*tier, *value))
                .collect()
        })
    }

    pub fn count(&self, node: &NodeRef, tier: Tier) -> i64 {
        self.state
            .stats
            .get(node)
            .and_then(|counters| counters.get(&tier))
            .copied()
            .unwrap_or(0)
    }

    /// Recount every subtree from the parent links and compare with the
    /// stored counters.
    pub fn assert_counters_consistent(&self) {
        for (owner, counters) in &self.state.stats {
            for tier in owner.tier().descendants() {
                let live = self
                    .state
                    .parents
                    .keys()
                    .filter(|n| n.tier() == tier && self.is_under(n, owner))
                    .count() as i64;
                let stored = counters.get(&tier).copied().unwrap_or(0);
                assert_eq!(stored, live, "{tier} counter of {owner}");
            }
        }
    }

    fn is_under(&self, node: &NodeRef, ancestor: &NodeRef) -> bool {
        let mut current = self.state.parents.get(node).cloned().flatten();
        while let Some(parent) = current {
            if &parent == ancestor {
                return true;
            }
            current = self.state.parents.get(&parent).cloned().flatten();
        }
        false
    }
}

pub struct MemoryTx<'a> {
    base: &'a mut MemoryState,
    working: MemoryState,
    fail_on_remove: Option<Tier>,
}

impl MemoryTx<'_> {
    /// Insert a row the way a service would, then run the insert script.
    pub async fn insert(&mut self, node: &NodeRef, parent: Option<&NodeRef>) -> Result<(), TreeError> {
        if self.working.parents.contains_key(node) {
            return Err(TreeError::Integrity(format!("{} already exists", node)));
        }
        self.working.parents.insert(node.clone(), parent.cloned());
        if let Some(username) = node.username() {
            self.working.users.insert(username.to_string());
        }
        record_insert(self, node, parent).await
    }

    pub fn commit(self) {
        *self.base = self.working;
    }
}

#[async_trait]
impl TreeTransaction for MemoryTx<'_> {
    async fn lock(&mut self, node: &NodeRef) -> Result<bool, TreeError> {
        Ok(self.working.parents.contains_key(node))
    }

    async fn parent_of(&mut self, node: &NodeRef) -> Result<Option<NodeRef>, TreeError> {
        Ok(self.working.parents.get(node).cloned().flatten())
    }

    async fn children_of(&mut self, node: &NodeRef) -> Result<Vec<NodeRef>, TreeError> {
        Ok(self
            .working
            .parents
            .iter()
            .filter(|(_, parent)| parent.as_ref() == Some(node))
            .map(|(child, _)| child.clone())
            .collect())
    }

    async fn create_stats(&mut self, node: &NodeRef, _parent: Option<&NodeRef>) -> Result<(), TreeError> {
        if self.working.stats.contains_key(node) {
            return Err(TreeError::Integrity(format!("duplicate statistics row for {}", node)));
        }
        self.working.stats.insert(node.clone(), BTreeMap::new());
        Ok(())
    }

    async fn adjust_counter(&mut self, owner: &NodeRef, counted: Tier, delta: i64) -> Result<(), TreeError> {
        let counters = self
            .working
            .stats
            .get_mut(owner)
            .ok_or_else(|| TreeError::Integrity(format!("missing statistics row for {}", owner)))?;
        let value = counters.entry(counted).or_insert(0);
        *value += delta;
        if *value < 0 {
            return Err(TreeError::Integrity(format!("{} counter of {} went negative", counted, owner)));
        }
        Ok(())
    }

    async fn remove_node(&mut self, node: &NodeRef) -> Result<(), TreeError> {
        if self.fail_on_remove == Some(node.tier()) {
            return Err(TreeError::Integrity(format!("injected failure removing {}", node)));
        }
        // Tree foreign keys are ON DELETE RESTRICT
        if self.working.parents.values().any(|parent| parent.as_ref() == Some(node)) {
            return Err(TreeError::Integrity(format!("{} still has children", node)));
        }
        if self.working.parents.remove(node).is_none() {
            return Err(TreeError::Integrity(format!("{} vanished during delete", node)));
        }
        self.working.stats.remove(node);
        if let Some(username) = node.username() {
            self.working.users.remove(username);
        }
        Ok(())
    }
}
