//! Counter maintenance and cascading deletes.
//!
//! Both scripts run against an open [`TreeTransaction`] and never commit it.
//! A returned error leaves the transaction dirty; callers drop or roll it back.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use super::store::{TreeError, TreeTransaction};
use super::{NodeRef, Tier};

/// What a cascading delete removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    /// Rows removed per tier, including the deleted node itself.
    pub removed: BTreeMap<Tier, u64>,
    /// Ancestors of the deleted node, nearest first. Org ancestors had their
    /// counters decremented.
    pub ancestors: Vec<NodeRef>,
}

impl DeleteSummary {
    pub fn total(&self) -> u64 {
        self.removed.values().sum()
    }

    pub fn removed_of(&self, tier: Tier) -> u64 {
        self.removed.get(&tier).copied().unwrap_or(0)
    }
}

/// Parent chain of `node`, nearest first.
pub async fn ancestors<T>(tx: &mut T, node: &NodeRef) -> Result<Vec<NodeRef>, TreeError>
where
    T: TreeTransaction + ?Sized,
{
    let mut chain = Vec::new();
    let mut current = tx.parent_of(node).await?;
    while let Some(parent) = current {
        current = tx.parent_of(&parent).await?;
        chain.push(parent);
    }
    Ok(chain)
}

/// Every descendant of `node`, grouped by tier.
pub async fn descendants<T>(tx: &mut T, node: &NodeRef) -> Result<BTreeMap<Tier, Vec<NodeRef>>, TreeError>
where
    T: TreeTransaction + ?Sized,
{
    let mut by_tier: BTreeMap<Tier, Vec<NodeRef>> = BTreeMap::new();
    let mut frontier = vec![node.clone()];

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for parent in &frontier {
            next.extend(tx.children_of(parent).await?);
        }
        if let Some(first) = next.first() {
            by_tier.entry(first.tier()).or_default().extend(next.iter().cloned());
        }
        frontier = next;
    }
    Ok(by_tier)
}

/// Account for a freshly inserted node.
///
/// Org nodes get a zeroed statistics row. Every org ancestor, starting with
/// `parent`, has the counter for the node's tier incremented by one. Must run
/// in the transaction that inserted the node.
pub async fn record_insert<T>(tx: &mut T, node: &NodeRef, parent: Option<&NodeRef>) -> Result<(), TreeError>
where
    T: TreeTransaction + ?Sized,
{
    let tier = node.tier();
    if parent.map(NodeRef::tier) != tier.parent() {
        return Err(TreeError::Integrity(format!(
            "{} cannot be placed under {}",
            node,
            parent.map_or_else(|| "the root".to_string(), NodeRef::to_string)
        )));
    }

    if let Some(parent) = parent {
        if !tx.lock(parent).await? {
            return Err(TreeError::NotFound(parent.to_string()));
        }
    }

    if tier.is_org() {
        tx.create_stats(node, parent).await?;
    }

    let mut current = parent.cloned();
    while let Some(ancestor) = current {
        if ancestor.tier().is_org() {
            tx.adjust_counter(&ancestor, tier, 1).await?;
        }
        current = tx.parent_of(&ancestor).await?;
    }

    debug!("Recorded insert of {}", node);
    Ok(())
}

/// Delete `node` and its whole subtree, deepest tier first, then decrement
/// every ancestor's counters by what was removed.
pub async fn delete_subtree<T>(tx: &mut T, node: &NodeRef) -> Result<DeleteSummary, TreeError>
where
    T: TreeTransaction + ?Sized,
{
    if !tx.lock(node).await? {
        return Err(TreeError::NotFound(node.to_string()));
    }

    let chain = ancestors(tx, node).await?;
    let below = descendants(tx, node).await?;

    let mut summary = DeleteSummary {
        ancestors: chain,
        ..DeleteSummary::default()
    };

    // BTreeMap iterates top-down; deletion must go bottom-up
    for (tier, nodes) in below.iter().rev() {
        for descendant in nodes {
            tx.remove_node(descendant).await.map_err(|e| restricted(descendant, e))?;
        }
        summary.removed.insert(*tier, nodes.len() as u64);
    }
    tx.remove_node(node).await.map_err(|e| restricted(node, e))?;
    summary.removed.insert(node.tier(), 1);

    for ancestor in summary.ancestors.iter().filter(|a| a.tier().is_org()) {
        for (tier, count) in &summary.removed {
            if *count > 0 {
                tx.adjust_counter(ancestor, *tier, -(*count as i64)).await?;
            }
        }
    }

    info!("Deleted {} with {} descendant rows", node, summary.total() - 1);
    Ok(summary)
}

/// A restrict violation while cascading means a child appeared that the
/// collected subtree does not know about.
fn restricted(node: &NodeRef, err: TreeError) -> TreeError {
    match err {
        TreeError::Database(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
            TreeError::Integrity(format!("{} gained children during delete: {}", node, db))
        }
        other => other,
    }
}
