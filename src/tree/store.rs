use async_trait::async_trait;
use thiserror::Error;

use super::{NodeRef, Tier};

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row-level operations the integrity scripts need from an open transaction.
///
/// Implementations must apply every call inside the same transaction; the
/// caller decides whether to commit. Dropping an uncommitted transaction
/// discards all of its effects.
#[async_trait]
pub trait TreeTransaction: Send {
    /// Lock `node` for the remainder of the transaction. Returns `false` when
    /// the node does not exist.
    async fn lock(&mut self, node: &NodeRef) -> Result<bool, TreeError>;

    async fn parent_of(&mut self, node: &NodeRef) -> Result<Option<NodeRef>, TreeError>;

    /// Direct children, all of tier `node.tier().child()`. The returned rows
    /// stay locked until the transaction ends.
    async fn children_of(&mut self, node: &NodeRef) -> Result<Vec<NodeRef>, TreeError>;

    /// Create the zeroed statistics row of an org node.
    async fn create_stats(&mut self, node: &NodeRef, parent: Option<&NodeRef>) -> Result<(), TreeError>;

    /// Add `delta` to the counter of `counted` on `owner`'s statistics row.
    async fn adjust_counter(&mut self, owner: &NodeRef, counted: Tier, delta: i64) -> Result<(), TreeError>;

    /// Delete the node's own rows: the record itself, or for org nodes the
    /// extension row, statistics row and user account.
    async fn remove_node(&mut self, node: &NodeRef) -> Result<(), TreeError>;
}
