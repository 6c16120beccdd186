use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::query::{Query, QueryScalar};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::store::{TreeError, TreeTransaction};
use super::{NodeKey, NodeRef, Tier};

/// Postgres-backed tree transaction.
///
/// Services run their own row inserts through [`PgTreeTx::conn`] so that the
/// integrity scripts and the triggering statement share one transaction.
pub struct PgTreeTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTreeTx {
    pub async fn begin(pool: &PgPool) -> Result<Self, TreeError> {
        Ok(Self { tx: pool.begin().await? })
    }

    pub fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> Result<(), TreeError> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), TreeError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn bind_key<'q>(query: Query<'q, Postgres, PgArguments>, key: NodeKey<'q>) -> Query<'q, Postgres, PgArguments> {
    match key {
        NodeKey::Username(username) => query.bind(username),
        NodeKey::Id(id) => query.bind(id),
    }
}

fn bind_key_scalar<'q, O>(
    query: QueryScalar<'q, Postgres, O, PgArguments>,
    key: NodeKey<'q>,
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    match key {
        NodeKey::Username(username) => query.bind(username),
        NodeKey::Id(id) => query.bind(id),
    }
}

fn no_parent_column(tier: Tier) -> TreeError {
    TreeError::Integrity(format!("{} has no parent tier", tier))
}

#[async_trait]
impl TreeTransaction for PgTreeTx {
    async fn lock(&mut self, node: &NodeRef) -> Result<bool, TreeError> {
        let tier = node.tier();
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = $1 FOR UPDATE",
            tier.table(),
            tier.key_column()
        );
        let row = bind_key(sqlx::query(&sql), node.key())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.is_some())
    }

    async fn parent_of(&mut self, node: &NodeRef) -> Result<Option<NodeRef>, TreeError> {
        let tier = node.tier();
        let (Some(parent_tier), Some(parent_column)) = (tier.parent(), tier.parent_column()) else {
            return Ok(None);
        };
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            parent_column,
            tier.table(),
            tier.key_column()
        );

        let parent = if parent_tier.is_org() {
            bind_key_scalar(sqlx::query_scalar::<_, String>(&sql), node.key())
                .fetch_optional(&mut *self.tx)
                .await?
                .and_then(|username| NodeRef::org(parent_tier, username))
        } else {
            bind_key_scalar(sqlx::query_scalar::<_, i64>(&sql), node.key())
                .fetch_optional(&mut *self.tx)
                .await?
                .and_then(|id| NodeRef::record(parent_tier, id))
        };
        Ok(parent)
    }

    async fn children_of(&mut self, node: &NodeRef) -> Result<Vec<NodeRef>, TreeError> {
        let Some(child_tier) = node.tier().child() else {
            return Ok(Vec::new());
        };
        let parent_column = child_tier
            .parent_column()
            .ok_or_else(|| no_parent_column(child_tier))?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY 1 FOR UPDATE",
            child_tier.key_column(),
            child_tier.table(),
            parent_column
        );

        let children = if child_tier.is_org() {
            bind_key_scalar(sqlx::query_scalar::<_, String>(&sql), node.key())
                .fetch_all(&mut *self.tx)
                .await?
                .into_iter()
                .filter_map(|username| NodeRef::org(child_tier, username))
                .collect()
        } else {
            bind_key_scalar(sqlx::query_scalar::<_, i64>(&sql), node.key())
                .fetch_all(&mut *self.tx)
                .await?
                .into_iter()
                .filter_map(|id| NodeRef::record(child_tier, id))
                .collect()
        };
        Ok(children)
    }

    async fn create_stats(&mut self, node: &NodeRef, parent: Option<&NodeRef>) -> Result<(), TreeError> {
        let username = node
            .username()
            .ok_or_else(|| TreeError::Integrity(format!("{} cannot hold statistics", node)))?;
        sqlx::query("INSERT INTO org_stats (username, tier, parent_username) VALUES ($1, $2, $3)")
            .bind(username)
            .bind(node.tier().as_str())
            .bind(parent.and_then(NodeRef::username))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn adjust_counter(&mut self, owner: &NodeRef, counted: Tier, delta: i64) -> Result<(), TreeError> {
        let username = owner
            .username()
            .ok_or_else(|| TreeError::Integrity(format!("{} cannot hold statistics", owner)))?;
        let column = counted
            .counter_column()
            .ok_or_else(|| TreeError::Integrity(format!("{} is never counted", counted)))?;

        let sql = format!(
            "UPDATE org_stats SET {column} = {column} + $1 WHERE username = $2 RETURNING {column}"
        );
        let updated: Option<i64> = sqlx::query_scalar(&sql)
            .bind(delta)
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await?;

        match updated {
            None => Err(TreeError::Integrity(format!("missing statistics row for {}", owner))),
            Some(value) if value < 0 => Err(TreeError::Integrity(format!(
                "{} of {} would become {}",
                column, owner, value
            ))),
            Some(_) => Ok(()),
        }
    }

    async fn remove_node(&mut self, node: &NodeRef) -> Result<(), TreeError> {
        let tier = node.tier();
        if let Some(username) = node.username() {
            sqlx::query("DELETE FROM org_stats WHERE username = $1")
                .bind(username)
                .execute(&mut *self.tx)
                .await?;
        }

        let sql = format!("DELETE FROM {} WHERE {} = $1", tier.table(), tier.key_column());
        let removed = bind_key(sqlx::query(&sql), node.key())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(TreeError::Integrity(format!("{} vanished during delete", node)));
        }

        if let Some(username) = node.username() {
            sqlx::query("DELETE FROM users WHERE username = $1")
                .bind(username)
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }
}
