use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;
use strum::Display;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    StatusChange,
    Approve,
    Reject,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub entity_id: u64,
    pub actor_id: u64,
    pub details: String,
}

/// Append-only record of lifecycle mutations.
#[async_trait]
pub trait AuditTrail: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<()>;
}

pub struct DbAuditTrail {
    pool: MySqlPool,
}

impl DbAuditTrail {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditTrail for DbAuditTrail {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (action, entity, entity_id, actor_id, details)
            VALUES (?, 'LeaveRequest', ?, ?, ?)
            "#,
        )
        .bind(entry.action.to_string())
        .bind(entry.entity_id)
        .bind(entry.actor_id)
        .bind(&entry.details)
        .execute(&self.pool)
        .await
        .context("failed to persist audit entry")?;

        Ok(())
    }
}
