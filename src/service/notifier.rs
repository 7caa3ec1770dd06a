use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;
use strum::Display;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NoteKind {
    LeaveSubmitted,
    LeaveApproved,
    LeaveRejected,
}

#[derive(Debug, Clone)]
pub struct Note {
    pub kind: NoteKind,
    pub title: String,
    pub body: String,
    pub link: String,
}

/// Notification capability injected into the lifecycle service. Delivery
/// beyond row persistence is out of scope.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: u64, note: Note) -> Result<()>;
}

pub struct DbNotifier {
    pool: MySqlPool,
}

impl DbNotifier {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for DbNotifier {
    async fn notify(&self, user_id: u64, note: Note) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, title, body, link)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(note.kind.to_string())
        .bind(&note.title)
        .bind(&note.body)
        .bind(&note.link)
        .execute(&self.pool)
        .await
        .context("failed to persist notification")?;

        Ok(())
    }
}
