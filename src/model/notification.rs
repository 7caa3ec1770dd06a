use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Notification {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1000)]
    pub user_id: u64,

    #[schema(example = "leave_submitted")]
    pub kind: String,

    #[schema(example = "New leave request")]
    pub title: String,

    #[schema(example = "Akou Kouame submitted a request for annual leave (5 days)")]
    pub body: String,

    /// Relative link to the record the notification is about.
    #[schema(example = "/leave/42")]
    pub link: String,

    pub is_read: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
