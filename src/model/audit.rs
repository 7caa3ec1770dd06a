use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AuditLog {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "APPROVE")]
    pub action: String,

    #[schema(example = "LeaveRequest")]
    pub entity: String,

    #[schema(example = 42)]
    pub entity_id: u64,

    #[schema(example = 7)]
    pub actor_id: u64,

    #[schema(example = "status: submitted -> manager_approved")]
    pub details: String,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
