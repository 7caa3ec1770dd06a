use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LeaveType {
    Annual,
    Sick,
    Maternity,
    Paternity,
    Exceptional,
    Unpaid,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LeaveStatus {
    Draft,
    Submitted,
    /// Approved at tier 1 by a branch manager, awaiting the final tier.
    ManagerApproved,
    /// Approved at tier 2. Terminal.
    FinalApproved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    /// No transition is permitted out of a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LeaveStatus::FinalApproved | LeaveStatus::Rejected | LeaveStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_id": 1000,
        "leave_type": "annual",
        "status": "draft",
        "start_date": "2026-03-02",
        "end_date": "2026-03-06",
        "business_days": 5,
        "reason": "family trip",
        "approver_id": null,
        "approved_at": null,
        "approver_comment": null,
        "created_at": "2026-02-20T09:00:00Z"
    })
)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1000)]
    pub employee_id: u64,

    #[schema(example = "annual")]
    pub leave_type: LeaveType,

    #[schema(example = "draft")]
    pub status: LeaveStatus,

    #[schema(example = "2026-03-02", value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(example = "2026-03-06", value_type = String, format = "date")]
    pub end_date: NaiveDate,

    /// Mon-Fri days in the inclusive range, computed at creation.
    #[schema(example = 5)]
    pub business_days: u32,

    #[schema(example = "family trip")]
    pub reason: String,

    #[schema(example = 7, nullable = true)]
    pub approver_id: Option<u64>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<DateTime<Utc>>,

    #[schema(nullable = true)]
    pub approver_comment: Option<String>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
