use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlPool;

use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::utils::manager_cache;

/// Fields of a not-yet-persisted request. `business_days` is computed by the
/// service, never taken from the caller.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub business_days: u32,
    pub reason: String,
}

/// Approver fields written together with an approve/reject transition.
#[derive(Debug, Clone)]
pub struct Decision {
    pub status: LeaveStatus,
    pub approver_id: u64,
    pub decided_at: DateTime<Utc>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequesterProfile {
    pub id: u64,
    pub display_name: String,
    pub branch_id: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveQuery {
    pub employee_id: Option<u64>,
    pub statuses: Vec<LeaveStatus>,
    pub branch_id: Option<u64>,
    pub year: Option<i32>,
    /// 1-based.
    pub page: u64,
    pub per_page: u64,
}

/// Persistence capability of the leave lifecycle. Status transitions are
/// compare-and-set on the expected current status so concurrent actors
/// cannot both win the same transition.
#[async_trait]
pub trait LeaveRequestStore: Send + Sync {
    async fn find_by_id(&self, id: u64) -> Result<Option<LeaveRequest>>;

    async fn insert(&self, new: NewLeaveRequest) -> Result<LeaveRequest>;

    /// Returns false when the row no longer carries `expected`.
    async fn set_status(&self, id: u64, expected: LeaveStatus, next: LeaveStatus) -> Result<bool>;

    /// Same stale-status contract as `set_status`, additionally recording the
    /// approver, the decision timestamp and the optional comment.
    async fn record_decision(&self, id: u64, expected: LeaveStatus, decision: Decision)
        -> Result<bool>;

    async fn list(&self, query: &LeaveQuery) -> Result<(Vec<LeaveRequest>, i64)>;

    /// Annual-type requests whose start date falls in `year`.
    async fn annual_requests(&self, employee_id: u64, year: i32) -> Result<Vec<LeaveRequest>>;

    async fn requester_profile(&self, user_id: u64) -> Result<Option<RequesterProfile>>;

    /// Active tier-1 approvers of a branch, for notification fan-out.
    async fn branch_manager_ids(&self, branch_id: u64) -> Result<Vec<u64>>;
}

// Helper enum for typed SQLx binding of dynamically built filters
enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
}

const LEAVE_COLUMNS: &str = "lr.id, lr.employee_id, lr.leave_type, lr.status, lr.start_date, \
     lr.end_date, lr.business_days, lr.reason, lr.approver_id, lr.approved_at, \
     lr.approver_comment, lr.created_at";

pub struct MySqlLeaveStore {
    pool: MySqlPool,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn build_where(query: &LeaveQuery) -> (String, Vec<FilterValue>) {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = query.employee_id {
            where_sql.push_str(" AND lr.employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }

        if !query.statuses.is_empty() {
            let placeholders = vec!["?"; query.statuses.len()].join(", ");
            where_sql.push_str(&format!(" AND lr.status IN ({})", placeholders));
            for status in &query.statuses {
                args.push(FilterValue::Str(status.to_string()));
            }
        }

        if let Some(branch_id) = query.branch_id {
            where_sql.push_str(" AND u.branch_id = ?");
            args.push(FilterValue::U64(branch_id));
        }

        if let Some(year) = query.year {
            where_sql.push_str(" AND lr.start_date BETWEEN ? AND ?");
            args.push(FilterValue::Date(year_start(year)));
            args.push(FilterValue::Date(year_end(year)));
        }

        (where_sql, args)
    }
}

fn year_start(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn year_end(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

#[async_trait]
impl LeaveRequestStore for MySqlLeaveStore {
    async fn find_by_id(&self, id: u64) -> Result<Option<LeaveRequest>> {
        let sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests lr WHERE lr.id = ?"
        );
        sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch leave request")
    }

    async fn insert(&self, new: NewLeaveRequest) -> Result<LeaveRequest> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type, status, start_date, end_date, business_days, reason)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.leave_type)
        .bind(LeaveStatus::Draft)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.business_days)
        .bind(&new.reason)
        .execute(&self.pool)
        .await
        .context("failed to insert leave request")?;

        let id = result.last_insert_id();
        self.find_by_id(id)
            .await?
            .context("inserted leave request vanished")
    }

    async fn set_status(&self, id: u64, expected: LeaveStatus, next: LeaveStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(next)
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .context("failed to update leave status")?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_decision(
        &self,
        id: u64,
        expected: LeaveStatus,
        decision: Decision,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approver_id = ?, approved_at = ?, approver_comment = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(decision.status)
        .bind(decision.approver_id)
        .bind(decision.decided_at)
        .bind(&decision.comment)
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .context("failed to record leave decision")?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &LeaveQuery) -> Result<(Vec<LeaveRequest>, i64)> {
        let per_page = query.per_page.clamp(1, 100);
        let page = query.page.max(1);
        let offset = (page - 1) * per_page;

        let (where_sql, args) = Self::build_where(query);

        let count_sql = format!(
            "SELECT COUNT(*) FROM leave_requests lr \
             JOIN users u ON u.id = lr.employee_id{where_sql}"
        );

        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(s.clone()),
                FilterValue::Date(d) => count_q.bind(*d),
            };
        }
        let total = count_q
            .fetch_one(&self.pool)
            .await
            .context("failed to count leave requests")?;

        let data_sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests lr \
             JOIN users u ON u.id = lr.employee_id{where_sql} \
             ORDER BY lr.created_at DESC \
             LIMIT ? OFFSET ?"
        );

        let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
                FilterValue::Date(d) => data_q.bind(d),
            };
        }
        let rows = data_q
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch leave requests")?;

        Ok((rows, total))
    }

    async fn annual_requests(&self, employee_id: u64, year: i32) -> Result<Vec<LeaveRequest>> {
        let sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests lr \
             WHERE lr.employee_id = ? \
             AND lr.leave_type = ? \
             AND lr.start_date BETWEEN ? AND ?"
        );
        sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(employee_id)
            .bind(LeaveType::Annual)
            .bind(year_start(year))
            .bind(year_end(year))
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch annual leave history")
    }

    async fn requester_profile(&self, user_id: u64) -> Result<Option<RequesterProfile>> {
        sqlx::query_as::<_, RequesterProfile>(
            r#"
            SELECT id, display_name, branch_id
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch requester profile")
    }

    async fn branch_manager_ids(&self, branch_id: u64) -> Result<Vec<u64>> {
        if let Some(ids) = manager_cache::get(branch_id).await {
            return Ok(ids.as_ref().clone());
        }

        let ids: Vec<u64> = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT id
            FROM users
            WHERE branch_id = ?
            AND role_id = ?
            AND is_active = 1
            "#,
        )
        .bind(branch_id)
        .bind(crate::model::role::Role::BranchManager as u8)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch branch managers")?;

        manager_cache::put(branch_id, ids.clone()).await;
        Ok(ids)
    }
}
