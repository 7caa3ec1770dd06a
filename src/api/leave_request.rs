use std::str::FromStr;

use crate::auth::auth::AuthUser;
use crate::domain::balance::LeaveBalance;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::service::error::LeaveError;
use crate::service::leave::{CreateLeave, LeaveService};
use crate::service::store::LeaveQuery;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeavePayload {
    #[schema(example = "annual")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: chrono::NaiveDate,
    #[schema(example = "2026-03-06", format = "date", value_type = String)]
    pub end_date: chrono::NaiveDate,
    #[schema(example = "family trip")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ApprovePayload {
    /// Optional approver comment
    #[schema(example = "enjoy")]
    pub comment: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectPayload {
    /// Mandatory rejection comment
    #[schema(example = "insufficient staffing")]
    pub comment: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee ID (ignored for staff callers)
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    /// Filter by request status
    #[schema(example = "submitted")]
    pub status: Option<String>,
    /// Restrict to requests starting in this year
    #[schema(example = 2026)]
    pub year: Option<i32>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PageParams {
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BalanceParams {
    /// Defaults to the caller
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    /// Defaults to the current year
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

/// Maps the service taxonomy onto HTTP statuses. Stale-status races surface
/// as 409 like any other invalid-state failure.
fn error_response(err: LeaveError) -> HttpResponse {
    match err {
        LeaveError::Validation(message) => {
            HttpResponse::BadRequest().json(serde_json::json!({ "message": message }))
        }
        LeaveError::NotFound => HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave request not found"
        })),
        LeaveError::Forbidden(message) => {
            HttpResponse::Forbidden().json(serde_json::json!({ "message": message }))
        }
        LeaveError::InvalidState(message) => {
            HttpResponse::Conflict().json(serde_json::json!({ "message": message }))
        }
        LeaveError::Store(e) => {
            tracing::error!(error = %e, "Leave operation failed");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "message": "Internal Server Error"
            }))
        }
    }
}

/* =========================
Create leave request (draft)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeavePayload,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Draft created", body = LeaveRequest),
        (status = 400, description = "No business days in the selected period"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<CreateLeavePayload>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    let result = service
        .create(
            auth.actor(),
            CreateLeave {
                leave_type: payload.leave_type,
                start_date: payload.start_date,
                end_date: payload.end_date,
                reason: payload.reason,
            },
        )
        .await;

    Ok(match result {
        Ok(request) => HttpResponse::Ok().json(request),
        Err(e) => error_response(e),
    })
}

/* =========================
Submit draft
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/submit",
    params(("leave_id" = u64, Path, description = "ID of the draft to submit")),
    responses(
        (status = 200, description = "Draft submitted", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Not a draft")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn submit_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    Ok(match service.submit(path.into_inner(), auth.actor()).await {
        Ok(request) => HttpResponse::Ok().json(request),
        Err(e) => error_response(e),
    })
}

/* =========================
Approve (branch manager / super admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request to approve")),
    request_body(content = ApprovePayload, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager role required"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Not approvable from the current status")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: Option<web::Json<ApprovePayload>>,
) -> actix_web::Result<impl Responder> {
    let comment = payload.and_then(|p| p.into_inner().comment);

    Ok(
        match service.approve(path.into_inner(), auth.actor(), comment).await {
            Ok(request) => HttpResponse::Ok().json(request),
            Err(e) => error_response(e),
        },
    )
}

/* =========================
Reject (branch manager / super admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "ID of the leave request to reject")),
    request_body(content = RejectPayload, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 400, description = "Blank comment"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager role required"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Not rejectable from the current status")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: web::Json<RejectPayload>,
) -> actix_web::Result<impl Responder> {
    Ok(
        match service
            .reject(path.into_inner(), auth.actor(), &payload.comment)
            .await
        {
            Ok(request) => HttpResponse::Ok().json(request),
            Err(e) => error_response(e),
        },
    )
}

/* =========================
Cancel
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/cancel",
    params(("leave_id" = u64, Path, description = "ID of the leave request to cancel")),
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Neither owner nor manager"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Not cancellable from the current status")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    Ok(match service.cancel(path.into_inner(), auth.actor()).await {
        Ok(request) => HttpResponse::Ok().json(request),
        Err(e) => error_response(e),
    })
}

/* =========================
Fetch one
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Neither owner nor manager"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    Ok(match service.get(path.into_inner(), auth.actor()).await {
        Ok(request) => HttpResponse::Ok().json(request),
        Err(e) => error_response(e),
    })
}

/* =========================
Paginated list
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let statuses = match query.status.as_deref() {
        Some(raw) => match LeaveStatus::from_str(raw) {
            Ok(status) => vec![status],
            Err(_) => {
                return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                    "message": format!("Unknown status \"{raw}\"")
                })));
            }
        },
        None => Vec::new(),
    };

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);

    let result = service
        .list(
            auth.actor(),
            LeaveQuery {
                employee_id: query.employee_id,
                statuses,
                year: query.year,
                page,
                per_page,
                ..Default::default()
            },
        )
        .await;

    Ok(match result {
        Ok((data, total)) => {
            HttpResponse::Ok().json(LeaveListResponse { data, page, per_page, total })
        }
        Err(e) => error_response(e),
    })
}

/* =========================
Approval queue
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/approvals",
    params(PageParams),
    responses(
        (status = 200, description = "Requests awaiting the caller's tier", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approval_queue(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<PageParams>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);

    Ok(
        match service.approval_queue(auth.actor(), page, per_page).await {
            Ok((data, total)) => {
                HttpResponse::Ok().json(LeaveListResponse { data, page, per_page, total })
            }
            Err(e) => error_response(e),
        },
    )
}

/* =========================
Yearly balance
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/balance",
    params(BalanceParams),
    responses(
        (status = 200, description = "Yearly annual-leave balance", body = LeaveBalance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not allowed for this employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_balance(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<BalanceParams>,
) -> actix_web::Result<impl Responder> {
    let employee_id = query.employee_id.unwrap_or(auth.user_id);
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    Ok(
        match service.balance(auth.actor(), employee_id, year).await {
            Ok(balance) => HttpResponse::Ok().json(balance),
            Err(e) => error_response(e),
        },
    )
}
