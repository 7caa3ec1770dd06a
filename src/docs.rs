use crate::api::audit::{AuditListResponse, AuditQuery};
use crate::api::leave_request::{
    ApprovePayload, BalanceParams, CreateLeavePayload, LeaveFilter, LeaveListResponse, PageParams,
    RejectPayload,
};
use crate::domain::balance::LeaveBalance;
use crate::model::audit::AuditLog;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::notification::Notification;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leavedesk API",
        version = "1.0.0",
        description = r#"
## Leave management for a multi-branch organization

This API tracks employee leave requests through a two-tier approval workflow.

### Key features
- **Leave lifecycle**
  - Draft, submit, approve (branch manager then super admin), reject, cancel
- **Balances**
  - Yearly annual-leave balance against a fixed allotment
- **Notifications**
  - Branch managers are notified of submissions; requesters of decisions
- **Audit log**
  - Every lifecycle mutation is recorded

### Security
All endpoints except `/auth/*` require **JWT Bearer authentication**.
Approval endpoints require a **branch manager** or **super admin** role.
"#,
    ),
    paths(
        crate::auth::handlers::me,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::submit_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::approval_queue,
        crate::api::leave_request::leave_balance,

        crate::api::notification::notification_list,
        crate::api::notification::mark_notification_read,

        crate::api::audit::audit_list,
    ),
    components(
        schemas(
            LeaveRequest,
            LeaveStatus,
            LeaveType,
            LeaveBalance,
            CreateLeavePayload,
            ApprovePayload,
            RejectPayload,
            LeaveFilter,
            PageParams,
            BalanceParams,
            LeaveListResponse,
            Notification,
            AuditLog,
            AuditQuery,
            AuditListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Token introspection APIs"),
        (name = "Leave", description = "Leave request lifecycle APIs"),
        (name = "Notifications", description = "Per-user notification APIs"),
        (name = "Audit", description = "Audit trail APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
