use crate::model::leave_request::LeaveStatus;
use crate::model::role::Role;

/// Whether `role` may approve a request currently in `status`.
///
/// Branch managers act as the first approval tier and only on submitted
/// requests. Super admins act as the final tier and may also pick up a
/// submitted request directly, skipping the first tier entirely. That skip is
/// confirmed behavior, not an accident.
pub fn can_approve(role: Role, status: LeaveStatus) -> bool {
    match role {
        Role::BranchManager => status == LeaveStatus::Submitted,
        Role::SuperAdmin => {
            matches!(status, LeaveStatus::Submitted | LeaveStatus::ManagerApproved)
        }
        Role::Staff => false,
    }
}

/// Status an approval by `role` lands in. `None` for non-approver roles.
pub fn next_approval_status(role: Role) -> Option<LeaveStatus> {
    match role {
        Role::BranchManager => Some(LeaveStatus::ManagerApproved),
        Role::SuperAdmin => Some(LeaveStatus::FinalApproved),
        Role::Staff => None,
    }
}

/// Rejection is tier-agnostic: allowed from either pre-final reviewable
/// status, always landing in `Rejected`.
pub fn can_reject(role: Role, status: LeaveStatus) -> bool {
    role.is_manager()
        && matches!(status, LeaveStatus::Submitted | LeaveStatus::ManagerApproved)
}
