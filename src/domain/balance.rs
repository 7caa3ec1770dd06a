use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};

/// Per-employee, per-year aggregate. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"total": 30, "used": 12, "pending": 5, "remaining": 18}))]
pub struct LeaveBalance {
    pub total: u32,
    pub used: u32,
    pub pending: u32,
    pub remaining: u32,
}

/// Aggregates annual-type requests against a fixed allotment.
///
/// Approved tiers count as used, draft/submitted as pending. `remaining` is
/// floored at 0; `used + pending` may well exceed `total`, that is the
/// approver's problem, not an invariant.
pub fn compute_balance(total: u32, requests: &[LeaveRequest]) -> LeaveBalance {
    let mut used = 0u32;
    let mut pending = 0u32;

    for request in requests {
        if request.leave_type != LeaveType::Annual {
            continue;
        }
        match request.status {
            LeaveStatus::ManagerApproved | LeaveStatus::FinalApproved => {
                used += request.business_days;
            }
            LeaveStatus::Draft | LeaveStatus::Submitted => {
                pending += request.business_days;
            }
            LeaveStatus::Rejected | LeaveStatus::Cancelled => {}
        }
    }

    LeaveBalance {
        total,
        used,
        pending,
        remaining: total.saturating_sub(used),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn request(leave_type: LeaveType, status: LeaveStatus, days: u32) -> LeaveRequest {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        LeaveRequest {
            id: 1,
            employee_id: 1000,
            leave_type,
            status,
            start_date: start,
            end_date: start,
            business_days: days,
            reason: "trip".into(),
            approver_id: None,
            approved_at: None,
            approver_comment: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn partitions_used_and_pending() {
        let requests = vec![
            request(LeaveType::Annual, LeaveStatus::FinalApproved, 5),
            request(LeaveType::Annual, LeaveStatus::ManagerApproved, 3),
            request(LeaveType::Annual, LeaveStatus::Draft, 2),
            request(LeaveType::Annual, LeaveStatus::Submitted, 4),
            request(LeaveType::Annual, LeaveStatus::Rejected, 10),
            request(LeaveType::Annual, LeaveStatus::Cancelled, 10),
        ];
        let balance = compute_balance(30, &requests);
        assert_eq!(
            balance,
            LeaveBalance { total: 30, used: 8, pending: 6, remaining: 22 }
        );
    }

    #[test]
    fn non_annual_types_are_ignored() {
        let requests = vec![
            request(LeaveType::Sick, LeaveStatus::FinalApproved, 10),
            request(LeaveType::Maternity, LeaveStatus::Submitted, 90),
            request(LeaveType::Annual, LeaveStatus::FinalApproved, 4),
        ];
        let balance = compute_balance(30, &requests);
        assert_eq!(balance.used, 4);
        assert_eq!(balance.pending, 0);
    }

    #[test]
    fn remaining_floors_at_zero_when_overconsumed() {
        let requests = vec![
            request(LeaveType::Annual, LeaveStatus::FinalApproved, 25),
            request(LeaveType::Annual, LeaveStatus::ManagerApproved, 12),
        ];
        let balance = compute_balance(30, &requests);
        assert_eq!(balance.used, 37);
        assert_eq!(balance.remaining, 0);
    }

    #[test]
    fn pending_may_exceed_remaining() {
        let requests = vec![
            request(LeaveType::Annual, LeaveStatus::FinalApproved, 28),
            request(LeaveType::Annual, LeaveStatus::Submitted, 10),
        ];
        let balance = compute_balance(30, &requests);
        assert_eq!(balance.remaining, 2);
        assert!(balance.pending > balance.remaining);
    }

    #[test]
    fn empty_history_is_full_allotment() {
        let balance = compute_balance(30, &[]);
        assert_eq!(
            balance,
            LeaveBalance { total: 30, used: 0, pending: 0, remaining: 30 }
        );
    }
}
