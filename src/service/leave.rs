use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::warn;

use crate::domain::balance::{self, LeaveBalance};
use crate::domain::business_days::business_days;
use crate::domain::policy;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::role::Role;

use super::audit::{AuditAction, AuditEntry, AuditTrail};
use super::error::{LeaveError, LeaveResult};
use super::notifier::{Note, NoteKind, Notifier};
use super::store::{Decision, LeaveQuery, LeaveRequestStore, NewLeaveRequest};

/// Authenticated caller, passed explicitly into every operation.
#[derive(Debug, Copy, Clone)]
pub struct Actor {
    pub id: u64,
    pub role: Role,
    pub branch_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CreateLeave {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

/// Owns the request lifecycle: draft -> submitted -> tier-1 -> tier-2, with
/// rejection and cancellation branches. All collaborators are injected so the
/// transition logic is testable without a database.
pub struct LeaveService {
    store: Arc<dyn LeaveRequestStore>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditTrail>,
    annual_allotment: u32,
}

impl LeaveService {
    pub fn new(
        store: Arc<dyn LeaveRequestStore>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditTrail>,
        annual_allotment: u32,
    ) -> Self {
        Self { store, notifier, audit, annual_allotment }
    }

    pub async fn create(&self, actor: Actor, input: CreateLeave) -> LeaveResult<LeaveRequest> {
        let days = business_days(input.start_date, input.end_date);
        if days == 0 {
            return Err(LeaveError::Validation(
                "the selected period contains no business days".into(),
            ));
        }

        let created = self
            .store
            .insert(NewLeaveRequest {
                employee_id: actor.id,
                leave_type: input.leave_type,
                start_date: input.start_date,
                end_date: input.end_date,
                business_days: days,
                reason: input.reason,
            })
            .await?;

        self.audit_quietly(AuditEntry {
            action: AuditAction::Create,
            entity_id: created.id,
            actor_id: actor.id,
            details: format!("request for {} leave ({} days)", created.leave_type, days),
        })
        .await;

        Ok(created)
    }

    pub async fn submit(&self, id: u64, actor: Actor) -> LeaveResult<LeaveRequest> {
        let mut request = self.store.find_by_id(id).await?.ok_or(LeaveError::NotFound)?;

        if request.employee_id != actor.id {
            return Err(LeaveError::Forbidden("not the owner of this request".into()));
        }
        if request.status != LeaveStatus::Draft {
            return Err(LeaveError::InvalidState("only a draft can be submitted".into()));
        }

        self.transition(id, LeaveStatus::Draft, LeaveStatus::Submitted).await?;
        request.status = LeaveStatus::Submitted;

        self.fan_out_to_branch_managers(&request).await;

        self.audit_quietly(AuditEntry {
            action: AuditAction::StatusChange,
            entity_id: id,
            actor_id: actor.id,
            details: "status: draft -> submitted".into(),
        })
        .await;

        Ok(request)
    }

    pub async fn approve(
        &self,
        id: u64,
        actor: Actor,
        comment: Option<String>,
    ) -> LeaveResult<LeaveRequest> {
        if !actor.role.is_manager() {
            return Err(LeaveError::Forbidden("manager role required".into()));
        }

        let mut request = self.store.find_by_id(id).await?.ok_or(LeaveError::NotFound)?;

        if !policy::can_approve(actor.role, request.status) {
            return Err(LeaveError::InvalidState(format!(
                "a request in status \"{}\" cannot be approved by this role",
                request.status
            )));
        }
        let next = policy::next_approval_status(actor.role)
            .ok_or_else(|| LeaveError::Forbidden("manager role required".into()))?;

        let from = request.status;
        let decided_at = Utc::now();
        let stored = self
            .store
            .record_decision(
                id,
                from,
                Decision {
                    status: next,
                    approver_id: actor.id,
                    decided_at,
                    comment: comment.clone(),
                },
            )
            .await?;
        if !stored {
            return Err(LeaveError::InvalidState(
                "request status changed concurrently".into(),
            ));
        }

        request.status = next;
        request.approver_id = Some(actor.id);
        request.approved_at = Some(decided_at);
        request.approver_comment = comment.clone();

        let mut body = format!("Your leave request has been approved ({})", next);
        if let Some(comment) = &comment {
            body.push_str(&format!(". Comment: {comment}"));
        }
        self.notify_quietly(
            request.employee_id,
            Note {
                kind: NoteKind::LeaveApproved,
                title: "Leave request approved".into(),
                body,
                link: format!("/leave/{id}"),
            },
        )
        .await;

        self.audit_quietly(AuditEntry {
            action: AuditAction::Approve,
            entity_id: id,
            actor_id: actor.id,
            details: format!("status: {from} -> {next}"),
        })
        .await;

        Ok(request)
    }

    pub async fn reject(&self, id: u64, actor: Actor, comment: &str) -> LeaveResult<LeaveRequest> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(LeaveError::Validation(
                "a comment is required to reject a request".into(),
            ));
        }
        if !actor.role.is_manager() {
            return Err(LeaveError::Forbidden("manager role required".into()));
        }

        let mut request = self.store.find_by_id(id).await?.ok_or(LeaveError::NotFound)?;

        if !policy::can_reject(actor.role, request.status) {
            return Err(LeaveError::InvalidState(format!(
                "a request in status \"{}\" cannot be rejected",
                request.status
            )));
        }

        let from = request.status;
        let decided_at = Utc::now();
        let stored = self
            .store
            .record_decision(
                id,
                from,
                Decision {
                    status: LeaveStatus::Rejected,
                    approver_id: actor.id,
                    decided_at,
                    comment: Some(comment.to_string()),
                },
            )
            .await?;
        if !stored {
            return Err(LeaveError::InvalidState(
                "request status changed concurrently".into(),
            ));
        }

        request.status = LeaveStatus::Rejected;
        request.approver_id = Some(actor.id);
        request.approved_at = Some(decided_at);
        request.approver_comment = Some(comment.to_string());

        self.notify_quietly(
            request.employee_id,
            Note {
                kind: NoteKind::LeaveRejected,
                title: "Leave request rejected".into(),
                body: format!("Your leave request has been rejected. Reason: {comment}"),
                link: format!("/leave/{id}"),
            },
        )
        .await;

        self.audit_quietly(AuditEntry {
            action: AuditAction::Reject,
            entity_id: id,
            actor_id: actor.id,
            details: format!("status: {from} -> rejected. Comment: {comment}"),
        })
        .await;

        Ok(request)
    }

    pub async fn cancel(&self, id: u64, actor: Actor) -> LeaveResult<LeaveRequest> {
        let mut request = self.store.find_by_id(id).await?.ok_or(LeaveError::NotFound)?;

        let is_owner = request.employee_id == actor.id;
        let is_manager = actor.role.is_manager();
        if !is_owner && !is_manager {
            return Err(LeaveError::Forbidden("not allowed to cancel this request".into()));
        }

        if is_manager {
            if request.status.is_terminal() {
                return Err(LeaveError::InvalidState(format!(
                    "a {} request can no longer be cancelled",
                    request.status
                )));
            }
        } else if !matches!(request.status, LeaveStatus::Draft | LeaveStatus::Submitted) {
            return Err(LeaveError::InvalidState(
                "only drafts and submitted requests can be cancelled by their owner".into(),
            ));
        }

        let from = request.status;
        self.transition(id, from, LeaveStatus::Cancelled).await?;
        request.status = LeaveStatus::Cancelled;

        self.audit_quietly(AuditEntry {
            action: AuditAction::StatusChange,
            entity_id: id,
            actor_id: actor.id,
            details: format!("status: {from} -> cancelled"),
        })
        .await;

        Ok(request)
    }

    pub async fn get(&self, id: u64, actor: Actor) -> LeaveResult<LeaveRequest> {
        let request = self.store.find_by_id(id).await?.ok_or(LeaveError::NotFound)?;
        if request.employee_id != actor.id && !actor.role.is_manager() {
            return Err(LeaveError::Forbidden("not allowed to view this request".into()));
        }
        Ok(request)
    }

    /// Staff are always scoped to their own requests regardless of filters.
    pub async fn list(
        &self,
        actor: Actor,
        mut query: LeaveQuery,
    ) -> LeaveResult<(Vec<LeaveRequest>, i64)> {
        if !actor.role.is_manager() {
            query.employee_id = Some(actor.id);
            query.branch_id = None;
        }
        Ok(self.store.list(&query).await?)
    }

    /// Requests awaiting the caller's approval tier: branch managers see
    /// submitted requests from their branch, super admins see submitted and
    /// tier-1-approved requests anywhere.
    pub async fn approval_queue(
        &self,
        actor: Actor,
        page: u64,
        per_page: u64,
    ) -> LeaveResult<(Vec<LeaveRequest>, i64)> {
        let query = match actor.role {
            Role::BranchManager => LeaveQuery {
                statuses: vec![LeaveStatus::Submitted],
                branch_id: actor.branch_id,
                page,
                per_page,
                ..Default::default()
            },
            Role::SuperAdmin => LeaveQuery {
                statuses: vec![LeaveStatus::Submitted, LeaveStatus::ManagerApproved],
                page,
                per_page,
                ..Default::default()
            },
            Role::Staff => {
                return Err(LeaveError::Forbidden("manager role required".into()));
            }
        };
        Ok(self.store.list(&query).await?)
    }

    pub async fn balance(
        &self,
        actor: Actor,
        employee_id: u64,
        year: i32,
    ) -> LeaveResult<LeaveBalance> {
        if actor.id != employee_id && !actor.role.is_manager() {
            return Err(LeaveError::Forbidden(
                "not allowed to view this employee's balance".into(),
            ));
        }
        let history = self.store.annual_requests(employee_id, year).await?;
        Ok(balance::compute_balance(self.annual_allotment, &history))
    }

    async fn transition(
        &self,
        id: u64,
        expected: LeaveStatus,
        next: LeaveStatus,
    ) -> LeaveResult<()> {
        let stored = self.store.set_status(id, expected, next).await?;
        if !stored {
            return Err(LeaveError::InvalidState(
                "request status changed concurrently".into(),
            ));
        }
        Ok(())
    }

    async fn fan_out_to_branch_managers(&self, request: &LeaveRequest) {
        let profile = match self.store.requester_profile(request.employee_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, employee_id = request.employee_id, "Requester lookup failed");
                return;
            }
        };
        let Some(branch_id) = profile.branch_id else {
            return;
        };

        let manager_ids = match self.store.branch_manager_ids(branch_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, branch_id, "Branch manager lookup failed");
                return;
            }
        };

        for manager_id in manager_ids {
            self.notify_quietly(
                manager_id,
                Note {
                    kind: NoteKind::LeaveSubmitted,
                    title: "New leave request".into(),
                    body: format!(
                        "{} submitted a request for {} leave ({} days)",
                        profile.display_name, request.leave_type, request.business_days
                    ),
                    link: format!("/leave/{}", request.id),
                },
            )
            .await;
        }
    }

    // Notification and audit writes never fail the transition that already
    // happened; they are logged and dropped instead.
    async fn notify_quietly(&self, user_id: u64, note: Note) {
        if let Err(e) = self.notifier.notify(user_id, note).await {
            warn!(error = %e, user_id, "Failed to record notification");
        }
    }

    async fn audit_quietly(&self, entry: AuditEntry) {
        if let Err(e) = self.audit.record(entry).await {
            warn!(error = %e, "Failed to record audit entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::service::store::RequesterProfile;

    #[derive(Default)]
    struct MemStore {
        rows: Mutex<HashMap<u64, LeaveRequest>>,
        next_id: Mutex<u64>,
        profiles: Mutex<HashMap<u64, RequesterProfile>>,
        managers: Mutex<HashMap<u64, Vec<u64>>>,
    }

    impl MemStore {
        fn with_profile(self, id: u64, name: &str, branch_id: Option<u64>) -> Self {
            self.profiles.lock().unwrap().insert(
                id,
                RequesterProfile { id, display_name: name.into(), branch_id },
            );
            self
        }

        fn with_managers(self, branch_id: u64, ids: Vec<u64>) -> Self {
            self.managers.lock().unwrap().insert(branch_id, ids);
            self
        }

        fn row(&self, id: u64) -> LeaveRequest {
            self.rows.lock().unwrap().get(&id).cloned().unwrap()
        }
    }

    #[async_trait]
    impl LeaveRequestStore for MemStore {
        async fn find_by_id(&self, id: u64) -> Result<Option<LeaveRequest>> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn insert(&self, new: NewLeaveRequest) -> Result<LeaveRequest> {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            let request = LeaveRequest {
                id: *next_id,
                employee_id: new.employee_id,
                leave_type: new.leave_type,
                status: LeaveStatus::Draft,
                start_date: new.start_date,
                end_date: new.end_date,
                business_days: new.business_days,
                reason: new.reason,
                approver_id: None,
                approved_at: None,
                approver_comment: None,
                created_at: Utc::now(),
            };
            self.rows.lock().unwrap().insert(request.id, request.clone());
            Ok(request)
        }

        async fn set_status(
            &self,
            id: u64,
            expected: LeaveStatus,
            next: LeaveStatus,
        ) -> Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(&id) {
                Some(row) if row.status == expected => {
                    row.status = next;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn record_decision(
            &self,
            id: u64,
            expected: LeaveStatus,
            decision: Decision,
        ) -> Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(&id) {
                Some(row) if row.status == expected => {
                    row.status = decision.status;
                    row.approver_id = Some(decision.approver_id);
                    row.approved_at = Some(decision.decided_at);
                    row.approver_comment = decision.comment;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn list(&self, query: &LeaveQuery) -> Result<(Vec<LeaveRequest>, i64)> {
            let rows = self.rows.lock().unwrap();
            let matches: Vec<LeaveRequest> = rows
                .values()
                .filter(|r| query.employee_id.is_none_or(|id| r.employee_id == id))
                .filter(|r| query.statuses.is_empty() || query.statuses.contains(&r.status))
                .cloned()
                .collect();
            let total = matches.len() as i64;
            Ok((matches, total))
        }

        async fn annual_requests(&self, employee_id: u64, year: i32) -> Result<Vec<LeaveRequest>> {
            use chrono::Datelike;
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .values()
                .filter(|r| {
                    r.employee_id == employee_id
                        && r.leave_type == LeaveType::Annual
                        && r.start_date.year() == year
                })
                .cloned()
                .collect())
        }

        async fn requester_profile(&self, user_id: u64) -> Result<Option<RequesterProfile>> {
            Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
        }

        async fn branch_manager_ids(&self, branch_id: u64) -> Result<Vec<u64>> {
            Ok(self
                .managers
                .lock()
                .unwrap()
                .get(&branch_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    /// Guarded updates always lose, as if another actor changed the row
    /// between the read and the conditional write.
    #[derive(Default)]
    struct ContendedStore {
        inner: MemStore,
    }

    #[async_trait]
    impl LeaveRequestStore for ContendedStore {
        async fn find_by_id(&self, id: u64) -> Result<Option<LeaveRequest>> {
            self.inner.find_by_id(id).await
        }

        async fn insert(&self, new: NewLeaveRequest) -> Result<LeaveRequest> {
            self.inner.insert(new).await
        }

        async fn set_status(
            &self,
            _id: u64,
            _expected: LeaveStatus,
            _next: LeaveStatus,
        ) -> Result<bool> {
            Ok(false)
        }

        async fn record_decision(
            &self,
            _id: u64,
            _expected: LeaveStatus,
            _decision: Decision,
        ) -> Result<bool> {
            Ok(false)
        }

        async fn list(&self, query: &LeaveQuery) -> Result<(Vec<LeaveRequest>, i64)> {
            self.inner.list(query).await
        }

        async fn annual_requests(&self, employee_id: u64, year: i32) -> Result<Vec<LeaveRequest>> {
            self.inner.annual_requests(employee_id, year).await
        }

        async fn requester_profile(&self, user_id: u64) -> Result<Option<RequesterProfile>> {
            self.inner.requester_profile(user_id).await
        }

        async fn branch_manager_ids(&self, branch_id: u64) -> Result<Vec<u64>> {
            self.inner.branch_manager_ids(branch_id).await
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(u64, Note)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, user_id: u64, note: Note) -> Result<()> {
            self.sent.lock().unwrap().push((user_id, note));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingAudit {
        entries: Mutex<Vec<AuditEntry>>,
    }

    #[async_trait]
    impl AuditTrail for RecordingAudit {
        async fn record(&self, entry: AuditEntry) -> Result<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }
    }

    const STAFF: Actor = Actor { id: 1000, role: Role::Staff, branch_id: Some(1) };
    const OTHER_STAFF: Actor = Actor { id: 1001, role: Role::Staff, branch_id: Some(1) };
    const MANAGER: Actor = Actor { id: 7, role: Role::BranchManager, branch_id: Some(1) };
    const ADMIN: Actor = Actor { id: 1, role: Role::SuperAdmin, branch_id: None };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (LeaveService, Arc<MemStore>, Arc<RecordingNotifier>, Arc<RecordingAudit>) {
        let store = Arc::new(
            MemStore::default()
                .with_profile(STAFF.id, "Akou Kouame", Some(1))
                .with_managers(1, vec![MANAGER.id]),
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let audit = Arc::new(RecordingAudit::default());
        let service =
            LeaveService::new(store.clone(), notifier.clone(), audit.clone(), 30);
        (service, store, notifier, audit)
    }

    fn week_of_annual_leave() -> CreateLeave {
        // Monday through Friday of the same week
        CreateLeave {
            leave_type: LeaveType::Annual,
            start_date: date(2026, 3, 2),
            end_date: date(2026, 3, 6),
            reason: "trip".into(),
        }
    }

    #[tokio::test]
    async fn create_computes_days_and_starts_as_draft() {
        let (service, _, _, audit) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();

        assert_eq!(request.business_days, 5);
        assert_eq!(request.status, LeaveStatus::Draft);
        assert_eq!(request.employee_id, STAFF.id);
        assert_eq!(audit.entries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_weekend_only_range() {
        let (service, _, _, _) = setup();

        let result = service
            .create(
                STAFF,
                CreateLeave {
                    leave_type: LeaveType::Annual,
                    start_date: date(2026, 3, 7), // Saturday
                    end_date: date(2026, 3, 8),   // Sunday
                    reason: "weekend".into(),
                },
            )
            .await;

        assert!(matches!(result, Err(LeaveError::Validation(_))));
    }

    #[tokio::test]
    async fn happy_path_through_both_tiers() {
        let (service, store, notifier, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        let request = service.submit(request.id, STAFF).await.unwrap();
        assert_eq!(request.status, LeaveStatus::Submitted);

        // submit fanned out to the branch manager
        {
            let sent = notifier.sent.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].0, MANAGER.id);
            assert!(sent[0].1.body.contains("Akou Kouame"));
        }

        let request = service.approve(request.id, MANAGER, None).await.unwrap();
        assert_eq!(request.status, LeaveStatus::ManagerApproved);
        assert_eq!(request.approver_id, Some(MANAGER.id));

        let request = service.approve(request.id, ADMIN, None).await.unwrap();
        assert_eq!(request.status, LeaveStatus::FinalApproved);
        assert_eq!(store.row(request.id).status, LeaveStatus::FinalApproved);
    }

    #[tokio::test]
    async fn super_admin_fast_tracks_a_submitted_request() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        service.submit(request.id, STAFF).await.unwrap();

        // skips the tier-1 status entirely
        let request = service.approve(request.id, ADMIN, None).await.unwrap();
        assert_eq!(request.status, LeaveStatus::FinalApproved);
    }

    #[tokio::test]
    async fn submit_requires_ownership() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        let result = service.submit(request.id, OTHER_STAFF).await;

        assert!(matches!(result, Err(LeaveError::Forbidden(_))));
    }

    #[tokio::test]
    async fn submit_requires_draft_status() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        service.submit(request.id, STAFF).await.unwrap();
        let result = service.submit(request.id, STAFF).await;

        assert!(matches!(result, Err(LeaveError::InvalidState(_))));
    }

    #[tokio::test]
    async fn staff_cannot_approve() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        service.submit(request.id, STAFF).await.unwrap();
        let result = service.approve(request.id, OTHER_STAFF, None).await;

        assert!(matches!(result, Err(LeaveError::Forbidden(_))));
    }

    #[tokio::test]
    async fn branch_manager_cannot_approve_a_draft_or_a_tier1_approved_request() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        let result = service.approve(request.id, MANAGER, None).await;
        assert!(matches!(result, Err(LeaveError::InvalidState(_))));

        service.submit(request.id, STAFF).await.unwrap();
        service.approve(request.id, MANAGER, None).await.unwrap();
        let result = service.approve(request.id, MANAGER, None).await;
        assert!(matches!(result, Err(LeaveError::InvalidState(_))));
    }

    #[tokio::test]
    async fn reject_requires_a_comment_regardless_of_status() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();

        // still a draft: the blank comment fails before any state guard
        let result = service.reject(request.id, MANAGER, "   ").await;
        assert!(matches!(result, Err(LeaveError::Validation(_))));

        service.submit(request.id, STAFF).await.unwrap();
        let result = service.reject(request.id, MANAGER, "").await;
        assert!(matches!(result, Err(LeaveError::Validation(_))));
    }

    #[tokio::test]
    async fn reject_records_approver_and_comment() {
        let (service, _, notifier, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        service.submit(request.id, STAFF).await.unwrap();

        let request = service
            .reject(request.id, MANAGER, "insufficient staffing")
            .await
            .unwrap();

        assert_eq!(request.status, LeaveStatus::Rejected);
        assert_eq!(request.approver_id, Some(MANAGER.id));
        assert_eq!(request.approver_comment.as_deref(), Some("insufficient staffing"));

        let sent = notifier.sent.lock().unwrap();
        let rejection = sent.iter().find(|(user_id, _)| *user_id == STAFF.id).unwrap();
        assert!(rejection.1.body.contains("insufficient staffing"));
    }

    #[tokio::test]
    async fn reject_is_allowed_from_tier1_approved() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        service.submit(request.id, STAFF).await.unwrap();
        service.approve(request.id, MANAGER, None).await.unwrap();

        let request = service.reject(request.id, ADMIN, "conflicts with audit week").await.unwrap();
        assert_eq!(request.status, LeaveStatus::Rejected);
    }

    #[tokio::test]
    async fn owner_cancels_draft_and_submitted_only() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        let cancelled = service.cancel(request.id, STAFF).await.unwrap();
        assert_eq!(cancelled.status, LeaveStatus::Cancelled);

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        service.submit(request.id, STAFF).await.unwrap();
        service.approve(request.id, MANAGER, None).await.unwrap();
        let result = service.cancel(request.id, STAFF).await;
        assert!(matches!(result, Err(LeaveError::InvalidState(_))));
    }

    #[tokio::test]
    async fn manager_cancels_any_non_terminal_request() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        service.submit(request.id, STAFF).await.unwrap();
        service.approve(request.id, MANAGER, None).await.unwrap();

        let cancelled = service.cancel(request.id, ADMIN).await.unwrap();
        assert_eq!(cancelled.status, LeaveStatus::Cancelled);

        // terminal now, even a manager cannot cancel again
        let result = service.cancel(request.id, ADMIN).await;
        assert!(matches!(result, Err(LeaveError::InvalidState(_))));
    }

    #[tokio::test]
    async fn non_owner_staff_cannot_cancel() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        let result = service.cancel(request.id, OTHER_STAFF).await;
        assert!(matches!(result, Err(LeaveError::Forbidden(_))));
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let (service, _, _, _) = setup();

        assert!(matches!(service.submit(999, STAFF).await, Err(LeaveError::NotFound)));
        assert!(matches!(service.approve(999, ADMIN, None).await, Err(LeaveError::NotFound)));
        assert!(matches!(service.cancel(999, ADMIN).await, Err(LeaveError::NotFound)));
        assert!(matches!(service.get(999, ADMIN).await, Err(LeaveError::NotFound)));
    }

    #[tokio::test]
    async fn get_is_limited_to_owner_and_managers() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();

        assert!(service.get(request.id, STAFF).await.is_ok());
        assert!(service.get(request.id, MANAGER).await.is_ok());
        assert!(matches!(
            service.get(request.id, OTHER_STAFF).await,
            Err(LeaveError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn list_scopes_staff_to_their_own_requests() {
        let (service, _, _, _) = setup();

        service.create(STAFF, week_of_annual_leave()).await.unwrap();
        service.create(OTHER_STAFF, week_of_annual_leave()).await.unwrap();

        let (rows, total) = service
            .list(OTHER_STAFF, LeaveQuery { employee_id: Some(STAFF.id), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(total, 1);
        assert!(rows.iter().all(|r| r.employee_id == OTHER_STAFF.id));
    }

    #[tokio::test]
    async fn approval_queue_is_role_shaped() {
        let (service, _, _, _) = setup();

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        service.submit(request.id, STAFF).await.unwrap();
        service.approve(request.id, MANAGER, None).await.unwrap();

        // tier-1 approved is invisible to branch managers but queued for admins
        let (rows, _) = service.approval_queue(MANAGER, 1, 10).await.unwrap();
        assert!(rows.is_empty());
        let (rows, _) = service.approval_queue(ADMIN, 1, 10).await.unwrap();
        assert_eq!(rows.len(), 1);

        assert!(matches!(
            service.approval_queue(STAFF, 1, 10).await,
            Err(LeaveError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn balance_aggregates_the_year() {
        let (service, _, _, _) = setup();

        // 5 approved days, 1 pending day
        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();
        service.submit(request.id, STAFF).await.unwrap();
        service.approve(request.id, ADMIN, None).await.unwrap();
        service
            .create(
                STAFF,
                CreateLeave {
                    leave_type: LeaveType::Annual,
                    start_date: date(2026, 4, 1),
                    end_date: date(2026, 4, 1),
                    reason: "appointment".into(),
                },
            )
            .await
            .unwrap();

        let balance = service.balance(STAFF, STAFF.id, 2026).await.unwrap();
        assert_eq!(balance.total, 30);
        assert_eq!(balance.used, 5);
        assert_eq!(balance.pending, 1);
        assert_eq!(balance.remaining, 25);
    }

    #[tokio::test]
    async fn balance_of_another_employee_requires_manager() {
        let (service, _, _, _) = setup();

        assert!(matches!(
            service.balance(OTHER_STAFF, STAFF.id, 2026).await,
            Err(LeaveError::Forbidden(_))
        ));
        assert!(service.balance(MANAGER, STAFF.id, 2026).await.is_ok());
    }

    #[tokio::test]
    async fn lost_race_on_any_transition_surfaces_as_invalid_state() {
        fn assert_stale(result: LeaveResult<LeaveRequest>) {
            match result {
                Err(LeaveError::InvalidState(msg)) => assert!(msg.contains("concurrently")),
                other => panic!("expected stale-status failure, got {other:?}"),
            }
        }

        let store = Arc::new(ContendedStore::default());
        let service = LeaveService::new(
            store.clone(),
            Arc::new(RecordingNotifier::default()),
            Arc::new(RecordingAudit::default()),
            30,
        );

        let request = service.create(STAFF, week_of_annual_leave()).await.unwrap();

        // all preconditions hold for a draft, only the guarded update loses
        assert_stale(service.submit(request.id, STAFF).await);

        // same for the reviewable statuses
        store
            .inner
            .rows
            .lock()
            .unwrap()
            .get_mut(&request.id)
            .unwrap()
            .status = LeaveStatus::Submitted;

        assert_stale(service.approve(request.id, MANAGER, None).await);
        assert_stale(service.reject(request.id, MANAGER, "overlapping absences").await);
        assert_stale(service.cancel(request.id, STAFF).await);

        // the losing side never touched the row
        let row = store.inner.row(request.id);
        assert_eq!(row.status, LeaveStatus::Submitted);
        assert_eq!(row.approver_id, None);
        assert_eq!(row.approver_comment, None);
    }
}
