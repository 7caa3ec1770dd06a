#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    /// Organization-wide administrator, final (tier-2) approver.
    SuperAdmin = 1,
    /// Branch-scoped manager, first (tier-1) approver.
    BranchManager = 2,
    Staff = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::SuperAdmin),
            2 => Some(Role::BranchManager),
            3 => Some(Role::Staff),
            _ => None,
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::BranchManager)
    }
}
