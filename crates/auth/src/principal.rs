use serde::{Deserialize, Serialize};

use gatehouse_core::{BranchId, TenantId, UserId};

/// Identity of an authenticated caller, as resolved by the transport layer.
///
/// Credential verification happens elsewhere; by the time a `Caller` exists the
/// user id is trusted. Company and branch are the request's working context
/// and are carried for logging only: effective permissions span all of the
/// user's active assignments.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub user_id: UserId,
    #[serde(default)]
    pub company_id: Option<TenantId>,
    #[serde(default)]
    pub branch_id: Option<BranchId>,
}

impl Caller {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            company_id: None,
            branch_id: None,
        }
    }

    pub fn in_company(mut self, company_id: TenantId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn in_branch(mut self, branch_id: BranchId) -> Self {
        self.branch_id = Some(branch_id);
        self
    }
}

impl From<UserId> for Caller {
    fn from(value: UserId) -> Self {
        Self::new(value)
    }
}
